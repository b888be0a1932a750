//! Stroke reconciliation between this device and the room.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::{Map, Value};
use tandem_common::{ParticipantId, StrokeId};
use tracing::{debug, warn};

use super::types::{
    point_value, LocalStroke, PartnerStroke, StrokeEvent, StrokeHandle, StrokeRecord,
};
use super::upload::{UploadPlan, UploadState};
use crate::protocol::POINTS;
use crate::services::{ChildChange, RequestId, RoomStore};

#[derive(Debug)]
struct LocalEntry {
    stroke: LocalStroke,
    upload: UploadState,
}

// ---------------------------------------------------------------------------
// Stroke Sync Engine
// ---------------------------------------------------------------------------

/// Keeps local and remote strokes consistent.
///
/// Every stroke has exactly one writer, its author. Strokes authored here
/// live in the local-origin table; store events for those ids are echoes
/// of our own writes and never surface as partner strokes. Ids leave the
/// table into the retired set, which lasts as long as the room, so late
/// echoes stay suppressed too.
#[derive(Debug, Default)]
pub struct StrokeSyncEngine {
    lines_path: Option<String>,
    creator: Option<ParticipantId>,
    local: HashMap<StrokeId, LocalEntry>,
    handles: HashMap<StrokeHandle, StrokeId>,
    retired: HashSet<StrokeId>,
    partners: BTreeMap<StrokeId, PartnerStroke>,
    uploads: HashMap<RequestId, StrokeId>,
}

impl StrokeSyncEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to a room's `lines` node.
    pub fn attach(&mut self, lines_path: String, creator: Option<ParticipantId>) {
        self.detach();
        self.lines_path = Some(lines_path);
        self.creator = creator;
    }

    /// Forget the room and every stroke in it.
    pub fn detach(&mut self) {
        self.lines_path = None;
        self.creator = None;
        self.local.clear();
        self.handles.clear();
        self.retired.clear();
        self.partners.clear();
        self.uploads.clear();
    }

    pub fn is_attached(&self) -> bool {
        self.lines_path.is_some()
    }

    pub fn lines_path(&self) -> Option<&str> {
        self.lines_path.as_deref()
    }

    pub fn local_id(&self, handle: &StrokeHandle) -> Option<&StrokeId> {
        self.handles.get(handle)
    }

    /// Whether `id` was authored on this device in the current room.
    pub fn is_local_origin(&self, id: &StrokeId) -> bool {
        self.local.contains_key(id) || self.retired.contains(id)
    }

    pub fn local_count(&self) -> usize {
        self.local.len()
    }

    pub fn partner_strokes(&self) -> impl Iterator<Item = &PartnerStroke> {
        self.partners.values()
    }

    pub fn partner_stroke(&self, id: &StrokeId) -> Option<&PartnerStroke> {
        self.partners.get(id)
    }

    // -----------------------------------------------------------------------
    // Local changes
    // -----------------------------------------------------------------------

    /// Record the latest state of a local stroke and queue it for upload.
    ///
    /// The first call for a handle allocates the store id. Calls made while
    /// a write is in flight coalesce into one follow-up upload.
    pub fn update_stroke(
        &mut self,
        store: &mut dyn RoomStore,
        stroke: &LocalStroke,
        remove: bool,
        events: &mut Vec<StrokeEvent>,
    ) {
        if remove {
            self.remove_stroke(store, stroke, events);
            return;
        }
        let Some(lines) = self.lines_path.clone() else {
            debug!(handle = %stroke.handle, "No room, stroke stays local");
            return;
        };

        let id = match self.handles.get(&stroke.handle) {
            Some(id) => id.clone(),
            None => {
                let id = StrokeId::from(store.child_key(&lines));
                self.handles.insert(stroke.handle, id.clone());
                self.local.insert(
                    id.clone(),
                    LocalEntry {
                        stroke: stroke.clone(),
                        upload: UploadState::default(),
                    },
                );
                events.push(StrokeEvent::LocalAdded {
                    handle: stroke.handle,
                    id: id.clone(),
                });
                id
            }
        };

        if let Some(entry) = self.local.get_mut(&id) {
            entry.stroke = stroke.clone();
            entry.upload.mark_dirty();
            if entry.upload.is_in_flight() {
                debug!(stroke = %id, "Upload in flight, batching update");
                return;
            }
        }
        self.upload_stroke(store, &id, events);
    }

    /// Upload whatever the store is missing for `id`.
    ///
    /// The first upload writes the full record, later ones only the new
    /// points. A degenerate stroke is never written; it is dropped and
    /// reported as removed.
    pub fn upload_stroke(
        &mut self,
        store: &mut dyn RoomStore,
        id: &StrokeId,
        events: &mut Vec<StrokeEvent>,
    ) {
        let Some(lines) = self.lines_path.as_deref() else {
            return;
        };
        let path = format!("{lines}/{id}");

        let Some(entry) = self.local.get_mut(id) else {
            return;
        };

        if entry.stroke.is_degenerate() {
            let handle = entry.stroke.handle;
            let created = entry.upload.is_created();
            debug!(stroke = %id, "Degenerate stroke, cancelling upload");
            self.evict(id);
            if created {
                store.write(&path, None, None);
            }
            events.push(StrokeEvent::LocalRemoved {
                handle,
                id: id.clone(),
            });
            return;
        }

        let len = entry.stroke.points.len();
        let request = match entry.upload.plan(len) {
            UploadPlan::Full => {
                let record = StrokeRecord::from_local(&entry.stroke, self.creator.clone());
                let request = RequestId::next();
                store.write(&path, Some(record.to_value()), Some(request));
                request
            }
            UploadPlan::Delta { from } => {
                let children: Map<String, Value> = entry.stroke.points[from..]
                    .iter()
                    .enumerate()
                    .map(|(offset, point)| (format!("{POINTS}/{}", from + offset), point_value(point)))
                    .collect();
                let request = RequestId::next();
                store.update(&path, children, Some(request));
                request
            }
            UploadPlan::Nothing => {
                entry.upload.settled();
                return;
            }
        };
        entry.upload.started(request, len);
        self.uploads.insert(request, id.clone());
    }

    /// Drop a local stroke and delete its record.
    pub fn remove_stroke(
        &mut self,
        store: &mut dyn RoomStore,
        stroke: &LocalStroke,
        events: &mut Vec<StrokeEvent>,
    ) {
        let Some(id) = self.handles.get(&stroke.handle).cloned() else {
            return;
        };
        let created = self
            .local
            .get(&id)
            .is_some_and(|entry| entry.upload.is_created());
        self.evict(&id);
        events.push(StrokeEvent::LocalRemoved {
            handle: stroke.handle,
            id: id.clone(),
        });
        if let (true, Some(lines)) = (created, self.lines_path.as_deref()) {
            store.write(&format!("{lines}/{id}"), None, None);
        }
    }

    /// Delete every stroke in the room with one write. Child-removed
    /// events drive the in-memory cleanup.
    pub fn clear_all_strokes(&mut self, store: &mut dyn RoomStore) {
        if let Some(lines) = self.lines_path.as_deref() {
            store.write(lines, None, None);
        }
    }

    /// Handle a write completion. Returns `false` if the request was not
    /// a stroke upload.
    pub fn on_write_completed(
        &mut self,
        store: &mut dyn RoomStore,
        request: RequestId,
        result: &Result<(), String>,
        events: &mut Vec<StrokeEvent>,
    ) -> bool {
        let Some(id) = self.uploads.remove(&request) else {
            return false;
        };
        if let Err(e) = result {
            warn!(stroke = %id, error = %e, "Stroke upload failed");
        }
        let follow_up = match self.local.get_mut(&id) {
            Some(entry) => entry.upload.completed(request, result.is_ok()) && entry.upload.is_dirty(),
            None => false,
        };
        if follow_up {
            self.upload_stroke(store, &id, events);
        }
        true
    }

    // -----------------------------------------------------------------------
    // Remote changes
    // -----------------------------------------------------------------------

    /// Apply a child event from the room's `lines` feed.
    pub fn on_remote(
        &mut self,
        change: ChildChange,
        key: &str,
        value: &Value,
        events: &mut Vec<StrokeEvent>,
    ) {
        let id = StrokeId::from(key);

        if let Some(entry) = self.local.get(&id) {
            if change == ChildChange::Removed {
                let handle = entry.stroke.handle;
                debug!(stroke = %id, "Own stroke cleared remotely");
                self.evict(&id);
                events.push(StrokeEvent::LocalRemoved { handle, id });
            } else {
                debug!(stroke = %id, "Echo of own stroke suppressed");
            }
            return;
        }
        if self.retired.contains(&id) {
            debug!(stroke = %id, "Echo of retired stroke suppressed");
            return;
        }

        match change {
            ChildChange::Added | ChildChange::Changed => {
                let record = match StrokeRecord::from_value(value) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(stroke = %id, error = %e, "Dropping unreadable stroke");
                        return;
                    }
                };
                if record.removed {
                    if self.partners.remove(&id).is_some() {
                        events.push(StrokeEvent::PartnerRemoved { id });
                    }
                    return;
                }
                match self.partners.get_mut(&id) {
                    Some(existing) => {
                        existing.points = record.points.clone();
                        existing.style = record.style;
                        events.push(StrokeEvent::PartnerUpdated {
                            id,
                            points: record.points,
                        });
                    }
                    None => {
                        let stroke = record.into_partner(id.clone());
                        self.partners.insert(id, stroke.clone());
                        events.push(StrokeEvent::PartnerAdded(stroke));
                    }
                }
            }
            ChildChange::Removed => {
                if self.partners.remove(&id).is_some() {
                    events.push(StrokeEvent::PartnerRemoved { id });
                }
            }
        }
    }

    fn evict(&mut self, id: &StrokeId) {
        if let Some(entry) = self.local.remove(id) {
            self.handles.remove(&entry.stroke.handle);
        }
        self.retired.insert(id.clone());
    }
}
