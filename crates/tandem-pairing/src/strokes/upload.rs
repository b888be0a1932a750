//! Per-stroke upload bookkeeping.
//!
//! At most one write per stroke is in flight. Updates arriving meanwhile
//! only mark the stroke dirty; the completion of the in-flight write
//! triggers one follow-up upload carrying everything accumulated.

use crate::services::RequestId;

/// What the next upload of a stroke has to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPlan {
    /// Write the whole record.
    Full,
    /// Append points `from..len` only.
    Delta { from: usize },
    /// The store already has every point.
    Nothing,
}

#[derive(Debug, Default)]
pub struct UploadState {
    /// Whether a full record has been written.
    created: bool,
    /// Points the store is known to hold.
    uploaded_len: usize,
    in_flight: Option<RequestId>,
    dirty: bool,
}

impl UploadState {
    pub fn plan(&self, len: usize) -> UploadPlan {
        if !self.created || len < self.uploaded_len {
            UploadPlan::Full
        } else if len > self.uploaded_len {
            UploadPlan::Delta {
                from: self.uploaded_len,
            }
        } else {
            UploadPlan::Nothing
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Record that a write covering `len` points was issued.
    pub fn started(&mut self, request: RequestId, len: usize) {
        self.created = true;
        self.uploaded_len = len;
        self.in_flight = Some(request);
        self.dirty = false;
    }

    /// Nothing needed writing.
    pub fn settled(&mut self) {
        self.dirty = false;
    }

    /// The in-flight write finished. After a failure the next upload
    /// rewrites the full record.
    pub fn completed(&mut self, request: RequestId, ok: bool) -> bool {
        if self.in_flight != Some(request) {
            return false;
        }
        self.in_flight = None;
        if !ok {
            self.created = false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_upload_is_full() {
        let state = UploadState::default();
        assert_eq!(state.plan(3), UploadPlan::Full);
    }

    #[test]
    fn later_uploads_are_deltas() {
        let mut state = UploadState::default();
        let request = RequestId::next();
        state.started(request, 3);
        assert!(state.completed(request, true));
        assert_eq!(state.plan(5), UploadPlan::Delta { from: 3 });
        assert_eq!(state.plan(3), UploadPlan::Nothing);
    }

    #[test]
    fn shrinking_stroke_is_rewritten() {
        let mut state = UploadState::default();
        state.started(RequestId::next(), 4);
        assert_eq!(state.plan(2), UploadPlan::Full);
    }

    #[test]
    fn failed_write_forces_full_rewrite() {
        let mut state = UploadState::default();
        let request = RequestId::next();
        state.started(request, 4);
        assert!(state.completed(request, false));
        assert!(!state.is_dirty());
        assert_eq!(state.plan(4), UploadPlan::Full);
    }

    #[test]
    fn unknown_completion_is_ignored() {
        let mut state = UploadState::default();
        let request = RequestId::next();
        state.started(request, 1);
        assert!(!state.completed(RequestId::next(), true));
        assert!(state.is_in_flight());
    }
}
