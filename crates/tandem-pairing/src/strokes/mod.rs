//! Stroke synchronization.
//!
//! Local strokes are uploaded by their author only; remote child events
//! under the room's `lines` node become partner strokes unless they are
//! echoes of this device's own writes.

mod engine;
mod types;
mod upload;

pub use engine::StrokeSyncEngine;
pub use types::{
    LocalStroke, PartnerStroke, StrokeEvent, StrokeHandle, StrokeRecord, StrokeStyle,
};
pub use upload::{UploadPlan, UploadState};
