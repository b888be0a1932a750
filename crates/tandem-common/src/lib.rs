pub mod errors;
pub mod id;
pub mod time;
pub mod types;

pub use errors::{ConfigError, PairingError, TandemError};
pub use id::{new_id, ParticipantId, PeerId, RoomKey, StrokeId};
pub use time::now_millis;
pub use types::{Color, Point3, Pose};

pub type Result<T> = std::result::Result<T, TandemError>;
