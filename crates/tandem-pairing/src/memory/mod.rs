//! In-process implementations of every external service.
//!
//! Used by the test suites and the `tandem-sim` binary. All callbacks are
//! posted to the owning device's inbox, never delivered inline, so the
//! coordinators see the same ordering they would with real services.

mod anchor;
mod device;
mod discovery;
mod store;

pub use anchor::{MemoryAnchorCloud, MemoryAnchorService, MemoryTracking};
pub use device::{pump_all, SimDevice, SimWorld};
pub use discovery::{MemoryDiscovery, MemoryMedium};
pub use store::{MemoryStore, MemoryStoreBackend, StoreControl};
