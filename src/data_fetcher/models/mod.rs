pub mod fetch_log;
pub mod kind;
pub mod lift;
pub mod snapshot;
pub mod vendor;
pub mod webcam;

pub use fetch_log::{FetchLogEntry, LogLevel};
pub use kind::{FeedKind, Source};
pub use lift::{LiftRecord, LiftSnapshot, LiftStatus, LiftType, Mountain};
pub use snapshot::Snapshot;
pub use vendor::{VendorLift, VendorMap, VendorStatusResponse};
pub use webcam::{WebcamRecord, WebcamSnapshot};
