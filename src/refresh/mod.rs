pub mod backoff;
pub mod orchestrator;
pub mod scheduler;
pub mod single_flight;

pub use backoff::Backoff;
pub use orchestrator::{RefreshPolicy, RefreshState, RefreshStatus, Refresher};
pub use scheduler::{Schedule, spawn_schedule};
pub use single_flight::SingleFlight;
