pub mod fetch_log;
pub mod store;

pub use fetch_log::FetchLog;
pub use store::CacheStore;
