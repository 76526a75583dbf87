//! Whistler Blackcomb lift status and webcam feed.
//!
//! Lift and webcam data is fetched from a priority-ordered chain of
//! upstream adapters (vendor API, page scrape with structured extraction,
//! page scrape with a name-scanning heuristic), normalized, cached on disk
//! and served over a small HTTP API.
//!
//! # Examples
//!
//! ```rust,no_run
//! use lift_feed::config::Config;
//! use lift_feed::data_fetcher::models::Snapshot;
//! use lift_feed::error::AppError;
//! use lift_feed::service::FeedService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let config = Config::load(None).await?;
//!     let service = FeedService::from_config(&config).await?;
//!
//!     let lifts = service.lifts().serve().await;
//!     println!("{} lifts from {}", lifts.lift_count(), lifts.source());
//!     for lift in lifts.lifts() {
//!         println!("{:<28} {:<10} {}", lift.name, lift.status, lift.mountain);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod data_fetcher;
pub mod error;
pub mod logging;
pub mod refresh;
pub mod server;
pub mod service;
pub mod testing_utils;

// Re-export commonly used types for convenience
pub use config::Config;
pub use data_fetcher::models::{
    FeedKind, LiftRecord, LiftSnapshot, Mountain, Snapshot, Source, WebcamRecord, WebcamSnapshot,
};
pub use error::{AppError, FetchError, RefreshError};
pub use service::FeedService;

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
