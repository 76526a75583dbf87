use crate::cli::Args;
use crate::config::Config;
use crate::data_fetcher::models::{FeedKind, LiftSnapshot, Snapshot, WebcamSnapshot};
use crate::error::{AppError, RefreshError};
use crate::refresh::Refresher;
use crate::service::FeedService;
use serde::Serialize;
use tracing::info;

/// Applies `--bind`, `--data-dir` and `--log-file` on top of the loaded
/// config and validates the result.
pub fn apply_cli_overrides(config: &mut Config, args: &Args) -> Result<(), AppError> {
    if let Some(bind) = &args.bind {
        config.bind_address = bind.clone();
    }
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(log_file) = &args.log_file {
        config.log_file_path = Some(log_file.clone());
    }
    config.validate()
}

/// Handles the --list-config command.
pub fn handle_list_config_command(config: &Config, config_path: &str) {
    config.display(config_path);
}

/// Printed by `--once`.
#[derive(Debug, Default, Serialize)]
pub struct OnceSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifts: Option<LiftSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webcams: Option<WebcamSnapshot>,
    pub errors: Vec<String>,
    #[serde(skip)]
    attempted: usize,
    #[serde(skip)]
    failed: usize,
}

impl OnceSummary {
    /// True when every selected kind failed to produce live data
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failed == self.attempted
    }

    fn record<S: Snapshot>(
        &mut self,
        kind: FeedKind,
        outcome: Result<S, RefreshError>,
    ) -> Option<S> {
        self.attempted += 1;
        match outcome {
            Ok(snapshot) => {
                if !snapshot.source().is_live() {
                    self.failed += 1;
                    if let Some(error) = snapshot.error() {
                        self.errors.push(format!("{kind}: {error}"));
                    }
                }
                Some(snapshot)
            }
            Err(e) => {
                self.failed += 1;
                self.errors.push(format!("{kind}: {e}"));
                None
            }
        }
    }
}

async fn refresh_once<S: Snapshot>(refresher: &Refresher<S>) -> Result<S, RefreshError> {
    let outcome = refresher.force_refresh().await;
    if let Ok(snapshot) = &outcome {
        info!(
            "{} refreshed: {} records ({})",
            S::KIND,
            snapshot.len(),
            snapshot.source()
        );
    }
    outcome
}

/// Force-refreshes each selected kind in turn.
pub async fn run_once(service: &FeedService, kinds: &[FeedKind]) -> OnceSummary {
    let mut summary = OnceSummary::default();
    for kind in kinds {
        match kind {
            FeedKind::Lifts => {
                let outcome = refresh_once(service.lifts()).await;
                summary.lifts = summary.record(*kind, outcome);
            }
            FeedKind::Webcams => {
                let outcome = refresh_once(service.webcams()).await;
                summary.webcams = summary.record(*kind, outcome);
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_fetcher::cache::CacheStore;
    use crate::data_fetcher::models::Source;
    use crate::error::FetchError;
    use crate::refresh::{Backoff, RefreshPolicy, Schedule};
    use crate::testing_utils::{MockAdapter, sample_lifts};
    use clap::Parser;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn service(dir: &std::path::Path) -> FeedService {
        let store = Arc::new(CacheStore::open(dir).await.unwrap());
        FeedService::with_chains(
            store,
            vec![Arc::new(MockAdapter::succeeding(
                "vendor-api",
                sample_lifts(Source::LiveVendorApi),
            ))],
            vec![Arc::new(MockAdapter::<WebcamSnapshot>::failing(
                "scrape-heuristic",
                FetchError::no_data("heuristic", "no known cameras found"),
            ))],
            RefreshPolicy {
                max_age: Duration::from_secs(600),
                keep_stale_on_failure: false,
            },
            Schedule {
                interval: Duration::from_secs(420),
                backoff: Backoff::new(Duration::from_secs(1), Duration::from_secs(1), 0),
            },
            10,
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_cli_overrides_are_validated() {
        let mut config = Config::default();
        let args = Args::parse_from([
            "lift_feed",
            "--bind",
            "0.0.0.0:8080",
            "--data-dir",
            "/srv/feeds",
        ]);
        apply_cli_overrides(&mut config, &args).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.data_dir, "/srv/feeds");

        let args = Args::parse_from(["lift_feed", "--bind", "not-an-address"]);
        assert!(apply_cli_overrides(&mut config, &args).is_err());
    }

    #[tokio::test]
    async fn test_partial_failure_is_not_total() {
        let dir = tempdir().unwrap();
        let service = service(dir.path()).await;
        let summary = run_once(&service, &FeedKind::ALL).await;

        assert_eq!(summary.lifts.as_ref().map(|s| s.lift_count()), Some(3));
        assert_eq!(
            summary.webcams.as_ref().map(|s| s.source()),
            Some(Source::NoData)
        );
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("webcams: "));
        assert!(!summary.all_failed());
    }

    #[tokio::test]
    async fn test_only_failing_kind_selected() {
        let dir = tempdir().unwrap();
        let service = service(dir.path()).await;
        let summary = run_once(&service, &[FeedKind::Webcams]).await;

        assert!(summary.lifts.is_none());
        assert!(summary.all_failed());

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("lifts").is_none());
        assert_eq!(json["webcams"]["source"], "no-data");
    }
}
