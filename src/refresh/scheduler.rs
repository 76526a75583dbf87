//! Periodic refresh of each kind.
//!
//! Each kind gets its own loop. The first tick fires immediately so the
//! cache is populated at startup. A tick whose refresh ends without live
//! data is retried with [`Backoff`], as long as the retry still lands
//! before the next regular tick.

use super::backoff::Backoff;
use super::orchestrator::Refresher;
use crate::data_fetcher::models::Snapshot;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub interval: Duration,
    pub backoff: Backoff,
}

/// Spawns the refresh loop for one kind. It ends when `shutdown` flips to
/// `true` or its sender is dropped.
pub fn spawn_schedule<S: Snapshot>(
    refresher: Refresher<S>,
    schedule: Schedule,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(run_schedule(refresher, schedule, shutdown))
}

async fn run_schedule<S: Snapshot>(
    refresher: Refresher<S>,
    schedule: Schedule,
    mut shutdown: watch::Receiver<bool>,
) {
    let kind = refresher.kind();
    let mut rng = SmallRng::from_rng(&mut rand::rng());
    let mut ticker = tokio::time::interval(schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        "Scheduling {} refresh every {}s",
        kind,
        schedule.interval.as_secs()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = wait_for_shutdown(&mut shutdown) => break,
        }

        let next_tick = Instant::now() + schedule.interval;
        let mut attempt = 0;
        loop {
            if refresh_succeeded(&refresher).await {
                break;
            }
            if attempt >= schedule.backoff.max_attempts() {
                warn!("{} refresh still failing after {} retries", kind, attempt);
                break;
            }

            let delay = schedule.backoff.delay(attempt, &mut rng);
            if Instant::now() + delay >= next_tick {
                debug!("Next {} tick is sooner than the retry, skipping it", kind);
                break;
            }
            attempt += 1;
            info!(
                "Retrying {} refresh in {}ms (attempt {})",
                kind,
                delay.as_millis(),
                attempt
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = wait_for_shutdown(&mut shutdown) => {
                    info!("{} scheduler stopped", kind);
                    return;
                }
            }
        }
    }
    info!("{} scheduler stopped", kind);
}

/// A refresh counts as successful when it persisted live data.
async fn refresh_succeeded<S: Snapshot>(refresher: &Refresher<S>) -> bool {
    match refresher.force_refresh().await {
        Ok(snapshot) => snapshot.source().is_live(),
        Err(e) => {
            warn!("Scheduled refresh failed: {e}");
            false
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender also means shutdown.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_fetcher::cache::{CacheStore, FetchLog};
    use crate::data_fetcher::models::{FeedKind, LiftSnapshot, Source};
    use crate::error::FetchError;
    use crate::refresh::RefreshPolicy;
    use crate::testing_utils::{MockAdapter, sample_lifts};
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn refresher(
        dir: &std::path::Path,
        adapter: Arc<MockAdapter<LiftSnapshot>>,
    ) -> Refresher<LiftSnapshot> {
        let store = Arc::new(CacheStore::open(dir).await.unwrap());
        let log = Arc::new(FetchLog::open(dir, FeedKind::Lifts, 50).await);
        Refresher::new(
            vec![adapter],
            store,
            log,
            RefreshPolicy {
                max_age: Duration::from_secs(600),
                keep_stale_on_failure: false,
            },
        )
    }

    async fn wait_for_calls(adapter: &MockAdapter<LiftSnapshot>, calls: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while adapter.calls() < calls && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_first_tick_populates_cache() {
        let dir = tempdir().unwrap();
        let adapter = Arc::new(MockAdapter::succeeding(
            "vendor-api",
            sample_lifts(Source::LiveVendorApi),
        ));
        let refresher = refresher(dir.path(), adapter.clone()).await;
        let (stop_tx, stop_rx) = watch::channel(false);

        let schedule = Schedule {
            interval: Duration::from_secs(3600),
            backoff: Backoff::new(Duration::from_millis(10), Duration::from_millis(50), 2),
        };
        let handle = spawn_schedule(refresher.clone(), schedule, stop_rx);

        wait_for_calls(&adapter, 1).await;
        assert_eq!(adapter.calls(), 1);

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(refresher.cached().await.is_some());
    }

    #[tokio::test]
    async fn test_failed_tick_is_retried_up_to_max_attempts() {
        let dir = tempdir().unwrap();
        let adapter = Arc::new(MockAdapter::<LiftSnapshot>::failing(
            "vendor-api",
            FetchError::HttpStatus {
                status: 502,
                url: "https://vendor.example.com".to_string(),
            },
        ));
        let refresher = refresher(dir.path(), adapter.clone()).await;
        let (stop_tx, stop_rx) = watch::channel(false);

        let schedule = Schedule {
            interval: Duration::from_secs(3600),
            backoff: Backoff::new(Duration::from_millis(5), Duration::from_millis(20), 2),
        };
        let handle = spawn_schedule(refresher, schedule, stop_rx);

        wait_for_calls(&adapter, 3).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(adapter.calls(), 3);

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_backoff_wait() {
        let dir = tempdir().unwrap();
        let adapter = Arc::new(MockAdapter::<LiftSnapshot>::failing(
            "vendor-api",
            FetchError::NetworkTimeout {
                url: "https://vendor.example.com".to_string(),
            },
        ));
        let refresher = refresher(dir.path(), adapter.clone()).await;
        let (stop_tx, stop_rx) = watch::channel(false);

        let schedule = Schedule {
            interval: Duration::from_secs(3600),
            backoff: Backoff::new(Duration::from_secs(7200), Duration::from_secs(7200), 5),
        };
        let handle = spawn_schedule(refresher, schedule, stop_rx);

        wait_for_calls(&adapter, 1).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(adapter.calls(), 1);

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_sender_stops_loop() {
        let dir = tempdir().unwrap();
        let adapter = Arc::new(MockAdapter::succeeding(
            "vendor-api",
            sample_lifts(Source::LiveVendorApi),
        ));
        let refresher = refresher(dir.path(), adapter.clone()).await;
        let (stop_tx, stop_rx) = watch::channel(false);
        let schedule = Schedule {
            interval: Duration::from_secs(3600),
            backoff: Backoff::new(Duration::from_secs(1), Duration::from_secs(1), 0),
        };
        let handle = spawn_schedule(refresher, schedule, stop_rx);

        wait_for_calls(&adapter, 1).await;
        drop(stop_tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
