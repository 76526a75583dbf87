use futures::future::join_all;
use lift_feed::data_fetcher::cache::{CacheStore, FetchLog};
use lift_feed::data_fetcher::models::{FeedKind, LiftSnapshot, Snapshot, Source};
use lift_feed::RefreshError;
use lift_feed::refresh::{RefreshPolicy, RefreshState, Refresher};
use lift_feed::testing_utils::{MockAdapter, TestDataBuilder, sample_lifts};
use std::sync::Arc;
use std::time::{Duration, Instant};
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

#[tokio::test]
async fn test_concurrent_refreshes_share_one_run() {
    let dir = tempdir().unwrap();
    let adapter = Arc::new(
        MockAdapter::succeeding("vendor-api", sample_lifts(Source::LiveVendorApi))
            .with_delay(Duration::from_millis(150)),
    );
    let refresher = refresher(dir.path(), Arc::clone(&adapter)).await;

    let forced = (0..10).map(|_| {
        let refresher = refresher.clone();
        tokio::spawn(async move { refresher.force_refresh().await })
    });
    let served = (0..10).map(|_| {
        let refresher = refresher.clone();
        tokio::spawn(async move { Ok::<_, RefreshError>(refresher.serve().await) })
    });
    let results = join_all(forced.chain(served)).await;

    assert_eq!(adapter.calls(), 1);
    for result in results {
        let snapshot = result.unwrap().unwrap();
        assert_eq!(snapshot.source(), Source::LiveVendorApi);
        assert_eq!(snapshot.lift_count(), 3);
    }
    assert!(!refresher.is_refreshing());
    assert_eq!(refresher.status().last_outcome, Some(RefreshState::Succeeded));
}

#[tokio::test]
async fn test_stale_serve_does_not_wait_for_refresh() {
    let dir = tempdir().unwrap();
    let store = CacheStore::open(dir.path()).await.unwrap();
    let stale = LiftSnapshot::live(
        Source::LiveVendorApi,
        TestDataBuilder::fixed_time(),
        sample_lifts(Source::LiveVendorApi).lifts().to_vec(),
    );
    store.write(&stale).await.unwrap();

    let adapter = Arc::new(
        MockAdapter::succeeding("scrape-heuristic", sample_lifts(Source::LiveScrapeFallback))
            .with_delay(Duration::from_millis(400)),
    );
    let refresher = refresher(dir.path(), Arc::clone(&adapter)).await;

    let started = Instant::now();
    let served = refresher.serve().await;
    assert!(started.elapsed() < Duration::from_millis(300));
    assert_eq!(served, stale);
    assert!(refresher.is_refreshing());

    // A second stale read joins the running refresh instead of starting one
    refresher.serve().await;

    tokio::time::timeout(Duration::from_secs(5), async {
        while refresher.is_refreshing() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(adapter.calls(), 1);
    let updated = refresher.cached().await.unwrap();
    assert_eq!(updated.source(), Source::LiveScrapeFallback);
    assert!(refresher.is_fresh(&updated));
}

#[tokio::test]
async fn test_sequential_refreshes_run_again() {
    let dir = tempdir().unwrap();
    let adapter = Arc::new(MockAdapter::succeeding(
        "vendor-api",
        sample_lifts(Source::LiveVendorApi),
    ));
    let refresher = refresher(dir.path(), Arc::clone(&adapter)).await;

    refresher.force_refresh().await.unwrap();
    refresher.force_refresh().await.unwrap();
    assert_eq!(adapter.calls(), 2);

    // Fresh cache answers without touching the adapter
    refresher.serve().await;
    assert_eq!(adapter.calls(), 2);
}
