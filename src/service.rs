//! The explicitly constructed service object: cache, fetch logs and one
//! refresher per kind, wired from [`Config`].

use crate::config::Config;
use crate::constants;
use crate::data_fetcher::api::{
    AdapterChain, Browser, ChatCompletionsExtractor, Extractor, HttpBrowser, LiftScrapeAdapter,
    VendorAdapter, WebcamScrapeAdapter,
};
use crate::data_fetcher::cache::{CacheStore, FetchLog};
use crate::data_fetcher::models::{FeedKind, LiftSnapshot, Snapshot, Source, WebcamSnapshot};
use crate::error::AppError;
use crate::refresh::{Backoff, RefreshPolicy, RefreshState, Refresher, Schedule, spawn_schedule};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Availability and refresh state of one kind, as reported by `/api/status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindStatus {
    pub available: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub age_seconds: Option<i64>,
    pub stale: bool,
    pub source: Option<Source>,
    pub count: usize,
    pub refreshing: bool,
    pub last_outcome: Option<RefreshState>,
    pub last_error: Option<String>,
    pub adapters: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub lifts: KindStatus,
    pub webcams: KindStatus,
}

pub struct FeedService {
    lifts: Refresher<LiftSnapshot>,
    webcams: Refresher<WebcamSnapshot>,
    schedule: Schedule,
}

impl FeedService {
    /// Builds the adapter chains and opens the data directory.
    ///
    /// Lifts: vendor API (when configured), structured scrape (when
    /// extraction is on), heuristic scrape. Webcams: structured scrape (when
    /// extraction is on), heuristic scrape.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        let store = Arc::new(CacheStore::open(&config.data_dir).await?);
        let browser: Arc<dyn Browser> = Arc::new(HttpBrowser::new(
            config.http_timeout_seconds,
            Duration::from_millis(config.scrape.settle_millis),
            constants::upstream::MAX_BROWSER_SESSIONS,
        )?);
        let extractor: Option<Arc<dyn Extractor>> = match config.active_extraction() {
            Some(extraction) => Some(Arc::new(ChatCompletionsExtractor::new(extraction)?)),
            None => None,
        };
        let navigation_timeout = Duration::from_secs(config.scrape.navigation_timeout_seconds);
        let max_chars = config.scrape.max_document_chars;

        let mut lift_chain: AdapterChain<LiftSnapshot> = Vec::new();
        if let Some(vendor) = &config.vendor {
            lift_chain.push(Arc::new(VendorAdapter::new(vendor)?));
        }
        if let Some(extractor) = &extractor {
            lift_chain.push(Arc::new(LiftScrapeAdapter::structured(
                Arc::clone(&browser),
                Arc::clone(extractor),
                &config.scrape.lifts_url,
                navigation_timeout,
                max_chars,
            )));
        }
        lift_chain.push(Arc::new(LiftScrapeAdapter::heuristic(
            Arc::clone(&browser),
            &config.scrape.lifts_url,
            navigation_timeout,
        )));

        let mut webcam_chain: AdapterChain<WebcamSnapshot> = Vec::new();
        if let Some(extractor) = &extractor {
            webcam_chain.push(Arc::new(WebcamScrapeAdapter::structured(
                Arc::clone(&browser),
                Arc::clone(extractor),
                &config.scrape.webcams_url,
                navigation_timeout,
                max_chars,
            )));
        }
        webcam_chain.push(Arc::new(WebcamScrapeAdapter::heuristic(
            browser,
            &config.scrape.webcams_url,
            navigation_timeout,
        )));

        let policy = RefreshPolicy {
            max_age: config.cache_max_age(),
            keep_stale_on_failure: config.keep_stale_on_failure,
        };
        let schedule = Schedule {
            interval: config.refresh_interval(),
            backoff: Backoff::from_config(&config.retry),
        };

        Self::with_chains(
            store,
            lift_chain,
            webcam_chain,
            policy,
            schedule,
            config.fetch_log_capacity,
        )
        .await
    }

    /// Wires a service around explicit adapter chains.
    pub async fn with_chains(
        store: Arc<CacheStore>,
        lift_chain: AdapterChain<LiftSnapshot>,
        webcam_chain: AdapterChain<WebcamSnapshot>,
        policy: RefreshPolicy,
        schedule: Schedule,
        fetch_log_capacity: usize,
    ) -> Result<Self, AppError> {
        let lifts_log =
            Arc::new(FetchLog::open(store.dir(), FeedKind::Lifts, fetch_log_capacity).await);
        let webcams_log =
            Arc::new(FetchLog::open(store.dir(), FeedKind::Webcams, fetch_log_capacity).await);

        let lifts = Refresher::new(lift_chain, Arc::clone(&store), lifts_log, policy.clone());
        let webcams = Refresher::new(webcam_chain, store, webcams_log, policy);
        info!(
            "Lift adapters: [{}], webcam adapters: [{}]",
            lifts.adapter_names().join(", "),
            webcams.adapter_names().join(", ")
        );

        Ok(FeedService {
            lifts,
            webcams,
            schedule,
        })
    }

    pub fn lifts(&self) -> &Refresher<LiftSnapshot> {
        &self.lifts
    }

    pub fn webcams(&self) -> &Refresher<WebcamSnapshot> {
        &self.webcams
    }

    /// Starts one schedule loop per kind.
    pub fn spawn_schedules(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        vec![
            spawn_schedule(self.lifts.clone(), self.schedule, shutdown.clone()),
            spawn_schedule(self.webcams.clone(), self.schedule, shutdown),
        ]
    }

    pub async fn status(&self) -> ServiceStatus {
        ServiceStatus {
            lifts: kind_status(&self.lifts).await,
            webcams: kind_status(&self.webcams).await,
        }
    }
}

async fn kind_status<S: Snapshot>(refresher: &Refresher<S>) -> KindStatus {
    let cached = refresher.cached().await;
    let status = refresher.status();
    let now = Utc::now();

    KindStatus {
        available: cached.as_ref().is_some_and(|s| !s.is_empty()),
        last_updated: cached.as_ref().map(|s| s.last_updated()),
        age_seconds: cached
            .as_ref()
            .map(|s| (now - s.last_updated()).num_seconds().max(0)),
        stale: cached.as_ref().is_none_or(|s| !refresher.is_fresh(s)),
        source: cached.as_ref().map(|s| s.source()),
        count: cached.as_ref().map_or(0, |s| s.len()),
        refreshing: refresher.is_refreshing(),
        last_outcome: status.last_outcome,
        last_error: status.last_error,
        adapters: refresher.adapter_names(),
    }
}
