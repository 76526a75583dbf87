use super::single_flight::SingleFlight;
use crate::data_fetcher::api::AdapterChain;
use crate::data_fetcher::cache::{CacheStore, FetchLog};
use crate::data_fetcher::models::{FeedKind, FetchLogEntry, Snapshot};
use crate::error::{FetchError, RefreshError};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Where a kind's refresh cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshState {
    Idle,
    Fetching,
    Succeeded,
    Failed,
}

/// Observable state of one kind's refresher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    pub state: RefreshState,
    /// Terminal state of the most recent completed cycle
    pub last_outcome: Option<RefreshState>,
    pub last_error: Option<String>,
    pub last_started: Option<DateTime<Utc>>,
    pub last_finished: Option<DateTime<Utc>>,
}

impl Default for RefreshStatus {
    fn default() -> Self {
        RefreshStatus {
            state: RefreshState::Idle,
            last_outcome: None,
            last_error: None,
            last_started: None,
            last_finished: None,
        }
    }
}

/// Refresh behaviour shared by both kinds.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    pub max_age: Duration,
    pub keep_stale_on_failure: bool,
}

struct Inner<S: Snapshot> {
    chain: AdapterChain<S>,
    store: Arc<CacheStore>,
    log: Arc<FetchLog>,
    policy: RefreshPolicy,
    status: Mutex<RefreshStatus>,
}

/// Serves and refreshes the snapshot of one kind.
///
/// Every path that runs the adapter chain goes through one [`SingleFlight`],
/// so concurrent requests, forced refreshes and the scheduler never run the
/// chain twice at the same time.
pub struct Refresher<S: Snapshot> {
    inner: Arc<Inner<S>>,
    flight: SingleFlight<Result<S, RefreshError>>,
}

impl<S: Snapshot> Clone for Refresher<S> {
    fn clone(&self) -> Self {
        Refresher {
            inner: Arc::clone(&self.inner),
            flight: self.flight.clone(),
        }
    }
}

impl<S: Snapshot> Refresher<S> {
    pub fn new(
        chain: AdapterChain<S>,
        store: Arc<CacheStore>,
        log: Arc<FetchLog>,
        policy: RefreshPolicy,
    ) -> Self {
        Refresher {
            inner: Arc::new(Inner {
                chain,
                store,
                log,
                policy,
                status: Mutex::new(RefreshStatus::default()),
            }),
            flight: SingleFlight::new(),
        }
    }

    pub fn kind(&self) -> FeedKind {
        S::KIND
    }

    pub fn adapter_names(&self) -> Vec<&'static str> {
        self.inner.chain.iter().map(|a| a.name()).collect()
    }

    /// Snapshot for a read request.
    ///
    /// Absent cache blocks on a refresh. Fresh cache is returned as is. Stale
    /// cache is returned immediately and a background refresh is started
    /// unless one is already running. Orchestration faults are folded into a
    /// `no-data` snapshot so reads never fail.
    #[instrument(skip(self), fields(kind = %S::KIND))]
    pub async fn serve(&self) -> S {
        match self.inner.store.read::<S>().await {
            Some(snapshot) => {
                if !self.is_fresh(&snapshot) {
                    let started = self.trigger_background();
                    debug!(
                        "Serving stale {} snapshot (background refresh started: {})",
                        S::KIND,
                        started
                    );
                }
                snapshot
            }
            None => {
                info!("No cached {} snapshot, fetching before responding", S::KIND);
                match self.force_refresh().await {
                    Ok(snapshot) => snapshot,
                    Err(e) => S::no_data(e.to_string(), Utc::now()),
                }
            }
        }
    }

    /// Runs the adapter chain (or joins the run in progress) and returns the
    /// snapshot it persisted.
    pub async fn force_refresh(&self) -> Result<S, RefreshError> {
        let inner = Arc::clone(&self.inner);
        self.flight
            .start_or_join(move || run_chain(inner))
            .await
            .map_err(|message| {
                self.inner.finish(RefreshState::Failed, Some(message.clone()));
                RefreshError::aborted(S::KIND, message)
            })?
    }

    /// Starts a refresh without waiting for it. No-op while one is running.
    pub fn trigger_background(&self) -> bool {
        let inner = Arc::clone(&self.inner);
        self.flight.try_start(move || run_chain(inner))
    }

    /// Latest persisted snapshot without triggering anything
    pub async fn cached(&self) -> Option<S> {
        self.inner.store.read::<S>().await
    }

    pub fn is_refreshing(&self) -> bool {
        self.flight.is_running()
    }

    pub fn status(&self) -> RefreshStatus {
        self.inner.status()
    }

    pub async fn log_entries(&self) -> Vec<FetchLogEntry> {
        self.inner.log.entries().await
    }

    pub fn max_age(&self) -> Duration {
        self.inner.policy.max_age
    }

    /// Fresh while the snapshot's age is at most `max_age`.
    pub fn is_fresh(&self, snapshot: &S) -> bool {
        self.is_fresh_at(snapshot, Utc::now())
    }

    fn is_fresh_at(&self, snapshot: &S, now: DateTime<Utc>) -> bool {
        let max_age = TimeDelta::from_std(self.inner.policy.max_age).unwrap_or(TimeDelta::MAX);
        now - snapshot.last_updated() <= max_age
    }
}

impl<S: Snapshot> Inner<S> {
    fn status(&self) -> RefreshStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn begin(&self) {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        status.state = RefreshState::Fetching;
        status.last_started = Some(Utc::now());
    }

    /// Records the terminal state and returns to `Idle`.
    fn finish(&self, outcome: RefreshState, error: Option<String>) {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        status.state = RefreshState::Idle;
        status.last_outcome = Some(outcome);
        status.last_error = error;
        status.last_finished = Some(Utc::now());
    }

    /// Snapshot to persist once every adapter has failed.
    async fn exhausted_snapshot(&self, message: String) -> S {
        if self.policy.keep_stale_on_failure {
            if let Some(previous) = self.store.read::<S>().await {
                if !previous.is_empty() {
                    self.log
                        .warn(format!(
                            "Keeping {} previous records as cached-stale",
                            previous.len()
                        ))
                        .await;
                    return previous.retag_stale(message);
                }
            }
        }
        S::no_data(message, Utc::now())
    }
}

/// One pass over the adapter chain: first success wins, total exhaustion
/// persists a `no-data` (or retagged stale) snapshot.
#[instrument(skip(inner), fields(kind = %S::KIND))]
async fn run_chain<S: Snapshot>(inner: Arc<Inner<S>>) -> Result<S, RefreshError> {
    inner.begin();
    inner
        .log
        .info(format!(
            "Refresh started with {} adapter(s)",
            inner.chain.len()
        ))
        .await;

    let mut failures = Vec::with_capacity(inner.chain.len());
    for adapter in &inner.chain {
        let result = match adapter.fetch().await {
            Ok(snapshot) if snapshot.is_empty() => Err(FetchError::no_data(
                adapter.name(),
                "adapter returned no records",
            )),
            other => other,
        };

        match result {
            Ok(snapshot) => {
                if let Err(e) = inner.store.write(&snapshot).await {
                    inner.log.error(e.to_string()).await;
                    inner.finish(RefreshState::Failed, Some(e.to_string()));
                    return Err(e);
                }
                inner
                    .log
                    .info(format!(
                        "{} succeeded with {} records ({})",
                        adapter.name(),
                        snapshot.len(),
                        snapshot.source()
                    ))
                    .await;
                inner.finish(RefreshState::Succeeded, None);
                return Ok(snapshot);
            }
            Err(e) => {
                if e.is_auth_failure() {
                    warn!("{} rejected our credentials", adapter.name());
                }
                inner.log.warn(format!("{} failed: {}", adapter.name(), e)).await;
                failures.push(format!("{}: {}", adapter.name(), e));
            }
        }
    }

    let message = if failures.is_empty() {
        "No adapters configured".to_string()
    } else {
        format!("All adapters failed: {}", failures.join("; "))
    };
    inner.log.error(message.clone()).await;

    let snapshot = inner.exhausted_snapshot(message.clone()).await;
    if let Err(e) = inner.store.write(&snapshot).await {
        inner.log.error(e.to_string()).await;
        inner.finish(RefreshState::Failed, Some(e.to_string()));
        return Err(e);
    }
    inner.finish(RefreshState::Failed, Some(message));
    Ok(snapshot)
}
