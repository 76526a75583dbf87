//! Test doubles and builders shared by unit and integration tests.

use crate::data_fetcher::api::{Adapter, Browser, BrowserSession, Extractor};
use crate::data_fetcher::models::{
    LiftRecord, LiftSnapshot, LiftStatus, LiftType, Mountain, Snapshot, Source, WebcamRecord,
    WebcamSnapshot,
};
use crate::data_fetcher::processors::normalized_key;
use crate::error::FetchError;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Builders for records and snapshots
pub struct TestDataBuilder;

impl TestDataBuilder {
    pub fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 24, 15, 30, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub fn create_lift(name: &str, status: LiftStatus, mountain: Mountain) -> LiftRecord {
        LiftRecord {
            name: name.to_string(),
            status,
            mountain,
            lift_type: LiftType::Unknown,
            wait_time_minutes: None,
            capacity: 0,
            last_updated: Utc::now(),
        }
    }

    pub fn create_webcam(name: &str, location: &str, url: &str) -> WebcamRecord {
        WebcamRecord {
            name: name.to_string(),
            location: location.to_string(),
            url: url.to_string(),
            is_live: false,
            last_updated: Utc::now(),
            elevation: None,
        }
    }

    /// Three lifts across both mountains plus the Peak 2 Peak
    pub fn create_lift_snapshot(source: Source) -> LiftSnapshot {
        LiftSnapshot::live(
            source,
            Utc::now(),
            vec![
                LiftRecord {
                    lift_type: LiftType::Gondola,
                    wait_time_minutes: Some(5),
                    ..Self::create_lift("Whistler Village Gondola", LiftStatus::Open, Mountain::Whistler)
                },
                Self::create_lift("Blackcomb Gondola", LiftStatus::Closed, Mountain::Blackcomb),
                LiftRecord {
                    lift_type: LiftType::Gondola,
                    ..Self::create_lift("Peak 2 Peak Gondola", LiftStatus::OnHold, Mountain::Both)
                },
            ],
        )
    }

    pub fn create_webcam_snapshot(source: Source) -> WebcamSnapshot {
        WebcamSnapshot::live(
            source,
            Utc::now(),
            vec![
                Self::create_webcam(
                    "Whistler Peak",
                    "Peak Area",
                    "https://cams.example.com/peak.jpg",
                ),
                Self::create_webcam(
                    "Roundhouse Lodge",
                    "Mid Mountain",
                    "https://cams.example.com/roundhouse.jpg",
                ),
            ],
        )
    }
}

pub fn sample_lifts(source: Source) -> LiftSnapshot {
    TestDataBuilder::create_lift_snapshot(source)
}

pub fn sample_webcams(source: Source) -> WebcamSnapshot {
    TestDataBuilder::create_webcam_snapshot(source)
}

/// Checks that must hold for every snapshot the service produces
pub struct PropertyTesting;

impl PropertyTesting {
    pub fn validate_lift_snapshot(snapshot: &LiftSnapshot) -> Result<(), String> {
        Self::validate_common(snapshot)?;
        let mut seen = HashSet::new();
        for lift in snapshot.lifts() {
            if !seen.insert(normalized_key(&lift.name)) {
                return Err(format!("duplicate lift name: {}", lift.name));
            }
            if lift.wait_time_minutes.is_some() && lift.status != LiftStatus::Open {
                return Err(format!("{} has a wait time but is not open", lift.name));
            }
        }
        Ok(())
    }

    pub fn validate_webcam_snapshot(snapshot: &WebcamSnapshot) -> Result<(), String> {
        Self::validate_common(snapshot)?;
        let mut seen = HashSet::new();
        for webcam in snapshot.webcams() {
            if webcam.url.is_empty() {
                return Err(format!("{} has no url", webcam.name));
            }
            if !seen.insert(normalized_key(&webcam.name)) {
                return Err(format!("duplicate webcam name: {}", webcam.name));
            }
        }
        Ok(())
    }

    fn validate_common<S: Snapshot>(snapshot: &S) -> Result<(), String> {
        match snapshot.source() {
            Source::NoData if !snapshot.is_empty() => {
                Err("no-data snapshot carries records".to_string())
            }
            Source::NoData | Source::CachedStale if snapshot.error().is_none() => {
                Err(format!("{} snapshot without error", snapshot.source()))
            }
            _ => Ok(()),
        }
    }
}

enum Reply<T> {
    Value(T),
    Error(FetchError),
}

impl<T: Clone> Reply<T> {
    fn get(&self) -> Result<T, FetchError> {
        match self {
            Reply::Value(value) => Ok(value.clone()),
            Reply::Error(e) => Err(e.clone()),
        }
    }
}

/// Adapter returning a fixed result, counting calls.
pub struct MockAdapter<S: Snapshot> {
    name: &'static str,
    reply: Reply<S>,
    delay: Duration,
    calls: AtomicUsize,
}

impl<S: Snapshot> MockAdapter<S> {
    pub fn succeeding(name: &'static str, snapshot: S) -> Self {
        MockAdapter {
            name,
            reply: Reply::Value(snapshot),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str, error: FetchError) -> Self {
        MockAdapter {
            name,
            reply: Reply::Error(error),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleeps this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: Snapshot> Adapter<S> for MockAdapter<S> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self) -> Result<S, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.get()
    }
}

#[derive(Default)]
struct SessionCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    navigations: AtomicUsize,
}

/// Browser whose every page is the same document.
pub struct StaticBrowser {
    page: Reply<String>,
    counters: Arc<SessionCounters>,
}

impl StaticBrowser {
    pub fn with_page(document: &str) -> Self {
        StaticBrowser {
            page: Reply::Value(document.to_string()),
            counters: Arc::default(),
        }
    }

    /// Every navigation fails with `error`
    pub fn failing(error: FetchError) -> Self {
        StaticBrowser {
            page: Reply::Error(error),
            counters: Arc::default(),
        }
    }

    /// Sessions opened and not yet closed
    pub fn open_sessions(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst) - self.closed_sessions()
    }

    pub fn closed_sessions(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> usize {
        self.counters.navigations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Browser for StaticBrowser {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticSession {
            page: self.page.get(),
            document: None,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct StaticSession {
    page: Result<String, FetchError>,
    document: Option<String>,
    counters: Arc<SessionCounters>,
}

#[async_trait]
impl BrowserSession for StaticSession {
    async fn navigate(&mut self, _url: &str, _timeout: Duration) -> Result<(), FetchError> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        self.document = Some(self.page.clone()?);
        Ok(())
    }

    async fn content(&mut self) -> Result<String, FetchError> {
        self.document
            .clone()
            .ok_or_else(|| FetchError::navigation("static", "no document captured"))
    }

    async fn close(self: Box<Self>) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Extractor with a canned answer
pub struct ScriptedExtractor {
    reply: Reply<String>,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn replying(text: &str) -> Self {
        ScriptedExtractor {
            reply: Reply::Value(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: FetchError) -> Self {
        ScriptedExtractor {
            reply: Reply::Error(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.get()
    }
}
