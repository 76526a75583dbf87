use super::adapter::Adapter;
use super::browser::Browser;
use super::extraction::{
    Extractor, SYSTEM_PROMPT, lift_prompt, parse_lift_extraction, parse_webcam_extraction,
    truncate_document, webcam_prompt,
};
use crate::data_fetcher::models::{LiftSnapshot, Snapshot, Source, WebcamSnapshot};
use crate::data_fetcher::processors::{normalize, normalize_webcams, scan_lifts, scan_webcams};
use crate::error::FetchError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// How a scrape adapter turns the captured page into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeMode {
    /// Structured extraction, falling back to the heuristic on the same
    /// document when the extraction service is unavailable
    Structured,
    HeuristicOnly,
}

/// Per-kind page handling.
pub trait ScrapeTarget: Send + Sync + 'static {
    type Output: Snapshot;

    fn prompt(page_url: &str, document: &str) -> String;

    fn from_extraction(
        text: &str,
        page_url: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self::Output, FetchError>;

    fn from_heuristic(
        document: &str,
        page_url: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self::Output, FetchError>;
}

pub struct LiftPage;

pub struct WebcamPage;

impl ScrapeTarget for LiftPage {
    type Output = LiftSnapshot;

    fn prompt(page_url: &str, document: &str) -> String {
        lift_prompt(page_url, document)
    }

    fn from_extraction(
        text: &str,
        _page_url: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<LiftSnapshot, FetchError> {
        let normalized = normalize(parse_lift_extraction(text)?, fetched_at);
        if normalized.records.is_empty() {
            return Err(FetchError::no_data("extraction", "output contained no lifts"));
        }
        Ok(LiftSnapshot::live(
            Source::LiveScrape,
            fetched_at,
            normalized.records,
        ))
    }

    fn from_heuristic(
        document: &str,
        _page_url: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<LiftSnapshot, FetchError> {
        let normalized = normalize(scan_lifts(document)?, fetched_at);
        Ok(LiftSnapshot::live(
            Source::LiveScrapeFallback,
            fetched_at,
            normalized.records,
        ))
    }
}

impl ScrapeTarget for WebcamPage {
    type Output = WebcamSnapshot;

    fn prompt(page_url: &str, document: &str) -> String {
        webcam_prompt(page_url, document)
    }

    fn from_extraction(
        text: &str,
        page_url: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<WebcamSnapshot, FetchError> {
        let normalized =
            normalize_webcams(parse_webcam_extraction(text, page_url, fetched_at)?);
        if normalized.records.is_empty() {
            return Err(FetchError::no_data("extraction", "output contained no webcams"));
        }
        Ok(WebcamSnapshot::live(
            Source::LiveScrape,
            fetched_at,
            normalized.records,
        ))
    }

    fn from_heuristic(
        document: &str,
        page_url: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<WebcamSnapshot, FetchError> {
        let normalized = normalize_webcams(scan_webcams(document, page_url, fetched_at)?);
        Ok(WebcamSnapshot::live(
            Source::LiveScrapeFallback,
            fetched_at,
            normalized.records,
        ))
    }
}

/// Captures a page and extracts snapshot `T::Output` from it.
pub struct ScrapeAdapter<T: ScrapeTarget> {
    browser: Arc<dyn Browser>,
    extractor: Option<Arc<dyn Extractor>>,
    url: String,
    navigation_timeout: Duration,
    max_document_chars: usize,
    mode: ScrapeMode,
    _target: PhantomData<T>,
}

pub type LiftScrapeAdapter = ScrapeAdapter<LiftPage>;
pub type WebcamScrapeAdapter = ScrapeAdapter<WebcamPage>;

impl<T: ScrapeTarget> ScrapeAdapter<T> {
    /// Scrape with structured extraction
    pub fn structured(
        browser: Arc<dyn Browser>,
        extractor: Arc<dyn Extractor>,
        url: impl Into<String>,
        navigation_timeout: Duration,
        max_document_chars: usize,
    ) -> Self {
        ScrapeAdapter {
            browser,
            extractor: Some(extractor),
            url: url.into(),
            navigation_timeout,
            max_document_chars,
            mode: ScrapeMode::Structured,
            _target: PhantomData,
        }
    }

    /// Scrape with the name-scanning heuristic only
    pub fn heuristic(
        browser: Arc<dyn Browser>,
        url: impl Into<String>,
        navigation_timeout: Duration,
    ) -> Self {
        ScrapeAdapter {
            browser,
            extractor: None,
            url: url.into(),
            navigation_timeout,
            max_document_chars: usize::MAX,
            mode: ScrapeMode::HeuristicOnly,
            _target: PhantomData,
        }
    }

    /// Opens a session, captures the document and always closes the session.
    async fn capture(&self) -> Result<String, FetchError> {
        let mut session = self.browser.open_session().await?;
        let captured = async {
            session.navigate(&self.url, self.navigation_timeout).await?;
            session.content().await
        }
        .await;
        session.close().await;
        captured
    }

    async fn extract(&self, document: &str, fetched_at: DateTime<Utc>) -> Result<T::Output, FetchError> {
        let Some(extractor) = &self.extractor else {
            return Err(FetchError::extraction_unavailable("extraction is not configured"));
        };
        let document = truncate_document(document, self.max_document_chars);
        let text = extractor
            .complete(SYSTEM_PROMPT, &T::prompt(&self.url, document))
            .await?;
        T::from_extraction(&text, &self.url, fetched_at)
    }
}

#[async_trait]
impl<T: ScrapeTarget> Adapter<T::Output> for ScrapeAdapter<T> {
    fn name(&self) -> &'static str {
        match self.mode {
            ScrapeMode::Structured => "scrape-extraction",
            ScrapeMode::HeuristicOnly => "scrape-heuristic",
        }
    }

    #[instrument(skip(self), fields(url = %self.url, mode = ?self.mode))]
    async fn fetch(&self) -> Result<T::Output, FetchError> {
        let document = self.capture().await?;
        let fetched_at = Utc::now();

        let snapshot = match self.mode {
            ScrapeMode::HeuristicOnly => T::from_heuristic(&document, &self.url, fetched_at)?,
            ScrapeMode::Structured => match self.extract(&document, fetched_at).await {
                Ok(snapshot) => snapshot,
                Err(e) if e.is_extraction_unavailable() => {
                    warn!("{e}; falling back to heuristic scan of the captured page");
                    T::from_heuristic(&document, &self.url, fetched_at)?
                }
                Err(e) => return Err(e),
            },
        };

        info!(
            "Scrape of {} produced {} records ({})",
            self.url,
            snapshot.len(),
            snapshot.source()
        );
        Ok(snapshot)
    }
}
