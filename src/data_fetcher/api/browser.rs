//! Page capture capability.
//!
//! Scrape adapters only see the [`Browser`] and [`BrowserSession`] traits, so
//! a JavaScript-rendering engine can be plugged in without touching them.
//! [`HttpBrowser`] is the built-in implementation over `reqwest`.

use super::fetch_utils::send_checked;
use super::http_client::create_http_client_with_timeout;
use crate::error::FetchError;
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, USER_AGENT};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument};

/// Desktop and mobile agents rotated per session
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
];

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

#[async_trait]
pub trait Browser: Send + Sync {
    /// Acquires a session; waits while every session is in use.
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, FetchError>;
}

/// A scoped page. Owned by one scrape at a time and closed after capture.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FetchError>;

    /// Captured document of the last successful navigation
    async fn content(&mut self) -> Result<String, FetchError>;

    async fn close(self: Box<Self>);
}

/// Fetches pages over plain HTTP with browser-like headers.
pub struct HttpBrowser {
    client: Client,
    sessions: Arc<Semaphore>,
    settle: Duration,
}

impl HttpBrowser {
    pub fn new(
        http_timeout_seconds: u64,
        settle: Duration,
        max_sessions: usize,
    ) -> Result<Self, reqwest::Error> {
        Ok(HttpBrowser {
            client: create_http_client_with_timeout(http_timeout_seconds)?,
            sessions: Arc::new(Semaphore::new(max_sessions.max(1))),
            settle,
        })
    }

    pub fn available_sessions(&self) -> usize {
        self.sessions.available_permits()
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        let permit = Arc::clone(&self.sessions)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::navigation("browser", "session pool is closed"))?;
        let user_agent = USER_AGENTS[rand::rng().random_range(0..USER_AGENTS.len())];
        debug!("Opened browser session as {user_agent}");

        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            user_agent,
            settle: self.settle,
            document: None,
            _permit: permit,
        }))
    }
}

struct HttpSession {
    client: Client,
    user_agent: &'static str,
    settle: Duration,
    document: Option<String>,
    _permit: OwnedSemaphorePermit,
}

#[async_trait]
impl BrowserSession for HttpSession {
    #[instrument(skip(self, timeout))]
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FetchError> {
        let request = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(CACHE_CONTROL, "no-cache");

        let navigation = async {
            let response = send_checked(request, url).await?;
            response
                .text()
                .await
                .map_err(|e| FetchError::from_transport(url, &e))
        };

        let document = match tokio::time::timeout(timeout, navigation).await {
            Err(_) | Ok(Err(FetchError::NetworkTimeout { .. })) => {
                return Err(FetchError::NavigationTimeout {
                    url: url.to_string(),
                    seconds: timeout.as_secs(),
                });
            }
            Ok(result) => result?,
        };

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
        debug!("Captured {} bytes from {url}", document.len());
        self.document = Some(document);
        Ok(())
    }

    async fn content(&mut self) -> Result<String, FetchError> {
        self.document
            .clone()
            .ok_or_else(|| FetchError::navigation("browser", "no document captured"))
    }

    async fn close(self: Box<Self>) {
        debug!("Closed browser session");
    }
}
