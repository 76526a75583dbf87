//! Bounded, persisted log of fetch attempts and outcomes per kind.

use super::store::write_atomic;
use crate::data_fetcher::models::{FeedKind, FetchLogEntry, LogLevel};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Ring buffer of the most recent fetch log entries for one kind.
///
/// Every append is mirrored to `tracing` and persisted to
/// `<kind>-log.json`. Once full, the oldest entry is dropped first.
#[derive(Debug)]
pub struct FetchLog {
    kind: FeedKind,
    path: PathBuf,
    capacity: usize,
    entries: Mutex<VecDeque<FetchLogEntry>>,
}

impl FetchLog {
    /// Opens the log, resuming from the persisted file when it is readable.
    pub async fn open(dir: &Path, kind: FeedKind, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let path = dir.join(kind.log_file_name());
        let mut entries: VecDeque<FetchLogEntry> = match tokio::fs::read(&path).await {
            Ok(body) => serde_json::from_slice::<Vec<FetchLogEntry>>(&body)
                .map(VecDeque::from)
                .unwrap_or_else(|e| {
                    warn!("Discarding unreadable fetch log {}: {}", path.display(), e);
                    VecDeque::new()
                }),
            Err(_) => VecDeque::new(),
        };
        while entries.len() > capacity {
            entries.pop_front();
        }

        FetchLog {
            kind,
            path,
            capacity,
            entries: Mutex::new(entries),
        }
    }

    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.append(LogLevel::Info, message.into()).await;
    }

    pub async fn warn(&self, message: impl Into<String>) {
        self.append(LogLevel::Warn, message.into()).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.append(LogLevel::Error, message.into()).await;
    }

    /// Appends an entry; persistence failures are logged, never returned.
    pub async fn append(&self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => info!(kind = %self.kind, "{message}"),
            LogLevel::Warn => warn!(kind = %self.kind, "{message}"),
            LogLevel::Error => error!(kind = %self.kind, "{message}"),
        }

        let mut entries = self.entries.lock().await;
        entries.push_back(FetchLogEntry::new(level, message));
        while entries.len() > self.capacity {
            entries.pop_front();
        }

        let persisted = serde_json::to_vec_pretty(&*entries);
        match persisted {
            Ok(body) => {
                if let Err(e) = write_atomic(&self.path, &body).await {
                    warn!("Failed to persist fetch log {}: {}", self.path.display(), e);
                }
            }
            Err(e) => warn!("Failed to serialize fetch log: {e}"),
        }
    }

    /// Oldest-first copy of the current entries
    pub async fn entries(&self) -> Vec<FetchLogEntry> {
        self.entries.lock().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_ring_buffer_drops_oldest() {
        let dir = tempdir().unwrap();
        let log = FetchLog::open(dir.path(), FeedKind::Lifts, 3).await;
        for i in 0..5 {
            log.info(format!("attempt {i}")).await;
        }

        let entries = log.entries().await;
        let messages: Vec<_> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["attempt 2", "attempt 3", "attempt 4"]);
    }

    #[tokio::test]
    async fn test_log_is_persisted_and_resumed() {
        let dir = tempdir().unwrap();
        {
            let log = FetchLog::open(dir.path(), FeedKind::Webcams, 10).await;
            log.info("started").await;
            log.error("all adapters failed").await;
        }
        assert!(dir.path().join("webcams-log.json").exists());

        let reopened = FetchLog::open(dir.path(), FeedKind::Webcams, 1).await;
        let entries = reopened.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Error);
        assert_eq!(entries[0].message, "all adapters failed");
    }

    #[tokio::test]
    async fn test_corrupt_log_starts_empty() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("lifts-log.json"), "not json")
            .await
            .unwrap();
        let log = FetchLog::open(dir.path(), FeedKind::Lifts, 10).await;
        assert!(log.entries().await.is_empty());
    }
}
