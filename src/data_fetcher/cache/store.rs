//! Durable per-kind snapshot storage.
//!
//! One JSON document per kind. Writes go to a temp file in the same
//! directory and are renamed over the target, so readers always see a
//! complete old or new document. Writers serialize on a per-kind lock;
//! readers never lock.

use crate::data_fetcher::models::{FeedKind, Snapshot};
use crate::error::RefreshError;
use chrono::{TimeDelta, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
    lifts_lock: Mutex<()>,
    webcams_lock: Mutex<()>,
}

impl CacheStore {
    /// Opens the store, creating the data directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(CacheStore {
            dir,
            lifts_lock: Mutex::new(()),
            webcams_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: FeedKind) -> PathBuf {
        self.dir.join(kind.snapshot_file_name())
    }

    fn lock_for(&self, kind: FeedKind) -> &Mutex<()> {
        match kind {
            FeedKind::Lifts => &self.lifts_lock,
            FeedKind::Webcams => &self.webcams_lock,
        }
    }

    /// Atomically replaces the stored snapshot of `S::KIND`.
    pub async fn write<S: Snapshot>(&self, snapshot: &S) -> Result<(), RefreshError> {
        let kind = S::KIND;
        let body = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| RefreshError::cache_write(kind, e.to_string()))?;

        let _guard = self.lock_for(kind).lock().await;
        write_atomic(&self.path_for(kind), &body)
            .await
            .map_err(|e| RefreshError::cache_write(kind, e.to_string()))?;

        debug!(
            "Wrote {} snapshot ({} records, {})",
            kind,
            snapshot.len(),
            snapshot.source()
        );
        Ok(())
    }

    /// Reads the stored snapshot; a missing or corrupt file reads as `None`.
    pub async fn read<S: Snapshot>(&self) -> Option<S> {
        let path = self.path_for(S::KIND);
        let body = match fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice(&body) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Ignoring corrupt cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Time since the stored snapshot's `lastUpdated`, read from disk on
    /// every call. Never negative.
    pub async fn age_of<S: Snapshot>(&self) -> Option<TimeDelta> {
        self.read::<S>()
            .await
            .map(|snapshot| (Utc::now() - snapshot.last_updated()).max(TimeDelta::zero()))
    }
}

/// Writes `body` to a sibling temp file, syncs it and renames it over `path`.
pub async fn write_atomic(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "snapshot".to_string());
    let temp_path = path.with_file_name(format!(
        ".{file_name}.{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = async {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(body).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, path).await
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&temp_path).await;
    }
    result
}
