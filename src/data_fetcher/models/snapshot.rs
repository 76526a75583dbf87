use super::kind::{FeedKind, Source};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Behaviour shared by the per-kind snapshot types.
///
/// A snapshot is immutable once built; a refresh produces a new one. The
/// record count always equals the number of records, and a `no-data`
/// snapshot never carries records.
pub trait Snapshot: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: FeedKind;

    fn last_updated(&self) -> DateTime<Utc>;

    fn source(&self) -> Source;

    /// Number of records
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn error(&self) -> Option<&str>;

    /// Empty snapshot recording that every adapter failed
    fn no_data(error: String, at: DateTime<Utc>) -> Self;

    /// Same records and timestamp, tagged `cached-stale` with `error` set
    fn retag_stale(self, error: String) -> Self;
}
