use crate::data_fetcher::models::Snapshot;
use crate::error::FetchError;
use async_trait::async_trait;
use std::sync::Arc;

/// One upstream strategy producing a complete snapshot of kind `S`.
///
/// Adapters never retry internally and never touch the cache; the refresher
/// runs them in priority order and keeps the first success.
#[async_trait]
pub trait Adapter<S: Snapshot>: Send + Sync {
    /// Short name for logs and the fetch log
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> Result<S, FetchError>;
}

/// Priority-ordered adapters for one kind
pub type AdapterChain<S> = Vec<Arc<dyn Adapter<S>>>;
