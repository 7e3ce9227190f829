//! appsearch-data
//!
//! Ingestion, the versioned snapshot store and the [`Dataset`] registry that
//! serves queries from the live snapshot while refreshes run in the
//! background.

use appsearch_core::error::Result;

pub mod ingest;
pub mod registry;
pub mod scheduler;
pub mod snapshot;
pub mod source;

pub use ingest::IngestReport;
pub use registry::{Dataset, DatasetConfig, DatasetState, ReloadPolicy, SearchHit, Snapshot};
pub use scheduler::{spawn_refresh_loop, RefreshJob};
pub use source::{DataSource, DirectorySource, IndexerClient};

/// Run CPU-bound engine work off the async workers.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await.map_err(anyhow::Error::from)??)
}
