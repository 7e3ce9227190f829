use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use appsearch_core::error::Error;
use appsearch_core::traits::{FulltextEngine, SemanticEngine};
use appsearch_core::types::ApplicationFileLocator;

use crate::registry::Dataset;
use crate::source::DataSource;

/// Work performed on every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshJob {
    IngestAndReload { locators: Vec<ApplicationFileLocator> },
    /// Pick up snapshots written by another process.
    ReloadOnly,
}

/// Run `job` every `period`, starting one period from now, until `shutdown`
/// flips to `true` or its sender is dropped. Ticks missed while a run is in
/// flight are skipped rather than queued.
pub fn spawn_refresh_loop<F, S, D>(
    dataset: Arc<Dataset<F, S>>,
    source: Arc<D>,
    job: RefreshJob,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    F: FulltextEngine,
    S: SemanticEngine,
    D: DataSource + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_secs = period.as_secs_f64(), "refresh loop started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = match &job {
                        RefreshJob::IngestAndReload { locators } => dataset.refresh(source.as_ref(), locators).await,
                        RefreshJob::ReloadOnly => dataset.reload().await,
                    };
                    match outcome {
                        Ok(version) => debug!(%version, "scheduled refresh done"),
                        Err(Error::RefreshInProgress) => debug!("refresh already running, skipping tick"),
                        Err(e @ Error::AnomalyDetected(_)) => warn!(error = %e, "scheduled refresh rejected"),
                        Err(e) => error!(error = %e, "scheduled refresh failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("refresh loop stopped");
    })
}
