//! Summary cache
//!
//! Holds the last good [`CatalogSnapshot`] and recomputes it in a background
//! task, either on a fixed interval or when a writer asks for a refresh.
//! Recomputations closer together than a third of the interval are skipped.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::entities::{AppSummary, CatalogSnapshot, Summary};
use crate::index::IndexError;

/// Pending signals beyond this are dropped; a queued refresh already covers them
const SIGNAL_CAPACITY: usize = 16;

/// Produces a full catalog aggregate
#[async_trait]
pub trait SummarySource: Send + Sync + 'static {
    async fn summarize(&self) -> Result<(Vec<AppSummary>, Summary), IndexError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSignal {
    Refresh,
    Stop,
}

type SharedSnapshot = Arc<Mutex<Arc<CatalogSnapshot>>>;

pub struct SummaryCache {
    snapshot: SharedSnapshot,
    sender: mpsc::Sender<CacheSignal>,
    worker: Mutex<Option<JoinHandle<()>>>,
    interval: Duration,
}

impl SummaryCache {
    /// Compute the first snapshot, then spawn the refresh loop
    ///
    /// Must be called from within a tokio runtime. `interval` must be non-zero.
    pub async fn start(
        source: Arc<dyn SummarySource>,
        interval: Duration,
    ) -> Result<Self, IndexError> {
        if interval.is_zero() {
            return Err(IndexError::InvalidOptions(
                "summary refresh interval must be greater than zero".into(),
            ));
        }

        let (applications, summary) = source.summarize().await?;
        let snapshot: SharedSnapshot =
            Arc::new(Mutex::new(Arc::new(CatalogSnapshot::new(applications, summary))));
        info!(
            applications = summary.application_count,
            tags = summary.tag_count,
            interval_ms = interval.as_millis() as u64,
            "summary cache started"
        );

        let (sender, receiver) = mpsc::channel(SIGNAL_CAPACITY);
        let worker = tokio::spawn(run_refresh_loop(
            source,
            Arc::clone(&snapshot),
            receiver,
            interval,
            Instant::now(),
        ));

        Ok(Self {
            snapshot,
            sender,
            worker: Mutex::new(Some(worker)),
            interval,
        })
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        let guard = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ask for a recomputation without waiting for it
    pub fn request_refresh(&self) {
        match self.sender.try_send(CacheSignal::Refresh) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("refresh already pending");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("summary cache stopped, refresh request ignored");
            }
        }
    }

    /// Stop the refresh loop and wait for it to exit
    pub async fn shutdown(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(worker) = worker else {
            return;
        };

        let _ = self.sender.send(CacheSignal::Stop).await;
        if let Err(err) = worker.await {
            warn!(error = %err, "summary cache task ended abnormally");
        }
        info!("summary cache stopped");
    }
}

async fn run_refresh_loop(
    source: Arc<dyn SummarySource>,
    snapshot: SharedSnapshot,
    mut receiver: mpsc::Receiver<CacheSignal>,
    interval: Duration,
    mut last_refresh: Instant,
) {
    let min_gap = interval / 3;
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            signal = receiver.recv() => match signal {
                Some(CacheSignal::Refresh) => {}
                Some(CacheSignal::Stop) | None => break,
            },
        }

        if last_refresh.elapsed() < min_gap {
            debug!("skipping summary refresh, last one is too recent");
            continue;
        }

        match source.summarize().await {
            Ok((applications, summary)) => {
                let fresh = Arc::new(CatalogSnapshot::new(applications, summary));
                *snapshot.lock().unwrap_or_else(|e| e.into_inner()) = fresh;
                last_refresh = Instant::now();
                debug!(
                    namespaces = summary.namespace_count,
                    applications = summary.application_count,
                    tags = summary.tag_count,
                    "summary cache refreshed"
                );
            }
            Err(err) => {
                warn!(error = %err, "summary refresh failed, keeping previous snapshot");
            }
        }
    }
}
