//! Sequential multi-asset installation
//!
//! The queue runs one `InstallationJob` at a time in the order the ids were
//! given, folds each `JobResult` into a `QueueSummary`, and stops advancing
//! once cancellation is requested. Job narration is relayed to the caller's
//! observer with a `[k/n]` prefix and job progress is folded into a single
//! non-decreasing 0..=100 figure for the whole queue.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span};

use crate::config::InstallerConfig;
use crate::fetcher::{AssetFetcher, AssetId};
use crate::job::{InstallationJob, JobResult};
use crate::progress::{InstallObserver, Progress};

/// Aggregate outcome of a queue run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueSummary {
    pub total_requested: usize,
    pub succeeded_count: usize,
    /// First failure, formatted as `ID <id>: <message>`
    pub first_error_message: Option<String>,
    pub cancelled: bool,
    /// One entry per job that ran, in input order
    pub results: Vec<JobResult>,
}

impl QueueSummary {
    fn new(total_requested: usize) -> Self {
        Self {
            total_requested,
            ..Self::default()
        }
    }

    fn record(&mut self, result: JobResult) {
        if result.success() {
            self.succeeded_count += 1;
        } else if !result.is_cancelled() && self.first_error_message.is_none() {
            self.first_error_message = Some(format!("ID {}: {}", result.asset_id, result.message));
        }
        self.results.push(result);
    }

    pub fn all_succeeded(&self) -> bool {
        !self.cancelled && self.succeeded_count == self.total_requested
    }

    /// User-facing one-line summary
    pub fn message(&self) -> String {
        if self.total_requested == 0 {
            return "No extensions selected.".to_string();
        }
        if self.cancelled {
            return format!(
                "Installation cancelled: {} of {} installed before cancellation.",
                self.succeeded_count, self.total_requested
            );
        }
        match self.first_error_message {
            None if self.succeeded_count == self.total_requested => "Installation complete.".to_string(),
            Some(ref error) => format!(
                "{} of {} installed successfully. First error: {}",
                self.succeeded_count, self.total_requested, error
            ),
            None => format!(
                "{} of {} installed successfully.",
                self.succeeded_count, self.total_requested
            ),
        }
    }
}

/// Cloneable handle that cancels a queue from any thread
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Installs assets into a project one after another
pub struct InstallationQueue {
    fetcher: Arc<dyn AssetFetcher>,
    config: InstallerConfig,
    token: CancellationToken,
}

impl InstallationQueue {
    pub fn new(fetcher: Arc<dyn AssetFetcher>, config: InstallerConfig) -> Self {
        Self {
            fetcher,
            config,
            token: CancellationToken::new(),
        }
    }

    /// Stop the current job and start no further ones. Irreversible.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            token: self.token.clone(),
        }
    }

    /// Run every job in order and return the summary
    pub async fn run(
        &self,
        asset_ids: Vec<AssetId>,
        project_dir: &Path,
        observer: Arc<dyn InstallObserver>,
    ) -> QueueSummary {
        let total = asset_ids.len();
        let mut summary = QueueSummary::new(total);

        if total == 0 {
            observer.on_status("No extensions selected.");
            return summary;
        }

        info!("Installing {} assets into {}", total, project_dir.display());
        observer.on_status(&format!("Starting installation of {} extensions...", total));
        observer.on_progress(Progress::Percent(0));

        let watcher = {
            let token = self.token.clone();
            let observer = Arc::clone(&observer);
            tokio::spawn(async move {
                token.cancelled().await;
                observer.on_cancel_requested();
                observer.on_status("Cancelling...");
            })
        };

        let high_water = Arc::new(AtomicU8::new(0));
        let mut pending: VecDeque<AssetId> = asset_ids.into();
        let mut completed = 0;

        while let Some(asset_id) = pending.pop_front() {
            if self.token.is_cancelled() {
                debug!("Cancelled, skipping {} remaining assets", pending.len() + 1);
                break;
            }

            let index = total - pending.len();
            observer.on_status(&format!("[{}/{}] Starting ID {}...", index, total, asset_id));

            let relay: Arc<dyn InstallObserver> = Arc::new(JobRelay {
                inner: Arc::clone(&observer),
                token: self.token.clone(),
                prefix: format!("[{}/{}] ID {}", index, total, asset_id),
                completed,
                total,
                high_water: Arc::clone(&high_water),
            });

            let job = InstallationJob::new(asset_id, project_dir, Arc::clone(&self.fetcher), &self.config)
                .with_cancellation(self.token.child_token());
            let result = job.run(relay).await;
            debug!("Job finished: {:?} {}", result.status, result.message);

            if !result.is_cancelled() {
                completed += 1;
            }
            summary.record(result);

            if self.token.is_cancelled() {
                break;
            }
            report_overall(observer.as_ref(), &high_water, completed * 100 / total);
        }

        summary.cancelled = self.token.is_cancelled();
        if summary.cancelled {
            // The watcher resolves once the token is cancelled; let it finish
            // its notifications before the final status.
            let _ = watcher.await;
        } else {
            watcher.abort();
            let _ = watcher.await;
        }

        let message = summary.message();
        info!("{}", message);
        observer.on_status(&message);
        summary
    }

    /// Run the queue on its own task
    pub fn spawn(
        self,
        asset_ids: Vec<AssetId>,
        project_dir: PathBuf,
        observer: Arc<dyn InstallObserver>,
    ) -> QueueHandle {
        let cancel = self.cancel_handle();
        let span = info_span!("install_queue", project = %project_dir.display());
        let join = tokio::spawn(
            async move { self.run(asset_ids, &project_dir, observer).await }.instrument(span),
        );
        QueueHandle { cancel, join }
    }
}

/// Handle to a queue started with `InstallationQueue::spawn`
#[derive(Debug)]
pub struct QueueHandle {
    cancel: CancelHandle,
    join: JoinHandle<QueueSummary>,
}

impl QueueHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for the summary. Errors only if the queue task panicked.
    pub async fn wait(self) -> Result<QueueSummary, JoinError> {
        self.join.await
    }
}

/// Emit `overall` unless progress already went further
fn report_overall(observer: &dyn InstallObserver, high_water: &AtomicU8, overall: usize) {
    let overall = overall.min(100) as u8;
    let previous = high_water.fetch_max(overall, Ordering::SeqCst);
    observer.on_progress(Progress::Percent(previous.max(overall)));
}

/// Observer handed to one job: prefixes status, rescales progress to the
/// queue, and goes quiet once the queue is cancelled
struct JobRelay {
    inner: Arc<dyn InstallObserver>,
    token: CancellationToken,
    prefix: String,
    completed: usize,
    total: usize,
    high_water: Arc<AtomicU8>,
}

impl InstallObserver for JobRelay {
    fn on_status(&self, message: &str) {
        if self.token.is_cancelled() {
            return;
        }
        self.inner.on_status(&format!("{}: {}", self.prefix, message));
    }

    fn on_progress(&self, progress: Progress) {
        if self.token.is_cancelled() {
            return;
        }
        match progress {
            Progress::Percent(p) => {
                let overall = (self.completed * 100 + usize::from(p)) / self.total;
                report_overall(self.inner.as_ref(), &self.high_water, overall);
            }
            Progress::Indeterminate => self.inner.on_progress(Progress::Indeterminate),
        }
    }
}
