//! Installation of a single asset
//!
//! `InstallationJob::run` drives `Pending → FetchingMetadata → Downloading →
//! Extracting → Done` and always ends in exactly one `JobResult`. Errors from
//! any stage are converted at this boundary and never escape the job. The
//! temporary archive is removed on every exit path.

use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::InstallerConfig;
use crate::error::{FailureKind, InstallError};
use crate::extract::ArchiveExtractor;
use crate::fetcher::{AssetFetcher, AssetId};
use crate::progress::{InstallObserver, Progress, TransferCallback, TransferEvent};
use crate::transfer::{TransferOutcome, TransferTask, files};

/// Job progress bands on its own 0..=100 scale
const FETCH_PROGRESS: u8 = 10;
const DOWNLOAD_START: u8 = 20;
const DOWNLOAD_END: u8 = 80;

/// Lifecycle of a job; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobState {
    Pending,
    FetchingMetadata,
    Downloading,
    Extracting,
    Done,
}

/// Terminal status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    Failed(FailureKind),
    Cancelled,
}

/// Outcome of one job, produced exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub asset_id: AssetId,
    pub status: JobStatus,
    /// Human-readable summary for the UI
    pub message: String,
}

impl JobResult {
    pub fn success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == JobStatus::Cancelled
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.status {
            JobStatus::Succeeded => None,
            JobStatus::Failed(kind) => Some(kind),
            JobStatus::Cancelled => Some(FailureKind::Cancelled),
        }
    }
}

/// Fetch, download, extract and clean up one asset
pub struct InstallationJob {
    asset_id: AssetId,
    project_dir: PathBuf,
    fetcher: Arc<dyn AssetFetcher>,
    config: InstallerConfig,
    extractor: ArchiveExtractor,
    token: CancellationToken,
    state: JobState,
}

impl InstallationJob {
    pub fn new<P: Into<PathBuf>>(
        asset_id: AssetId,
        project_dir: P,
        fetcher: Arc<dyn AssetFetcher>,
        config: &InstallerConfig,
    ) -> Self {
        Self {
            asset_id,
            project_dir: project_dir.into(),
            fetcher,
            extractor: ArchiveExtractor::new(config),
            config: config.clone(),
            token: CancellationToken::new(),
            state: JobState::Pending,
        }
    }

    /// Observe `token`; the active transfer gets a child of it
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Token that cancels this job when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Run the job to completion, reporting through `observer`
    pub async fn run(mut self, observer: Arc<dyn InstallObserver>) -> JobResult {
        let span = info_span!("install_job", asset_id = %self.asset_id);
        async move {
            let mut temp_archive = None;
            let outcome = self.execute(&observer, &mut temp_archive).await;

            if let Some(path) = temp_archive {
                files::discard_file(&path).await;
                if let Some(parent) = path.parent() {
                    files::remove_dir_if_empty(parent).await;
                }
            }
            self.advance(JobState::Done);

            let asset_id = self.asset_id.clone();
            match outcome {
                Ok(title) => {
                    let message = format!("'{}' (ID:{}) installed successfully.", title, asset_id);
                    info!("{}", message);
                    JobResult {
                        asset_id,
                        status: JobStatus::Succeeded,
                        message,
                    }
                }
                Err(error) if error.kind() == FailureKind::Cancelled => {
                    info!("Installation cancelled: {}", error);
                    JobResult {
                        asset_id,
                        status: JobStatus::Cancelled,
                        message: format!("Installation cancelled: {}", error),
                    }
                }
                Err(error) => {
                    warn!(category = error.category(), "Installation failed: {}", error);
                    JobResult {
                        asset_id,
                        status: JobStatus::Failed(error.kind()),
                        message: format!("Installation failed: {}", error),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &mut self,
        observer: &Arc<dyn InstallObserver>,
        temp_archive: &mut Option<PathBuf>,
    ) -> Result<String, InstallError> {
        self.check_cancelled("Cancelled before start.")?;

        self.advance(JobState::FetchingMetadata);
        observer.on_status(&format!("Getting info for ID {}...", self.asset_id));
        observer.on_progress(Progress::Percent(FETCH_PROGRESS));

        let metadata = tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                return Err(InstallError::cancelled("Cancelled while fetching details."));
            }
            metadata = self.fetcher.fetch_asset_metadata(&self.asset_id) => metadata?,
        };
        if !metadata.has_download_url() {
            return Err(InstallError::MissingDownloadUrl(self.asset_id.clone()));
        }
        let title = metadata.title;
        debug!("Resolved '{}' -> {}", title, metadata.download_url);

        self.check_cancelled("Cancelled before download.")?;

        self.advance(JobState::Downloading);
        observer.on_status(&format!("Downloading '{}'...", title));
        observer.on_progress(Progress::Percent(DOWNLOAD_START));

        tokio::fs::create_dir_all(&self.config.temp_dir)
            .await
            .map_err(|source| InstallError::TempFile {
                path: self.config.temp_dir.clone(),
                source,
            })?;
        let archive = files::temp_archive_path(&self.config.temp_dir, &self.asset_id);
        *temp_archive = Some(archive.clone());

        let handle = TransferTask::new(&metadata.download_url, &archive, &self.config)
            .with_cancellation(self.token.child_token())
            .with_callback(relay_to(Arc::clone(observer)))
            .spawn();

        match handle
            .wait()
            .await
            .map_err(|e| InstallError::Worker(e.to_string()))?
        {
            TransferOutcome::Completed { bytes, .. } => {
                debug!("Downloaded {} bytes to {}", bytes, archive.display());
            }
            TransferOutcome::Cancelled => {
                return Err(InstallError::cancelled("Download cancelled by user."));
            }
            TransferOutcome::Failed(error) => return Err(error.into()),
        }

        self.check_cancelled("Cancelled before extraction.")?;

        self.advance(JobState::Extracting);
        observer.on_status(&format!("Extracting '{}'...", title));
        observer.on_progress(Progress::Percent(DOWNLOAD_END));

        let install_dir = self.config.install_dir_for(&self.project_dir);
        let extractor = self.extractor.clone();
        tokio::task::spawn_blocking(move || extractor.extract(&archive, &install_dir))
            .await
            .map_err(|e| InstallError::Worker(e.to_string()))??;

        observer.on_progress(Progress::Percent(100));
        observer.on_status(&format!("'{}' installed.", title));
        Ok(title)
    }

    fn check_cancelled(&self, reason: &str) -> Result<(), InstallError> {
        if self.token.is_cancelled() {
            Err(InstallError::cancelled(reason))
        } else {
            Ok(())
        }
    }

    fn advance(&mut self, next: JobState) {
        debug_assert!(next >= self.state, "job state moved backwards");
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Forward transfer events to the job observer, mapping progress onto the
/// download band
fn relay_to(observer: Arc<dyn InstallObserver>) -> TransferCallback {
    Arc::new(move |event| match event {
        TransferEvent::Status(message) => observer.on_status(&message),
        TransferEvent::Progress(progress) => {
            observer.on_progress(progress.scale(DOWNLOAD_START, DOWNLOAD_END))
        }
    })
}
