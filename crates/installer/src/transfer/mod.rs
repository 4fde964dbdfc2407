//! Cancellable streaming download of one URL to one file
//!
//! A `TransferTask` runs on its own tokio task. It narrates through an
//! optional `TransferCallback` and ends with exactly one `TransferOutcome`.
//! The destination file only survives a `Completed` outcome.

pub mod files;

use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::InstallerConfig;
use crate::error::TransferError;
use crate::progress::{Progress, TransferCallback, TransferEvent};

/// Terminal event of a transfer
#[derive(Debug)]
pub enum TransferOutcome {
    Completed { path: PathBuf, bytes: u64 },
    Failed(TransferError),
    Cancelled,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Completed { .. })
    }
}

/// Why the streaming loop stopped early
enum Interrupt {
    Cancelled,
    Failed(TransferError),
}

impl From<TransferError> for Interrupt {
    fn from(error: TransferError) -> Self {
        Interrupt::Failed(error)
    }
}

/// One URL streamed into one destination file
pub struct TransferTask {
    url: String,
    destination: PathBuf,
    config: InstallerConfig,
    token: CancellationToken,
    callback: Option<TransferCallback>,
}

impl TransferTask {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(url: S, destination: P, config: &InstallerConfig) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            config: config.clone(),
            token: CancellationToken::new(),
            callback: None,
        }
    }

    /// Observe this token instead of a private one
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_callback(mut self, callback: TransferCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Start the transfer on its own task
    pub fn spawn(self) -> TransferHandle {
        let token = self.token.clone();
        let span = info_span!("transfer", url = %self.url);
        let join = tokio::spawn(self.run().instrument(span));
        TransferHandle { token, join }
    }

    /// Run the transfer to its terminal outcome on the current task
    pub async fn run(self) -> TransferOutcome {
        match self.stream_to_file().await {
            Ok(bytes) => {
                info!(
                    "Download completed: {} ({} bytes)",
                    self.destination.display(),
                    bytes
                );
                self.emit(TransferEvent::Progress(Progress::Percent(100)));
                self.emit(TransferEvent::Status(format!(
                    "Download complete: {}",
                    self.file_name()
                )));
                TransferOutcome::Completed {
                    path: self.destination,
                    bytes,
                }
            }
            Err(Interrupt::Cancelled) => {
                info!("Download interrupted: {}", self.destination.display());
                files::discard_file(&self.destination).await;
                TransferOutcome::Cancelled
            }
            Err(Interrupt::Failed(error)) => {
                warn!(category = error.category(), "Download failed: {}", error);
                files::discard_file(&self.destination).await;
                TransferOutcome::Failed(error)
            }
        }
    }

    async fn stream_to_file(&self) -> Result<u64, Interrupt> {
        if self.token.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }

        self.emit(TransferEvent::Status(format!("Connecting to {}...", self.url)));

        if let Some(parent) = self.destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TransferError::fs(parent, e))?;
        }

        let client = Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| TransferError::http(&self.url, e))?;

        let response = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(Interrupt::Cancelled),
            response = client.get(&self.url).send() => {
                response.map_err(|e| TransferError::http(&self.url, e))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            }
            .into());
        }
        debug!("Connection OK (status {})", status.as_u16());

        let total = response.content_length().unwrap_or(0);
        self.emit(TransferEvent::Status(format!(
            "Starting download: {} ({} bytes)",
            self.file_name(),
            total
        )));

        let mut file = fs::File::create(&self.destination)
            .await
            .map_err(|e| TransferError::fs(&self.destination, e))?;

        let chunk_size = self.config.chunk_size.max(1);
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(Interrupt::Cancelled),
                next = tokio::time::timeout(self.config.read_timeout, stream.next()) => next,
            };

            let chunk = match next {
                Err(_) => {
                    return Err(TransferError::Timeout {
                        url: self.url.clone(),
                        duration_secs: self.config.read_timeout.as_secs(),
                    }
                    .into());
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => return Err(TransferError::http(&self.url, e).into()),
                Ok(Some(Ok(chunk))) => chunk,
            };

            for piece in chunk.chunks(chunk_size) {
                if self.token.is_cancelled() {
                    return Err(Interrupt::Cancelled);
                }
                file.write_all(piece)
                    .await
                    .map_err(|e| TransferError::fs(&self.destination, e))?;
                downloaded += piece.len() as u64;
                self.emit(TransferEvent::Progress(Progress::of(downloaded, total)));
            }
        }

        file.flush()
            .await
            .map_err(|e| TransferError::fs(&self.destination, e))?;

        if self.token.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        Ok(downloaded)
    }

    fn emit(&self, event: TransferEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }

    fn file_name(&self) -> String {
        display_name(&self.destination)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Handle to a running transfer
#[derive(Debug)]
pub struct TransferHandle {
    token: CancellationToken,
    join: JoinHandle<TransferOutcome>,
}

impl TransferHandle {
    /// Request cancellation; observed before the next chunk is written
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the terminal outcome. Errors only if the task panicked.
    pub async fn wait(self) -> Result<TransferOutcome, JoinError> {
        self.join.await
    }
}
