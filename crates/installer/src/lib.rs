//! Asset Installer Library
//!
//! Downloads community asset archives and installs them into project
//! folders. A queue runs one installation job at a time: each job resolves
//! the asset's metadata, streams the archive to a temporary file, locates
//! the payload inside the archive and merges it into the project's
//! `addons/` directory.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use asset_installer::{
//!     AssetId, AssetLibraryClient, InstallationQueue, InstallerConfig, LoggingObserver,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = InstallerConfig::default();
//! let fetcher = Arc::new(AssetLibraryClient::new(&config)?);
//!
//! let queue = InstallationQueue::new(fetcher, config);
//! let summary = queue
//!     .run(
//!         vec![AssetId::from(1234u64), AssetId::from(5678u64)],
//!         Path::new("/path/to/project"),
//!         Arc::new(LoggingObserver),
//!     )
//!     .await;
//!
//! println!("{}", summary.message());
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Sequential queue**: jobs run strictly one after another, in input order
//! - **Cooperative cancellation**: one cancel stops the running transfer and drains the queue
//! - **Smooth progress**: per-job progress folded into one non-decreasing figure
//! - **Layout detection**: `addons/` folders, wrapper folders and nested archives
//! - **Guaranteed cleanup**: temporary archives and scratch directories never outlive a job

pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod job;
pub mod progress;
pub mod queue;
pub mod transfer;

// Re-export commonly used types for convenience
pub use config::{InstallerConfig, InstallerConfigBuilder};
pub use error::{ConfigError, ExtractError, FailureKind, FetchError, InstallError, TransferError};
pub use extract::{ArchiveExtractor, ExtractMode};
pub use fetcher::{AssetFetcher, AssetId, AssetLibraryClient, AssetMetadata};
pub use job::{InstallationJob, JobResult, JobState, JobStatus};
pub use progress::{
    CompositeObserver, InstallObserver, LoggingObserver, NullObserver, Progress, TransferCallback,
    TransferEvent,
};
pub use queue::{CancelHandle, InstallationQueue, QueueHandle, QueueSummary};
pub use transfer::{TransferHandle, TransferOutcome, TransferTask};
