//! Error types for the asset installation pipeline
//!
//! Each stage has its own error enum carrying the context needed to report it
//! (url, path, asset id). `InstallError` is the per-job taxonomy: every stage
//! error is converted into it at the job boundary and never travels further
//! than the `JobResult`.

use std::path::PathBuf;
use thiserror::Error;

use crate::fetcher::AssetId;

/// Configuration values a pipeline cannot run with
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("api_base_url '{url}' is not a valid URL: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

/// Failures of a single streaming transfer
#[derive(Error, Debug)]
pub enum TransferError {
    /// Connection, DNS or stream-level failure
    #[error("Network error while downloading '{url}': {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-2xx status
    #[error("Server returned HTTP {status} for '{url}'")]
    Status { url: String, status: u16 },

    /// No data arrived within the configured read timeout
    #[error("Download timeout: no data from '{url}' for {duration_secs}s")]
    Timeout { url: String, duration_secs: u64 },

    /// Local file could not be created or written
    #[error("File operation failed on '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransferError {
    pub fn category(&self) -> &'static str {
        match self {
            TransferError::Http { .. } => "http",
            TransferError::Status { .. } => "http_status",
            TransferError::Timeout { .. } => "timeout",
            TransferError::FileSystem { .. } => "file_system",
        }
    }

    pub(crate) fn http(url: &str, source: reqwest::Error) -> Self {
        TransferError::Http {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TransferError::FileSystem {
            path: path.into(),
            source,
        }
    }
}

/// Failures of the archive extractor
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Archive not found: {0}")]
    NotFound(PathBuf),

    #[error("Archive '{path}' is corrupt or unreadable: {source}")]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Destination left partially populated
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive '{path}' nests more than {limit} archives")]
    NestingTooDeep { path: PathBuf, limit: usize },
}

impl ExtractError {
    pub fn category(&self) -> &'static str {
        match self {
            ExtractError::NotFound(_) => "not_found",
            ExtractError::CorruptArchive { .. } => "corrupt_archive",
            ExtractError::Io { .. } => "io",
            ExtractError::NestingTooDeep { .. } => "nesting_too_deep",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExtractError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures of an asset metadata lookup
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Asset {0} not found")]
    NotFound(AssetId),

    #[error("Network error fetching details for ID {asset_id}: {message}")]
    Network { asset_id: AssetId, message: String },

    #[error("Invalid response for asset {asset_id}: {message}")]
    InvalidResponse { asset_id: AssetId, message: String },
}

/// Everything that can end an installation job unsuccessfully
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Details not found for asset ID {0}.")]
    MetadataNotFound(AssetId),

    #[error("Download URL not found for asset ID {0}.")]
    MissingDownloadUrl(AssetId),

    #[error("{0}")]
    Fetch(FetchError),

    #[error("Download failed: {0}")]
    Network(#[from] TransferError),

    #[error("{reason}")]
    Cancelled { reason: String },

    #[error("Extraction failed: {0}")]
    CorruptArchive(ExtractError),

    #[error("Extraction failed: {0}")]
    ExtractIo(ExtractError),

    #[error("Could not prepare temporary directory '{path}': {source}")]
    TempFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Background worker failed: {0}")]
    Worker(String),
}

impl InstallError {
    pub(crate) fn cancelled(reason: impl Into<String>) -> Self {
        InstallError::Cancelled {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            InstallError::MetadataNotFound(_) => FailureKind::MetadataNotFound,
            InstallError::MissingDownloadUrl(_) => FailureKind::MissingDownloadUrl,
            InstallError::Fetch(FetchError::NotFound(_)) => FailureKind::MetadataNotFound,
            InstallError::Fetch(_) => FailureKind::Network,
            InstallError::Network(_) => FailureKind::Network,
            InstallError::Cancelled { .. } => FailureKind::Cancelled,
            InstallError::CorruptArchive(_) => FailureKind::CorruptArchive,
            InstallError::ExtractIo(_) => FailureKind::ExtractIo,
            InstallError::TempFile { .. } => FailureKind::ExtractIo,
            InstallError::Worker(_) => FailureKind::Internal,
        }
    }

    pub fn category(&self) -> &'static str {
        self.kind().as_str()
    }
}

impl From<FetchError> for InstallError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::NotFound(id) => InstallError::MetadataNotFound(id),
            other => InstallError::Fetch(other),
        }
    }
}

impl From<ExtractError> for InstallError {
    fn from(error: ExtractError) -> Self {
        match error {
            ExtractError::Io { .. } => InstallError::ExtractIo(error),
            _ => InstallError::CorruptArchive(error),
        }
    }
}

/// Cloneable classification of an `InstallError`, kept in `JobResult`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MetadataNotFound,
    MissingDownloadUrl,
    Network,
    Cancelled,
    CorruptArchive,
    ExtractIo,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MetadataNotFound => "metadata_not_found",
            FailureKind::MissingDownloadUrl => "missing_download_url",
            FailureKind::Network => "network",
            FailureKind::Cancelled => "cancelled",
            FailureKind::CorruptArchive => "corrupt_archive",
            FailureKind::ExtractIo => "extract_io",
            FailureKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
