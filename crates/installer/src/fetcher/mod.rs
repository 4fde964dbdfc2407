//! Asset metadata lookup
//!
//! The pipeline only needs two facts about an asset before it can download
//! it: a display title and the archive URL. `AssetFetcher` is the seam the
//! job calls; `AssetLibraryClient` is the HTTP implementation.

pub mod asset_library;

pub use asset_library::AssetLibraryClient;

use async_trait::async_trait;
use std::fmt;

use crate::error::FetchError;

/// Opaque identifier of a remote asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(String);

impl AssetId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for AssetId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<u32> for AssetId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl From<i32> for AssetId {
    fn from(id: i32) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Resolved metadata of an asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMetadata {
    pub title: String,
    /// Empty when the record carries no usable download
    pub download_url: String,
}

impl AssetMetadata {
    pub fn new<T: Into<String>, U: Into<String>>(title: T, download_url: U) -> Self {
        Self {
            title: title.into(),
            download_url: download_url.into(),
        }
    }

    pub fn has_download_url(&self) -> bool {
        !self.download_url.trim().is_empty()
    }
}

/// Resolves an asset identifier to its metadata
///
/// Implementations must complete or fail within a bounded time; the job does
/// not impose its own timeout on top.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch_asset_metadata(&self, asset_id: &AssetId) -> Result<AssetMetadata, FetchError>;
}
