//! Configuration for the installation pipeline

use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://godotengine.org/asset-library/api";

/// Configuration shared by the fetcher, transfers, extractor and queue
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Base URL of the asset library API (without trailing `/asset`)
    pub api_base_url: String,
    pub user_agent: String,
    /// Upper bound for one metadata lookup
    pub metadata_timeout: Duration,
    /// Upper bound for establishing a transfer connection
    pub connect_timeout: Duration,
    /// Longest allowed silence between two body chunks of a transfer
    pub read_timeout: Duration,
    /// Bytes written per step; cancellation is checked before each step
    pub chunk_size: usize,
    /// Directory receiving downloaded archives while a job runs
    pub temp_dir: PathBuf,
    /// Parent of extractor scratch directories (system temp when `None`)
    pub scratch_dir: Option<PathBuf>,
    /// Project-relative directory assets are installed into
    pub install_subdir: String,
    /// Maximum number of archive-inside-archive restarts during extraction
    pub max_archive_nesting: usize,
}

impl InstallerConfig {
    /// Load defaults, then apply `.env` / environment overrides
    pub fn from_env() -> Self {
        if dotenv::dotenv().is_ok() {
            debug!("Loaded environment variables from .env file");
        }

        let mut config = Self::default();
        if let Ok(base) = std::env::var("ASSET_INSTALLER_API_BASE") {
            config.api_base_url = base;
        }
        if let Ok(dir) = std::env::var("ASSET_INSTALLER_TEMP_DIR") {
            config.temp_dir = PathBuf::from(dir);
        }
        if let Ok(agent) = std::env::var("ASSET_INSTALLER_USER_AGENT") {
            config.user_agent = agent;
        }
        if let Some(size) = std::env::var("ASSET_INSTALLER_CHUNK_SIZE")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
        {
            config.chunk_size = size;
        }
        config
    }

    pub fn builder() -> InstallerConfigBuilder {
        InstallerConfigBuilder::new()
    }

    /// Check the values a pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.api_base_url).map_err(|source| ConfigError::InvalidUrl {
            url: self.api_base_url.clone(),
            source,
        })?;
        if self.chunk_size == 0 {
            return Err(ConfigError::Zero { field: "chunk_size" });
        }
        if self.install_subdir.trim().is_empty() {
            return Err(ConfigError::Empty {
                field: "install_subdir",
            });
        }
        for (field, value) in [
            ("metadata_timeout", self.metadata_timeout),
            ("connect_timeout", self.connect_timeout),
            ("read_timeout", self.read_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Zero { field });
            }
        }
        Ok(())
    }

    /// Installation directory for a given project
    pub fn install_dir_for(&self, project_dir: &std::path::Path) -> PathBuf {
        project_dir.join(&self.install_subdir)
    }
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            user_agent: concat!("asset-installer/", env!("CARGO_PKG_VERSION")).to_string(),
            metadata_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(20),
            read_timeout: Duration::from_secs(30),
            chunk_size: 8192,
            temp_dir: std::env::temp_dir().join("asset_installer").join("extensions"),
            scratch_dir: None,
            install_subdir: "addons".to_string(),
            max_archive_nesting: 8,
        }
    }
}

/// Fluent builder over `InstallerConfig::default()`
#[derive(Debug, Clone, Default)]
pub struct InstallerConfigBuilder {
    config: InstallerConfig,
}

impl InstallerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, agent: S) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn metadata_timeout(mut self, timeout: Duration) -> Self {
        self.config.metadata_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn temp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.temp_dir = dir.into();
        self
    }

    pub fn scratch_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn install_subdir<S: Into<String>>(mut self, subdir: S) -> Self {
        self.config.install_subdir = subdir.into();
        self
    }

    pub fn max_archive_nesting(mut self, limit: usize) -> Self {
        self.config.max_archive_nesting = limit;
        self
    }

    pub fn build(self) -> InstallerConfig {
        self.config
    }
}
