//! Archive extraction with payload-root discovery
//!
//! Community archives come in many layouts: the addon at the root, wrapped
//! in a project folder, or zipped again inside the archive. In `Smart` mode
//! the archive is unpacked into a private scratch directory, the payload
//! root is located with [`scan::locate_payload`], and only the payload is
//! merged into the destination. Scratch directories are `TempDir`s and are
//! removed when extraction returns, whatever the outcome.
//!
//! Extraction is blocking I/O. Async callers run it on
//! `tokio::task::spawn_blocking`.

pub mod merge;
pub mod scan;

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::InstallerConfig;
use crate::error::ExtractError;
use scan::{ADDONS_DIR, LocalTree, PayloadRoot};

/// How an archive is laid out in the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// Locate the payload root and install only that
    #[default]
    Smart,
    /// Unpack the archive verbatim
    Full,
}

/// Extracts zip archives into a destination directory
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    scratch_parent: Option<PathBuf>,
    max_nesting: usize,
}

impl Default for ArchiveExtractor {
    fn default() -> Self {
        Self::new(&InstallerConfig::default())
    }
}

impl ArchiveExtractor {
    pub fn new(config: &InstallerConfig) -> Self {
        Self {
            scratch_parent: config.scratch_dir.clone(),
            max_nesting: config.max_archive_nesting,
        }
    }

    /// Create scratch directories under `dir` instead of the system temp dir
    pub fn with_scratch_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.scratch_parent = Some(dir.into());
        self
    }

    pub fn with_max_nesting(mut self, limit: usize) -> Self {
        self.max_nesting = limit;
        self
    }

    /// Extract `archive` into `destination` using payload-root discovery
    pub fn extract(&self, archive: &Path, destination: &Path) -> Result<(), ExtractError> {
        self.extract_with_mode(archive, destination, ExtractMode::Smart)
    }

    pub fn extract_with_mode(
        &self,
        archive: &Path,
        destination: &Path,
        mode: ExtractMode,
    ) -> Result<(), ExtractError> {
        info!(
            "Starting extraction: '{}' -> '{}' ({:?})",
            archive.display(),
            destination.display(),
            mode
        );

        if !archive.is_file() {
            return Err(ExtractError::NotFound(archive.to_path_buf()));
        }

        std::fs::create_dir_all(destination).map_err(|e| ExtractError::io(destination, e))?;

        match mode {
            ExtractMode::Full => unpack(archive, destination)?,
            ExtractMode::Smart => self.extract_payload(archive, destination)?,
        }

        info!("Extraction completed: {}", archive.display());
        Ok(())
    }

    fn extract_payload(&self, archive: &Path, destination: &Path) -> Result<(), ExtractError> {
        // Kept alive until the payload is copied; dropping removes them.
        let mut scratches = vec![self.scratch_dir()?];
        unpack(archive, scratches[0].path())?;

        loop {
            let root = match scratches.last() {
                Some(scratch) => scratch.path().to_path_buf(),
                None => return Err(ExtractError::NotFound(archive.to_path_buf())),
            };

            match scan::locate_payload(&LocalTree, &root).map_err(|e| ExtractError::io(&root, e))? {
                PayloadRoot::AddonsDir(dir) => {
                    info!("Found payload directory: {}", dir.display());
                    let copied = merge::merge_dir_contents(&dir, destination)?;
                    debug!("Copied {} files into {}", copied, destination.display());
                    return Ok(());
                }
                PayloadRoot::NestedArchive(nested) => {
                    if scratches.len() > self.max_nesting {
                        return Err(ExtractError::NestingTooDeep {
                            path: archive.to_path_buf(),
                            limit: self.max_nesting,
                        });
                    }
                    info!("Found nested archive, extracting: {}", nested.display());
                    let scratch = self.scratch_dir()?;
                    unpack(&nested, scratch.path())?;
                    scratches.push(scratch);
                }
                PayloadRoot::NotFound => {
                    let source = scan::fallback_root(&LocalTree, &root)
                        .map_err(|e| ExtractError::io(&root, e))?;
                    let target = destination.join(ADDONS_DIR);
                    info!(
                        "No '{}' directory found, installing into {}",
                        ADDONS_DIR,
                        target.display()
                    );
                    merge::merge_dir_contents(&source, &target)?;
                    return Ok(());
                }
            }
        }
    }

    fn scratch_dir(&self) -> Result<TempDir, ExtractError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("asset_extract_");
        match self.scratch_parent {
            Some(ref parent) => {
                std::fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
                builder.tempdir_in(parent).map_err(|e| ExtractError::io(parent, e))
            }
            None => builder
                .tempdir()
                .map_err(|e| ExtractError::io(std::env::temp_dir(), e)),
        }
    }
}

/// Unpack the whole archive into `target`
///
/// Symlink entries are written as regular files holding the link target, so
/// nothing in the scratch tree points outside it. Entries whose names escape
/// `target` are skipped.
fn unpack(archive: &Path, target: &Path) -> Result<(), ExtractError> {
    let corrupt = |source| ExtractError::CorruptArchive {
        path: archive.to_path_buf(),
        source,
    };

    let file = File::open(archive).map_err(|e| corrupt(zip::result::ZipError::Io(e)))?;
    let mut zip = zip::ZipArchive::new(file).map_err(corrupt)?;
    debug!("Unpacking {} entries from {}", zip.len(), archive.display());

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(corrupt)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe entry name: {}", entry.name());
            continue;
        };
        let out_path = target.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| ExtractError::io(&out_path, e))?;
            continue;
        }
        if entry.is_symlink() {
            debug!("Writing symlink entry as a file: {}", entry.name());
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
        }
        let mut output = File::create(&out_path).map_err(|e| ExtractError::io(&out_path, e))?;
        io::copy(&mut entry, &mut output).map_err(|e| ExtractError::io(&out_path, e))?;
    }
    Ok(())
}
