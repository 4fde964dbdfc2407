//! File helpers for transfers and temporary archives

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::fetcher::AssetId;

const UNSAFE_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|', ' '];

/// Replace characters that are not portable in file names with `_`
pub fn safe_file_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) || c.is_control() { '_' } else { c })
        .collect();

    if safe.is_empty() { "_".to_string() } else { safe }
}

/// Unique path for the downloaded archive of `asset_id` inside `temp_dir`
///
/// Names combine the asset id, a timestamp and a random suffix, so two jobs
/// for the same asset never share a file.
pub fn temp_archive_path(temp_dir: &Path, asset_id: &AssetId) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    temp_dir.join(format!(
        "asset_{}_{}_{}.zip",
        safe_file_name(asset_id.as_str()),
        timestamp,
        &suffix[..8]
    ))
}

/// Remove a file, treating "already gone" as success
pub async fn remove_file_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Best-effort removal used on cleanup paths; failures are only logged
pub async fn discard_file(path: &Path) {
    if let Err(e) = remove_file_if_exists(path).await {
        warn!("Could not remove {}: {}", path.display(), e);
    }
}

/// Remove `dir` when it exists and has no entries. Returns whether it was removed.
pub async fn remove_dir_if_empty(dir: &Path) -> bool {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return false,
    };

    match entries.next_entry().await {
        Ok(None) => match fs::remove_dir(dir).await {
            Ok(()) => {
                debug!("Removed empty temporary directory {}", dir.display());
                true
            }
            Err(e) => {
                debug!("Could not remove {}: {}", dir.display(), e);
                false
            }
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("My Asset: v2?"), "My_Asset__v2_");
        assert_eq!(safe_file_name("a/b\\c|d"), "a_b_c_d");
        assert_eq!(safe_file_name("plain-name.zip"), "plain-name.zip");
        assert_eq!(safe_file_name(""), "_");
    }

    #[test]
    fn test_temp_archive_paths_are_unique() {
        let dir = Path::new("/tmp/assets");
        let id = AssetId::from("12/34");
        let first = temp_archive_path(dir, &id);
        let second = temp_archive_path(dir, &id);

        assert_ne!(first, second);
        assert_eq!(first.parent(), Some(dir));
        let name = first.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("asset_12_34_"));
        assert!(name.ends_with(".zip"));
    }

    #[tokio::test]
    async fn test_remove_file_if_exists_ignores_missing() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.zip");
        assert!(remove_file_if_exists(&file).await.is_ok());

        std::fs::write(&file, b"x").unwrap();
        remove_file_if_exists(&file).await.unwrap();
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_remove_dir_if_empty() {
        let dir = tempdir().unwrap();
        let full = dir.path().join("full");
        let empty = dir.path().join("empty");
        std::fs::create_dir(&full).unwrap();
        std::fs::create_dir(&empty).unwrap();
        std::fs::write(full.join("keep.txt"), b"x").unwrap();

        assert!(!remove_dir_if_empty(&full).await);
        assert!(full.exists());
        assert!(remove_dir_if_empty(&empty).await);
        assert!(!empty.exists());
        assert!(!remove_dir_if_empty(&dir.path().join("missing")).await);
    }
}
