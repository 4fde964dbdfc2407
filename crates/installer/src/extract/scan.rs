//! Payload-root discovery
//!
//! Works against a `TreeView` so the layout heuristics can be tested on an
//! in-memory tree. `LocalTree` is the filesystem implementation the extractor
//! uses.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Directory name marking the payload inside an archive
pub const ADDONS_DIR: &str = "addons";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn dir<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
        }
    }

    pub fn file<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }
}

/// Read-only view of a directory tree
pub trait TreeView {
    /// Direct children of `dir`
    fn entries(&self, dir: &Path) -> io::Result<Vec<TreeEntry>>;

    /// Whether the file at `path` is a readable archive
    fn is_archive(&self, path: &Path) -> bool;
}

/// Result of scanning an extracted tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadRoot {
    /// Directory whose contents are the payload
    AddonsDir(PathBuf),
    /// Archive that must be extracted and scanned again from its root
    NestedArchive(PathBuf),
    NotFound,
}

/// Scan `root` depth-first for the payload root
///
/// At each level, in order:
/// 1. an entry named exactly `addons` that is a directory wins, and one that
///    is an archive file is reported as nested;
/// 2. a file named `addons` or `addons.zip` in any letter case that is an
///    archive is reported as nested;
/// 3. otherwise subdirectories are scanned in name order.
pub fn locate_payload<T: TreeView + ?Sized>(tree: &T, root: &Path) -> io::Result<PayloadRoot> {
    let mut entries = tree.entries(root)?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    if let Some(entry) = entries.iter().find(|e| e.name == ADDONS_DIR) {
        let path = root.join(&entry.name);
        match entry.kind {
            EntryKind::Dir => return Ok(PayloadRoot::AddonsDir(path)),
            EntryKind::File if tree.is_archive(&path) => {
                return Ok(PayloadRoot::NestedArchive(path));
            }
            EntryKind::File => {}
        }
    }

    for entry in entries.iter().filter(|e| e.kind == EntryKind::File) {
        let lower = entry.name.to_lowercase();
        if lower != ADDONS_DIR && lower != "addons.zip" {
            continue;
        }
        let path = root.join(&entry.name);
        if tree.is_archive(&path) {
            return Ok(PayloadRoot::NestedArchive(path));
        }
    }

    for entry in entries.iter().filter(|e| e.kind == EntryKind::Dir) {
        match locate_payload(tree, &root.join(&entry.name))? {
            PayloadRoot::NotFound => continue,
            found => return Ok(found),
        }
    }

    Ok(PayloadRoot::NotFound)
}

/// Directory whose contents are installed when no payload marker exists
///
/// A root holding a single directory is treated as a wrapper and unwrapped;
/// any other root is installed as is.
pub fn fallback_root<T: TreeView + ?Sized>(tree: &T, root: &Path) -> io::Result<PathBuf> {
    let entries = tree.entries(root)?;
    match entries.as_slice() {
        [only] if only.kind == EntryKind::Dir => Ok(root.join(&only.name)),
        _ => Ok(root.to_path_buf()),
    }
}

/// `TreeView` over the local filesystem; symlinks are reported as files
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTree;

impl TreeView for LocalTree {
    fn entries(&self, dir: &Path) -> io::Result<Vec<TreeEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let kind = if entry.file_type()?.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            entries.push(TreeEntry { name, kind });
        }
        Ok(entries)
    }

    fn is_archive(&self, path: &Path) -> bool {
        File::open(path)
            .map(|file| zip::ZipArchive::new(file).is_ok())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    /// Tree built from slash-separated paths; a trailing `/` marks a directory
    #[derive(Default)]
    struct MemoryTree {
        dirs: BTreeMap<PathBuf, Vec<TreeEntry>>,
        archives: BTreeSet<PathBuf>,
    }

    impl MemoryTree {
        fn new(paths: &[&str]) -> Self {
            let mut tree = MemoryTree::default();
            tree.dirs.insert(PathBuf::from("/"), Vec::new());
            for raw in paths {
                let is_dir = raw.ends_with('/');
                let parts: Vec<&str> = raw.trim_end_matches('/').split('/').collect();
                let mut parent = PathBuf::from("/");
                for (i, part) in parts.iter().enumerate() {
                    let last = i == parts.len() - 1;
                    let entry = if last && !is_dir {
                        TreeEntry::file(*part)
                    } else {
                        TreeEntry::dir(*part)
                    };
                    let children = tree.dirs.entry(parent.clone()).or_default();
                    if !children.contains(&entry) {
                        children.push(entry.clone());
                    }
                    parent = parent.join(part);
                    if entry.kind == EntryKind::Dir {
                        tree.dirs.entry(parent.clone()).or_default();
                    }
                }
            }
            tree
        }

        fn archive(mut self, path: &str) -> Self {
            self.archives.insert(Path::new("/").join(path));
            self
        }
    }

    impl TreeView for MemoryTree {
        fn entries(&self, dir: &Path) -> io::Result<Vec<TreeEntry>> {
            self.dirs
                .get(dir)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such dir"))
        }

        fn is_archive(&self, path: &Path) -> bool {
            self.archives.contains(path)
        }
    }

    fn root() -> &'static Path {
        Path::new("/")
    }

    #[test]
    fn test_addons_dir_at_root() {
        let tree = MemoryTree::new(&["addons/Foo/plugin.cfg", "README.md"]);
        assert_eq!(
            locate_payload(&tree, root()).unwrap(),
            PayloadRoot::AddonsDir(PathBuf::from("/addons"))
        );
    }

    #[test]
    fn test_addons_dir_inside_wrapper() {
        let tree = MemoryTree::new(&["godot-foo-main/addons/Foo/plugin.cfg", "godot-foo-main/LICENSE"]);
        assert_eq!(
            locate_payload(&tree, root()).unwrap(),
            PayloadRoot::AddonsDir(PathBuf::from("/godot-foo-main/addons"))
        );
    }

    #[test]
    fn test_nested_addons_zip_sibling() {
        let tree = MemoryTree::new(&["wrapper/addons.zip"]).archive("wrapper/addons.zip");
        assert_eq!(
            locate_payload(&tree, root()).unwrap(),
            PayloadRoot::NestedArchive(PathBuf::from("/wrapper/addons.zip"))
        );
    }

    #[test]
    fn test_addons_file_that_is_an_archive() {
        let tree = MemoryTree::new(&["addons"]).archive("addons");
        assert_eq!(
            locate_payload(&tree, root()).unwrap(),
            PayloadRoot::NestedArchive(PathBuf::from("/addons"))
        );
    }

    #[test]
    fn test_sibling_archive_name_is_case_insensitive() {
        let tree = MemoryTree::new(&["Addons.ZIP"]).archive("Addons.ZIP");
        assert_eq!(
            locate_payload(&tree, root()).unwrap(),
            PayloadRoot::NestedArchive(PathBuf::from("/Addons.ZIP"))
        );
    }

    #[test]
    fn test_non_archive_addons_file_is_ignored() {
        let tree = MemoryTree::new(&["addons.zip", "docs/readme.txt"]);
        assert_eq!(locate_payload(&tree, root()).unwrap(), PayloadRoot::NotFound);
    }

    #[test]
    fn test_current_level_wins_over_deeper_levels() {
        let tree = MemoryTree::new(&["a/addons/Deep/x.gd", "addons/Top/y.gd"]);
        assert_eq!(
            locate_payload(&tree, root()).unwrap(),
            PayloadRoot::AddonsDir(PathBuf::from("/addons"))
        );
    }

    #[test]
    fn test_subdirectories_scanned_in_name_order() {
        let tree = MemoryTree::new(&["zeta/addons/Z/z.gd", "alpha/addons/A/a.gd"]);
        assert_eq!(
            locate_payload(&tree, root()).unwrap(),
            PayloadRoot::AddonsDir(PathBuf::from("/alpha/addons"))
        );
    }

    #[test]
    fn test_no_marker_anywhere() {
        let tree = MemoryTree::new(&["LICENSE", "README.md", "src/main.gd"]);
        assert_eq!(locate_payload(&tree, root()).unwrap(), PayloadRoot::NotFound);
    }

    #[test]
    fn test_fallback_unwraps_single_directory() {
        let tree = MemoryTree::new(&["my-plugin/plugin.cfg", "my-plugin/icon.png"]);
        assert_eq!(fallback_root(&tree, root()).unwrap(), PathBuf::from("/my-plugin"));
    }

    #[test]
    fn test_fallback_keeps_root_with_several_entries() {
        let tree = MemoryTree::new(&["LICENSE", "README.md", "src/"]);
        assert_eq!(fallback_root(&tree, root()).unwrap(), PathBuf::from("/"));

        let single_file = MemoryTree::new(&["plugin.gd"]);
        assert_eq!(fallback_root(&single_file, root()).unwrap(), PathBuf::from("/"));
    }
}
