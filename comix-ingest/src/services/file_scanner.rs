//! Library scanner
//!
//! Recursive comic archive discovery. Candidates are picked by extension
//! and kept only when their leading bytes carry an archive signature.

use crate::archive::ArchiveType;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Bytes needed to see every supported signature (tar magic sits at 257)
const SIGNATURE_LEN: u64 = 512;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("File access error {0}: {1}")]
    FileAccessError(PathBuf, String),
}

/// Archive found by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedArchive {
    pub path: PathBuf,
    pub archive_type: ArchiveType,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct LibraryScanner {
    ignore_patterns: Vec<String>,
    max_depth: Option<usize>,
}

impl LibraryScanner {
    /// Scanner with default ignore patterns
    ///
    /// Skips system files like .DS_Store, Thumbs.db, .git and macOS
    /// resource forks.
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
                "__MACOSX".to_string(),
            ],
            max_depth: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Archives under `root`, sorted by path
    ///
    /// Unreadable entries are logged and skipped.
    pub fn scan(&self, root: &Path) -> Result<Vec<ScannedArchive>, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let mut symlink_visited = HashSet::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .max_depth(self.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e, &mut symlink_visited));

        let mut candidates = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    if ArchiveType::from_extension(entry.path()).is_some() {
                        candidates.push(entry.into_path());
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Error accessing entry"),
            }
        }
        tracing::debug!(candidates = candidates.len(), root = %root.display(), "Library walk complete");

        let mut archives: Vec<ScannedArchive> = candidates
            .into_iter()
            .filter_map(|path| match self.verify(&path) {
                Ok(Some(found)) => Some(found),
                Ok(None) => {
                    tracing::debug!(path = %path.display(), "No archive signature, skipping");
                    None
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Error verifying file");
                    None
                }
            })
            .collect();
        archives.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::info!(archives = archives.len(), root = %root.display(), "Library scanned");
        Ok(archives)
    }

    fn should_process_entry(&self, entry: &DirEntry, symlink_visited: &mut HashSet<PathBuf>) -> bool {
        let file_name = entry.file_name().to_string_lossy();

        if self.ignore_patterns.iter().any(|p| file_name.contains(p.as_str())) {
            return false;
        }
        // AppleDouble files next to the real archive
        if entry.depth() > 0 && file_name.starts_with("._") {
            return false;
        }

        if entry.file_type().is_symlink() {
            if let Ok(canonical) = entry.path().canonicalize() {
                if !symlink_visited.insert(canonical) {
                    tracing::warn!(path = %entry.path().display(), "Symlink loop detected");
                    return false;
                }
            }
        }

        true
    }

    /// Archive type from the file's signature, None when it has none
    fn verify(&self, path: &Path) -> Result<Option<ScannedArchive>, ScanError> {
        let access = |e: std::io::Error| ScanError::FileAccessError(path.to_path_buf(), e.to_string());

        let file = File::open(path).map_err(access)?;
        let size = file.metadata().map_err(access)?.len();

        let mut signature = Vec::new();
        file.take(SIGNATURE_LEN)
            .read_to_end(&mut signature)
            .map_err(access)?;

        Ok(ArchiveType::from_signature(&signature).map(|archive_type| ScannedArchive {
            path: path.to_path_buf(),
            archive_type,
            size,
        }))
    }
}

impl Default for LibraryScanner {
    fn default() -> Self {
        Self::new()
    }
}
