//! Full-archive and single-entry loads
//!
//! Adaptor I/O failures abort and propagate. Loader failures for one entry
//! are logged and the load moves on to the next entry.

use super::{ArchiveAdaptors, ArchiveType, OpenArchive};
use crate::content::{DispatchOutcome, EntryLoaderRegistry};
use crate::error::ArchiveError;
use crate::models::Comic;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counts from a full-archive load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub entries: usize,
    pub loaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Reads archives into comics through the entry loader registry
#[derive(Clone)]
pub struct ArchiveLoader {
    adaptors: Arc<ArchiveAdaptors>,
    registry: Arc<EntryLoaderRegistry>,
}

impl ArchiveLoader {
    pub fn new(adaptors: Arc<ArchiveAdaptors>, registry: Arc<EntryLoaderRegistry>) -> Self {
        Self { adaptors, registry }
    }

    pub fn adaptors(&self) -> &ArchiveAdaptors {
        &self.adaptors
    }

    /// Replace the comic's pages and metadata with the archive's contents
    ///
    /// Entries are visited in lexicographic name order so page numbering
    /// is stable across reads of an unchanged archive. The comic is only
    /// updated when the whole archive was read.
    pub fn load_all(&self, comic: &mut Comic) -> Result<LoadSummary, ArchiveError> {
        let mut archive = self.adaptors.open(comic.archive_type, comic.path())?;

        let mut names = archive.entry_names()?;
        names.sort();

        let mut loaded = comic.clone();
        loaded.clear_contents();
        let mut summary = LoadSummary {
            entries: names.len(),
            ..Default::default()
        };

        for name in &names {
            let content = archive.read_entry(name)?;

            match self.registry.dispatch(&mut loaded, name, &content) {
                Ok(DispatchOutcome::Loaded { .. }) => summary.loaded += 1,
                Ok(DispatchOutcome::Skipped { content_type }) => {
                    debug!(entry = %name, content_type = %content_type, "No loader for entry");
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!(
                        comic_id = %comic.id,
                        entry = %name,
                        error = %e,
                        "Entry load failed, skipping"
                    );
                    summary.failed += 1;
                }
            }
        }
        archive.close();

        loaded.metadata_read = true;
        loaded.touch();
        *comic = loaded;

        info!(
            comic_id = %comic.id,
            path = %comic.path().display(),
            entries = summary.entries,
            pages = comic.pages.len(),
            failed = summary.failed,
            "Archive loaded"
        );
        Ok(summary)
    }

    /// Bytes of one entry, opening and closing the archive within the call
    pub fn load_one(
        &self,
        archive_type: ArchiveType,
        path: &Path,
        entry_name: &str,
    ) -> Result<Vec<u8>, ArchiveError> {
        let mut archive: OpenArchive = self.adaptors.open(archive_type, path)?;
        archive.read_entry(entry_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveAdaptor, ArchiveEntry};
    use crate::archive::zip::ZipAdaptor;

    const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00";

    fn loader() -> ArchiveLoader {
        ArchiveLoader::new(
            Arc::new(ArchiveAdaptors::with_default_formats()),
            Arc::new(EntryLoaderRegistry::with_default_loaders()),
        )
    }

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let entries: Vec<ArchiveEntry> = entries
            .iter()
            .map(|(name, content)| ArchiveEntry {
                name: name.to_string(),
                content: content.to_vec(),
            })
            .collect();
        std::fs::write(path, ZipAdaptor.encode(path, &entries).unwrap()).unwrap();
    }

    #[test]
    fn test_load_all_sorts_and_skips_bad_entries() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.cbz");
        write_zip(
            &path,
            &[
                ("002.gif", GIF),
                ("000.gif", GIF),
                ("notes.txt", b"hello"),
                ("broken.xml", b"<rss/>"),
                ("001.gif", GIF),
            ],
        );
        let mut comic = Comic::new(&path, ArchiveType::Zip);

        let summary = loader().load_all(&mut comic).unwrap();

        assert_eq!(summary, LoadSummary { entries: 5, loaded: 3, skipped: 1, failed: 1 });
        let names: Vec<&str> = comic.pages.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, vec!["000.gif", "001.gif", "002.gif"]);
        assert!(comic.has_contiguous_pages());
        assert!(comic.metadata_read);
        assert!(comic.metadata.is_none());
    }

    #[test]
    fn test_reload_replaces_pages() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.cbz");
        write_zip(&path, &[("000.gif", GIF)]);
        let mut comic = Comic::new(&path, ArchiveType::Zip);
        let loader = loader();

        loader.load_all(&mut comic).unwrap();
        loader.load_all(&mut comic).unwrap();

        assert_eq!(comic.pages.len(), 1);
    }

    #[test]
    fn test_open_failure_leaves_comic_untouched() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut comic = Comic::new(dir.path().join("missing.cbz"), ArchiveType::Zip);
        comic.push_page("keep.jpg");

        let result = loader().load_all(&mut comic);

        assert!(matches!(result, Err(ArchiveError::Open { .. })));
        assert_eq!(comic.pages.len(), 1);
        assert!(!comic.metadata_read);
    }

    #[test]
    fn test_load_one() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.cbz");
        write_zip(&path, &[("000.gif", GIF)]);

        let loader = loader();
        assert_eq!(loader.load_one(ArchiveType::Zip, &path, "000.gif").unwrap(), GIF);
        assert!(matches!(
            loader.load_one(ArchiveType::Zip, &path, "404.gif"),
            Err(ArchiveError::EntryRead { .. })
        ));
    }
}
