//! Archive export
//!
//! Reads a comic's kept pages from its own archive and writes them back
//! out through the comic's adaptor, either to a new path or over the
//! source file.

use crate::archive::{publish_archive, renumbered_name, stage_archive, ArchiveLoader, PageContent, StagedArchive};
use crate::error::{ArchiveError, ExportError};
use crate::models::{Comic, Page, PageState, COMIC_INFO_ENTRY};
use std::path::Path;
use tracing::info;

/// Outcome of [`ArchiveExporter::recreate`]
#[derive(Debug)]
pub struct RecreatedArchive {
    /// Pages dropped from the comic, now in the removed state
    pub removed: Vec<Page>,
    /// New archive, still to be published over the comic's file
    pub staged: StagedArchive,
}

#[derive(Clone)]
pub struct ArchiveExporter {
    loader: ArchiveLoader,
    renumber: bool,
}

impl ArchiveExporter {
    pub fn new(loader: ArchiveLoader, renumber: bool) -> Self {
        Self { loader, renumber }
    }

    pub fn renumber(&self) -> bool {
        self.renumber
    }

    /// Bytes of every page not marked for deletion, in page order
    fn page_contents<'a>(&self, comic: &'a Comic) -> Result<Vec<PageContent<'a>>, ArchiveError> {
        let mut kept: Vec<&Page> = comic
            .pages
            .iter()
            .filter(|p| p.state == PageState::Stable)
            .collect();
        kept.sort_by_key(|p| p.page_number);

        let mut archive = self
            .loader
            .adaptors()
            .open(comic.archive_type, comic.path())?;

        kept.into_iter()
            .map(|page| {
                Ok(PageContent {
                    page,
                    content: archive.read_entry(&page.filename)?,
                })
            })
            .collect()
    }

    /// Archive bytes for the comic as it stands
    pub fn export_bytes(&self, comic: &Comic) -> Result<Vec<u8>, ArchiveError> {
        let pages = self.page_contents(comic)?;
        self.loader.adaptors().get(comic.archive_type)?.write_archive(
            comic.path(),
            comic.metadata.as_ref(),
            &pages,
            self.renumber,
        )
    }

    /// Write the comic to `target`, replacing any file already there
    pub fn export_to(&self, comic: &Comic, target: &Path) -> Result<(), ArchiveError> {
        let bytes = self.export_bytes(comic)?;
        publish_archive(target, &bytes)?;

        info!(comic_id = %comic.id, target = %target.display(), "Comic exported");
        Ok(())
    }

    /// Rebuild the comic's own archive without its marked pages
    ///
    /// The new archive is only staged; the file on disk changes when the
    /// caller publishes it. The comic is updated to describe the staged
    /// archive: marked pages are removed and returned, the rest are
    /// numbered 0..n and, when renumbering, renamed to match the entries
    /// written. On error the comic is left as it was.
    pub fn recreate(&self, comic: &mut Comic) -> Result<RecreatedArchive, ExportError> {
        let (staged, names) = {
            let pages = self.page_contents(comic)?;
            let bytes = self.loader.adaptors().get(comic.archive_type)?.write_archive(
                comic.path(),
                comic.metadata.as_ref(),
                &pages,
                self.renumber,
            )?;

            let width = pages.len().to_string().len().max(3);
            let names: Vec<String> = pages
                .iter()
                .enumerate()
                .map(|(index, p)| renumbered_name(index, width, &p.page.filename, &p.content))
                .collect();
            (stage_archive(comic.path(), &bytes)?, names)
        };

        let mut updated = comic.clone();
        let removed = updated.remove_marked_pages()?;

        if self.renumber {
            for (page, name) in updated.pages.iter_mut().zip(names) {
                page.filename = name;
            }
            if let Some(document) = updated.metadata.as_mut() {
                document.entry_name = COMIC_INFO_ENTRY.to_string();
            }
        }
        updated.touch();
        *comic = updated;

        info!(
            comic_id = %comic.id,
            pages = comic.pages.len(),
            removed = removed.len(),
            renumbered = self.renumber,
            "Archive staged for recreation"
        );
        Ok(RecreatedArchive { removed, staged })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::zip::ZipAdaptor;
    use crate::archive::{ArchiveAdaptor, ArchiveAdaptors, ArchiveEntry, ArchiveType};
    use crate::content::EntryLoaderRegistry;
    use std::sync::Arc;

    const GIF: &[u8] = b"GIF89a\x02\x00\x03\x00";
    const INFO: &[u8] = b"<?xml version=\"1.0\"?><ComicInfo><Series>Test</Series></ComicInfo>";

    fn loader() -> ArchiveLoader {
        ArchiveLoader::new(
            Arc::new(ArchiveAdaptors::with_default_formats()),
            Arc::new(EntryLoaderRegistry::with_default_loaders()),
        )
    }

    fn loaded_comic(dir: &Path, names: &[&str]) -> Comic {
        let path = dir.join("a.cbz");
        let mut entries = vec![ArchiveEntry {
            name: "ComicInfo.xml".to_string(),
            content: INFO.to_vec(),
        }];
        for name in names {
            entries.push(ArchiveEntry {
                name: name.to_string(),
                content: GIF.to_vec(),
            });
        }
        std::fs::write(&path, ZipAdaptor.encode(&path, &entries).unwrap()).unwrap();

        let mut comic = Comic::new(&path, ArchiveType::Zip);
        loader().load_all(&mut comic).unwrap();
        comic
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let mut archive = ArchiveAdaptors::with_default_formats()
            .open(ArchiveType::Zip, path)
            .unwrap();
        archive.entry_names().unwrap()
    }

    #[test]
    fn test_export_to_keeps_order_and_metadata_first() {
        let dir = tempfile::TempDir::new().unwrap();
        let comic = loaded_comic(dir.path(), &["000.gif", "001.gif"]);
        let target = dir.path().join("out.cbz");

        ArchiveExporter::new(loader(), false)
            .export_to(&comic, &target)
            .unwrap();

        assert_eq!(entry_names(&target), vec!["ComicInfo.xml", "000.gif", "001.gif"]);
    }

    #[test]
    fn test_recreate_drops_marked_pages_and_renumbers() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut comic = loaded_comic(dir.path(), &["a.gif", "b.gif", "c.gif"]);
        comic.pages[1].mark_for_deletion().unwrap();

        let recreated = ArchiveExporter::new(loader(), true)
            .recreate(&mut comic)
            .unwrap();
        recreated.staged.publish().unwrap();
        let removed = recreated.removed;

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].filename, "b.gif");
        assert_eq!(removed[0].state, PageState::Removed);
        assert!(comic.has_contiguous_pages());
        assert_eq!(comic.pages[0].filename, "000.gif");
        assert_eq!(comic.pages[1].filename, "001.gif");
        assert_eq!(
            entry_names(comic.path()),
            vec!["ComicInfo.xml", "000.gif", "001.gif"]
        );
    }

    #[test]
    fn test_recreate_leaves_file_alone_until_published() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut comic = loaded_comic(dir.path(), &["a.gif", "b.gif"]);
        comic.pages[0].mark_for_deletion().unwrap();
        let before = std::fs::read(comic.path()).unwrap();

        let recreated = ArchiveExporter::new(loader(), true)
            .recreate(&mut comic)
            .unwrap();
        assert_eq!(recreated.staged.target(), comic.path());
        assert_eq!(std::fs::read(comic.path()).unwrap(), before);

        // Abandoning the staged archive removes its temporary file
        drop(recreated);
        assert_eq!(std::fs::read(comic.path()).unwrap(), before);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_source_fails_without_changes() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut comic = loaded_comic(dir.path(), &["000.gif"]);
        comic.pages[0].mark_for_deletion().unwrap();
        std::fs::remove_file(comic.path()).unwrap();
        let before = comic.clone();

        let result = ArchiveExporter::new(loader(), false).recreate(&mut comic);

        assert!(matches!(result, Err(ExportError::Archive(ArchiveError::Open { .. }))));
        assert_eq!(comic, before);
    }
}
