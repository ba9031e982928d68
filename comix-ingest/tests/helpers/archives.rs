//! Archive builders and readers for tests

use comix_ingest::archive::{ArchiveAdaptor, ArchiveAdaptors, ArchiveEntry, ArchiveType};
use std::path::Path;

/// Write an archive holding `entries` in the given order
pub fn write_test_archive(path: &Path, archive_type: ArchiveType, entries: &[(&str, Vec<u8>)]) {
    let entries: Vec<ArchiveEntry> = entries
        .iter()
        .map(|(name, content)| ArchiveEntry {
            name: name.to_string(),
            content: content.clone(),
        })
        .collect();

    let adaptors = ArchiveAdaptors::with_default_formats();
    let bytes = adaptors
        .get(archive_type)
        .unwrap()
        .encode(path, &entries)
        .unwrap();
    std::fs::write(path, bytes).unwrap();
}

/// Entry names in archive order
pub fn entry_names(path: &Path, archive_type: ArchiveType) -> Vec<String> {
    let mut archive = ArchiveAdaptors::with_default_formats()
        .open(archive_type, path)
        .unwrap();
    archive.entry_names().unwrap()
}

pub fn read_entry(path: &Path, archive_type: ArchiveType, name: &str) -> Vec<u8> {
    let mut archive = ArchiveAdaptors::with_default_formats()
        .open(archive_type, path)
        .unwrap();
    archive.read_entry(name).unwrap()
}
