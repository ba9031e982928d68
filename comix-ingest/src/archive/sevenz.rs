//! 7Z / CB7 adaptor
//!
//! 7z streams are solid, so each entry read walks the archive from the
//! start until it reaches the entry. Entry names are captured at open time.

use super::{check_archive_path, closed_handle, ArchiveAdaptor, ArchiveEntry, ArchiveHandle, ArchiveType};
use crate::error::{ArchiveError, BoxError};
use sevenz_rust::{Password, SevenZArchiveEntry, SevenZReader, SevenZWriter};
use std::io::Cursor;
use std::path::{Path, PathBuf};

fn cause(e: impl std::fmt::Display) -> BoxError {
    e.to_string().into()
}

pub struct SevenZipAdaptor;

impl ArchiveAdaptor for SevenZipAdaptor {
    fn archive_type(&self) -> ArchiveType {
        ArchiveType::SevenZip
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ArchiveHandle>, ArchiveError> {
        check_archive_path(path)?;
        let reader = SevenZReader::open(path, Password::empty())
            .map_err(|e| ArchiveError::open(path, cause(e)))?;

        let names = reader
            .archive()
            .files
            .iter()
            .filter(|entry| !entry.is_directory())
            .map(|entry| entry.name().to_string())
            .collect();

        Ok(Box::new(SevenZipHandle {
            path: path.to_path_buf(),
            names,
            open: true,
        }))
    }

    fn encode(&self, target: &Path, entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError> {
        let mut writer = SevenZWriter::new(Cursor::new(Vec::new()))
            .map_err(|e| ArchiveError::write(target, cause(e)))?;

        for entry in entries {
            let mut archive_entry = SevenZArchiveEntry::new();
            archive_entry.name = entry.name.clone();
            archive_entry.has_stream = !entry.content.is_empty();

            let source = archive_entry
                .has_stream
                .then(|| Cursor::new(entry.content.as_slice()));
            writer
                .push_archive_entry(archive_entry, source)
                .map_err(|e| ArchiveError::write(target, cause(e)))?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| ArchiveError::write(target, cause(e)))?;
        Ok(cursor.into_inner())
    }
}

struct SevenZipHandle {
    path: PathBuf,
    names: Vec<String>,
    open: bool,
}

impl ArchiveHandle for SevenZipHandle {
    fn path(&self) -> &Path {
        &self.path
    }

    fn entry_names(&mut self) -> Result<Vec<String>, ArchiveError> {
        if !self.open {
            return Err(closed_handle(&self.path, "*"));
        }
        Ok(self.names.clone())
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        if !self.open {
            return Err(closed_handle(&self.path, name));
        }
        if !self.names.iter().any(|n| n == name) {
            return Err(ArchiveError::entry_not_found(&self.path, name));
        }

        let mut reader = SevenZReader::open(&self.path, Password::empty())
            .map_err(|e| ArchiveError::entry_read(&self.path, name, cause(e)))?;

        let mut content = None;
        reader
            .for_each_entries(|entry, stream| {
                if entry.name() != name {
                    return Ok(true);
                }
                let mut buf = Vec::with_capacity(entry.size() as usize);
                stream.read_to_end(&mut buf)?;
                content = Some(buf);
                Ok(false)
            })
            .map_err(|e| ArchiveError::entry_read(&self.path, name, cause(e)))?;

        content.ok_or_else(|| ArchiveError::entry_not_found(&self.path, name))
    }

    fn close(&mut self) {
        self.open = false;
    }
}
