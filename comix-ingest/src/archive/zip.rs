//! ZIP / CBZ adaptor

use super::{check_archive_path, closed_handle, ArchiveAdaptor, ArchiveEntry, ArchiveHandle, ArchiveType};
use crate::error::ArchiveError;
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub struct ZipAdaptor;

impl ArchiveAdaptor for ZipAdaptor {
    fn archive_type(&self) -> ArchiveType {
        ArchiveType::Zip
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ArchiveHandle>, ArchiveError> {
        check_archive_path(path)?;
        let file = File::open(path).map_err(|e| ArchiveError::open(path, e))?;
        let archive = ZipArchive::new(file).map_err(|e| ArchiveError::open(path, e))?;

        Ok(Box::new(ZipHandle {
            path: path.to_path_buf(),
            archive: Some(archive),
        }))
    }

    fn encode(&self, target: &Path, entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in entries {
            writer
                .start_file(entry.name.as_str(), options)
                .map_err(|e| ArchiveError::write(target, e))?;
            writer
                .write_all(&entry.content)
                .map_err(|e| ArchiveError::write(target, e))?;
        }

        let cursor = writer.finish().map_err(|e| ArchiveError::write(target, e))?;
        Ok(cursor.into_inner())
    }
}

struct ZipHandle {
    path: PathBuf,
    archive: Option<ZipArchive<File>>,
}

impl ArchiveHandle for ZipHandle {
    fn path(&self) -> &Path {
        &self.path
    }

    fn entry_names(&mut self) -> Result<Vec<String>, ArchiveError> {
        let archive = self
            .archive
            .as_mut()
            .ok_or_else(|| closed_handle(&self.path, "*"))?;

        let mut names = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive
                .by_index_raw(index)
                .map_err(|e| ArchiveError::entry_read(&self.path, format!("#{}", index), e))?;
            if !file.is_dir() {
                names.push(file.name().to_string());
            }
        }
        Ok(names)
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        let archive = self
            .archive
            .as_mut()
            .ok_or_else(|| closed_handle(&self.path, name))?;

        let mut file = match archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => {
                return Err(ArchiveError::entry_not_found(&self.path, name))
            }
            Err(e) => return Err(ArchiveError::entry_read(&self.path, name, e)),
        };

        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)
            .map_err(|e| ArchiveError::entry_read(&self.path, name, e))?;
        Ok(content)
    }

    fn close(&mut self) {
        self.archive = None;
    }
}
