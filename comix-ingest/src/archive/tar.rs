//! TAR / CBT adaptor
//!
//! Tar has no index; names are captured at open time and each read scans
//! the archive from the start.

use super::{check_archive_path, closed_handle, ArchiveAdaptor, ArchiveEntry, ArchiveHandle, ArchiveType};
use crate::error::ArchiveError;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::{Archive, Builder, Header};

pub struct TarAdaptor;

fn entry_names(path: &Path) -> std::io::Result<Vec<String>> {
    let mut archive = Archive::new(File::open(path)?);
    let mut names = Vec::new();

    for entry in archive.entries()? {
        let entry = entry?;
        if entry.header().entry_type().is_file() {
            names.push(entry.path()?.to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

impl ArchiveAdaptor for TarAdaptor {
    fn archive_type(&self) -> ArchiveType {
        ArchiveType::Tar
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ArchiveHandle>, ArchiveError> {
        check_archive_path(path)?;
        let names = entry_names(path).map_err(|e| ArchiveError::open(path, e))?;

        Ok(Box::new(TarHandle {
            path: path.to_path_buf(),
            names,
            open: true,
        }))
    }

    fn encode(&self, target: &Path, entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError> {
        let mut builder = Builder::new(Vec::new());

        for entry in entries {
            let mut header = Header::new_gnu();
            header.set_size(entry.content.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(chrono::Utc::now().timestamp().max(0) as u64);
            builder
                .append_data(&mut header, &entry.name, entry.content.as_slice())
                .map_err(|e| ArchiveError::write(target, e))?;
        }

        builder.into_inner().map_err(|e| ArchiveError::write(target, e))
    }
}

struct TarHandle {
    path: PathBuf,
    names: Vec<String>,
    open: bool,
}

impl TarHandle {
    fn find(&self, name: &str) -> std::io::Result<Option<Vec<u8>>> {
        let mut archive = Archive::new(File::open(&self.path)?);

        for entry in archive.entries()? {
            let mut entry = entry?;
            if entry.path()?.to_string_lossy() == name {
                let mut content = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut content)?;
                return Ok(Some(content));
            }
        }
        Ok(None)
    }
}

impl ArchiveHandle for TarHandle {
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

        match self.find(name) {
            Ok(Some(content)) => Ok(content),
            Ok(None) => Err(ArchiveError::entry_not_found(&self.path, name)),
            Err(e) => Err(ArchiveError::entry_read(&self.path, name, e)),
        }
    }

    fn close(&mut self) {
        self.open = false;
    }
}
