//! Archive adaptors
//!
//! One adaptor per container format behind the same capability set:
//! open, enumerate entries, read an entry, close, and write a new archive.
//! Formats are picked by the comic's declared type or, at discovery time,
//! by file signature.

pub mod loader;
pub mod sevenz;
pub mod tar;
pub mod zip;

pub use loader::{ArchiveLoader, LoadSummary};

use crate::content::ContentClassifier;
use crate::error::ArchiveError;
use crate::models::{MetadataDocument, Page, PageState, COMIC_INFO_ENTRY};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Bytes needed to recognise every supported container
const SIGNATURE_LEN: usize = 512;

/// Container format of a comic archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveType {
    Zip,
    SevenZip,
    Tar,
}

impl ArchiveType {
    pub const ALL: [ArchiveType; 3] = [ArchiveType::Zip, ArchiveType::SevenZip, ArchiveType::Tar];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveType::Zip => "zip",
            ArchiveType::SevenZip => "sevenzip",
            ArchiveType::Tar => "tar",
        }
    }

    /// Comic-flavoured file extension
    pub fn comic_extension(&self) -> &'static str {
        match self {
            ArchiveType::Zip => "cbz",
            ArchiveType::SevenZip => "cb7",
            ArchiveType::Tar => "cbt",
        }
    }

    /// Detect from leading file bytes
    pub fn from_signature(bytes: &[u8]) -> Option<Self> {
        if infer::archive::is_zip(bytes) {
            Some(ArchiveType::Zip)
        } else if infer::archive::is_7z(bytes) {
            Some(ArchiveType::SevenZip)
        } else if infer::archive::is_tar(bytes) {
            Some(ArchiveType::Tar)
        } else {
            None
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "cbz" | "zip" => Some(ArchiveType::Zip),
            "cb7" | "7z" => Some(ArchiveType::SevenZip),
            "cbt" | "tar" => Some(ArchiveType::Tar),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zip" => Ok(ArchiveType::Zip),
            "sevenzip" | "7z" => Ok(ArchiveType::SevenZip),
            "tar" => Ok(ArchiveType::Tar),
            other => Err(format!("Unknown archive type: {}", other)),
        }
    }
}

/// Open archive owned by a single caller
pub trait ArchiveHandle: Send {
    fn path(&self) -> &Path;

    /// Entry names in archive-native order, directories excluded
    fn entry_names(&mut self) -> Result<Vec<String>, ArchiveError>;

    /// Entry bytes
    ///
    /// A failed read leaves the handle usable for further entries.
    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError>;

    /// Release the underlying file; safe to call more than once
    fn close(&mut self);
}

/// One page and its bytes, input to [`ArchiveAdaptor::write_archive`]
#[derive(Debug, Clone)]
pub struct PageContent<'a> {
    pub page: &'a Page,
    pub content: Vec<u8>,
}

/// Named entry of an archive about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub content: Vec<u8>,
}

/// Format-specific archive access
pub trait ArchiveAdaptor: Send + Sync {
    fn archive_type(&self) -> ArchiveType;

    /// Open an archive for reading
    ///
    /// Fails with [`ArchiveError::Open`] when the path is missing, is a
    /// directory, or holds a malformed container.
    fn open(&self, path: &Path) -> Result<Box<dyn ArchiveHandle>, ArchiveError>;

    /// Encode entries in the given order
    fn encode(&self, target: &Path, entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError>;

    /// Build archive bytes for a comic
    ///
    /// The metadata document comes first, then every page not marked for
    /// deletion in page-number order. `target` names the archive in errors.
    fn write_archive(
        &self,
        target: &Path,
        metadata: Option<&MetadataDocument>,
        pages: &[PageContent<'_>],
        renumber: bool,
    ) -> Result<Vec<u8>, ArchiveError> {
        let entries = plan_entries(metadata, pages, renumber)
            .map_err(|e| ArchiveError::write(target, e))?;
        debug!(
            target = %target.display(),
            format = %self.archive_type(),
            entries = entries.len(),
            renumber,
            "Writing archive"
        );
        self.encode(target, &entries)
    }
}

/// Ordered entry list for a new archive
pub fn plan_entries(
    metadata: Option<&MetadataDocument>,
    pages: &[PageContent<'_>],
    renumber: bool,
) -> Result<Vec<ArchiveEntry>, crate::models::ComicInfoError> {
    let mut kept: Vec<&PageContent<'_>> = pages
        .iter()
        .filter(|p| p.page.state == PageState::Stable)
        .collect();
    kept.sort_by_key(|p| p.page.page_number);

    let mut entries = Vec::with_capacity(kept.len() + 1);

    if let Some(document) = metadata {
        let name = if renumber {
            COMIC_INFO_ENTRY.to_string()
        } else {
            document.entry_name.clone()
        };
        entries.push(ArchiveEntry {
            name,
            content: document.content()?,
        });
    }

    let width = kept.len().to_string().len().max(3);
    for (index, page) in kept.into_iter().enumerate() {
        let name = if renumber {
            renumbered_name(index, width, &page.page.filename, &page.content)
        } else {
            page.page.filename.clone()
        };
        entries.push(ArchiveEntry {
            name,
            content: page.content.clone(),
        });
    }

    Ok(entries)
}

/// Canonical zero-padded page name, keeping the original extension
pub fn renumbered_name(index: usize, width: usize, original: &str, content: &[u8]) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .or_else(|| {
            ContentClassifier::new()
                .classify(content)
                .extension()
                .map(str::to_string)
        });

    match extension {
        Some(ext) => format!("{:0width$}.{}", index, ext, width = width),
        None => format!("{:0width$}", index, width = width),
    }
}

/// Archive bytes written next to their target but not yet visible there
///
/// Dropping it without [`StagedArchive::publish`] deletes the temporary
/// file and leaves the target untouched.
#[derive(Debug)]
pub struct StagedArchive {
    temp: tempfile::NamedTempFile,
    target: PathBuf,
}

impl StagedArchive {
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Replace the target with the staged bytes in one rename
    pub fn publish(self) -> Result<(), ArchiveError> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|e| ArchiveError::write(&target, e.error))?;
        debug!(path = %target.display(), "Archive published");
        Ok(())
    }
}

/// Write archive bytes to a temporary file beside `path`
pub fn stage_archive(path: &Path, bytes: &[u8]) -> Result<StagedArchive, ArchiveError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ArchiveError::write(path, e))?;
    temp.write_all(bytes).map_err(|e| ArchiveError::write(path, e))?;
    temp.as_file().sync_all().map_err(|e| ArchiveError::write(path, e))?;

    Ok(StagedArchive {
        temp,
        target: path.to_path_buf(),
    })
}

/// Write archive bytes over `path`
///
/// On failure the temporary file is removed and the target is left as it
/// was.
pub fn publish_archive(path: &Path, bytes: &[u8]) -> Result<(), ArchiveError> {
    stage_archive(path, bytes)?.publish()
}

/// Handle that closes itself when dropped
///
/// Scoped acquisition for every exit path, including early returns on
/// read errors.
pub struct OpenArchive {
    handle: Box<dyn ArchiveHandle>,
}

impl OpenArchive {
    pub fn new(handle: Box<dyn ArchiveHandle>) -> Self {
        Self { handle }
    }
}

impl Deref for OpenArchive {
    type Target = dyn ArchiveHandle;

    fn deref(&self) -> &Self::Target {
        self.handle.as_ref()
    }
}

impl DerefMut for OpenArchive {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.handle.as_mut()
    }
}

impl Drop for OpenArchive {
    fn drop(&mut self) {
        self.handle.close();
    }
}

/// Adaptors by archive type
#[derive(Clone)]
pub struct ArchiveAdaptors {
    adaptors: HashMap<ArchiveType, Arc<dyn ArchiveAdaptor>>,
}

impl ArchiveAdaptors {
    pub fn empty() -> Self {
        Self {
            adaptors: HashMap::new(),
        }
    }

    /// ZIP, 7Z and TAR
    pub fn with_default_formats() -> Self {
        let mut adaptors = Self::empty();
        adaptors.register(Arc::new(zip::ZipAdaptor));
        adaptors.register(Arc::new(sevenz::SevenZipAdaptor));
        adaptors.register(Arc::new(tar::TarAdaptor));
        adaptors
    }

    pub fn register(&mut self, adaptor: Arc<dyn ArchiveAdaptor>) {
        self.adaptors.insert(adaptor.archive_type(), adaptor);
    }

    pub fn get(&self, archive_type: ArchiveType) -> Result<&Arc<dyn ArchiveAdaptor>, ArchiveError> {
        self.adaptors
            .get(&archive_type)
            .ok_or_else(|| ArchiveError::UnsupportedFormat(archive_type.to_string()))
    }

    pub fn open(&self, archive_type: ArchiveType, path: &Path) -> Result<OpenArchive, ArchiveError> {
        let handle = self.get(archive_type)?.open(path)?;
        Ok(OpenArchive::new(handle))
    }

    /// Identify the container at `path`
    ///
    /// Signature first, extension as fallback.
    pub fn detect(&self, path: &Path) -> Result<ArchiveType, ArchiveError> {
        let signature = read_signature(path)?;

        let detected = ArchiveType::from_signature(&signature)
            .or_else(|| ArchiveType::from_extension(path))
            .ok_or_else(|| ArchiveError::UnsupportedFormat(path.display().to_string()))?;

        self.get(detected)?;
        Ok(detected)
    }
}

impl Default for ArchiveAdaptors {
    fn default() -> Self {
        Self::with_default_formats()
    }
}

fn read_signature(path: &Path) -> Result<Vec<u8>, ArchiveError> {
    if path.is_dir() {
        return Err(ArchiveError::open(path, "path is a directory"));
    }
    let file = File::open(path).map_err(|e| ArchiveError::open(path, e))?;

    let mut signature = Vec::with_capacity(SIGNATURE_LEN);
    file.take(SIGNATURE_LEN as u64)
        .read_to_end(&mut signature)
        .map_err(|e| ArchiveError::open(path, e))?;
    Ok(signature)
}

/// Reject paths that cannot hold an archive before handing them to a codec
pub(crate) fn check_archive_path(path: &Path) -> Result<(), ArchiveError> {
    let metadata = std::fs::metadata(path).map_err(|e| ArchiveError::open(path, e))?;
    if metadata.is_dir() {
        return Err(ArchiveError::open(path, "path is a directory"));
    }
    Ok(())
}

/// Error returned by reads on a closed handle
pub(crate) fn closed_handle(path: &Path, entry: &str) -> ArchiveError {
    ArchiveError::entry_read(path, entry, "archive handle is closed")
}
