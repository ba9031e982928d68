//! Services for comix-ingest

pub mod exporter;
pub mod file_scanner;
pub mod hashing;
pub mod ingestion;

pub use exporter::{ArchiveExporter, RecreatedArchive};
pub use file_scanner::{LibraryScanner, ScanError, ScannedArchive};
pub use ingestion::{IngestError, IngestSummary, LibraryImporter};
