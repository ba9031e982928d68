//! Content hashing
//!
//! SHA-256, lowercase hex. Page hashes cover the entry bytes exactly as
//! stored in the archive; file hashes cover the whole archive file.

use crate::models::FileDetails;
use chrono::Utc;
use comix_common::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Hash of a page's byte content
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Hash and size of a file, read in 1 MB chunks
pub fn file_details(path: &Path) -> Result<FileDetails> {
    let mut file = File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {} for hashing: {}", path.display(), e),
        ))
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut size = 0u64;

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    Ok(FileDetails {
        hash: format!("{:x}", hasher.finalize()),
        size,
        created_at: Utc::now(),
    })
}

/// [`file_details`] on the blocking pool
pub async fn file_details_async(path: PathBuf) -> Result<FileDetails> {
    tracing::debug!(path = %path.display(), "Calculating archive hash");

    tokio::task::spawn_blocking(move || file_details(&path))
        .await
        .map_err(|e| Error::Internal(format!("Hash task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_content_hash_known_value() {
        assert_eq!(content_hash(b"hello"), HELLO_SHA256);
    }

    #[test]
    fn test_content_hash_is_lowercase_hex() {
        let hash = content_hash(&[0xFF; 100]);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[tokio::test]
    async fn test_file_details_matches_content_hash() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"hello").unwrap();
        temp_file.flush().unwrap();

        let details = file_details_async(temp_file.path().to_path_buf()).await.unwrap();
        assert_eq!(details.hash, HELLO_SHA256);
        assert_eq!(details.size, 5);
    }

    #[test]
    fn test_missing_file() {
        let result = file_details(Path::new("/nonexistent/comic.cbz"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
