//! Utility functions for nudge.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{NudgeError, Result};

/// Maximum file size that can be read into memory (10 MB).
///
/// A goal file of years of check-ins stays far below this.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

/// Read a file into a string, refusing files over [`MAX_FILE_SIZE`].
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Read a file into a string with a custom size limit.
///
/// A missing file is a `Storage` error whose source has kind
/// `NotFound`, so callers can tell it apart with [`is_not_found`].
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| NudgeError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(NudgeError::storage(
            path,
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("file is too large ({} bytes, max {} bytes)", size, max_size),
            ),
        ));
    }

    fs::read_to_string(path).map_err(|e| NudgeError::storage(path, e))
}

/// Whether an error means "the file does not exist".
pub fn is_not_found(err: &NudgeError) -> bool {
    matches!(err, NudgeError::Storage { source, .. } if source.kind() == io::ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_read_to_string_limited_success() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("goals.json");
        fs::write(&path, "[]").unwrap();

        assert_eq!(read_to_string_limited(&path).unwrap(), "[]");
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.json");

        let err = read_to_string_limited(&path).unwrap_err();
        assert!(is_not_found(&err));
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_read_to_string_with_limit_exceeds() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("large.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(&[b'x'; 1000]).unwrap();

        let err = read_to_string_with_limit(&path, 500).unwrap_err();
        assert!(!is_not_found(&err));
        let message = err.to_string();
        assert!(message.contains("too large"));
        assert!(message.contains("1000 bytes"));
        assert!(message.contains("max 500 bytes"));
    }

    #[test]
    fn test_read_to_string_with_limit_at_boundary() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("boundary.json");
        fs::write(&path, "x".repeat(100)).unwrap();

        assert!(read_to_string_with_limit(&path, 100).is_ok());
        assert!(read_to_string_with_limit(&path, 99).is_err());
    }
}
