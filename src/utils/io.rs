//! File I/O primitives with consistent error handling.

use crate::error::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Read file contents with standardized error handling.
///
/// Wraps `fs::read_to_string` with consistent `Error::internal_io` formatting.
pub fn read_file(path: &Path, operation: &str) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Create a directory and its parents.
pub fn ensure_dir(path: &Path, operation: &str) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Create (or truncate) a file for writing.
pub fn create_file(path: &Path, operation: &str) -> Result<File> {
    File::create(path).map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Create a file that must not exist yet.
pub fn create_new_file(path: &Path, operation: &str) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Append text to an open file.
pub fn append(mut file: &File, content: &str, operation: &str) -> Result<()> {
    file.write_all(content.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn read_file_succeeds_for_existing_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "test content").unwrap();

        let content = read_file(temp.path(), "test read").unwrap();
        assert!(content.contains("test content"));
    }

    #[test]
    fn read_file_returns_error_for_missing_file() {
        let result = read_file(Path::new("/nonexistent/path.txt"), "test read");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }

    #[test]
    fn create_new_file_refuses_existing_path() {
        let temp = NamedTempFile::new().unwrap();
        let err = create_new_file(temp.path(), "test create").unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }

    #[test]
    fn append_adds_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let file = create_file(&path, "test create").unwrap();

        append(&file, "one\n", "test append").unwrap();
        append(&file, "two\n", "test append").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }
}
