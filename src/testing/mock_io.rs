//! Mock I/O helpers backed by temporary files.

use crate::field::Row;
use crate::format::TextFormat;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

/// A temporary file that is automatically deleted when dropped.
pub struct TempFilePath {
    #[allow(dead_code)]
    temp_file: NamedTempFile,
    path: PathBuf,
}

impl TempFilePath {
    /// Create a new temporary file.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created.
    pub fn new() -> std::io::Result<Self> {
        let temp_file = NamedTempFile::new()?;
        let path = temp_file.path().to_path_buf();
        Ok(Self { temp_file, path })
    }

    /// Create a new temporary file with a specific extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created.
    pub fn with_extension(extension: &str) -> std::io::Result<Self> {
        let temp_file = tempfile::Builder::new()
            .suffix(&format!(".{extension}"))
            .tempfile()?;
        let path = temp_file.path().to_path_buf();
        Ok(Self { temp_file, path })
    }

    /// Get the path to the temporary file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A temporary directory that is automatically deleted when dropped.
pub struct TempDirPath {
    #[allow(dead_code)]
    temp_dir: TempDir,
    path: PathBuf,
}

impl TempDirPath {
    /// Create a new temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().to_path_buf();
        Ok(Self { temp_dir, path })
    }

    /// Get the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a file path within this directory.
    #[must_use]
    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.path.join(filename)
    }
}

/// Create a temporary `.txt` file holding `content` verbatim.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created or written.
pub fn mock_text_file(content: impl AsRef<[u8]>) -> std::io::Result<TempFilePath> {
    let temp = TempFilePath::with_extension("txt")?;
    std::fs::write(temp.path(), content)?;
    Ok(temp)
}

/// Create a temporary `.txt` file holding `rows` encoded with `format`.
///
/// # Errors
///
/// Returns an error if the file cannot be written or a value cannot be encoded.
pub fn mock_rows_file(format: &TextFormat, rows: &[Row]) -> anyhow::Result<TempFilePath> {
    let temp = TempFilePath::with_extension("txt")?;
    crate::io::text::write_text_vec(format, temp.path(), rows)?;
    Ok(temp)
}

/// Read a file's contents as UTF-8 text for assertion.
///
/// # Errors
///
/// Returns an error if the read operation fails.
pub fn read_text_output(path: impl AsRef<Path>) -> std::io::Result<String> {
    std::fs::read_to_string(path)
}
