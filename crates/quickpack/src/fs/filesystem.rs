//! File system port
//!
//! Writes never create parent directories; only scaffolding calls `create_dir_all`.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;

/// Port for file system operations (Hexagonal Architecture)
///
/// This trait abstracts file system operations to allow for different implementations
/// (real file system, mocks for testing) and to let the ledger's best-effort teardown be
/// tested against injected failures.
#[cfg_attr(any(test, feature = "with_mocks"), mockall::automock)]
pub trait FileSystem: Send + Sync {
    /// Read a file and return its contents as a UTF-8 string
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] if the file cannot be read or is not valid UTF-8.
    fn read_file(&self, path: &Path) -> Result<String, FileSystemError>;

    /// Read a file and return its raw bytes
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] if the file cannot be read.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FileSystemError>;

    /// Write data to a file, creating or truncating it
    ///
    /// The parent directory must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] if the file cannot be written.
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), FileSystemError>;

    /// Check if a path exists (file, directory or anything else)
    fn path_exists(&self, path: &Path) -> bool;

    /// Check if a path exists and is a regular file
    fn is_file(&self, path: &Path) -> bool;

    /// Check if a path exists and is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Delete a single file
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] if the file cannot be removed.
    fn remove_file(&self, path: &Path) -> Result<(), FileSystemError>;

    /// Delete a directory and everything below it
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] if the directory cannot be removed.
    fn remove_dir_all(&self, path: &Path) -> Result<(), FileSystemError>;

    /// Create a directory and all missing parents
    ///
    /// Only used outside of a pipeline run (scaffolding); steps never create directories.
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] if the directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> Result<(), FileSystemError>;

    /// List the entries of a directory, sorted by path
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] if the directory cannot be read.
    fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>, FileSystemError>;

    /// Expand a path with shell-like expansions (`~`)
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] if the home directory cannot be determined.
    fn expand_path(&self, path: &Path) -> Result<PathBuf, FileSystemError>;

    /// Get the directory holding the tool's own configuration file
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError::HomeDirNotFound`] if no configuration directory can be
    /// determined.
    fn config_dir(&self) -> Result<PathBuf, FileSystemError>;
}

/// Errors that can occur during file system operations
#[derive(Error, Debug, Clone)]
pub enum FileSystemError {
    /// IO error on a specific path
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// Home directory could not be determined
    #[error("Home directory not found")]
    HomeDirNotFound,
}

impl FileSystemError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source: Arc::new(source),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
impl MockFileSystem {
    /// Set up a mock for reading a file with specific content
    pub(crate) fn mock_read_file<P, S>(&mut self, path: P, content: S)
    where
        PathBuf: From<P>,
        S: ToString,
    {
        let path_buf = PathBuf::from(path);
        let content_string = content.to_string();
        self.expect_read_file()
            .with(mockall::predicate::eq(path_buf))
            .returning(move |_| Ok(content_string.clone()));
    }

    /// Set up a mock for reading raw bytes
    pub(crate) fn mock_read_bytes<P>(&mut self, path: P, content: &[u8])
    where
        PathBuf: From<P>,
    {
        let path_buf = PathBuf::from(path);
        let bytes = content.to_vec();
        self.expect_read_bytes()
            .with(mockall::predicate::eq(path_buf))
            .returning(move |_| Ok(bytes.clone()));
    }

    /// Set up a mock for path existence checking
    pub(crate) fn mock_path_exists<P>(&mut self, path: P, exists: bool)
    where
        PathBuf: From<P>,
    {
        self.expect_path_exists()
            .with(mockall::predicate::eq(PathBuf::from(path)))
            .returning(move |_| exists);
    }

    /// Set up a mock for regular-file checking
    pub(crate) fn mock_is_file<P>(&mut self, path: P, is_file: bool)
    where
        PathBuf: From<P>,
    {
        self.expect_is_file()
            .with(mockall::predicate::eq(PathBuf::from(path)))
            .returning(move |_| is_file);
    }

    /// Set up a mock for getting the configuration directory
    pub(crate) fn mock_config_dir_ok<P>(&mut self, path: P)
    where
        PathBuf: From<P>,
    {
        let p = PathBuf::from(path);
        self.expect_config_dir().return_once(|| Ok(p));
    }

    /// Set up a complete configuration file scenario: `config.yaml` present, `config.yml` absent
    pub(crate) fn mock_config_file(&mut self, config_dir: &Path, config_yaml: &str) {
        let config_dir_owned = PathBuf::from(config_dir);
        let config_path = config_dir.join("config.yaml");

        self.expect_config_dir()
            .return_once(|| Ok(config_dir_owned));
        self.mock_path_exists(&config_path, true);
        self.mock_read_file(&config_path, config_yaml);

        self.mock_path_exists(config_dir.join("config.yml"), false);
    }

    /// Set up a mock for path expansion
    pub(crate) fn mock_expand_path<P>(&mut self, input: P, output: P)
    where
        PathBuf: From<P>,
    {
        let input = PathBuf::from(input);
        let output = PathBuf::from(output);

        self.expect_expand_path()
            .with(mockall::predicate::eq(input))
            .return_once(|_| Ok(output));
    }
}
