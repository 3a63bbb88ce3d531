//! Transactional record of every file a pipeline run creates or mutates
//!
//! A [`VirtualFileLedger`] keeps two registers. *Creations* are files that did not exist before
//! the run and must be deleted afterwards. *Modifications* are files that existed and whose
//! original bytes must be written back. A path lives in at most one register, at most once.
//!
//! Teardown is best-effort: a failure on one path is logged and recorded in the
//! [`TeardownReport`], and the remaining paths are still processed. Both registers are always
//! empty once teardown returns.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;
use tracing::{debug, warn};

use crate::fs::{FileSystem, FileSystemError};

/// Which register a path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Creation,
    Modification,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creation => write!(f, "removal"),
            Self::Modification => write!(f, "revert"),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    #[error("cannot register {}: already registered for {register}", path.display())]
    DuplicateRegistration { path: PathBuf, register: Register },

    #[error("precondition failed for {}: {reason}", path.display())]
    Precondition { path: PathBuf, reason: String },

    #[error("cannot create virtual file at {}: file already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("cannot modify {}: file does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("{} is not tracked by this ledger", path.display())]
    NotRegistered { path: PathBuf },

    #[error("ledger has already been used for a pipeline run")]
    Reused,

    #[error(transparent)]
    FileSystem(#[from] FileSystemError),
}

/// What happened to one path during teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownAction {
    Remove,
    Revert,
}

impl fmt::Display for TeardownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remove => write!(f, "remove"),
            Self::Revert => write!(f, "revert"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TeardownFailure {
    pub path: PathBuf,
    pub action: TeardownAction,
    pub error: FileSystemError,
}

/// Outcome of a (possibly partial) teardown
#[derive(Debug, Clone, Default)]
pub struct TeardownReport {
    pub removed: Vec<PathBuf>,
    pub reverted: Vec<PathBuf>,
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    /// True when every registered path was handled without error
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: Self) {
        self.removed.extend(other.removed);
        self.reverted.extend(other.reverted);
        self.failures.extend(other.failures);
    }

    #[must_use]
    pub fn touched(&self) -> usize {
        self.removed.len() + self.reverted.len()
    }
}

/// Ledger of virtual files for a single pipeline run
pub struct VirtualFileLedger {
    fs: Arc<dyn FileSystem>,
    creations: Vec<PathBuf>,
    modifications: Vec<(PathBuf, Vec<u8>)>,
    opened: bool,
}

impl fmt::Debug for VirtualFileLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualFileLedger")
            .field("creations", &self.creations)
            .field(
                "modifications",
                &self.modifications.iter().map(|(p, _)| p).collect::<Vec<_>>(),
            )
            .field("opened", &self.opened)
            .finish()
    }
}

impl VirtualFileLedger {
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            creations: Vec::new(),
            modifications: Vec::new(),
            opened: false,
        }
    }

    /// Claim the ledger for a pipeline run
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Reused`] if the ledger was already opened once.
    pub fn open(&mut self) -> Result<(), LedgerError> {
        if self.opened {
            return Err(LedgerError::Reused);
        }
        self.opened = true;
        Ok(())
    }

    #[must_use]
    pub fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    #[must_use]
    pub fn creations(&self) -> &[PathBuf] {
        &self.creations
    }

    pub fn modifications(&self) -> impl Iterator<Item = &Path> {
        self.modifications.iter().map(|(path, _)| path.as_path())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.creations.is_empty() && self.modifications.is_empty()
    }

    /// The register `path` is tracked in, if any
    #[must_use]
    pub fn register_of(&self, path: &Path) -> Option<Register> {
        if self.creations.iter().any(|p| p == path) {
            Some(Register::Creation)
        } else if self.modifications.iter().any(|(p, _)| p == path) {
            Some(Register::Modification)
        } else {
            None
        }
    }

    fn check_registrable(&self, path: &Path) -> Result<(), LedgerError> {
        if let Some(register) = self.register_of(path) {
            return Err(LedgerError::DuplicateRegistration {
                path: path.to_path_buf(),
                register,
            });
        }
        if !self.fs.path_exists(path) {
            return Err(LedgerError::Precondition {
                path: path.to_path_buf(),
                reason: "file does not exist".to_string(),
            });
        }
        if !self.fs.is_file(path) {
            return Err(LedgerError::Precondition {
                path: path.to_path_buf(),
                reason: "not a regular file".to_string(),
            });
        }
        Ok(())
    }

    /// Track an existing file for deletion at teardown
    ///
    /// # Errors
    ///
    /// Fails if the path is already tracked, or is not an existing regular file.
    pub fn register_creation(&mut self, path: &Path) -> Result<(), LedgerError> {
        self.check_registrable(path)?;
        debug!(path = %path.display(), "Registered virtual file for removal");
        self.creations.push(path.to_path_buf());
        Ok(())
    }

    /// Snapshot an existing file so its original bytes are restored at teardown
    ///
    /// # Errors
    ///
    /// Fails if the path is already tracked, is not an existing regular file, or cannot be read.
    pub fn register_modification(&mut self, path: &Path) -> Result<(), LedgerError> {
        self.check_registrable(path)?;
        let original = self.fs.read_bytes(path)?;
        debug!(
            path = %path.display(),
            bytes = original.len(),
            "Registered file for revert"
        );
        self.modifications.push((path.to_path_buf(), original));
        Ok(())
    }

    /// Write a brand new file and track it for deletion
    ///
    /// The parent directory must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AlreadyExists`] if anything is at `path` already.
    pub fn create_file(&mut self, path: &Path, content: &[u8]) -> Result<(), LedgerError> {
        if self.fs.path_exists(path) {
            return Err(LedgerError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !self.fs.is_dir(parent) {
                return Err(LedgerError::Precondition {
                    path: path.to_path_buf(),
                    reason: format!("parent directory {} does not exist", parent.display()),
                });
            }
        }
        self.fs.write_file(path, content)?;
        self.register_creation(path)
    }

    /// Overwrite an existing file, snapshotting its original bytes first
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if nothing is at `path`.
    pub fn modify_file(&mut self, path: &Path, content: &[u8]) -> Result<(), LedgerError> {
        if !self.fs.path_exists(path) {
            return Err(LedgerError::NotFound {
                path: path.to_path_buf(),
            });
        }
        self.register_modification(path)?;
        self.fs.write_file(path, content)?;
        Ok(())
    }

    /// Overwrite a file this ledger already tracks, keeping its original registration
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotRegistered`] if the path is in neither register.
    pub fn rewrite_registered(&mut self, path: &Path, content: &[u8]) -> Result<(), LedgerError> {
        if self.register_of(path).is_none() {
            return Err(LedgerError::NotRegistered {
                path: path.to_path_buf(),
            });
        }
        self.fs.write_file(path, content)?;
        Ok(())
    }

    /// Delete every created file, calling `on_each` before each deletion
    pub fn remove_all(&mut self, mut on_each: impl FnMut(&Path)) -> TeardownReport {
        let mut report = TeardownReport::default();

        for path in std::mem::take(&mut self.creations) {
            on_each(&path);
            match self.fs.remove_file(&path) {
                Ok(()) => report.removed.push(path),
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        %error,
                        "Failed to remove build-time created file, left on disk"
                    );
                    report.failures.push(TeardownFailure {
                        path,
                        action: TeardownAction::Remove,
                        error,
                    });
                }
            }
        }

        report
    }

    /// Restore every modified file to its original bytes, calling `on_each` first
    pub fn revert_all(&mut self, mut on_each: impl FnMut(&Path)) -> TeardownReport {
        let mut report = TeardownReport::default();

        for (path, original) in std::mem::take(&mut self.modifications) {
            on_each(&path);
            match self.fs.write_file(&path, &original) {
                Ok(()) => report.reverted.push(path),
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        %error,
                        "Failed to revert build-time modified file"
                    );
                    report.failures.push(TeardownFailure {
                        path,
                        action: TeardownAction::Revert,
                        error,
                    });
                }
            }
        }

        report
    }

    /// Remove all creations, then revert all modifications
    pub fn teardown_with(&mut self, mut on_each: impl FnMut(TeardownAction, &Path)) -> TeardownReport {
        let mut report = self.remove_all(|p| on_each(TeardownAction::Remove, p));
        report.merge(self.revert_all(|p| on_each(TeardownAction::Revert, p)));
        report
    }

    pub fn teardown(&mut self) -> TeardownReport {
        self.teardown_with(|_, _| {})
    }
}
