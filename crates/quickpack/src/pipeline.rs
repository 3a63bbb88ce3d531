//! Assembling and running the ordered step pipeline
//!
//! - [`assembler`] turns setup options into an ordered list of steps plus a build context
//! - [`runner`] executes them and guarantees teardown of every virtual file

pub mod assembler;
pub mod runner;

use std::{fmt, path::Path, path::PathBuf};

use thiserror::Error;

use crate::fs::{FileSystem, FileSystemError};
use crate::setup::SetupLoadError;
use crate::steps::{StepError, StepId};
use crate::version::VersionError;

pub use assembler::{Collaborators, Pipeline, PipelineAssembler, step_order};
pub use runner::{PipelineError, PipelineRunner, RunSummary};

/// File whose presence in the project root marks an unpacked distribution
pub const PKG_INFO: &str = "PKG-INFO";

/// Whether the run produces a distribution or builds from one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackagingMode {
    /// Building a distribution from the source tree
    Packaging,
    /// Installing from an already built distribution
    AlreadyPackaged,
}

impl PackagingMode {
    #[must_use]
    pub fn detect(fs: &dyn FileSystem, root: &Path) -> Self {
        if fs.is_file(&root.join(PKG_INFO)) {
            Self::AlreadyPackaged
        } else {
            Self::Packaging
        }
    }
}

impl fmt::Display for PackagingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Packaging => write!(f, "packaging"),
            Self::AlreadyPackaged => write!(f, "already packaged"),
        }
    }
}

/// Problems found in the declared configuration, before any side effect
#[derive(Error, Debug, Clone)]
pub enum ConfigurationError {
    #[error(transparent)]
    Setup(#[from] SetupLoadError),

    #[error("`name` is required")]
    MissingName,

    #[error("`version` and `version_sources` are mutually exclusive; set only one")]
    VersionSourceConflict,

    #[error("either `version` or `version_sources` must be set")]
    MissingVersion,

    #[error("version source {} does not exist", path.display())]
    MissingVersionSource { path: PathBuf },

    #[error("failed to read the development version from {}: {source}", path.display())]
    DevVersion {
        path: PathBuf,
        #[source]
        source: VersionError,
    },

    #[error("console script {name:?} is declared more than once")]
    DuplicateConsoleScript { name: String },

    #[error("console script {name:?} must name a module, got {module:?}")]
    InvalidConsoleScript { name: String, module: String },

    #[error("invalid top package {name:?}: only letters, digits and underscores are allowed")]
    InvalidTopPackage { name: String },

    #[error("invalid manifest line {line:?}: must start with a directive or be a comment")]
    InvalidManifestLine { line: String },

    #[error("failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: FileSystemError,
    },
}

/// Failure to compute the host record without running the pipeline
#[derive(Error, Debug, Clone)]
pub enum MetadataError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("could not determine the version: {0}")]
    Version(#[from] VersionError),

    #[error("{step}: {source}")]
    Step {
        step: StepId,
        #[source]
        source: StepError,
    },
}
