//! Version derivation and version-module stamping
//!
//! - [`describe`] turns `git describe` output into a version string
//! - [`module`] reads and rewrites the `__version__` line of a version module
//! - [`source`] is the port that supplies the version for a packaging run

pub mod describe;
pub mod module;
pub mod source;

use std::path::PathBuf;

use thiserror::Error;

use crate::commands::CommandError;
use crate::fs::FileSystemError;

pub use describe::describe_to_version;
pub use module::{
    VERSION_MODULE_FILENAME, read_module_version, reset_version_text, resolve_module_path,
    stamp_version_text, version_boilerplate,
};
#[cfg(any(test, feature = "with_mocks"))]
pub use source::MockVersionSource;
pub use source::{FixedVersionSource, GitVersionSource, VersionSource};

/// Placeholder version carried by version modules in the source tree
pub const DEV_VERSION: &str = "0.0.0.dev0";

#[derive(Error, Debug, Clone)]
pub enum VersionError {
    #[error("version module {} has no `__version__ = ...` line", path.display())]
    MalformedVersionModule { path: PathBuf },

    #[error("failed to parse the 'git describe' output: {descriptor:?}")]
    UnparsableVersionDescriptor { descriptor: String },

    #[error("version control lookup failed: {0}")]
    Command(#[from] CommandError),

    #[error(transparent)]
    FileSystem(#[from] FileSystemError),
}
