//! Declarative project configuration (the setup document)
//!
//! A setup document is YAML with a `setup` mapping and an optional `include` list:
//!
//! ```yaml
//! include:
//!   - ../common.yml
//! setup:
//!   name: examplelib
//!   version_sources: [examplelib/version.py]
//!   console_scripts:
//!     example: examplelib.cli
//! ```
//!
//! Included documents are merged first, in order; the including document wins.

pub mod document;
pub mod options;

use std::path::PathBuf;

use thiserror::Error;

use crate::fs::FileSystemError;

pub use document::SetupDocument;
pub use options::{
    BundleHelperOptions, ConsoleScript, ConsoleScripts, FreezeSetting, LongDescription,
    SetupOptions,
};

/// Default name of the setup document in the project root
pub const DEFAULT_SETUP_FILE: &str = "quickpack.yml";

#[derive(Error, Debug, Clone)]
pub enum SetupLoadError {
    #[error("failed to read setup document {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: FileSystemError,
    },

    #[error("invalid YAML in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("{} must be a mapping at the top level and under `{section}`", path.display())]
    NotAMapping { path: PathBuf, section: String },

    #[error("include cycle: {}", format_chain(chain))]
    IncludeCycle { chain: Vec<PathBuf> },

    #[error("invalid setup options: {message}")]
    Options { message: String },
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
