//! Scaffolding for new libraries
//!
//! Lays down the smallest project the pipeline can package: a README, a setup document that
//! derives its version from version control, a version module carrying the development
//! placeholder and an empty package marker.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::fs::{FileSystem, FileSystemError};
use crate::setup::DEFAULT_SETUP_FILE;
use crate::version::{VERSION_MODULE_FILENAME, version_boilerplate};

static PACKAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

#[derive(Error, Debug, Clone)]
pub enum ScaffoldError {
    #[error("{} already exists and is not empty", path.display())]
    NotEmpty { path: PathBuf },

    #[error("{} exists and is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("invalid package name {name:?}: only letters, digits and underscores are allowed")]
    InvalidPackageName { name: String },

    #[error("library name must not be empty")]
    EmptyName,

    #[error("failed to render the setup document: {0}")]
    Render(String),

    #[error(transparent)]
    FileSystem(#[from] FileSystemError),
}

/// What to put into a new library
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaffoldRequest {
    /// Distribution name
    pub name: String,
    /// Top-level import package
    pub package: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub author_email: Option<String>,
}

impl ScaffoldRequest {
    /// A request whose import package is derived from the distribution name
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            package: default_package_name(name),
            ..Self::default()
        }
    }
}

/// The import package a distribution called `name` would normally use
#[must_use]
pub fn default_package_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Create a new library under `target`
///
/// `target` may be missing or an empty directory. Returns the files written, in order.
///
/// # Errors
///
/// Returns [`ScaffoldError`] if the request is invalid, `target` is not an empty directory,
/// or a file cannot be written.
pub fn scaffold(
    fs: &dyn FileSystem,
    target: &Path,
    request: &ScaffoldRequest,
) -> Result<Vec<PathBuf>, ScaffoldError> {
    if request.name.trim().is_empty() {
        return Err(ScaffoldError::EmptyName);
    }
    if !PACKAGE_NAME.is_match(&request.package) {
        return Err(ScaffoldError::InvalidPackageName {
            name: request.package.clone(),
        });
    }
    ensure_empty_target(fs, target)?;

    let package_dir = target.join(&request.package);
    fs.create_dir_all(&package_dir)?;

    let files = [
        (target.join("README.md"), readme(request)),
        (target.join(DEFAULT_SETUP_FILE), setup_document(request)?),
        (package_dir.join(VERSION_MODULE_FILENAME), version_boilerplate()),
        (package_dir.join("__init__.py"), String::new()),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (path, content) in files {
        debug!(path = %path.display(), "Writing scaffold file");
        fs.write_file(&path, content.as_bytes())?;
        written.push(path);
    }

    info!(name = %request.name, target = %target.display(), "Scaffolded new library");
    Ok(written)
}

fn ensure_empty_target(fs: &dyn FileSystem, target: &Path) -> Result<(), ScaffoldError> {
    if !fs.path_exists(target) {
        return Ok(());
    }
    if !fs.is_dir(target) {
        return Err(ScaffoldError::NotADirectory {
            path: target.to_path_buf(),
        });
    }
    if !fs.list_directory(target)?.is_empty() {
        return Err(ScaffoldError::NotEmpty {
            path: target.to_path_buf(),
        });
    }
    Ok(())
}

fn readme(request: &ScaffoldRequest) -> String {
    let mut text = format!("# {}\n", request.name.trim());
    if let Some(description) = &request.description {
        text.push('\n');
        text.push_str(description.trim());
        text.push('\n');
    }
    text
}

fn setup_document(request: &ScaffoldRequest) -> Result<String, ScaffoldError> {
    let mut setup = Mapping::new();
    let mut insert = |key: &str, value: Value| {
        setup.insert(Value::String(key.to_string()), value);
    };

    insert("name", Value::String(request.name.trim().to_string()));
    let optional = [
        ("description", &request.description),
        ("url", &request.url),
        ("author", &request.author),
        ("author_email", &request.author_email),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            insert(key, Value::String(value.clone()));
        }
    }
    insert(
        "version_sources",
        Value::Sequence(vec![Value::String(format!(
            "{}/{VERSION_MODULE_FILENAME}",
            request.package
        ))]),
    );
    insert("top_packages", Value::Sequence(vec![Value::String(request.package.clone())]));

    let mut document = Mapping::new();
    document.insert(Value::String("setup".to_string()), Value::Mapping(setup));

    serde_yaml::to_string(&Value::Mapping(document)).map_err(|e| ScaffoldError::Render(e.to_string()))
}
