//! Text-level handling of version modules
//!
//! A version module is a source file holding a `__version__ = ...` line. In the source tree the
//! line points at the `DEV_VERSION` placeholder; during packaging it is stamped with a concrete
//! version and reset afterwards.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;

use super::{DEV_VERSION, VersionError};
use crate::fs::FileSystem;

/// File looked up when a version source names a directory
pub const VERSION_MODULE_FILENAME: &str = "version.py";

static VERSION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^__version__ = [^\r\n]*").expect("valid regex"));

static DEV_VERSION_CONSTANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^DEV_VERSION = ['"]([^'"]*)['"]\s*$"#).expect("valid regex")
});

static VERSION_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^__version__ = (?:['"]([^'"]*)['"]|(DEV_VERSION))\s*$"#)
        .expect("valid regex")
});

/// Resolve a version source to the module file it designates
///
/// Paths ending in `.py` are files; anything else is a directory holding `version.py`.
#[must_use]
pub fn resolve_module_path(root: &Path, source: &Path) -> PathBuf {
    let path = root.join(source);
    let is_module = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("py"));

    if is_module {
        path
    } else {
        path.join(VERSION_MODULE_FILENAME)
    }
}

/// Boilerplate for a version module that carries the development placeholder
#[must_use]
pub fn version_boilerplate() -> String {
    format!("# quickpack version boilerplate\nDEV_VERSION = \"{DEV_VERSION}\"\n__version__ = DEV_VERSION\n")
}

/// Replace every `__version__ = ...` line in `text` with the concrete `version`
///
/// Returns `None` when the text has no such line.
#[must_use]
pub fn stamp_version_text(text: &str, version: &str) -> Option<String> {
    if !VERSION_LINE.is_match(text) {
        return None;
    }
    let replacement = format!("__version__ = '{version}'");
    Some(
        VERSION_LINE
            .replace_all(text, regex::NoExpand(&replacement))
            .into_owned(),
    )
}

/// Point every `__version__ = ...` line in `text` back at `DEV_VERSION`
///
/// Returns `None` when the text has no such line.
#[must_use]
pub fn reset_version_text(text: &str) -> Option<String> {
    if !VERSION_LINE.is_match(text) {
        return None;
    }
    Some(
        VERSION_LINE
            .replace_all(text, "__version__ = DEV_VERSION")
            .into_owned(),
    )
}

/// Read the concrete version declared by a version module, without executing it
///
/// Handles both a quoted literal and the `DEV_VERSION` indirection.
///
/// # Errors
///
/// Returns [`VersionError::FileSystem`] if the module cannot be read, or
/// [`VersionError::MalformedVersionModule`] if no version can be resolved from it.
pub fn read_module_version(fs: &dyn FileSystem, path: &Path) -> Result<String, VersionError> {
    let text = fs.read_file(path)?;
    let malformed = || VersionError::MalformedVersionModule {
        path: path.to_path_buf(),
    };

    let caps = VERSION_VALUE.captures(&text).ok_or_else(malformed)?;
    if let Some(literal) = caps.get(1) {
        return Ok(literal.as_str().to_string());
    }

    DEV_VERSION_CONSTANT
        .captures(&text)
        .map(|c| c[1].to_string())
        .ok_or_else(malformed)
}
