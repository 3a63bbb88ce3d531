use std::path::{Component, Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::{DEFAULT_SETUP_FILE, SetupLoadError, SetupOptions};
use crate::fs::FileSystem;

const INCLUDE_KEY: &str = "include";
const SETUP_KEY: &str = "setup";

/// Suffix of the manifest template that accompanies a non-default setup document
pub const MANIFEST_TEMPLATE_SUFFIX: &str = ".MANIFEST.in";

/// A setup document with all of its includes merged in
#[derive(Debug, Clone, PartialEq)]
pub struct SetupDocument {
    path: PathBuf,
    sections: Mapping,
}

impl SetupDocument {
    /// Load `path` and, recursively, every document it includes
    ///
    /// # Errors
    ///
    /// Returns [`SetupLoadError`] if a document cannot be read or parsed, is not a mapping,
    /// or includes itself directly or indirectly.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self, SetupLoadError> {
        let path = normalize(path);
        let mut stack = Vec::new();
        let sections = load_merged(fs, &path, &mut stack)?;

        Ok(Self { path, sections })
    }

    /// Parse a single document from text, without resolving includes
    ///
    /// # Errors
    ///
    /// Returns [`SetupLoadError`] if the text is not a YAML mapping or has includes.
    pub fn from_yaml(path: impl Into<PathBuf>, text: &str) -> Result<Self, SetupLoadError> {
        let path = path.into();
        let sections = parse(&path, text)?;
        if sections.contains_key(INCLUDE_KEY) {
            return Err(SetupLoadError::Parse {
                path,
                message: "includes need a file system to resolve".to_string(),
            });
        }
        Ok(Self { path, sections })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The directory relative paths in this document are resolved against
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    /// The merged `setup` mapping (empty if the documents had none)
    #[must_use]
    pub fn setup(&self) -> Mapping {
        match self.sections.get(SETUP_KEY) {
            Some(Value::Mapping(setup)) => setup.clone(),
            _ => Mapping::new(),
        }
    }

    /// Deserialize the `setup` mapping into typed options
    ///
    /// # Errors
    ///
    /// Returns [`SetupLoadError::Options`] if a recognized option has the wrong shape.
    pub fn options(&self) -> Result<SetupOptions, SetupLoadError> {
        serde_yaml::from_value(Value::Mapping(self.setup())).map_err(|e| {
            SetupLoadError::Options {
                message: e.to_string(),
            }
        })
    }
}

impl SetupDocument {
    /// `<stem>.MANIFEST.in` next to this document, if the document is not the default one
    /// and the template exists
    #[must_use]
    pub fn matching_manifest_template(&self, fs: &dyn FileSystem) -> Option<PathBuf> {
        if self.path.file_name().is_some_and(|name| name == DEFAULT_SETUP_FILE) {
            return None;
        }
        let stem = self.path.file_stem()?.to_string_lossy();
        let template = self.base_dir().join(format!("{stem}{MANIFEST_TEMPLATE_SUFFIX}"));
        fs.is_file(&template).then_some(template)
    }

    /// Typed options, with the manifest template filled in from the document's neighbour
    /// when none is configured
    ///
    /// # Errors
    ///
    /// Same as [`Self::options`].
    pub fn project_options(&self, fs: &dyn FileSystem) -> Result<SetupOptions, SetupLoadError> {
        let mut options = self.options()?;
        if options.manifest_template.is_none() {
            options.manifest_template = self.matching_manifest_template(fs);
            if let Some(template) = &options.manifest_template {
                debug!(template = %template.display(), "Using the setup document's manifest template");
            }
        }
        Ok(options)
    }
}

fn parse(path: &Path, text: &str) -> Result<Mapping, SetupLoadError> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| SetupLoadError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let not_a_mapping = |section: &str| SetupLoadError::NotAMapping {
        path: path.to_path_buf(),
        section: section.to_string(),
    };

    let sections = match value {
        Value::Null => Mapping::new(),
        Value::Mapping(mapping) => mapping,
        _ => return Err(not_a_mapping("(document)")),
    };
    match sections.get(SETUP_KEY) {
        None | Some(Value::Mapping(_) | Value::Null) => Ok(sections),
        Some(_) => Err(not_a_mapping(SETUP_KEY)),
    }
}

fn load_merged(
    fs: &dyn FileSystem,
    path: &Path,
    stack: &mut Vec<PathBuf>,
) -> Result<Mapping, SetupLoadError> {
    if stack.iter().any(|p| p == path) {
        let mut chain = stack.clone();
        chain.push(path.to_path_buf());
        return Err(SetupLoadError::IncludeCycle { chain });
    }
    stack.push(path.to_path_buf());

    debug!(path = %path.display(), "Loading setup document");
    let text = fs.read_file(path).map_err(|source| SetupLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut own = parse(path, &text)?;

    let includes = match own.remove(INCLUDE_KEY) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(single)) => vec![single],
        Some(Value::Sequence(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(SetupLoadError::Parse {
                    path: path.to_path_buf(),
                    message: format!("include entries must be strings, got {other:?}"),
                }),
            })
            .collect::<Result<_, _>>()?,
        Some(other) => {
            return Err(SetupLoadError::Parse {
                path: path.to_path_buf(),
                message: format!("`include` must be a list of paths, got {other:?}"),
            });
        }
    };

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut merged = Mapping::new();
    for include in includes {
        let expanded = fs
            .expand_path(Path::new(&include))
            .map_err(|source| SetupLoadError::Read {
                path: PathBuf::from(&include),
                source,
            })?;
        let include_path = normalize(&base_dir.join(expanded));
        let included = load_merged(fs, &include_path, stack)?;
        merge_document(&mut merged, included);
    }
    merge_document(&mut merged, own);

    stack.pop();
    Ok(merged)
}

/// Top level: sections present on both sides are merged, anything else is replaced
fn merge_document(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Mapping(existing)), Value::Mapping(incoming)) => {
                merge_section(existing, incoming);
            }
            (Some(slot), value) => *slot = value,
            (None, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Section level: option values are replaced, except mappings which merge deeply
fn merge_section(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Mapping(existing)), Value::Mapping(incoming)) => {
                merge_nested(existing, incoming);
            }
            (Some(slot), value) => *slot = value,
            (None, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Inside a nested mapping, sequences are unioned instead of replaced
fn merge_nested(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Mapping(existing)), Value::Mapping(incoming)) => {
                merge_nested(existing, incoming);
            }
            (Some(Value::Sequence(existing)), Value::Sequence(incoming)) => {
                for item in incoming {
                    if !existing.contains(&item) {
                        existing.push(item);
                    }
                }
            }
            (Some(slot), value) => *slot = value,
            (None, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Lexically resolve `.` and `..` so the same file is recognised along different include paths
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                // `..` of the root is the root itself
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
