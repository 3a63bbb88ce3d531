//! Locked libraries: a companion distribution that pins a target release and its dependency tree
//!
//! The `lock` section of the setup document describes the companion:
//!
//! ```yaml
//! setup:
//!   name: examplelib
//!   version_sources: [examplelib/version.py]
//! lock:
//!   target:
//!     name: examplelib
//!     version: 1.2.0
//!   _template:
//!     name: "%(name)s-locked"
//!     description: "%(name)s %(version)s, locked %(human_timestamp)s"
//!   url: https://example.com/examplelib
//! ```
//!
//! `_template` values are expanded with `%(key)s` placeholders over the scalar `setup`
//! values plus `version`, `human_timestamp` and `dateTtime`. Unknown keys expand to
//! `undefined`. Plain keys of the section are taken as-is and win over template results.

use std::{collections::BTreeMap, path::PathBuf};

use chrono::NaiveDateTime;
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::requirements::{LookupError, PackageIndex, Requirement, normalize_name, resolve};
use crate::setup::{FreezeSetting, SetupDocument, SetupOptions};
use crate::version::{VersionError, VersionSource};

pub const LOCK_SECTION: &str = "lock";

/// Format accepted for explicit lock timestamps, also exposed as `dateTtime`
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Format of the `human_timestamp` template variable
pub const HUMAN_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TARGET_KEY: &str = "target";
const TEMPLATE_KEY: &str = "_template";
const UNDEFINED: &str = "undefined";

#[derive(Error, Debug, Clone)]
pub enum LockError {
    #[error("{} has no `lock` section", path.display())]
    MissingSection { path: PathBuf },

    #[error("`lock` must be a mapping")]
    NotAMapping,

    #[error("invalid `lock.target`: {message}")]
    InvalidTarget { message: String },

    #[error("invalid template for `{key}`: {message}")]
    Template { key: String, message: String },

    #[error("no target name; set `lock.target.name` or `setup.name`")]
    MissingTarget,

    #[error("the locked library needs a `name`")]
    MissingName,

    #[error("the locked library must be named differently from its target {name:?}")]
    SameName { name: String },

    #[error("invalid locked setup options: {message}")]
    Options { message: String },

    #[error("could not determine the target version: {0}")]
    Version(#[from] VersionError),

    #[error("failed to resolve {target}: {source}")]
    Resolve {
        target: String,
        #[source]
        source: LookupError,
    },
}

/// Parse a `--timestamp` value written as `20240131T235959`
///
/// # Errors
///
/// Returns the chrono parse error when `text` does not follow [`TIMESTAMP_FORMAT`].
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
}

/// The release being locked; both fields fall back to the `setup` section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockTarget {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// The `lock` section of a setup document
#[derive(Debug, Clone, PartialEq)]
pub struct LockSection {
    target: LockTarget,
    template: Vec<(String, String)>,
    values: Mapping,
}

impl LockSection {
    /// Read the `lock` section, if the document has one
    ///
    /// # Errors
    ///
    /// Returns [`LockError`] if the section, its target or its template is malformed.
    pub fn from_document(document: &SetupDocument) -> Result<Option<Self>, LockError> {
        match document.section(LOCK_SECTION) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Mapping(section)) => Self::from_mapping(section.clone()).map(Some),
            Some(_) => Err(LockError::NotAMapping),
        }
    }

    fn from_mapping(mut values: Mapping) -> Result<Self, LockError> {
        let target = match values.remove(TARGET_KEY) {
            None | Some(Value::Null) => LockTarget::default(),
            Some(Value::Mapping(target)) => LockTarget {
                name: target_field(&target, "name")?,
                version: target_field(&target, "version")?,
            },
            Some(other) => {
                return Err(LockError::InvalidTarget {
                    message: format!("expected a mapping, got {other:?}"),
                });
            }
        };

        let template = match values.remove(TEMPLATE_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Mapping(template)) => template
                .into_iter()
                .map(|(key, value)| {
                    let key = scalar_text(&key).unwrap_or_else(|| format!("{key:?}"));
                    match value {
                        Value::String(expr) => Ok((key, expr)),
                        other => Err(LockError::Template {
                            key,
                            message: format!("expected a string, got {other:?}"),
                        }),
                    }
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(LockError::Template {
                    key: TEMPLATE_KEY.to_string(),
                    message: format!("expected a mapping, got {other:?}"),
                });
            }
        };

        Ok(Self {
            target,
            template,
            values,
        })
    }

    #[must_use]
    pub fn target(&self) -> &LockTarget {
        &self.target
    }

    /// Expand the template over `variables` and overlay the plain keys
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Template`] for a malformed placeholder.
    pub fn expand(&self, variables: &BTreeMap<String, String>) -> Result<Mapping, LockError> {
        let mut expanded = Mapping::new();
        for (key, expr) in &self.template {
            let value = interpolate(expr, variables).map_err(|message| LockError::Template {
                key: key.clone(),
                message,
            })?;
            expanded.insert(Value::String(key.clone()), Value::String(value));
        }
        for (key, value) in &self.values {
            expanded.insert(key.clone(), value.clone());
        }
        Ok(expanded)
    }

    /// Setup options for the companion library of `target_name`
    ///
    /// The companion ships no packages of its own and depends on exactly `requirements`.
    /// Without an explicit `version` it takes the target's version.
    ///
    /// # Errors
    ///
    /// Returns [`LockError`] if the expansion fails, the companion has no name or shares
    /// the target's name, or the options have the wrong shape.
    pub fn locked_options(
        &self,
        variables: &BTreeMap<String, String>,
        target_name: &str,
        target_version: &str,
        requirements: Vec<String>,
    ) -> Result<SetupOptions, LockError> {
        let values = self.expand(variables)?;
        let name = values
            .get("name")
            .and_then(scalar_text)
            .filter(|n| !n.trim().is_empty())
            .ok_or(LockError::MissingName)?;
        if normalize_name(&name) == normalize_name(target_name) {
            return Err(LockError::SameName { name });
        }

        let mut options: SetupOptions = serde_yaml::from_value(Value::Mapping(values))
            .map_err(|e| LockError::Options {
                message: e.to_string(),
            })?;
        options.packages = Some(Vec::new());
        options.top_packages = None;
        options.auto_discover_packages = false;
        options.install_requires = requirements;
        options.use_requirements_file = false;
        options.requirements_files = None;
        options.freeze_requirements = FreezeSetting::default();
        options.version_sources.clear();
        options.require_existing_version_sources = false;
        if options.version.is_none() {
            options.version = Some(target_version.to_string());
        }
        options.metadata.insert(
            "extras_require".to_string(),
            serde_json::Value::Object(serde_json::Map::new()),
        );
        Ok(options)
    }
}

fn target_field(target: &Mapping, key: &str) -> Result<Option<String>, LockError> {
    match target.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_text(value)
            .map(Some)
            .ok_or_else(|| LockError::InvalidTarget {
                message: format!("`{key}` must be a scalar, got {value:?}"),
            }),
    }
}

/// Text of a scalar the way a Python `%s` would print it
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        _ => None,
    }
}

/// Variables available to `_template`: scalar `setup` values, then the lock's own
#[must_use]
pub fn template_variables(
    setup: &Mapping,
    target_version: &str,
    timestamp: NaiveDateTime,
) -> BTreeMap<String, String> {
    let mut variables: BTreeMap<String, String> = setup
        .iter()
        .filter_map(|(key, value)| Some((scalar_text(key)?, scalar_text(value)?)))
        .collect();
    variables.insert(
        "human_timestamp".to_string(),
        timestamp.format(HUMAN_TIMESTAMP_FORMAT).to_string(),
    );
    variables.insert(
        "dateTtime".to_string(),
        timestamp.format(TIMESTAMP_FORMAT).to_string(),
    );
    variables.insert("version".to_string(), target_version.to_string());
    variables
}

/// Expand `%(key)s` placeholders; `%%` is a literal percent sign
///
/// # Errors
///
/// Returns a message for an unclosed placeholder or a conversion other than `s`.
pub fn interpolate(template: &str, variables: &BTreeMap<String, String>) -> Result<String, String> {
    let mut expanded = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('%') {
        expanded.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        if let Some(tail) = after.strip_prefix('%') {
            expanded.push('%');
            rest = tail;
            continue;
        }
        let Some(named) = after.strip_prefix('(') else {
            return Err(format!("expected `%(name)s` at {:?}", &rest[pos..]));
        };
        let Some(close) = named.find(')') else {
            return Err(format!("unclosed placeholder {:?}", &rest[pos..]));
        };
        let key = &named[..close];
        let Some(tail) = named[close + 1..].strip_prefix('s') else {
            return Err(format!("placeholder `%({key})` must end in `s`"));
        };
        expanded.push_str(variables.get(key).map_or(UNDEFINED, String::as_str));
        rest = tail;
    }
    expanded.push_str(rest);

    Ok(expanded)
}

/// What to lock, beyond the setup document
#[derive(Debug, Clone)]
pub struct LockRequest {
    /// Target version, ahead of `lock.target.version` and `setup.version`
    pub version: Option<String>,
    pub timestamp: NaiveDateTime,
    /// Admit pre-releases anywhere in the dependency tree
    pub prereleases: bool,
}

/// A resolved lock, ready to be packaged with the ordinary pipeline
#[derive(Debug, Clone)]
pub struct LockPlan {
    pub target_name: String,
    pub target_version: String,
    /// Pinned requirement lines, the target itself included
    pub requirements: Vec<String>,
    pub options: SetupOptions,
}

/// Resolve the target release and build the companion's setup options
///
/// The target version is the first of: the request, `lock.target.version`, `setup.version`,
/// then `versions`.
///
/// # Errors
///
/// Returns [`LockError`] if the document has no usable `lock` section, the target cannot be
/// resolved against `index`, or the companion options are invalid.
pub fn plan_lock(
    document: &SetupDocument,
    request: &LockRequest,
    versions: &dyn VersionSource,
    index: &dyn PackageIndex,
) -> Result<LockPlan, LockError> {
    let section = LockSection::from_document(document)?.ok_or_else(|| LockError::MissingSection {
        path: document.path().to_path_buf(),
    })?;
    let setup = document.setup();

    let target_name = section
        .target
        .name
        .clone()
        .or_else(|| setup.get("name").and_then(scalar_text))
        .ok_or(LockError::MissingTarget)?;
    let target_version = match request
        .version
        .clone()
        .or_else(|| section.target.version.clone())
        .or_else(|| setup.get("version").and_then(scalar_text))
    {
        Some(version) => version,
        None => versions.version()?,
    };
    info!(target = %target_name, version = %target_version, "Locking");

    let core = format!("{target_name}=={target_version}");
    let root: Requirement = core.parse().map_err(|e| LockError::InvalidTarget {
        message: format!("{e}"),
    })?;
    let requirements: Vec<String> = resolve(&[root], index, request.prereleases)
        .map_err(|source| LockError::Resolve {
            target: core.clone(),
            source,
        })?
        .iter()
        .map(ToString::to_string)
        .collect();
    debug!(requirements = ?requirements, "Concrete requirements");

    let variables = template_variables(&setup, &target_version, request.timestamp);
    let options =
        section.locked_options(&variables, &target_name, &target_version, requirements.clone())?;

    Ok(LockPlan {
        target_name,
        target_version,
        requirements,
        options,
    })
}
