//! The mutable record threaded through one pipeline run

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::host::HostRecord;
use crate::ledger::TeardownReport;
use crate::manifest::{ManifestMode, ManifestRewriter};
use crate::pipeline::{ConfigurationError, PackagingMode};
use crate::setup::{ConsoleScript, LongDescription, SetupOptions};
use crate::steps::scripts::{ScriptHook, plan_script_hooks};
use crate::version::{read_module_version, resolve_module_path};

/// Directories never searched for packages
const SKIPPED_DIRECTORIES: &[&str] = &["__pycache__", "build", "dist", "node_modules"];

/// State shared by the steps of a single run
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub root: PathBuf,
    pub mode: PackagingMode,
    pub name: String,
    /// Concrete version; stamped during packaging, read from the version module otherwise
    pub version: Option<String>,
    /// Resolved version module files
    pub version_modules: Vec<PathBuf>,
    pub packages: Vec<String>,
    pub console_scripts: Vec<ConsoleScript>,
    pub script_hooks: Vec<ScriptHook>,
    /// Computed `name=module:function` console entry points
    pub entry_points: Vec<String>,
    pub manifest: ManifestRewriter,
    pub install_requires: Vec<String>,
    pub long_description: Option<String>,
    pub long_description_content_type: Option<String>,
    pub include_package_data: bool,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// What teardown did, filled in by the final step
    pub teardown: TeardownReport,
}

impl BuildContext {
    /// Build the context for `options`, reading the project tree where needed
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the name is missing, a file named by the options
    /// cannot be read, or the development version cannot be determined.
    pub fn prepare(
        fs: &dyn FileSystem,
        root: &Path,
        options: &SetupOptions,
        mode: PackagingMode,
    ) -> Result<Self, ConfigurationError> {
        let name = options
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .ok_or(ConfigurationError::MissingName)?;

        let version_modules: Vec<PathBuf> = options
            .version_sources
            .iter()
            .map(|source| resolve_module_path(root, source))
            .collect();

        let version = match (&options.version, version_modules.first(), mode) {
            (Some(fixed), _, _) => Some(fixed.clone()),
            (None, Some(module), PackagingMode::AlreadyPackaged) => {
                Some(read_module_version(fs, module).map_err(|source| {
                    ConfigurationError::DevVersion {
                        path: module.clone(),
                        source,
                    }
                })?)
            }
            (None, _, _) => None,
        };

        let packages = match &options.packages {
            Some(explicit) => explicit.clone(),
            None if options.top_packages.is_some() || options.auto_discover_packages => {
                let found = discover_packages(fs, root, options.top_packages.as_deref())?;
                info!(packages = ?found, "Auto-discovered packages");
                found
            }
            None => Vec::new(),
        };

        let (long_description, long_description_content_type) = match &options.long_description {
            Some(LongDescription::Text(text)) => (Some(text.clone()), None),
            Some(LongDescription::File {
                filename,
                content_type,
            }) => {
                let path = root.join(filename);
                let text = fs
                    .read_file(&path)
                    .map_err(|source| ConfigurationError::Unreadable { path, source })?;
                (Some(text), Some(content_type.clone()))
            }
            None => (None, None),
        };

        let console_scripts = options.console_scripts.0.clone();
        let script_hooks = plan_script_hooks(&console_scripts);
        let entry_points = script_hooks.iter().map(ScriptHook::entry_point).collect();

        let mode_for_manifest = if options.manifest.is_some() {
            ManifestMode::Replace
        } else {
            ManifestMode::Append
        };

        Ok(Self {
            root: root.to_path_buf(),
            mode,
            name,
            version,
            version_modules,
            packages,
            console_scripts,
            script_hooks,
            entry_points,
            manifest: ManifestRewriter::new(root.join(&options.manifest_path), mode_for_manifest)
                .with_template(options.manifest_template.as_ref().map(|t| root.join(t))),
            install_requires: options.install_requires.clone(),
            long_description,
            long_description_content_type,
            include_package_data: options.include_package_data,
            metadata: options.metadata.clone(),
            teardown: TeardownReport::default(),
        })
    }

    /// Resolve a project-relative path
    #[must_use]
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// The configuration record handed to the host toolchain
    ///
    /// Returns `None` while no version is known.
    #[must_use]
    pub fn host_record(&self) -> Option<HostRecord> {
        let version = self.version.clone()?;
        let mut entry_points = BTreeMap::new();
        if !self.entry_points.is_empty() {
            entry_points.insert("console_scripts".to_string(), self.entry_points.clone());
        }

        Some(HostRecord {
            name: self.name.clone(),
            version,
            packages: self.packages.clone(),
            install_requires: self.install_requires.clone(),
            entry_points,
            include_package_data: self.include_package_data,
            long_description: self.long_description.clone(),
            long_description_content_type: self.long_description_content_type.clone(),
            metadata: self.metadata.clone(),
        })
    }
}

#[cfg(test)]
impl BuildContext {
    /// A packaging-mode context for `name` with nothing discovered or configured
    pub(crate) fn for_tests(root: &Path, name: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            mode: PackagingMode::Packaging,
            name: name.to_string(),
            version: None,
            version_modules: Vec::new(),
            packages: Vec::new(),
            console_scripts: Vec::new(),
            script_hooks: Vec::new(),
            entry_points: Vec::new(),
            manifest: ManifestRewriter::new(root.join("MANIFEST.in"), ManifestMode::Append),
            install_requires: Vec::new(),
            long_description: None,
            long_description_content_type: None,
            include_package_data: true,
            metadata: serde_json::Map::new(),
            teardown: TeardownReport::default(),
        }
    }
}

/// Find importable packages below `root`, optionally restricted to some top-level packages
///
/// A directory is a package when it holds `__init__.py`; the search does not descend into
/// directories that are not packages.
///
/// # Errors
///
/// Returns [`ConfigurationError::Unreadable`] if a directory cannot be listed.
pub fn discover_packages(
    fs: &dyn FileSystem,
    root: &Path,
    top_packages: Option<&[String]>,
) -> Result<Vec<String>, ConfigurationError> {
    let mut found = Vec::new();
    let mut pending = vec![(root.to_path_buf(), String::new())];

    while let Some((dir, prefix)) = pending.pop() {
        let entries = fs
            .list_directory(&dir)
            .map_err(|source| ConfigurationError::Unreadable {
                path: dir.clone(),
                source,
            })?;

        for entry in entries {
            let Some(dir_name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if dir_name.contains('.')
                || dir_name.starts_with('_') && dir_name.ends_with("__")
                || SKIPPED_DIRECTORIES.contains(&dir_name)
                || !fs.is_dir(&entry)
                || !fs.is_file(&entry.join("__init__.py"))
            {
                continue;
            }

            let package = if prefix.is_empty() {
                dir_name.to_string()
            } else {
                format!("{prefix}.{dir_name}")
            };
            debug!(package = %package, "Found package");
            pending.push((entry.clone(), package.clone()));
            found.push(package);
        }
    }

    if let Some(tops) = top_packages {
        found.retain(|package| {
            let top = package.split('.').next().unwrap_or(package);
            tops.iter().any(|t| t == top)
        });
    }
    found.sort();
    found.dedup();
    Ok(found)
}
