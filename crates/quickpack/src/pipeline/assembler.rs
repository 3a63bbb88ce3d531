use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

use regex::Regex;
use tracing::{debug, info};

use super::{ConfigurationError, MetadataError, PackagingMode};
use crate::context::BuildContext;
use crate::fs::FileSystem;
use crate::host::{HostRecord, HostToolchain};
use crate::ledger::VirtualFileLedger;
use crate::manifest::is_valid_line;
use crate::requirements::PackageIndex;
use crate::setup::SetupOptions;
use crate::steps::{
    BuildStep, BundleHelper, CleanEggInfo, CreateScriptHooks, DynamicRequirements,
    FreezeRequirements, HostToolchainStep, PrepareManifestIn, RequirementsMode, StepId,
    UndoVirtualFiles, UseRequirementsFiles, VersionResetToDev, VersionSetByVcs,
};
use crate::version::{VersionSource, resolve_module_path};

/// Requirements file used when none is configured and it exists
pub const DEFAULT_REQUIREMENTS_FILE: &str = "requirements.txt";

static TOP_PACKAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid regex"));

static MODULE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("valid regex")
});

/// The ordered step ids for `options` in `mode`
///
/// Pure: the same options and mode always give the same order.
#[must_use]
pub fn step_order(options: &SetupOptions, mode: PackagingMode) -> Vec<StepId> {
    if mode == PackagingMode::AlreadyPackaged {
        return vec![StepId::DynamicRequirements, StepId::HostToolchain];
    }

    let stamps_version = !options.version_sources.is_empty();
    let planned = [
        (StepId::CleanEggInfo, true),
        (StepId::UseRequirementsTxt, options.use_requirements_file),
        (StepId::FreezeRequirements, options.freeze_requirements.is_enabled()),
        (StepId::DynamicRequirements, true),
        (StepId::BundleHelper, options.bundle_helper.is_some()),
        (StepId::VersionSetByVcs, stamps_version),
        (StepId::CreateScriptHooks, !options.console_scripts.is_empty()),
        (StepId::PrepareManifestIn, true),
        (StepId::HostToolchain, true),
        (StepId::VersionResetToDev, stamps_version),
        (StepId::UndoVirtualFiles, true),
    ];

    planned
        .into_iter()
        .filter_map(|(id, enabled)| enabled.then_some(id))
        .collect()
}

/// External collaborators the steps are built with
#[derive(Clone)]
pub struct Collaborators {
    pub versions: Arc<dyn VersionSource>,
    pub index: Arc<dyn PackageIndex>,
    pub host: Arc<dyn HostToolchain>,
}

/// An assembled pipeline, ready for the runner
pub struct Pipeline {
    pub mode: PackagingMode,
    pub context: BuildContext,
    pub steps: Vec<Box<dyn BuildStep>>,
}

impl Pipeline {
    #[must_use]
    pub fn step_ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|step| step.id()).collect()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("mode", &self.mode)
            .field("name", &self.context.name)
            .field("steps", &self.step_ids())
            .finish()
    }
}

/// Builds the ordered step list and the build context from setup options
pub struct PipelineAssembler {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    collaborators: Collaborators,
    host_args: Vec<String>,
    write_version_file: Option<PathBuf>,
}

impl PipelineAssembler {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>, collaborators: Collaborators) -> Self {
        Self {
            fs,
            root: root.into(),
            collaborators,
            host_args: Vec::new(),
            write_version_file: None,
        }
    }

    /// Arguments handed to the host toolchain, e.g. `sdist`
    #[must_use]
    pub fn with_host_args(mut self, args: Vec<String>) -> Self {
        self.host_args = args;
        self
    }

    /// Also write the stamped version to this file (relative to the root)
    #[must_use]
    pub fn with_version_file(mut self, path: Option<PathBuf>) -> Self {
        self.write_version_file = path;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Detect the packaging mode of the project root
    #[must_use]
    pub fn detect_mode(&self) -> PackagingMode {
        PackagingMode::detect(self.fs.as_ref(), &self.root)
    }

    /// Check `options` for configuration errors without touching anything
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found.
    pub fn validate(&self, options: &SetupOptions) -> Result<(), ConfigurationError> {
        if options.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
            return Err(ConfigurationError::MissingName);
        }

        match (options.version.is_some(), options.version_sources.is_empty()) {
            (true, false) => return Err(ConfigurationError::VersionSourceConflict),
            (false, true) => return Err(ConfigurationError::MissingVersion),
            _ => {}
        }

        if options.require_existing_version_sources {
            for source in &options.version_sources {
                let path = resolve_module_path(&self.root, source);
                if !self.fs.is_file(&path) {
                    return Err(ConfigurationError::MissingVersionSource { path });
                }
            }
        }

        if let Some(name) = options.console_scripts.first_duplicate() {
            return Err(ConfigurationError::DuplicateConsoleScript {
                name: name.to_string(),
            });
        }
        if let Some(script) = options
            .console_scripts
            .iter()
            .find(|script| !MODULE_NAME.is_match(&script.module))
        {
            return Err(ConfigurationError::InvalidConsoleScript {
                name: script.name.clone(),
                module: script.module.clone(),
            });
        }

        if let Some(top) = options
            .top_packages
            .iter()
            .flatten()
            .find(|top| !TOP_PACKAGE.is_match(top))
        {
            return Err(ConfigurationError::InvalidTopPackage { name: top.clone() });
        }

        let (_, lines) = options.configured_manifest_lines();
        if let Some(line) = lines.iter().find(|line| !is_valid_line(line)) {
            return Err(ConfigurationError::InvalidManifestLine { line: line.clone() });
        }

        Ok(())
    }

    /// Validate `options`, prepare the build context and construct the steps in order
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the options are invalid or the context cannot be
    /// prepared. Nothing in the project tree has been changed when this fails.
    pub fn assemble(
        &self,
        options: &SetupOptions,
        mode: PackagingMode,
    ) -> Result<Pipeline, ConfigurationError> {
        self.validate(options)?;
        let context = BuildContext::prepare(self.fs.as_ref(), &self.root, options, mode)?;

        let steps: Vec<Box<dyn BuildStep>> = step_order(options, mode)
            .into_iter()
            .filter_map(|id| self.build_step(id, options, mode, &context))
            .collect();

        info!(
            mode = %mode,
            steps = ?steps.iter().map(|s| s.id().as_str()).collect::<Vec<_>>(),
            "Assembled pipeline"
        );
        Ok(Pipeline {
            mode,
            context,
            steps,
        })
    }

    /// The record the host toolchain would receive, computed without changing the tree
    ///
    /// Requirements files (or the persisted requirements of a built distribution) are read
    /// but not frozen. Without a fixed version the version source is asked.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] if the options are invalid, the version cannot be
    /// determined, or a requirements file cannot be read.
    pub fn export_metadata(&self, options: &SetupOptions) -> Result<HostRecord, MetadataError> {
        self.validate(options)?;
        let mode = self.detect_mode();
        let mut context = BuildContext::prepare(self.fs.as_ref(), &self.root, options, mode)?;
        if context.version.is_none() {
            context.version = Some(self.collaborators.versions.version()?);
        }

        let readers: Vec<Box<dyn BuildStep>> = match mode {
            PackagingMode::Packaging if options.use_requirements_file => vec![Box::new(
                UseRequirementsFiles::new(self.requirements_files(options)),
            )],
            PackagingMode::Packaging => Vec::new(),
            PackagingMode::AlreadyPackaged => vec![Box::new(DynamicRequirements::new(
                options.dynamic_requirements_file.clone(),
                RequirementsMode::Load,
            ))],
        };
        let mut ledger = VirtualFileLedger::new(Arc::clone(&self.fs));
        for step in readers {
            step.validate(&context, &ledger)
                .and_then(|()| step.execute(&mut context, &mut ledger))
                .map_err(|source| MetadataError::Step {
                    step: step.id(),
                    source,
                })?;
        }

        debug!(name = %context.name, version = ?context.version, "Exported metadata");
        context
            .host_record()
            .ok_or(MetadataError::Configuration(ConfigurationError::MissingVersion))
    }

    fn build_step(
        &self,
        id: StepId,
        options: &SetupOptions,
        mode: PackagingMode,
        context: &BuildContext,
    ) -> Option<Box<dyn BuildStep>> {
        let step: Box<dyn BuildStep> = match id {
            StepId::CleanEggInfo => Box::new(CleanEggInfo),
            StepId::UseRequirementsTxt => {
                Box::new(UseRequirementsFiles::new(self.requirements_files(options)))
            }
            StepId::FreezeRequirements => {
                Box::new(FreezeRequirements::new(Arc::clone(&self.collaborators.index)))
            }
            StepId::DynamicRequirements => {
                let direction = match mode {
                    PackagingMode::Packaging => RequirementsMode::Persist,
                    PackagingMode::AlreadyPackaged => RequirementsMode::Load,
                };
                Box::new(DynamicRequirements::new(
                    options.dynamic_requirements_file.clone(),
                    direction,
                ))
            }
            StepId::BundleHelper => {
                let helper = options.bundle_helper.clone()?;
                Box::new(BundleHelper::new(self.root.join(&helper.archive), helper))
            }
            StepId::VersionSetByVcs => Box::new(
                VersionSetByVcs::new(
                    Arc::clone(&self.collaborators.versions),
                    dedup(&context.version_modules),
                )
                .with_version_file(self.write_version_file.clone()),
            ),
            StepId::CreateScriptHooks => Box::new(CreateScriptHooks),
            StepId::PrepareManifestIn => {
                let (_, lines) = options.configured_manifest_lines();
                Box::new(PrepareManifestIn::new(
                    options.manifest_includes.clone(),
                    options.manifest_excludes.clone(),
                    lines,
                ))
            }
            StepId::HostToolchain => Box::new(HostToolchainStep::new(
                Arc::clone(&self.collaborators.host),
                self.host_args.clone(),
            )),
            StepId::VersionResetToDev => {
                Box::new(VersionResetToDev::new(dedup(&context.version_modules)))
            }
            StepId::UndoVirtualFiles => Box::new(UndoVirtualFiles),
        };
        Some(step)
    }

    fn requirements_files(&self, options: &SetupOptions) -> Vec<PathBuf> {
        if let Some(files) = &options.requirements_files {
            return files.clone();
        }
        let default = PathBuf::from(DEFAULT_REQUIREMENTS_FILE);
        if self.fs.is_file(&self.root.join(&default)) {
            debug!("Using the default requirements file");
            vec![default]
        } else {
            Vec::new()
        }
    }
}

fn dedup(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut unique: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths {
        if !unique.contains(path) {
            unique.push(path.clone());
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::RealFileSystem;
    use crate::host::MockHostToolchain;
    use crate::requirements::MockPackageIndex;
    use crate::version::{FixedVersionSource, MockVersionSource};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn options(yaml: &str) -> SetupOptions {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn collaborators() -> Collaborators {
        let mut host = MockHostToolchain::new();
        host.expect_name().return_const("fake host".to_string());
        Collaborators {
            versions: Arc::new(FixedVersionSource::new("1.0.0")),
            index: Arc::new(MockPackageIndex::new()),
            host: Arc::new(host),
        }
    }

    fn assembler(root: &Path) -> PipelineAssembler {
        PipelineAssembler::new(Arc::new(RealFileSystem), root, collaborators())
    }

    #[test]
    fn test_full_packaging_order() {
        let options = options(
            "
name: examplelib
version_sources: [examplelib]
freeze_requirements: true
console_scripts: {ex: examplelib.cli}
bundle_helper: {archive: helper.zip, name: helper, version: '1.0'}
",
        );

        assert_eq!(step_order(&options, PackagingMode::Packaging), StepId::ALL.to_vec());
    }

    #[test]
    fn test_minimal_packaging_order() {
        let options = options("name: examplelib\nversion: '1.0'\nuse_requirements_file: false\n");

        assert_eq!(
            step_order(&options, PackagingMode::Packaging),
            vec![
                StepId::CleanEggInfo,
                StepId::DynamicRequirements,
                StepId::PrepareManifestIn,
                StepId::HostToolchain,
                StepId::UndoVirtualFiles,
            ]
        );
    }

    #[test]
    fn test_already_packaged_order() {
        let options = options("name: examplelib\nversion_sources: [examplelib]\nfreeze_requirements: true\n");

        assert_eq!(
            step_order(&options, PackagingMode::AlreadyPackaged),
            vec![StepId::DynamicRequirements, StepId::HostToolchain]
        );
    }

    #[test]
    fn test_version_and_sources_conflict() {
        let dir = tempdir().unwrap();
        let options = options("name: examplelib\nversion_sources: [examplelib]\nfixed_version: '1.0'\n");

        assert!(matches!(
            assembler(dir.path()).validate(&options),
            Err(ConfigurationError::VersionSourceConflict)
        ));
    }

    #[test]
    fn test_version_required() {
        let dir = tempdir().unwrap();

        assert!(matches!(
            assembler(dir.path()).validate(&options("name: examplelib\n")),
            Err(ConfigurationError::MissingVersion)
        ));
    }

    #[test]
    fn test_required_version_sources_must_exist() {
        let dir = tempdir().unwrap();
        let options = options(
            "name: examplelib\nversion_sources: [examplelib]\nrequire_existing_version_sources: true\n",
        );

        match assembler(dir.path()).validate(&options) {
            Err(ConfigurationError::MissingVersionSource { path }) => {
                assert_eq!(path, dir.path().join("examplelib/version.py"));
            }
            other => panic!("Expected MissingVersionSource, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_console_scripts() {
        let dir = tempdir().unwrap();
        let options = options(
            "name: examplelib\nversion: '1'\nconsole_scripts: [ex=examplelib.cli, ex=examplelib.other]\n",
        );

        match assembler(dir.path()).validate(&options) {
            Err(ConfigurationError::DuplicateConsoleScript { name }) => assert_eq!(name, "ex"),
            other => panic!("Expected DuplicateConsoleScript, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_top_package_and_manifest_line() {
        let dir = tempdir().unwrap();

        assert!(matches!(
            assembler(dir.path()).validate(&options("name: x\nversion: '1'\ntop_packages: [a.b]\n")),
            Err(ConfigurationError::InvalidTopPackage { .. })
        ));
        assert!(matches!(
            assembler(dir.path())
                .validate(&options("name: x\nversion: '1'\nmanifest_extra: ['copy all']\n")),
            Err(ConfigurationError::InvalidManifestLine { .. })
        ));
    }

    #[test]
    fn test_assemble_builds_steps_in_order() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("examplelib")).unwrap();
        fs::write(dir.path().join("examplelib/__init__.py"), "").unwrap();
        fs::write(dir.path().join("requirements.txt"), "six\n").unwrap();
        let options = options(
            "name: examplelib\nversion_sources: [examplelib, examplelib/version.py]\n",
        );
        let mut versions = MockVersionSource::new();
        versions.expect_name().return_const("git describe".to_string());
        let collaborators = Collaborators {
            versions: Arc::new(versions),
            ..collaborators()
        };

        let pipeline = PipelineAssembler::new(Arc::new(RealFileSystem), dir.path(), collaborators)
            .with_host_args(vec!["sdist".to_string()])
            .assemble(&options, PackagingMode::Packaging)
            .unwrap();

        assert_eq!(pipeline.step_ids(), step_order(&options, PackagingMode::Packaging));
        assert_eq!(pipeline.context.packages, vec!["examplelib"]);
        let use_requirements = &pipeline.steps[1];
        assert_eq!(use_requirements.options()[0].value, "requirements.txt");
        let version_step = pipeline
            .steps
            .iter()
            .find(|s| s.id() == StepId::VersionSetByVcs)
            .unwrap();
        assert_eq!(
            version_step.options()[0].value,
            dir.path().join("examplelib/version.py").display().to_string()
        );
    }

    #[test]
    fn test_export_metadata_reads_requirements_without_writing() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("examplelib")).unwrap();
        fs::write(dir.path().join("examplelib/__init__.py"), "").unwrap();
        fs::write(dir.path().join("requirements.txt"), "six>=1.0\n").unwrap();
        let options = options("name: examplelib\nversion_sources: [examplelib]\n");

        let record = assembler(dir.path()).export_metadata(&options).unwrap();

        assert_eq!(record.name, "examplelib");
        assert_eq!(record.version, "1.0.0");
        assert_eq!(record.packages, vec!["examplelib"]);
        assert_eq!(record.install_requires, vec!["six>=1.0"]);
        assert!(!dir.path().join("dynamic_requirements.txt").exists());
    }

    #[test]
    fn test_export_metadata_of_built_distribution() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("PKG-INFO"), "Name: examplelib\n").unwrap();
        fs::write(dir.path().join("dynamic_requirements.txt"), "six==1.16.0\n").unwrap();
        let options = options("name: examplelib\nversion: '2.0'\n");

        let record = assembler(dir.path()).export_metadata(&options).unwrap();

        assert_eq!(record.version, "2.0");
        assert_eq!(record.install_requires, vec!["six==1.16.0"]);
    }

    #[test]
    fn test_export_metadata_reports_missing_requirements_file() {
        let dir = tempdir().unwrap();
        let options = options(
            "name: examplelib\nversion: '1.0'\nrequirements_files: [missing.txt]\n",
        );

        let err = assembler(dir.path()).export_metadata(&options).unwrap_err();

        assert!(matches!(
            err,
            MetadataError::Step {
                step: StepId::UseRequirementsTxt,
                ..
            }
        ));
    }
}
