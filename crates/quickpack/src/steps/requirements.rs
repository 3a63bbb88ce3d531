use std::{path::PathBuf, sync::Arc};

use tracing::{debug, info};

use super::{BuildStep, StepError, StepId, StepOption};
use crate::context::BuildContext;
use crate::ledger::VirtualFileLedger;
use crate::requirements::{PackageIndex, Requirement, RequirementError, parse_requirements_text};

/// Appends the contents of requirements files to the dependency list
#[derive(Debug)]
pub struct UseRequirementsFiles {
    files: Vec<PathBuf>,
}

impl UseRequirementsFiles {
    /// `files` are relative to the project root
    #[must_use]
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }
}

impl BuildStep for UseRequirementsFiles {
    fn id(&self) -> StepId {
        StepId::UseRequirementsTxt
    }

    fn description(&self) -> String {
        "add requirements files to install_requires".to_string()
    }

    fn options(&self) -> Vec<StepOption> {
        let files: Vec<_> = self.files.iter().map(|f| f.display().to_string()).collect();
        vec![StepOption::new(
            "requirements_files",
            files.join(", "),
            "requirements.txt (if present)",
        )]
    }

    fn validate(&self, ctx: &BuildContext, ledger: &VirtualFileLedger) -> Result<(), StepError> {
        for file in &self.files {
            let path = ctx.path(file);
            if !ledger.file_system().is_file(&path) {
                return Err(StepError::precondition(format!(
                    "requirements file {} does not exist",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    fn execute(
        &self,
        ctx: &mut BuildContext,
        ledger: &mut VirtualFileLedger,
    ) -> Result<(), StepError> {
        for file in &self.files {
            let path = ctx.path(file);
            let text = ledger.file_system().read_file(&path)?;
            let requirements = parse_requirements_text(&text).map_err(|source| match source {
                RequirementError::UnsupportedOption { .. } => {
                    StepError::precondition(format!("{}: {source}", path.display()))
                }
                source => StepError::Requirements {
                    path: path.clone(),
                    source,
                },
            })?;

            info!(path = %path.display(), count = requirements.len(), "Using requirements file");
            for requirement in requirements {
                let line = requirement.to_string();
                if !ctx.install_requires.contains(&line) {
                    ctx.install_requires.push(line);
                }
            }
        }
        Ok(())
    }
}

/// Pins every dependency to the newest matching release on the package index
pub struct FreezeRequirements {
    index: Arc<dyn PackageIndex>,
}

impl FreezeRequirements {
    #[must_use]
    pub fn new(index: Arc<dyn PackageIndex>) -> Self {
        Self { index }
    }
}

impl BuildStep for FreezeRequirements {
    fn id(&self) -> StepId {
        StepId::FreezeRequirements
    }

    fn description(&self) -> String {
        "pin install_requires to the newest matching releases".to_string()
    }

    fn execute(
        &self,
        ctx: &mut BuildContext,
        _ledger: &mut VirtualFileLedger,
    ) -> Result<(), StepError> {
        let mut frozen = Vec::with_capacity(ctx.install_requires.len());
        for line in &ctx.install_requires {
            let requirement: Requirement = line
                .parse()
                .map_err(|e| StepError::precondition(format!("cannot freeze: {e}")))?;
            let pinned = requirement.freeze(self.index.as_ref())?;
            debug!(from = %line, to = %pinned, "Froze requirement");
            frozen.push(pinned.to_string());
        }

        info!(count = frozen.len(), "Froze requirements");
        ctx.install_requires = frozen;
        Ok(())
    }
}

/// Direction of [`DynamicRequirements`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementsMode {
    /// Write the dependency list into the distribution
    Persist,
    /// Read the list back when building from a distribution
    Load,
}

/// Carries the final dependency list from packaging time into the distribution
#[derive(Debug)]
pub struct DynamicRequirements {
    file: PathBuf,
    mode: RequirementsMode,
}

impl DynamicRequirements {
    /// `file` is relative to the project root
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, mode: RequirementsMode) -> Self {
        Self {
            file: file.into(),
            mode,
        }
    }

    fn manifest_entry(&self) -> String {
        self.file.to_string_lossy().replace('\\', "/")
    }
}

impl BuildStep for DynamicRequirements {
    fn id(&self) -> StepId {
        StepId::DynamicRequirements
    }

    fn description(&self) -> String {
        match self.mode {
            RequirementsMode::Persist => format!("persist install_requires to {}", self.file.display()),
            RequirementsMode::Load => format!("load install_requires from {}", self.file.display()),
        }
    }

    fn options(&self) -> Vec<StepOption> {
        vec![StepOption::new(
            "dynamic_requirements_file",
            self.file.display(),
            crate::setup::options::DYNAMIC_REQUIREMENTS_FILE,
        )]
    }

    fn validate(&self, ctx: &BuildContext, ledger: &VirtualFileLedger) -> Result<(), StepError> {
        let path = ctx.path(&self.file);
        let exists = ledger.file_system().path_exists(&path);
        match (self.mode, exists) {
            (RequirementsMode::Persist, true) => Err(StepError::precondition(format!(
                "{} already exists; remove it, it may be left over from an interrupted run",
                path.display()
            ))),
            (RequirementsMode::Load, false) => Err(StepError::precondition(format!(
                "{} is missing from the distribution",
                path.display()
            ))),
            _ => Ok(()),
        }
    }

    fn execute(
        &self,
        ctx: &mut BuildContext,
        ledger: &mut VirtualFileLedger,
    ) -> Result<(), StepError> {
        let path = ctx.path(&self.file);
        match self.mode {
            RequirementsMode::Persist => {
                let mut text = ctx.install_requires.join("\n");
                text.push('\n');
                ledger.create_file(&path, text.as_bytes())?;
                ctx.manifest.add_include(&[self.manifest_entry()])?;
                info!(path = %path.display(), count = ctx.install_requires.len(), "Persisted requirements");
            }
            RequirementsMode::Load => {
                let text = ledger.file_system().read_file(&path)?;
                ctx.install_requires = text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect();
                info!(path = %path.display(), count = ctx.install_requires.len(), "Loaded requirements");
            }
        }
        Ok(())
    }
}
