//! Build steps: the units of work the pipeline runs in order
//!
//! Steps never call each other. They read and write the [`BuildContext`] and register every
//! file they create or change with the [`VirtualFileLedger`], which undoes it all at the end.

pub mod bundle;
pub mod clean;
pub mod host;
pub mod manifest;
pub mod requirements;
pub mod scripts;
pub mod teardown;
pub mod version;

use std::{fmt, path::PathBuf};

use thiserror::Error;

use crate::context::BuildContext;
use crate::fs::FileSystemError;
use crate::host::HostError;
use crate::ledger::{LedgerError, VirtualFileLedger};
use crate::manifest::ManifestError;
use crate::requirements::{LookupError, RequirementError};
use crate::version::VersionError;

pub use bundle::BundleHelper;
pub use clean::CleanEggInfo;
pub use host::HostToolchainStep;
pub use manifest::PrepareManifestIn;
pub use requirements::{DynamicRequirements, FreezeRequirements, RequirementsMode, UseRequirementsFiles};
pub use scripts::{CreateScriptHooks, ScriptHook};
pub use teardown::UndoVirtualFiles;
pub use version::{VersionResetToDev, VersionSetByVcs};

/// Identity of a step; also its position in the fixed pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepId {
    CleanEggInfo,
    UseRequirementsTxt,
    FreezeRequirements,
    DynamicRequirements,
    BundleHelper,
    VersionSetByVcs,
    CreateScriptHooks,
    PrepareManifestIn,
    HostToolchain,
    VersionResetToDev,
    UndoVirtualFiles,
}

impl StepId {
    pub const ALL: [Self; 11] = [
        Self::CleanEggInfo,
        Self::UseRequirementsTxt,
        Self::FreezeRequirements,
        Self::DynamicRequirements,
        Self::BundleHelper,
        Self::VersionSetByVcs,
        Self::CreateScriptHooks,
        Self::PrepareManifestIn,
        Self::HostToolchain,
        Self::VersionResetToDev,
        Self::UndoVirtualFiles,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CleanEggInfo => "clean_egg_info",
            Self::UseRequirementsTxt => "use_requirements_txt",
            Self::FreezeRequirements => "freeze_requirements",
            Self::DynamicRequirements => "dynamic_requirements",
            Self::BundleHelper => "bundle_helper",
            Self::VersionSetByVcs => "version_set_by_vcs",
            Self::CreateScriptHooks => "create_script_hooks",
            Self::PrepareManifestIn => "prepare_manifest_in",
            Self::HostToolchain => "host_toolchain",
            Self::VersionResetToDev => "version_reset_to_dev",
            Self::UndoVirtualFiles => "undo_virtual_files",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a step still runs after an earlier step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Skipped once the run has failed
    Content,
    /// Always runs; errors after a failure are logged and suppressed
    Finalizer,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content => write!(f, "content"),
            Self::Finalizer => write!(f, "finalizer"),
        }
    }
}

/// One recognized option of a step, as shown by `quickpack plan`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOption {
    pub name: &'static str,
    pub value: String,
    pub default: &'static str,
}

impl StepOption {
    #[must_use]
    pub fn new(name: &'static str, value: impl fmt::Display, default: &'static str) -> Self {
        Self {
            name,
            value: value.to_string(),
            default,
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum StepError {
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("invalid requirements in {}: {source}", path.display())]
    Requirements {
        path: PathBuf,
        #[source]
        source: RequirementError,
    },

    #[error("external lookup failed: {0}")]
    ExternalLookup(#[from] LookupError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    FileSystem(#[from] FileSystemError),
}

impl StepError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }
}

/// A named, configurable unit of work
pub trait BuildStep: Send + Sync {
    fn id(&self) -> StepId;

    fn description(&self) -> String;

    fn kind(&self) -> StepKind {
        StepKind::Content
    }

    /// The options this step was built with
    fn options(&self) -> Vec<StepOption> {
        Vec::new()
    }

    /// Pre-flight checks, run immediately before [`BuildStep::execute`]
    ///
    /// # Errors
    ///
    /// Returns [`StepError`] if the step cannot run in the current state.
    fn validate(&self, _ctx: &BuildContext, _ledger: &VirtualFileLedger) -> Result<(), StepError> {
        Ok(())
    }

    /// Do the work
    ///
    /// # Errors
    ///
    /// Returns [`StepError`] on failure; the runner then tears down the ledger.
    fn execute(&self, ctx: &mut BuildContext, ledger: &mut VirtualFileLedger)
    -> Result<(), StepError>;
}

impl fmt::Debug for dyn BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildStep")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .finish()
    }
}
