use std::{path::PathBuf, sync::Arc};

use tracing::{debug, info};

use super::{BuildStep, StepError, StepId, StepKind, StepOption};
use crate::context::BuildContext;
use crate::ledger::VirtualFileLedger;
use crate::version::{
    VersionError, VersionSource, reset_version_text, stamp_version_text, version_boilerplate,
};

/// Stamps the version supplied by a [`VersionSource`] into every version module
pub struct VersionSetByVcs {
    source: Arc<dyn VersionSource>,
    modules: Vec<PathBuf>,
    write_version_file: Option<PathBuf>,
}

impl VersionSetByVcs {
    /// `modules` are resolved version module files
    #[must_use]
    pub fn new(source: Arc<dyn VersionSource>, modules: Vec<PathBuf>) -> Self {
        Self {
            source,
            modules,
            write_version_file: None,
        }
    }

    /// Also write the computed version to `path`; this file is not undone
    #[must_use]
    pub fn with_version_file(mut self, path: Option<PathBuf>) -> Self {
        self.write_version_file = path;
        self
    }
}

impl BuildStep for VersionSetByVcs {
    fn id(&self) -> StepId {
        StepId::VersionSetByVcs
    }

    fn description(&self) -> String {
        format!("stamp the version from {} into version modules", self.source.name())
    }

    fn options(&self) -> Vec<StepOption> {
        let modules: Vec<_> = self.modules.iter().map(|m| m.display().to_string()).collect();
        let mut options = vec![StepOption::new("version_sources", modules.join(", "), "-")];
        if let Some(path) = &self.write_version_file {
            options.push(StepOption::new("write_version_file", path.display(), "none"));
        }
        options
    }

    fn validate(&self, _ctx: &BuildContext, ledger: &VirtualFileLedger) -> Result<(), StepError> {
        let fs = ledger.file_system();
        for module in &self.modules {
            if fs.path_exists(module) {
                let text = fs.read_file(module)?;
                if stamp_version_text(&text, "").is_none() {
                    return Err(VersionError::MalformedVersionModule {
                        path: module.clone(),
                    }
                    .into());
                }
            } else {
                let parent_exists = module.parent().is_some_and(|parent| fs.is_dir(parent));
                if !parent_exists {
                    return Err(StepError::precondition(format!(
                        "cannot create version module {}: its directory does not exist",
                        module.display()
                    )));
                }
            }
        }
        Ok(())
    }

    fn execute(
        &self,
        ctx: &mut BuildContext,
        ledger: &mut VirtualFileLedger,
    ) -> Result<(), StepError> {
        let version = self.source.version()?;
        info!(version = %version, source = %self.source.name(), "Stamping version");

        for module in &self.modules {
            if ledger.file_system().path_exists(module) {
                let text = ledger.file_system().read_file(module)?;
                let stamped = stamp_version_text(&text, &version).ok_or_else(|| {
                    VersionError::MalformedVersionModule {
                        path: module.clone(),
                    }
                })?;
                ledger.modify_file(module, stamped.as_bytes())?;
                debug!(path = %module.display(), "Stamped existing version module");
            } else {
                let boilerplate = version_boilerplate();
                let stamped = stamp_version_text(&boilerplate, &version).unwrap_or(boilerplate);
                ledger.create_file(module, stamped.as_bytes())?;
                debug!(path = %module.display(), "Created version module");
            }
        }

        if let Some(path) = &self.write_version_file {
            let path = ctx.path(path);
            ledger
                .file_system()
                .write_file(&path, format!("{version}\n").as_bytes())?;
            info!(path = %path.display(), "Wrote version file");
        }

        ctx.version = Some(version);
        Ok(())
    }
}

/// Puts the development placeholder back into the stamped version modules
#[derive(Debug)]
pub struct VersionResetToDev {
    modules: Vec<PathBuf>,
}

impl VersionResetToDev {
    #[must_use]
    pub fn new(modules: Vec<PathBuf>) -> Self {
        Self { modules }
    }
}

impl BuildStep for VersionResetToDev {
    fn id(&self) -> StepId {
        StepId::VersionResetToDev
    }

    fn description(&self) -> String {
        "reset version modules to DEV_VERSION".to_string()
    }

    fn kind(&self) -> StepKind {
        StepKind::Finalizer
    }

    fn execute(
        &self,
        _ctx: &mut BuildContext,
        ledger: &mut VirtualFileLedger,
    ) -> Result<(), StepError> {
        for module in &self.modules {
            // never stamped, e.g. the run failed before the stamping step
            if ledger.register_of(module).is_none() {
                continue;
            }
            let text = ledger.file_system().read_file(module)?;
            let reset = reset_version_text(&text).ok_or_else(|| {
                VersionError::MalformedVersionModule {
                    path: module.clone(),
                }
            })?;
            ledger.rewrite_registered(module, reset.as_bytes())?;
            debug!(path = %module.display(), "Reset version module");
        }
        Ok(())
    }
}
