use std::path::PathBuf;

use tracing::info;

use super::{BuildStep, StepError, StepId, StepOption};
use crate::context::BuildContext;
use crate::ledger::VirtualFileLedger;
use crate::setup::BundleHelperOptions;
use crate::version::DEV_VERSION;

/// Ships a copy of a build helper archive inside the distribution
#[derive(Debug)]
pub struct BundleHelper {
    /// Absolute path of the source archive
    archive: PathBuf,
    helper: BundleHelperOptions,
}

impl BundleHelper {
    #[must_use]
    pub fn new(archive: impl Into<PathBuf>, helper: BundleHelperOptions) -> Self {
        Self {
            archive: archive.into(),
            helper,
        }
    }
}

impl BuildStep for BundleHelper {
    fn id(&self) -> StepId {
        StepId::BundleHelper
    }

    fn description(&self) -> String {
        format!("bundle {} as {}", self.helper.name, self.helper.bundled_file_name())
    }

    fn options(&self) -> Vec<StepOption> {
        vec![
            StepOption::new("archive", self.archive.display(), "-"),
            StepOption::new("name", &self.helper.name, "-"),
            StepOption::new("version", &self.helper.version, "-"),
        ]
    }

    fn validate(&self, _ctx: &BuildContext, ledger: &VirtualFileLedger) -> Result<(), StepError> {
        if self.helper.version == DEV_VERSION {
            return Err(StepError::precondition(format!(
                "refusing to bundle {} at the development version {DEV_VERSION}",
                self.helper.name
            )));
        }
        if !ledger.file_system().is_file(&self.archive) {
            return Err(StepError::precondition(format!(
                "helper archive {} does not exist",
                self.archive.display()
            )));
        }
        Ok(())
    }

    fn execute(
        &self,
        ctx: &mut BuildContext,
        ledger: &mut VirtualFileLedger,
    ) -> Result<(), StepError> {
        let target = ctx.path(self.helper.bundled_file_name());
        let content = ledger.file_system().read_bytes(&self.archive)?;
        ledger.create_file(&target, &content)?;
        ctx.manifest.add_include(&[self.helper.manifest_pattern()])?;

        info!(
            from = %self.archive.display(),
            to = %target.display(),
            "Bundled helper archive"
        );
        Ok(())
    }
}
