use tracing::info;

use super::{BuildStep, StepError, StepId};
use crate::context::BuildContext;
use crate::ledger::VirtualFileLedger;

const EGG_INFO_SUFFIX: &str = ".egg-info";

/// Removes stale `*.egg-info` directories from the project root
///
/// Not virtual: the metadata is stale and should not come back after the run.
#[derive(Debug, Default)]
pub struct CleanEggInfo;

impl BuildStep for CleanEggInfo {
    fn id(&self) -> StepId {
        StepId::CleanEggInfo
    }

    fn description(&self) -> String {
        "remove stale *.egg-info metadata".to_string()
    }

    fn execute(
        &self,
        ctx: &mut BuildContext,
        ledger: &mut VirtualFileLedger,
    ) -> Result<(), StepError> {
        let fs = ledger.file_system();
        for entry in fs.list_directory(&ctx.root)? {
            let is_egg_info = entry
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(EGG_INFO_SUFFIX));
            if is_egg_info && fs.is_dir(&entry) {
                info!(path = %entry.display(), "Removing stale egg-info");
                fs.remove_dir_all(&entry)?;
            }
        }
        Ok(())
    }
}
