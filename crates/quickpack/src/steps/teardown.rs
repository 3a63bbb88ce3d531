use tracing::info;

use super::{BuildStep, StepError, StepId, StepKind};
use crate::context::BuildContext;
use crate::ledger::{TeardownAction, VirtualFileLedger};

/// Removes every created file and restores every modified one
#[derive(Debug, Default)]
pub struct UndoVirtualFiles;

impl BuildStep for UndoVirtualFiles {
    fn id(&self) -> StepId {
        StepId::UndoVirtualFiles
    }

    fn description(&self) -> String {
        "remove created files and revert modified ones".to_string()
    }

    fn kind(&self) -> StepKind {
        StepKind::Finalizer
    }

    fn execute(
        &self,
        ctx: &mut BuildContext,
        ledger: &mut VirtualFileLedger,
    ) -> Result<(), StepError> {
        let report = ledger.teardown_with(|action, path| match action {
            TeardownAction::Remove => info!(path = %path.display(), "Removing virtual file"),
            TeardownAction::Revert => info!(path = %path.display(), "Reverting virtual file"),
        });
        ctx.teardown.merge(report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::RealFileSystem;
    use std::{fs, sync::Arc};
    use tempfile::tempdir;

    #[test]
    fn test_undo_records_report_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let existing = dir.path().join("setup.cfg");
        fs::write(&existing, "[metadata]\n").unwrap();
        let mut ctx = BuildContext::for_tests(dir.path(), "examplelib");
        let mut ledger = VirtualFileLedger::new(Arc::new(RealFileSystem));
        ledger.create_file(&dir.path().join("generated.txt"), b"x").unwrap();
        ledger.modify_file(&existing, b"[changed]\n").unwrap();

        UndoVirtualFiles.execute(&mut ctx, &mut ledger).unwrap();
        UndoVirtualFiles.execute(&mut ctx, &mut ledger).unwrap();

        assert!(!dir.path().join("generated.txt").exists());
        assert_eq!(fs::read_to_string(&existing).unwrap(), "[metadata]\n");
        assert_eq!(ctx.teardown.removed.len(), 1);
        assert_eq!(ctx.teardown.reverted.len(), 1);
        assert!(ctx.teardown.is_clean());
    }
}
