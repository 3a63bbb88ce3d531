use tracing::info;

use super::{BuildStep, StepError, StepId, StepOption};
use crate::context::BuildContext;
use crate::ledger::VirtualFileLedger;
use crate::manifest::{ManifestError, is_valid_line};

/// Writes the accumulated manifest lines; the last content step before the host runs
#[derive(Debug, Default)]
pub struct PrepareManifestIn {
    includes: Vec<String>,
    excludes: Vec<String>,
    /// Raw lines from the setup document
    lines: Vec<String>,
}

impl PrepareManifestIn {
    #[must_use]
    pub fn new(includes: Vec<String>, excludes: Vec<String>, lines: Vec<String>) -> Self {
        Self {
            includes,
            excludes,
            lines,
        }
    }
}

impl BuildStep for PrepareManifestIn {
    fn id(&self) -> StepId {
        StepId::PrepareManifestIn
    }

    fn description(&self) -> String {
        "rewrite the packaging manifest".to_string()
    }

    fn options(&self) -> Vec<StepOption> {
        vec![
            StepOption::new("manifest_includes", self.includes.join(" "), "none"),
            StepOption::new("manifest_excludes", self.excludes.join(" "), "none"),
            StepOption::new("manifest lines", self.lines.len(), "0"),
        ]
    }

    fn validate(&self, _ctx: &BuildContext, _ledger: &VirtualFileLedger) -> Result<(), StepError> {
        if let Some(line) = self.lines.iter().find(|line| !is_valid_line(line)) {
            return Err(ManifestError::InvalidLine { line: line.clone() }.into());
        }
        Ok(())
    }

    fn execute(
        &self,
        ctx: &mut BuildContext,
        ledger: &mut VirtualFileLedger,
    ) -> Result<(), StepError> {
        if !self.includes.is_empty() {
            ctx.manifest.add_include(self.includes.as_slice())?;
        }
        if !self.excludes.is_empty() {
            ctx.manifest.add_exclude(self.excludes.as_slice())?;
        }
        if !self.lines.is_empty() {
            ctx.manifest.add_comment("from the setup document")?;
            for line in &self.lines {
                ctx.manifest.add_line(line.as_str())?;
            }
        }

        match ctx.manifest.rewrite(ledger)? {
            Some(path) => info!(path = %path.display(), "Rewrote manifest"),
            None => info!("No manifest lines, leaving the manifest alone"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::RealFileSystem;
    use crate::manifest::{BLOCK_FOOTER, BLOCK_HEADER, ManifestMode};
    use pretty_assertions::assert_eq;
    use std::{fs, sync::Arc};
    use tempfile::tempdir;

    #[test]
    fn test_appends_block_to_existing_manifest() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("MANIFEST.in");
        fs::write(&manifest, "include README.md").unwrap();
        let mut ctx = BuildContext::for_tests(dir.path(), "examplelib");
        ctx.manifest.add_include(&["dynamic_requirements.txt"]).unwrap();
        let mut ledger = VirtualFileLedger::new(Arc::new(RealFileSystem));
        let step = PrepareManifestIn::new(
            vec!["*.cfg".to_string()],
            vec!["secrets.txt".to_string()],
            vec!["graft docs".to_string()],
        );

        step.validate(&ctx, &ledger).unwrap();
        step.execute(&mut ctx, &mut ledger).unwrap();

        assert_eq!(
            fs::read_to_string(&manifest).unwrap(),
            format!(
                "include README.md\n{BLOCK_HEADER}\ninclude dynamic_requirements.txt\ninclude *.cfg\nexclude secrets.txt\n# from the setup document\ngraft docs\n{BLOCK_FOOTER}\n"
            )
        );

        ledger.teardown();
        assert_eq!(fs::read_to_string(&manifest).unwrap(), "include README.md");
    }

    #[test]
    fn test_replace_mode_discards_existing_lines() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("MANIFEST.in");
        fs::write(&manifest, "include old.txt\n").unwrap();
        let mut ctx = BuildContext::for_tests(dir.path(), "examplelib");
        ctx.manifest.set_mode(ManifestMode::Replace);
        let mut ledger = VirtualFileLedger::new(Arc::new(RealFileSystem));

        PrepareManifestIn::new(Vec::new(), Vec::new(), vec!["include new.txt".to_string()])
            .execute(&mut ctx, &mut ledger)
            .unwrap();

        let text = fs::read_to_string(&manifest).unwrap();
        assert!(!text.contains("old.txt"));
        assert!(text.contains("include new.txt"));
    }

    #[test]
    fn test_nothing_to_write_leaves_tree_alone() {
        let dir = tempdir().unwrap();
        let mut ctx = BuildContext::for_tests(dir.path(), "examplelib");
        let mut ledger = VirtualFileLedger::new(Arc::new(RealFileSystem));

        PrepareManifestIn::default().execute(&mut ctx, &mut ledger).unwrap();

        assert!(!dir.path().join("MANIFEST.in").exists());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_invalid_line_fails_validation() {
        let dir = tempdir().unwrap();
        let ctx = BuildContext::for_tests(dir.path(), "examplelib");
        let ledger = VirtualFileLedger::new(Arc::new(RealFileSystem));

        let err = PrepareManifestIn::new(Vec::new(), Vec::new(), vec!["copy a b".to_string()])
            .validate(&ctx, &ledger)
            .unwrap_err();

        assert!(matches!(err, StepError::Manifest(ManifestError::InvalidLine { .. })));
    }
}
