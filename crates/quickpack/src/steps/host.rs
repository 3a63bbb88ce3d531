use std::sync::Arc;

use tracing::info;

use super::{BuildStep, StepError, StepId, StepOption};
use crate::context::BuildContext;
use crate::host::HostToolchain;
use crate::ledger::VirtualFileLedger;

/// Hands the finished configuration record to the host toolchain
pub struct HostToolchainStep {
    host: Arc<dyn HostToolchain>,
    args: Vec<String>,
}

impl HostToolchainStep {
    #[must_use]
    pub fn new(host: Arc<dyn HostToolchain>, args: Vec<String>) -> Self {
        Self { host, args }
    }
}

impl BuildStep for HostToolchainStep {
    fn id(&self) -> StepId {
        StepId::HostToolchain
    }

    fn description(&self) -> String {
        format!("run {} {}", self.host.name(), self.args.join(" "))
            .trim_end()
            .to_string()
    }

    fn options(&self) -> Vec<StepOption> {
        vec![StepOption::new("args", self.args.join(" "), "sdist")]
    }

    fn validate(&self, ctx: &BuildContext, _ledger: &VirtualFileLedger) -> Result<(), StepError> {
        if ctx.version.is_none() {
            return Err(StepError::precondition(
                "no version is known; set `version` or `version_sources`",
            ));
        }
        if !self.host.is_available() {
            return Err(StepError::precondition(format!(
                "{} is not available; install it or point `python` at another interpreter",
                self.host.name()
            )));
        }
        Ok(())
    }

    fn execute(
        &self,
        ctx: &mut BuildContext,
        _ledger: &mut VirtualFileLedger,
    ) -> Result<(), StepError> {
        let record = ctx
            .host_record()
            .ok_or_else(|| StepError::precondition("no version is known"))?;
        info!(
            host = %self.host.name(),
            name = %record.name,
            version = %record.version,
            packages = record.packages.len(),
            "Running host toolchain"
        );
        self.host.run(&record, &self.args)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::RealFileSystem;
    use crate::host::{HostError, MockHostToolchain};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_passes_record_and_args() {
        let dir = tempdir().unwrap();
        let mut ctx = BuildContext::for_tests(dir.path(), "examplelib");
        ctx.version = Some("1.2.3".to_string());
        ctx.packages = vec!["examplelib".to_string()];
        ctx.entry_points = vec!["ex=examplelib.__scripthooks__:examplelib_cli_0".to_string()];
        let mut host = MockHostToolchain::new();
        host.expect_name().return_const("fake".to_string());
        host.expect_is_available().return_const(true);
        host.expect_run()
            .withf(|record, args| {
                record.version == "1.2.3"
                    && record.entry_points["console_scripts"].len() == 1
                    && args == ["bdist_wheel".to_string()]
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let step = HostToolchainStep::new(Arc::new(host), vec!["bdist_wheel".to_string()]);
        let mut ledger = VirtualFileLedger::new(Arc::new(RealFileSystem));

        step.validate(&ctx, &ledger).unwrap();
        step.execute(&mut ctx, &mut ledger).unwrap();
        assert_eq!(step.description(), "run fake bdist_wheel");
    }

    #[test]
    fn test_requires_version() {
        let dir = tempdir().unwrap();
        let ctx = BuildContext::for_tests(dir.path(), "examplelib");
        let step = HostToolchainStep::new(Arc::new(MockHostToolchain::new()), Vec::new());
        let ledger = VirtualFileLedger::new(Arc::new(RealFileSystem));

        assert!(matches!(
            step.validate(&ctx, &ledger),
            Err(StepError::Precondition(_))
        ));
    }

    #[test]
    fn test_missing_host_fails_validation() {
        let dir = tempdir().unwrap();
        let mut ctx = BuildContext::for_tests(dir.path(), "examplelib");
        ctx.version = Some("1.0".to_string());
        let mut host = MockHostToolchain::new();
        host.expect_name().return_const("setuptools (python9)".to_string());
        host.expect_is_available().return_const(false);
        host.expect_run().never();
        let step = HostToolchainStep::new(Arc::new(host), vec!["sdist".to_string()]);
        let ledger = VirtualFileLedger::new(Arc::new(RealFileSystem));

        let err = step.validate(&ctx, &ledger).unwrap_err();

        assert!(matches!(&err, StepError::Precondition(message) if message.contains("python9")));
    }

    #[test]
    fn test_host_failure_propagates() {
        let dir = tempdir().unwrap();
        let mut ctx = BuildContext::for_tests(dir.path(), "examplelib");
        ctx.version = Some("1.0".to_string());
        let mut host = MockHostToolchain::new();
        host.expect_name().return_const("fake".to_string());
        host.expect_run().returning(|_, _| {
            Err(HostError::Failed {
                exit_code: 1,
                stderr: "boom".to_string(),
            })
        });
        let step = HostToolchainStep::new(Arc::new(host), vec!["sdist".to_string()]);
        let mut ledger = VirtualFileLedger::new(Arc::new(RealFileSystem));

        let err = step.execute(&mut ctx, &mut ledger).unwrap_err();

        assert!(matches!(err, StepError::Host(HostError::Failed { exit_code: 1, .. })));
    }
}
