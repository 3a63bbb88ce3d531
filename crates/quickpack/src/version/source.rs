//! Port supplying the version stamped into a package

use std::{path::PathBuf, sync::Arc};

use tracing::debug;

use super::{VersionError, describe_to_version};
use crate::commands::{CommandError, CommandRunner, ProgramInvocation};

/// Where the version of a packaging run comes from
#[cfg_attr(any(test, feature = "with_mocks"), mockall::automock)]
pub trait VersionSource: Send + Sync {
    /// Compute the version for this run
    ///
    /// # Errors
    ///
    /// Returns [`VersionError`] if the version cannot be determined.
    fn version(&self) -> Result<String, VersionError>;

    /// Short label for logs and plans
    fn name(&self) -> String;
}

/// Derives the version from `git describe` in the project root
pub struct GitVersionSource {
    runner: Arc<dyn CommandRunner>,
    root: PathBuf,
}

impl GitVersionSource {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            root: root.into(),
        }
    }

    fn invocation(&self) -> ProgramInvocation {
        ProgramInvocation::new("git")
            .args(["describe", "--match", "*.*", "--dirty=_dirty"])
            .current_dir(&self.root)
    }
}

impl VersionSource for GitVersionSource {
    fn version(&self) -> Result<String, VersionError> {
        let invocation = self.invocation();
        let output = self.runner.execute_program(&invocation)?;

        if !output.is_success() {
            return Err(CommandError::non_zero_exit(
                &invocation.display(),
                &output,
                self.root.clone(),
            )
            .into());
        }

        let descriptor = output.stdout_str();
        debug!(descriptor = %descriptor.trim(), "git describe");
        describe_to_version(&descriptor)
    }

    fn name(&self) -> String {
        "git describe".to_string()
    }
}

/// A version given up front, e.g. from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedVersionSource(String);

impl FixedVersionSource {
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }
}

impl VersionSource for FixedVersionSource {
    fn version(&self) -> Result<String, VersionError> {
        Ok(self.0.clone())
    }

    fn name(&self) -> String {
        format!("fixed ({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandOutput, MockCommandRunner};
    use std::time::Duration;

    fn runner_returning(exit_code: i32, stdout: &'static str) -> MockCommandRunner {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_execute_program()
            .withf(|inv| {
                inv.program() == "git"
                    && inv.get_args() == ["describe", "--match", "*.*", "--dirty=_dirty"]
            })
            .times(1)
            .returning(move |_| {
                Ok(CommandOutput::new(
                    Some(exit_code),
                    stdout,
                    "fatal: No names found",
                    Duration::from_millis(5),
                ))
            });
        runner
    }

    #[test]
    fn test_git_version_source_parses_describe() {
        let source = GitVersionSource::new(Arc::new(runner_returning(0, "1.7-12-g0ff1ce_dirty\n")), "/repo");

        assert_eq!(source.version().unwrap(), "1.7.12.dirty");
    }

    #[test]
    fn test_git_version_source_failed_command() {
        let source = GitVersionSource::new(Arc::new(runner_returning(128, "")), "/repo");

        let err = source.version().unwrap_err();

        assert!(matches!(
            err,
            VersionError::Command(CommandError::NonZeroExit { exit_code: 128, .. })
        ));
    }

    #[test]
    fn test_fixed_version_source() {
        let source = FixedVersionSource::new("4.2");

        assert_eq!(source.version().unwrap(), "4.2");
        assert_eq!(source.name(), "fixed (4.2)");
    }
}
