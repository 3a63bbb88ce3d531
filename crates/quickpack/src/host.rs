//! Boundary to the host packaging toolchain
//!
//! The engine never models the host's metadata. It produces a [`HostRecord`] and hands it,
//! together with the user's host arguments (`sdist`, `bdist_wheel`, ...), to a
//! [`HostToolchain`].

use std::{collections::BTreeMap, io::Write, path::PathBuf, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::commands::{CommandError, CommandRunner, ProgramInvocation};

/// Environment variable through which the bootstrap finds the serialized record
pub const HOST_RECORD_ENV: &str = "QUICKPACK_HOST_RECORD";

/// Inline program run by the host interpreter: loads the record and calls `setuptools.setup`
pub const SETUPTOOLS_BOOTSTRAP: &str = r#"import json, os, sys
import setuptools
with open(os.environ["QUICKPACK_HOST_RECORD"]) as f:
    record = json.load(f)
kwargs = dict(record.pop("metadata", {}))
kwargs.update(record)
sys.argv = ["setup.py"] + sys.argv[1:]
setuptools.setup(**kwargs)
"#;

#[derive(Error, Debug, Clone)]
pub enum HostError {
    #[error("host toolchain exited with code {exit_code}: {}", last_lines(stderr))]
    Failed { exit_code: i32, stderr: String },

    #[error("failed to hand the configuration record to the host: {message}")]
    Record { message: String },

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// The tail of the host's stderr, which is where Python puts the traceback and its message
fn last_lines(stderr: &str) -> String {
    const KEPT_LINES: usize = 20;

    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    if lines.is_empty() {
        return "(no output on stderr)".to_string();
    }
    lines[lines.len().saturating_sub(KEPT_LINES)..].join("\n")
}

/// Everything the host needs to build the distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRecord {
    pub name: String,
    pub version: String,
    pub packages: Vec<String>,
    pub install_requires: Vec<String>,
    pub entry_points: BTreeMap<String, Vec<String>>,
    pub include_package_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description_content_type: Option<String>,
    /// Pass-through keys the engine does not interpret
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Port for the host packaging toolchain (Hexagonal Architecture)
#[cfg_attr(any(test, feature = "with_mocks"), mockall::automock)]
pub trait HostToolchain: Send + Sync {
    /// Build with `record`, passing `args` as the host's own command line
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] if the host cannot be started or reports failure.
    fn run(&self, record: &HostRecord, args: &[String]) -> Result<(), HostError>;

    /// Short label for logs and plans
    fn name(&self) -> String;

    /// Whether the host can be started at all in this environment
    fn is_available(&self) -> bool;
}

/// Runs setuptools through `python -c`, feeding it the record from a temporary file
///
/// The temporary file lives outside the source tree, so handing over the record never needs
/// a virtual file.
pub struct SetuptoolsHost {
    runner: Arc<dyn CommandRunner>,
    python: String,
    root: PathBuf,
    timeout: Duration,
}

impl SetuptoolsHost {
    #[must_use]
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        python: impl Into<String>,
        root: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            python: python.into(),
            root: root.into(),
            timeout,
        }
    }

    /// The invocation used for `record_path` and `args`
    #[must_use]
    pub fn invocation(&self, record_path: &str, args: &[String]) -> ProgramInvocation {
        ProgramInvocation::new(&self.python)
            .arg("-c")
            .arg(SETUPTOOLS_BOOTSTRAP)
            .args(args.iter().cloned())
            .env(HOST_RECORD_ENV, record_path)
            .current_dir(&self.root)
            .inherit_output(true)
            .timeout(self.timeout)
    }
}

impl HostToolchain for SetuptoolsHost {
    fn run(&self, record: &HostRecord, args: &[String]) -> Result<(), HostError> {
        let record_error = |message: String| HostError::Record { message };

        let json = serde_json::to_vec_pretty(record).map_err(|e| record_error(e.to_string()))?;
        let mut file = tempfile::Builder::new()
            .prefix("quickpack-record-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| record_error(e.to_string()))?;
        file.write_all(&json)
            .and_then(|()| file.flush())
            .map_err(|e| record_error(e.to_string()))?;

        let record_path = file.path().to_string_lossy().into_owned();
        let invocation = self.invocation(&record_path, args);
        info!(
            python = %self.python,
            args = ?args,
            "Handing {} {} to setuptools",
            record.name,
            record.version
        );

        let output = self.runner.execute_program(&invocation)?;
        if !output.is_success() {
            return Err(HostError::Failed {
                exit_code: output.exit_code(),
                stderr: output.stderr_str().into_owned(),
            });
        }

        let stderr = output.stderr_str();
        if !stderr.trim().is_empty() {
            warn!(stderr = %stderr.trim_end(), "Host toolchain reported warnings");
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("setuptools ({})", self.python)
    }

    fn is_available(&self) -> bool {
        self.runner.is_command_available(&self.python)
    }
}
