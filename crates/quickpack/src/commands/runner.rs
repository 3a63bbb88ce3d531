//! Command execution abstractions and types
//!
//! The pipeline talks to exactly two kinds of external processes: the version-control CLI
//! (`git describe`) and the host packaging toolchain. Both go through the [`CommandRunner`]
//! port so steps can be tested with [`MockCommandRunner`] instead of real processes.

use std::{borrow::Cow, path::PathBuf, process::Output, sync::Arc, time::Duration};

use thiserror::Error;

/// Port for command execution (Hexagonal Architecture)
///
/// Every call blocks until the process exits or its timeout elapses. The engine is strictly
/// sequential, so there is no streaming or background execution here.
#[cfg_attr(any(test, feature = "with_mocks"), mockall::automock)]
pub trait CommandRunner: Send + Sync {
    /// Check if a command is available in the current environment
    ///
    /// # Arguments
    ///
    /// * `command` - The command name to check (e.g., "git", "python3")
    fn is_command_available(&self, command: &str) -> bool;

    /// Execute a shell command using the runner's default timeout
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if the command cannot be started or times out. A non-zero exit
    /// is *not* an error at this level; inspect [`CommandOutput::is_success`].
    fn execute(&self, command: &str) -> Result<CommandOutput, CommandError>;

    /// Execute a shell command with a specific timeout
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if the command cannot be started or times out.
    fn execute_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;

    /// Execute a program directly, without a shell in between
    ///
    /// Used when arguments carry text that would need shell quoting (inline scripts, paths
    /// with spaces).
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if the program cannot be started or times out.
    fn execute_program(
        &self,
        invocation: &ProgramInvocation,
    ) -> Result<CommandOutput, CommandError>;
}

/// A program to run without going through the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInvocation {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
    pub(crate) envs: Vec<(String, String)>,
    pub(crate) current_dir: Option<PathBuf>,
    pub(crate) inherit_output: bool,
    pub(crate) timeout: Option<Duration>,
}

impl ProgramInvocation {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
            inherit_output: false,
            timeout: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Let the child write straight to this process' stdout instead of capturing it
    ///
    /// stderr is always captured.
    #[must_use]
    pub fn inherit_output(mut self, inherit: bool) -> Self {
        self.inherit_output = inherit;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn get_envs(&self) -> &[(String, String)] {
        &self.envs
    }

    /// Human-readable rendering used in logs and error messages
    #[must_use]
    pub fn display(&self) -> String {
        let mut rendered = self.program.clone();
        for arg in &self.args {
            rendered.push(' ');
            if arg.contains(char::is_whitespace) {
                rendered.push_str("<script>");
            } else {
                rendered.push_str(arg);
            }
        }
        rendered
    }
}

/// Result of executing a command
///
/// Contains the exit status, the captured output streams and the execution duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub(crate) exit_code: Option<i32>,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
    pub(crate) duration: Duration,
}

impl CommandOutput {
    /// Build an output record; `exit_code` is `None` when the process was killed by a signal
    #[must_use]
    pub fn new(
        exit_code: Option<i32>,
        stdout: impl Into<Vec<u8>>,
        stderr: impl Into<Vec<u8>>,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            duration,
        }
    }

    pub(crate) fn from_output(output: Output, duration: Duration) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
            duration,
        }
    }

    /// Get the command's exit code, or -1 if the process was terminated by a signal
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.exit_code.unwrap_or(-1)
    }

    #[must_use]
    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    /// Get stdout as a UTF-8 string, replacing invalid sequences
    #[must_use]
    pub fn stdout_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    #[must_use]
    pub fn stderr(&self) -> &[u8] {
        &self.stderr
    }

    /// Get stderr as a UTF-8 string, replacing invalid sequences
    #[must_use]
    pub fn stderr_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Check if the command exited with status code 0
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Errors that can occur during command execution
#[derive(Error, Debug, Clone)]
pub enum CommandError {
    /// Command execution exceeded the specified timeout
    #[error("Command timed out after {timeout:?}: {command}")]
    Timeout {
        command: String,
        timeout: Duration,
        working_directory: PathBuf,
    },

    /// IO error occurred while starting or running the command
    #[error("IO Error executing command '{command}': {source}")]
    IoError {
        command: String,
        working_directory: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Command executed but returned a non-zero exit code
    #[error("Command failed with exit code {exit_code}: {command}")]
    NonZeroExit {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
        working_directory: PathBuf,
        execution_duration: Duration,
    },
}

impl CommandError {
    /// Turn a finished-but-failed command into a [`CommandError::NonZeroExit`]
    #[must_use]
    pub fn non_zero_exit(
        command: &str,
        output: &CommandOutput,
        working_directory: PathBuf,
    ) -> Self {
        Self::NonZeroExit {
            command: command.to_string(),
            exit_code: output.exit_code(),
            stdout: output.stdout_str().into_owned(),
            stderr: output.stderr_str().into_owned(),
            working_directory,
            execution_duration: output.duration,
        }
    }
}
