// Shell command runner adapter implementation

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::{process::Command, runtime::Builder};
use tracing::debug;

use super::runner::{CommandError, CommandOutput, CommandRunner, ProgramInvocation};

/// Shell command runner implementation
///
/// Each call drives the child process on a private current-thread runtime, so callers stay
/// synchronous while still getting a real timeout that kills the child.
#[derive(Clone, Debug)]
pub struct ShellCommandRunner {
    /// Path to the shell executable
    shell: String,

    /// Default timeout for commands
    default_timeout: Duration,

    /// Directory commands run in; the process' current directory when unset
    working_directory: Option<PathBuf>,
}

impl ShellCommandRunner {
    /// Create a new shell command runner
    #[must_use]
    pub fn new(shell: &str, default_timeout: Duration) -> Self {
        Self {
            shell: shell.to_string(),
            default_timeout,
            working_directory: None,
        }
    }

    /// Run every command from `dir` instead of the current directory
    #[must_use]
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    fn effective_directory(&self) -> PathBuf {
        self.working_directory.clone().unwrap_or_else(|| {
            std::env::current_dir().unwrap_or_else(|_| Path::new(".").to_path_buf())
        })
    }

    fn run(
        &self,
        mut cmd: Command,
        shown: &str,
        timeout: Duration,
        working_directory: PathBuf,
    ) -> Result<CommandOutput, CommandError> {
        let io_error = |e: std::io::Error| CommandError::IoError {
            command: shown.to_string(),
            working_directory: working_directory.clone(),
            source: Arc::new(e),
        };

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(io_error)?;

        cmd.stdin(Stdio::null()).kill_on_drop(true);

        debug!(command = %shown, ?timeout, "Executing command");
        let start_time = Instant::now();

        // The child is killed when the timed-out future is dropped
        let output = runtime
            .block_on(async {
                let child = cmd.spawn()?;
                Ok::<_, std::io::Error>(
                    tokio::time::timeout(timeout, child.wait_with_output()).await,
                )
            })
            .map_err(io_error)?
            .map_err(|_| CommandError::Timeout {
                command: shown.to_string(),
                timeout,
                working_directory: working_directory.clone(),
            })?
            .map_err(io_error)?;

        let output = CommandOutput::from_output(output, start_time.elapsed());
        debug!(
            command = %shown,
            exit_code = output.exit_code(),
            duration = ?output.duration(),
            "Command finished"
        );

        Ok(output)
    }
}

impl CommandRunner for ShellCommandRunner {
    fn is_command_available(&self, command: &str) -> bool {
        // Shell-agnostic way to check if a command exists
        let check_cmd = format!("command -v {command} >/dev/null 2>&1");

        self.execute(&check_cmd)
            .map(|output| output.is_success())
            .unwrap_or(false)
    }

    fn execute(&self, command: &str) -> Result<CommandOutput, CommandError> {
        self.execute_with_timeout(command, self.default_timeout)
    }

    fn execute_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let working_directory = self.effective_directory();

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .current_dir(&working_directory)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        self.run(cmd, command, timeout, working_directory)
    }

    fn execute_program(
        &self,
        invocation: &ProgramInvocation,
    ) -> Result<CommandOutput, CommandError> {
        let working_directory = invocation
            .current_dir
            .clone()
            .unwrap_or_else(|| self.effective_directory());

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(invocation.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&working_directory);

        // stderr stays captured either way so failures can carry it
        let stdout = if invocation.inherit_output {
            Stdio::inherit()
        } else {
            Stdio::piped()
        };
        cmd.stdout(stdout).stderr(Stdio::piped());

        let timeout = invocation.timeout.unwrap_or(self.default_timeout);
        self.run(cmd, &invocation.display(), timeout, working_directory)
    }
}
