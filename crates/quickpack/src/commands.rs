//! Command execution abstractions and implementations

pub mod runner;
pub mod shell;


#[cfg(any(test, feature = "with_mocks"))]
pub use runner::MockCommandRunner;
pub use runner::{CommandError, CommandOutput, CommandRunner, ProgramInvocation};
pub use shell::ShellCommandRunner;
