//! User-facing progress output
//!
//! The engine reports through the [`ProgressReporter`] port; the CLI supplies the
//! [`TerminalProgressReporter`]. Structured diagnostics go through `tracing` instead.

pub mod port;
pub mod terminal;

pub use port::{MessageType, ProgressReporter};
pub use terminal::TerminalProgressReporter;
