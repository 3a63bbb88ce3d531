use std::fmt::Display;

use crate::steps::{StepId, StepKind};

/// Port for progress output (Hexagonal Architecture)
pub trait ProgressReporter: Send + Sync {
    fn status_line<T: Display>(&self, message_type: MessageType, message: T) -> String;

    fn format_progress<T: Display>(&self, message: T) -> String {
        self.status_line(MessageType::Progress, message)
    }

    fn format_success<T: Display>(&self, message: T) -> String {
        self.status_line(MessageType::Success, message)
    }

    fn format_info<T: Display>(&self, message: T) -> String {
        self.status_line(MessageType::Info, message)
    }

    fn format_warning<T: Display>(&self, message: T) -> String {
        self.status_line(MessageType::Warning, message)
    }

    fn format_error<T: Display>(&self, message: T) -> String {
        self.status_line(MessageType::Error, message)
    }

    fn report<T: Display>(&self, message: T);
    fn report_progress<T: Display>(&self, message: T);
    fn report_success<T: Display>(&self, message: T);
    fn report_info<T: Display>(&self, message: T);
    fn report_warning<T: Display>(&self, message: T);
    fn report_error<T: Display>(&self, message: T);

    /// Announce that a pipeline step is about to run
    fn report_step(&self, position: usize, total: usize, id: StepId, kind: StepKind) {
        match kind {
            StepKind::Content => self.report_progress(format!("[{position}/{total}] {id}")),
            StepKind::Finalizer => {
                self.report_progress(format!("[{position}/{total}] {id} (finalizer)"));
            }
        }
    }
}

/// Types of status messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Progress,
    Info,
    Success,
    Error,
    Warning,
}
