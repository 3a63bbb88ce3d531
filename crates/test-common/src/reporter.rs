//! A progress reporter that keeps every message for later assertions.

use quickpack::progress_reporter::{MessageType, ProgressReporter};
use std::{fmt::Display, sync::Mutex};

#[derive(Debug, Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<(MessageType, String)>>,
}

impl RecordingReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages in the order they were reported.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|(_, m)| m.clone()).collect()
    }

    /// Messages of a single type.
    #[must_use]
    pub fn messages_of(&self, message_type: MessageType) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(t, _)| *t == message_type)
            .map(|(_, m)| m.clone())
            .collect()
    }

    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lock().iter().any(|(_, m)| m.contains(needle))
    }

    fn push<T: Display>(&self, message_type: MessageType, message: T) {
        self.lock().push((message_type, message.to_string()));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(MessageType, String)>> {
        self.messages.lock().expect("reporter lock")
    }
}

impl ProgressReporter for RecordingReporter {
    fn status_line<T: Display>(&self, message_type: MessageType, message: T) -> String {
        format!("{message_type:?}: {message}")
    }

    fn report<T: Display>(&self, message: T) {
        self.push(MessageType::Info, message);
    }

    fn report_progress<T: Display>(&self, message: T) {
        self.push(MessageType::Progress, message);
    }

    fn report_success<T: Display>(&self, message: T) {
        self.push(MessageType::Success, message);
    }

    fn report_info<T: Display>(&self, message: T) {
        self.push(MessageType::Info, message);
    }

    fn report_warning<T: Display>(&self, message: T) {
        self.push(MessageType::Warning, message);
    }

    fn report_error<T: Display>(&self, message: T) {
        self.push(MessageType::Error, message);
    }
}
