use std::fmt::Display;

use log::{error, info};

pub const DEFAULT_MAX_LINES: usize = 20;

/// Decision trail of a single resolution.
///
/// Keeps info and error messages in order, and mirrors every message to the
/// `log` facade. The error channel is capped at `max_lines` entries; anything
/// beyond is only counted and reported by [`FilteredLog::error_messages`].
#[derive(Debug, Clone)]
pub struct FilteredLog {
    title: String,
    max_lines: usize,
    info_messages: Vec<String>,
    error_messages: Vec<String>,
    skipped_errors: usize,
}

impl FilteredLog {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_max_lines(title, DEFAULT_MAX_LINES)
    }

    pub fn with_max_lines(title: impl Into<String>, max_lines: usize) -> Self {
        Self {
            title: title.into(),
            max_lines,
            info_messages: Vec::new(),
            error_messages: Vec::new(),
            skipped_errors: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("[{}] {message}", self.title);
        self.info_messages.push(message);
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("[{}] {message}", self.title);
        if self.error_messages.len() < self.max_lines {
            self.error_messages.push(message);
        } else {
            self.skipped_errors += 1;
        }
    }

    pub fn log_exception(&mut self, cause: &dyn Display, message: impl Into<String>) {
        self.log_error(format!("{}: {cause}", message.into()));
    }

    pub fn info_messages(&self) -> &[String] {
        &self.info_messages
    }

    /// Error messages, followed by a summary line if some were skipped.
    pub fn error_messages(&self) -> Vec<String> {
        let mut messages = self.error_messages.clone();
        if self.skipped_errors > 0 {
            messages.push(format!(
                "  ... skipped logging of {} additional errors ...",
                self.skipped_errors
            ));
        }
        messages
    }

    pub fn has_errors(&self) -> bool {
        !self.error_messages.is_empty()
    }
}
