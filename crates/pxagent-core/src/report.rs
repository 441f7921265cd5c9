//! Severity-tagged message log shared by the agent components.
//!
//! Every message is forwarded to `tracing` as it is recorded and also kept
//! in memory so that a status summary (`pxagent status`) can be rendered and
//! the last error code inspected.

use std::fmt;

/// Message severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
    pub code: Option<String>,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {} ({})", self.severity.as_str(), self.text, code),
            None => write!(f, "{}: {}", self.severity.as_str(), self.text),
        }
    }
}

/// Messages kept in memory before the oldest are dropped.
const MAX_MESSAGES: usize = 1000;

/// Aggregated outcome of a series of operations.
#[derive(Debug, Default)]
pub struct Report {
    messages: Vec<Message>,
    n_errors: usize,
    n_warnings: usize,
    last_error_code: Option<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!("{}", text);
        self.push(Severity::Debug, text, None);
    }

    pub fn info(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!("{}", text);
        self.push(Severity::Info, text, None);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!("{}", text);
        self.n_warnings += 1;
        self.push(Severity::Warning, text, None);
    }

    /// Record an error together with its code. The code is also kept as the
    /// report's last error code.
    pub fn error(&mut self, code: impl Into<String>, text: impl Into<String>) {
        let code = code.into();
        let text = text.into();
        tracing::error!(error_code = %code, "{}", text);
        self.n_errors += 1;
        self.last_error_code = Some(code.clone());
        self.push(Severity::Error, text, Some(code));
    }

    fn push(&mut self, severity: Severity, text: String, code: Option<String>) {
        if self.messages.len() >= MAX_MESSAGES {
            self.messages.remove(0);
        }
        self.messages.push(Message {
            severity,
            text,
            code,
        });
    }

    /// "OK" while no error has been recorded, "ERROR" afterwards.
    pub fn status(&self) -> &'static str {
        if self.n_errors == 0 {
            "OK"
        } else {
            "ERROR"
        }
    }

    pub fn n_errors(&self) -> usize {
        self.n_errors
    }

    pub fn n_warnings(&self) -> usize {
        self.n_warnings
    }

    pub fn last_error_code(&self) -> Option<&str> {
        self.last_error_code.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Plain-text rendering of all messages at or above `min`.
    pub fn show(&self, min: Severity) -> String {
        let mut buffer = format!(
            "Report: status: {}, {} errors, {} warnings\n",
            self.status(),
            self.n_errors,
            self.n_warnings
        );
        for message in self.messages.iter().filter(|m| m.severity >= min) {
            buffer.push_str(&format!("  - {}\n", message));
        }
        buffer
    }
}
