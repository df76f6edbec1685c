//! Non-fatal findings accumulated during a conversion run.

use std::fmt;

use serde::Serialize;

/// Severity of a non-fatal diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A single non-fatal finding tied to a source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// 1-based source line.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: line {}: {}", self.severity, self.line, self.message)
    }
}

/// Collector shared by the pipeline stages.
///
/// Each recorded diagnostic is also emitted as a `tracing` event, so callers
/// that only install a subscriber still see warnings as they happen.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, line: usize, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(line, "{message}");
        self.items.push(Diagnostic {
            severity: Severity::Warning,
            line,
            message,
        });
    }

    pub fn info(&mut self, line: usize, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(line, "{message}");
        self.items.push(Diagnostic {
            severity: Severity::Info,
            line,
            message,
        });
    }

    pub fn warning_count(&self) -> usize {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
