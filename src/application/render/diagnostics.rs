//! Per-call diagnostics for the render pipeline.
//!
//! A fresh [`ErrorCollector`] is created for every render invocation and
//! dropped when the result is assembled, so concurrent or repeated calls never
//! observe each other's records.

use std::fmt;

use serde::Serialize;

/// Pipeline stage that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Math,
    Markdown,
    QuestionDirective,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Math => "math",
            ErrorKind::Markdown => "markdown",
            ErrorKind::QuestionDirective => "question directive",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    /// Offending source snippet.
    pub content: String,
    /// Byte offset into the stage input, when known.
    pub position: Option<usize>,
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}: {}", self.kind, self.severity, self.message)?;
        if let Some(position) = self.position {
            write!(f, " (at {position})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ErrorCollector {
    records: Vec<ErrorRecord>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(
        &mut self,
        kind: ErrorKind,
        message: impl Into<String>,
        content: impl Into<String>,
    ) {
        self.push(kind, Severity::Error, message.into(), content.into(), None);
    }

    pub fn add_error_at(
        &mut self,
        kind: ErrorKind,
        message: impl Into<String>,
        content: impl Into<String>,
        position: usize,
    ) {
        self.push(
            kind,
            Severity::Error,
            message.into(),
            content.into(),
            Some(position),
        );
    }

    pub fn add_warning(
        &mut self,
        kind: ErrorKind,
        message: impl Into<String>,
        content: impl Into<String>,
    ) {
        self.push(kind, Severity::Warning, message.into(), content.into(), None);
    }

    pub fn add_info(
        &mut self,
        kind: ErrorKind,
        message: impl Into<String>,
        content: impl Into<String>,
    ) {
        self.push(kind, Severity::Info, message.into(), content.into(), None);
    }

    fn push(
        &mut self,
        kind: ErrorKind,
        severity: Severity,
        message: String,
        content: String,
        position: Option<usize>,
    ) {
        self.records.push(ErrorRecord {
            kind,
            severity,
            message,
            content,
            position,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn info_count(&self) -> usize {
        self.count(Severity::Info)
    }

    fn count(&self, severity: Severity) -> usize {
        self.records
            .iter()
            .filter(|record| record.severity == severity)
            .count()
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records
            .iter()
            .filter(|record| record.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records
            .iter()
            .filter(|record| record.severity == Severity::Warning)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Single summary line for the result's `error` field.
    ///
    /// `None` unless at least one error-severity record exists.
    pub fn summary(&self) -> Option<String> {
        let mut errors = self.errors();
        let first = errors.next()?;
        let remaining = errors.count();

        if remaining == 0 {
            Some(first.message.clone())
        } else {
            Some(format!(
                "{} errors while rendering; first: {}",
                remaining + 1,
                first.message
            ))
        }
    }

    /// Messages of all non-error records, in insertion order.
    pub fn warning_messages(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| record.severity != Severity::Error)
            .map(|record| record.message.clone())
            .collect()
    }
}
