use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;
use tinybasic_common::{FileId, Span, ValueError};

/// Fatal run-time failures. Any of these aborts the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeErrorKind {
    #[error("RETURN without GOSUB")]
    ReturnOutsideSub,
    #[error("division by zero")]
    DivisionByZero,
    #[error("line {0} not found")]
    LineNotFound(i64),
    #[error("undefined identifier: {0}")]
    UndefinedIdentifier(String),
    #[error("input error: {0}")]
    InputError(String),
    #[error("nothing to run: the program is empty")]
    NothingToRun,
    #[error("{0}")]
    ExpectingNumber(String),
    #[error("no statement at line {0}")]
    ProgramError(i64),
    #[error("output error: {0}")]
    OutputError(String),
}

impl From<ValueError> for RuntimeErrorKind {
    fn from(err: ValueError) -> Self {
        match err {
            ValueError::DivisionByZero => RuntimeErrorKind::DivisionByZero,
            err @ ValueError::ExpectingNumber { .. } => {
                RuntimeErrorKind::ExpectingNumber(err.to_string())
            }
        }
    }
}

impl From<std::io::Error> for RuntimeErrorKind {
    fn from(err: std::io::Error) -> Self {
        RuntimeErrorKind::OutputError(err.to_string())
    }
}

/// A failure together with where it happened.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}{}", location(.line))]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    /// Line being executed, if the run got that far.
    pub line: Option<i64>,
    pub span: Option<Span>,
}

fn location(line: &Option<i64>) -> String {
    match line {
        Some(line) => format!(" (line {line})"),
        None => String::new(),
    }
}

impl RuntimeError {
    pub fn to_diagnostic(&self, file_id: FileId) -> Diagnostic<FileId> {
        let diagnostic = Diagnostic::error().with_message(self.to_string());
        match self.span {
            Some(span) => diagnostic.with_labels(vec![Label::primary(file_id, span.to_range())
                .with_message(self.kind.to_string())]),
            None => diagnostic,
        }
    }
}

/// Non-fatal conditions recorded while the run continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A PRINT value or IF condition was unset, or a condition was not boolean.
    UnsetValue,
    /// GOSUB to a negative line.
    NegativeLine,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub kind: WarningKind,
    pub line: i64,
    pub span: Span,
    pub message: String,
}

impl Warning {
    pub fn to_diagnostic(&self, file_id: FileId) -> Diagnostic<FileId> {
        Diagnostic::warning()
            .with_message(format!("{} (line {})", self.message, self.line))
            .with_labels(vec![
                Label::primary(file_id, self.span.to_range()).with_message(&self.message)
            ])
    }
}
