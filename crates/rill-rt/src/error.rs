//! Runtime errors as first-class, catchable values.

use std::fmt;

use rill_common::Span;

/// An error raised during evaluation.
///
/// Errors carry a `kind` (the handle `error.catch` filters on), a
/// human message, and the positions traversed while propagating.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeError {
    pub kind: String,
    pub message: String,
    pub positions: Vec<Span>,
}

impl RuntimeError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError { kind: kind.into(), message: message.into(), positions: Vec::new() }
    }

    /// The default kind used by bare `error.raise`.
    pub fn raised(message: impl Into<String>) -> Self {
        RuntimeError::new("error", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        RuntimeError::new("not_found", message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        RuntimeError::new("type", message)
    }

    /// Record a position while the error propagates outward.
    pub fn with_pos(mut self, span: Option<Span>) -> Self {
        if let Some(s) = span {
            if self.positions.last() != Some(&s) {
                self.positions.push(s);
            }
        }
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error({}): {}", self.kind, self.message)?;
        if let Some(first) = self.positions.first() {
            write!(f, " at {first}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
