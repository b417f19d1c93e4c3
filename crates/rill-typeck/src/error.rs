//! Type errors and lint warnings.
//!
//! The checker fails fast on the first mismatch in a subtree. Enclosing
//! contexts enrich an error (attach a position, wrap the reported type
//! pair in surrounding structure) but never swallow it. Lints are
//! collected separately and can be promoted to hard errors under the
//! strict flag.

use std::fmt;

use rill_common::Span;

use crate::pretty::Repr;
use crate::ty::Constraint;

/// A type error found during checking.
#[derive(Clone, Debug)]
pub enum TypeError {
    /// A name is not in scope.
    Unbound { name: String, span: Option<Span> },
    /// A row lookup failed on a fixed type.
    NoMethod { label: String, ty: Repr, span: Option<Span> },
    /// Two types that should be in the subtyping relation are not.
    ///
    /// Both sides are reduced representations local to the point of
    /// failure; unrelated substructure shows as `...`.
    Mismatch { found: Repr, expected: Repr, span: Option<Span> },
    /// An application or arrow comparison referenced a label the
    /// function does not declare.
    NoLabel { label: String, span: Option<Span> },
    /// Mandatory parameters were left unsupplied.
    MissingArguments { labels: Vec<String>, span: Option<Span> },
    /// A function declares the same non-empty label twice.
    DuplicateLabel { label: String, span: Option<Span> },
    /// The occur check failed: a variable would contain itself.
    InfiniteType { ty: Repr, span: Option<Span> },
    /// A pending constraint cannot hold for the resolved type.
    UnsatisfiedConstraint { constraint: Constraint, ty: Repr, span: Option<Span> },
    /// A lint promoted to a hard error by strict mode.
    Lint(TypeWarning),
}

/// A lint warning; collected apart from hard errors.
#[derive(Clone, Debug)]
pub enum TypeWarning {
    /// A `let`-bound name was never read (names starting with `_` are
    /// exempt).
    UnusedVariable { name: String, span: Option<Span> },
    /// The left side of a sequence produces a value that is silently
    /// dropped.
    IgnoredValue { ty: Repr, span: Option<Span> },
}

impl TypeError {
    /// The primary source position, if any.
    pub fn span(&self) -> Option<Span> {
        match self {
            TypeError::Unbound { span, .. }
            | TypeError::NoMethod { span, .. }
            | TypeError::Mismatch { span, .. }
            | TypeError::NoLabel { span, .. }
            | TypeError::MissingArguments { span, .. }
            | TypeError::DuplicateLabel { span, .. }
            | TypeError::InfiniteType { span, .. }
            | TypeError::UnsatisfiedConstraint { span, .. } => *span,
            TypeError::Lint(w) => w.span(),
        }
    }

    /// Attach a position if the error does not already carry one.
    pub fn with_span(mut self, new: Option<Span>) -> Self {
        if new.is_none() {
            return self;
        }
        let slot = match &mut self {
            TypeError::Unbound { span, .. }
            | TypeError::NoMethod { span, .. }
            | TypeError::Mismatch { span, .. }
            | TypeError::NoLabel { span, .. }
            | TypeError::MissingArguments { span, .. }
            | TypeError::DuplicateLabel { span, .. }
            | TypeError::InfiniteType { span, .. }
            | TypeError::UnsatisfiedConstraint { span, .. } => span,
            TypeError::Lint(_) => return self,
        };
        if slot.is_none() {
            *slot = new;
        }
        self
    }

    /// Wrap both reported sides of a mismatch in surrounding structure.
    ///
    /// Leaves every other variant untouched, so an inner `NoMethod` or
    /// `Unbound` bubbles up verbatim.
    pub fn map_reprs(self, f: impl Fn(Repr) -> Repr) -> Self {
        match self {
            TypeError::Mismatch { found, expected, span } => {
                TypeError::Mismatch { found: f(found), expected: f(expected), span }
            }
            other => other,
        }
    }
}

impl TypeWarning {
    pub fn span(&self) -> Option<Span> {
        match self {
            TypeWarning::UnusedVariable { span, .. } | TypeWarning::IgnoredValue { span, .. } => {
                *span
            }
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Unbound { name, .. } => write!(f, "unbound variable `{name}`"),
            TypeError::NoMethod { label, ty, .. } => {
                write!(f, "type `{ty}` has no method `{label}`")
            }
            TypeError::Mismatch { found, expected, .. } => {
                write!(f, "type mismatch: `{found}` is not a subtype of `{expected}`")
            }
            TypeError::NoLabel { label, .. } => {
                if label.is_empty() {
                    write!(f, "no unlabeled parameter left to match this argument")
                } else {
                    write!(f, "no parameter labeled `{label}`")
                }
            }
            TypeError::MissingArguments { labels, .. } => {
                let shown: Vec<String> = labels
                    .iter()
                    .map(|l| if l.is_empty() { "<unlabeled>".to_string() } else { l.clone() })
                    .collect();
                write!(f, "missing arguments: {}", shown.join(", "))
            }
            TypeError::DuplicateLabel { label, .. } => {
                write!(f, "duplicate parameter label `{label}`")
            }
            TypeError::InfiniteType { ty, .. } => {
                write!(f, "cyclic type: a variable occurs inside `{ty}`")
            }
            TypeError::UnsatisfiedConstraint { constraint, ty, .. } => {
                write!(f, "`{ty}` is not {constraint}")
            }
            TypeError::Lint(w) => write!(f, "{w} (strict mode)"),
        }
    }
}

impl fmt::Display for TypeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeWarning::UnusedVariable { name, .. } => {
                write!(f, "unused variable `{name}`")
            }
            TypeWarning::IgnoredValue { ty, .. } => {
                write!(f, "this value of type `{ty}` is ignored")
            }
        }
    }
}

impl std::error::Error for TypeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_display_uses_reprs() {
        let err = TypeError::Mismatch {
            found: Repr::Ground("int".into()),
            expected: Repr::Ground("string".into()),
            span: None,
        };
        assert_eq!(
            err.to_string(),
            "type mismatch: `int` is not a subtype of `string`"
        );
    }

    #[test]
    fn map_reprs_only_touches_mismatch() {
        let err = TypeError::Unbound { name: "x".into(), span: None };
        let wrapped = err.map_reprs(|r| r.in_list());
        assert!(matches!(wrapped, TypeError::Unbound { .. }));

        let err = TypeError::Mismatch {
            found: Repr::Ground("int".into()),
            expected: Repr::Ground("float".into()),
            span: None,
        };
        let wrapped = err.map_reprs(|r| r.in_list());
        assert_eq!(
            wrapped.to_string(),
            "type mismatch: `[int]` is not a subtype of `[float]`"
        );
    }

    #[test]
    fn with_span_never_overwrites() {
        let span_a = Span::new(1, 2);
        let span_b = Span::new(5, 9);
        let err = TypeError::NoLabel { label: "x".into(), span: Some(span_a) };
        assert_eq!(err.with_span(Some(span_b)).span(), Some(span_a));
        let err = TypeError::NoLabel { label: "x".into(), span: None };
        assert_eq!(err.with_span(Some(span_b)).span(), Some(span_b));
    }
}
