//! Ariadne-based diagnostic rendering for type errors and lints.
//!
//! Renders `TypeError` and `TypeWarning` into formatted, labeled
//! reports. Output is terse: an error code, the error's own message,
//! one labeled source span, and a help line when a plausible fix
//! exists.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use serde::Serialize;

use rill_common::Span;

use crate::error::{TypeError, TypeWarning};

/// Rendering options.
#[derive(Copy, Clone, Debug)]
pub struct DiagnosticOptions {
    pub color: bool,
}

impl DiagnosticOptions {
    /// Deterministic output for tests and logs.
    pub fn colorless() -> Self {
        DiagnosticOptions { color: false }
    }
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions { color: true }
    }
}

// ── Error Codes ────────────────────────────────────────────────────────

/// Assign a unique code to each error variant.
fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::Mismatch { .. } => "E0001",
        TypeError::InfiniteType { .. } => "E0002",
        TypeError::Unbound { .. } => "E0003",
        TypeError::NoMethod { .. } => "E0004",
        TypeError::NoLabel { .. } => "E0005",
        TypeError::MissingArguments { .. } => "E0006",
        TypeError::DuplicateLabel { .. } => "E0007",
        TypeError::UnsatisfiedConstraint { .. } => "E0008",
        TypeError::Lint(w) => warning_code(w),
    }
}

fn warning_code(w: &TypeWarning) -> &'static str {
    match w {
        TypeWarning::UnusedVariable { .. } => "W0001",
        TypeWarning::IgnoredValue { .. } => "W0002",
    }
}

// ── Span Helpers ───────────────────────────────────────────────────────

/// Clamp an optional span to a valid, non-empty range inside `source`.
fn clamped_range(span: Option<Span>, source_len: usize) -> Range<usize> {
    let r: Range<usize> = match span {
        Some(s) => s.into(),
        None => 0..source_len,
    };
    let start = r.start.min(source_len);
    let end = r.end.min(source_len).max(start);
    // Ariadne needs at least a one-character span.
    if start == end {
        start..end.saturating_add(1).min(source_len)
    } else {
        start..end
    }
}

fn label_text(error: &TypeError) -> String {
    match error {
        TypeError::Unbound { .. } => "not found in this scope".to_string(),
        TypeError::NoMethod { label, .. } => format!("no method `{label}` here"),
        TypeError::Mismatch { expected, .. } => format!("expected `{expected}`"),
        TypeError::NoLabel { label, .. } if label.is_empty() => {
            "extra positional argument".to_string()
        }
        TypeError::NoLabel { label, .. } => format!("no parameter takes `~{label}`"),
        TypeError::MissingArguments { .. } => "this call is incomplete".to_string(),
        TypeError::DuplicateLabel { label, .. } => format!("`~{label}` declared again here"),
        TypeError::InfiniteType { .. } => "recursive type here".to_string(),
        TypeError::UnsatisfiedConstraint { constraint, .. } => {
            format!("required to be {constraint}")
        }
        TypeError::Lint(w) => warning_label(w),
    }
}

fn warning_label(w: &TypeWarning) -> String {
    match w {
        TypeWarning::UnusedVariable { .. } => "never read".to_string(),
        TypeWarning::IgnoredValue { .. } => "value dropped here".to_string(),
    }
}

fn help_text(error: &TypeError) -> Option<String> {
    match error {
        TypeError::InfiniteType { .. } => {
            Some("a value cannot have a type that refers to itself".to_string())
        }
        TypeError::MissingArguments { labels, .. } => {
            Some(format!("supply {} more argument(s) or apply partially", labels.len()))
        }
        TypeError::Lint(TypeWarning::UnusedVariable { name, .. }) => {
            Some(format!("rename to `_{name}` to silence"))
        }
        TypeError::Lint(TypeWarning::IgnoredValue { .. }) => {
            Some("bind it with `let _ = ...` to drop it explicitly".to_string())
        }
        _ => None,
    }
}

// ── Main Rendering Functions ───────────────────────────────────────────

/// Render a type error into a formatted diagnostic string.
pub fn render_diagnostic(
    error: &TypeError,
    source: &str,
    _filename: &str,
    opts: DiagnosticOptions,
) -> String {
    let config = Config::default().with_color(opts.color);
    let range = clamped_range(error.span(), source.len());

    let kind = match error {
        TypeError::Lint(_) => ReportKind::Warning,
        _ => ReportKind::Error,
    };
    let color = match kind {
        ReportKind::Warning => Color::Yellow,
        _ => Color::Red,
    };

    let mut builder = Report::build(kind, range.clone())
        .with_code(error_code(error))
        .with_message(error.to_string())
        .with_config(config);
    builder.add_label(Label::new(range).with_message(label_text(error)).with_color(color));
    if let Some(help) = help_text(error) {
        builder.set_help(help);
    }
    let report = builder.finish();

    let mut buf = Vec::new();
    report
        .write(Source::from(source), &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

/// Render a collected lint warning.
pub fn render_warning(
    warning: &TypeWarning,
    source: &str,
    _filename: &str,
    opts: DiagnosticOptions,
) -> String {
    let config = Config::default().with_color(opts.color);
    let range = clamped_range(warning.span(), source.len());

    let mut builder = Report::build(ReportKind::Warning, range.clone())
        .with_code(warning_code(warning))
        .with_message(warning.to_string())
        .with_config(config);
    builder.add_label(
        Label::new(range).with_message(warning_label(warning)).with_color(Color::Yellow),
    );
    let report = builder.finish();

    let mut buf = Vec::new();
    report
        .write(Source::from(source), &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

// ── Machine-Readable Output ────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A diagnostic flattened for machine consumers (editors, harnesses).
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    pub label: String,
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// Flatten a type error into a [`Diagnostic`]. `source_len` clamps the
/// span the same way the rendered report does.
pub fn diagnostic(error: &TypeError, source_len: usize) -> Diagnostic {
    let range = clamped_range(error.span(), source_len);
    Diagnostic {
        code: error_code(error),
        severity: match error {
            TypeError::Lint(_) => Severity::Warning,
            _ => Severity::Error,
        },
        message: error.to_string(),
        label: label_text(error),
        start: range.start,
        end: range.end,
        help: help_text(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_renders_with_code_and_label() {
        let source = "x + 1";
        let err = TypeError::Unbound { name: "x".into(), span: Some(Span::new(0, 1)) };
        let out = render_diagnostic(&err, source, "test.rill", DiagnosticOptions::colorless());
        assert!(out.contains("E0003"));
        assert!(out.contains("unbound variable `x`"));
        assert!(out.contains("not found in this scope"));
    }

    #[test]
    fn out_of_range_span_is_clamped() {
        let source = "()";
        let err = TypeError::NoLabel { label: "x".into(), span: Some(Span::new(100, 200)) };
        // Must not panic.
        let out = render_diagnostic(&err, source, "test.rill", DiagnosticOptions::colorless());
        assert!(out.contains("E0005"));
    }

    #[test]
    fn lint_renders_as_warning() {
        let source = "let x = 1";
        let w = TypeWarning::UnusedVariable { name: "x".into(), span: Some(Span::new(4, 5)) };
        let out = render_warning(&w, source, "test.rill", DiagnosticOptions::colorless());
        assert!(out.contains("W0001"));
        assert!(out.contains("unused variable `x`"));
    }

    #[test]
    fn diagnostics_serialize_for_machine_consumers() {
        let err = TypeError::Unbound { name: "x".into(), span: Some(Span::new(0, 1)) };
        let d = diagnostic(&err, 5);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["code"], "E0003");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["start"], 0);
        assert!(json.get("help").is_none());
    }
}
