//! Error rendering using ariadne
//!
//! Renders script errors with the offending source line and a label under
//! the span. Errors without a span (most runtime failures) are written as a
//! single line.

use crate::{Diagnostic, Error, Severity};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;

/// Render an error for `source` to stderr
///
/// # Example
/// ```no_run
/// use plastics::{Compiler, render_error};
///
/// let source = "var x = ;";
/// let result = Compiler::default().compile(source);
/// for error in &result.errors {
///     render_error(error, source);
/// }
/// ```
pub fn render_error(error: &Error, source: &str) {
    render_error_to_writer(error, source, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
pub fn render_error_to(error: &Error, source: &str, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, source, writer, true)
}

/// Render an error to a String without color codes (useful for tests)
pub fn render_error_to_string_no_color(error: &Error, source: &str) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    source: &str,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    render_diagnostic(source, &error.to_diagnostic(), writer, use_color)
}

fn render_diagnostic(
    source: &str,
    diag: &Diagnostic,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    let Some(span) = &diag.span else {
        return match &diag.code {
            Some(code) => writeln!(writer, "{}[{}]: {}", diag.severity, code, diag.message),
            None => writeln!(writer, "{}: {}", diag.severity, diag.message),
        };
    };

    let mut colors = ColorGenerator::new();
    colors.next(); // Skip the first color.

    let kind = match diag.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
        Severity::Info => ReportKind::Advice,
    };

    // Clamp so that an end-of-input error still points at the last character.
    let end = span.0.end.min(source.len());
    let start = span.0.start.min(end);
    let range = start..end;

    let mut report = Report::build(kind, ("<script>", range.clone()))
        .with_message(&diag.message)
        .with_config(ariadne::Config::default().with_color(use_color));

    if let Some(code) = &diag.code {
        report = report.with_code(code);
    }

    let color = colors.next();
    report = report.with_label(
        Label::new(("<script>", range))
            .with_message(&diag.message)
            .with_color(color),
    );

    if let Some(help) = &diag.help {
        report = report.with_help(help);
    }

    report
        .finish()
        .write(("<script>", Source::from(source)), &mut *writer)
}
