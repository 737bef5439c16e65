//! Diagnostic reports: an error kind, a message and an optional span,
//! rendered against the [SourceMap] with the offending line and a
//! caret marker.
pub mod highlight;

use std::fmt;

use highlight::{highlight, Colour};
use rux_source::{SourceMap, Span};

/// Severity of a report.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReportKind {
    Error,
    Warning,
    /// An internal invariant failure; not caused by the input.
    Internal,
}

impl ReportKind {
    fn colour(&self) -> Colour {
        match self {
            ReportKind::Error | ReportKind::Internal => Colour::Red,
            ReportKind::Warning => Colour::Yellow,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ReportKind::Error => "error",
            ReportKind::Warning => "warning",
            ReportKind::Internal => "internal error",
        }
    }
}

/// One diagnostic, ready to render.
#[derive(Debug)]
pub struct Report {
    pub kind: ReportKind,
    pub message: String,
    pub span: Option<Span>,
}

impl Report {
    pub fn error(message: impl Into<String>, span: Option<Span>) -> Self {
        Self { kind: ReportKind::Error, message: message.into(), span }
    }

    /// Pair the report with its source for display.
    pub fn with_source<'r>(&'r self, map: &'r SourceMap, colour: bool) -> ReportWriter<'r> {
        ReportWriter { report: self, map, colour }
    }
}

pub struct ReportWriter<'r> {
    report: &'r Report,
    map: &'r SourceMap,
    colour: bool,
}

impl fmt::Display for ReportWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let colour = self.colour.then(|| self.report.kind.colour());

        writeln!(
            f,
            "{}: {}",
            highlight(colour, true, self.report.kind.label()),
            self.report.message
        )?;

        let Some(span) = self.report.span else {
            return Ok(());
        };

        let start = self.map.row_col(span.start());
        writeln!(f, "  --> {}:{}", self.map.name(), start)?;

        let line = self.map.line(start.row);
        let line_number = format!("{}", start.row + 1);
        let gutter = " ".repeat(line_number.len());

        writeln!(f, " {gutter} |")?;
        writeln!(f, " {line_number} | {line}")?;

        // The caret run stays within the quoted line even when the
        // span continues past it.
        let width = (span.len() as usize).max(1).min(line.len().saturating_sub(start.col as usize).max(1));
        let carets = "^".repeat(width);
        writeln!(
            f,
            " {gutter} | {}{}",
            " ".repeat(start.col as usize),
            highlight(colour, true, &carets)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_the_offending_line() {
        let map = SourceMap::new("demo.rx", "fn main() {\n    let x: i32 = true;\n}\n");
        let report = Report::error(
            "mismatched types: expected `i32`, found `bool`",
            Some(Span::new(29, 33)),
        );

        let rendered = report.with_source(&map, false).to_string();
        assert_eq!(
            rendered,
            "error: mismatched types: expected `i32`, found `bool`\n\
             \x20 --> demo.rx:2:18\n\
             \x20  |\n\
             \x202 |     let x: i32 = true;\n\
             \x20  |                  ^^^^\n"
        );
    }

    #[test]
    fn spanless_reports_are_one_line() {
        let map = SourceMap::new("demo.rx", "");
        let report = Report::error("missing symbol `main`", None);
        assert_eq!(
            report.with_source(&map, false).to_string(),
            "error: missing symbol `main`\n"
        );
    }
}
