//! Diagnostics for everything the assembler reports, and their rendering.
//!
//! Errors found while assembling carry the span of the offending statement and one
//! note per enclosing `.INCLUDE`. Diagnostics that belong to no source, such as an
//! unreadable input file, have no span and render as a single line.

use std::collections::HashMap;
use std::fmt;

use ariadne::{Cache, Color, Config, IndexType, Label, Report, ReportKind, Source};

use crate::span::{SourceId, SourceMap, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn report_kind(self) -> ReportKind<'static> {
        match self {
            Self::Error => ReportKind::Error,
            Self::Warning => ReportKind::Warning,
        }
    }

    fn color(self) -> Color {
        match self {
            Self::Error => Color::Red,
            Self::Warning => Color::Yellow,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Supplemental {
    Help(String),
    Note(String),
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub primary: Option<Span>,
    pub supplements: Vec<Supplemental>,
}

impl Diagnostic {
    fn new(severity: Severity, primary: Option<Span>, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            primary,
            supplements: Vec::new(),
        }
    }

    pub fn error(primary: Span, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, Some(primary), message)
    }

    pub fn warning(primary: Span, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, Some(primary), message)
    }

    /// An error tied to no source text.
    pub fn error_without_span(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, None, message)
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.supplements.push(Supplemental::Help(help.into()));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.supplements.push(Supplemental::Note(note.into()));
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

struct SourceMapCache<'a> {
    source_map: &'a SourceMap,
    sources: HashMap<SourceId, Source<&'a str>>,
}

impl<'a> Cache<SourceId> for SourceMapCache<'a> {
    type Storage = &'a str;

    fn fetch(&mut self, id: &SourceId) -> Result<&Source<Self::Storage>, impl fmt::Debug> {
        let Some(file) = self.source_map.get(*id) else {
            return Err(format!("no source registered for {id:?}"));
        };
        Ok(self
            .sources
            .entry(*id)
            .or_insert_with(|| Source::from(file.text.as_str())))
    }

    fn display<'b>(&self, id: &'b SourceId) -> Option<impl fmt::Display + 'b> {
        self.source_map.get(*id).map(|file| file.name.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub color: bool,
}

impl RenderOptions {
    pub const fn plain() -> Self {
        Self { color: false }
    }

    pub const fn colored() -> Self {
        Self { color: true }
    }
}

pub fn render_diagnostic(source_map: &SourceMap, diagnostic: &Diagnostic) -> String {
    render_diagnostic_with_options(source_map, diagnostic, RenderOptions::plain())
}

pub fn render_diagnostic_with_options(
    source_map: &SourceMap,
    diagnostic: &Diagnostic,
    options: RenderOptions,
) -> String {
    let Some(primary) = diagnostic
        .primary
        .filter(|span| source_map.get(span.source_id).is_some())
    else {
        return render_plain(diagnostic, None);
    };

    let span = (primary.source_id, primary.as_range());
    let mut report = Report::build(diagnostic.severity.report_kind(), span.clone())
        .with_config(
            Config::default()
                .with_index_type(IndexType::Byte)
                .with_color(options.color),
        )
        .with_message(&diagnostic.message)
        .with_label(Label::new(span).with_color(diagnostic.severity.color()));
    for supplement in &diagnostic.supplements {
        report = match supplement {
            Supplemental::Help(help) => report.with_help(help),
            Supplemental::Note(note) => report.with_note(note),
        };
    }

    let mut output = Vec::new();
    let mut cache = SourceMapCache {
        source_map,
        sources: HashMap::new(),
    };
    match report.finish().write(&mut cache, &mut output) {
        Ok(()) => String::from_utf8_lossy(&output).into_owned(),
        Err(_) => render_plain(diagnostic, source_map.position(primary)),
    }
}

/// `error: message`, the position on its own line when known, then help and notes.
fn render_plain(diagnostic: &Diagnostic, position: Option<String>) -> String {
    let mut rendered = diagnostic.to_string();
    if let Some(position) = position {
        rendered.push_str(&format!("\n --> {position}"));
    }
    for supplement in &diagnostic.supplements {
        match supplement {
            Supplemental::Help(help) => rendered.push_str(&format!("\nHelp: {help}")),
            Supplemental::Note(note) => rendered.push_str(&format!("\nNote: {note}")),
        }
    }
    rendered.push('\n');
    rendered
}

pub fn render_diagnostics(source_map: &SourceMap, diagnostics: &[Diagnostic]) -> String {
    render_diagnostics_with_options(source_map, diagnostics, RenderOptions::plain())
}

pub fn render_diagnostics_with_options(
    source_map: &SourceMap,
    diagnostics: &[Diagnostic],
    options: RenderOptions,
) -> String {
    diagnostics
        .iter()
        .map(|diagnostic| render_diagnostic_with_options(source_map, diagnostic, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_message_file_and_include_notes() {
        let mut sources = SourceMap::default();
        let source_id = sources.add_source("main.s", "    lda #1\n    foo\n");
        let diagnostic = Diagnostic::error(Span::new(source_id, 15, 18), "unknown opcode 'foo'")
            .with_note("included from boot.s:3");
        let rendered = render_diagnostic(&sources, &diagnostic);
        assert!(rendered.contains("unknown opcode 'foo'"), "{rendered}");
        assert!(rendered.contains("main.s"), "{rendered}");
        assert!(rendered.contains("included from boot.s:3"), "{rendered}");
    }

    #[test]
    fn diagnostics_without_source_render_on_one_line() {
        let sources = SourceMap::default();
        let diagnostic = Diagnostic::error_without_span("cannot read 'game.s'")
            .with_help("check the input path");
        assert_eq!(
            render_diagnostic(&sources, &diagnostic),
            "error: cannot read 'game.s'\nHelp: check the input path\n"
        );

        let lost = Diagnostic::warning(Span::new(SourceId(7), 0, 1), "unterminated block comment");
        assert_eq!(render_diagnostic(&sources, &lost), "warning: unterminated block comment\n");
    }

    #[test]
    fn renders_every_diagnostic_in_order() {
        let mut sources = SourceMap::default();
        let source_id = sources.add_source("main.s", "    nop /*\n");
        let diagnostics = [
            Diagnostic::warning(Span::new(source_id, 8, 10), "unterminated block comment"),
            Diagnostic::error_without_span("assembly stopped"),
        ];
        let rendered = render_diagnostics(&sources, &diagnostics);
        let warning = rendered.find("unterminated block comment").expect("warning");
        let error = rendered.find("assembly stopped").expect("error");
        assert!(warning < error);
    }
}
