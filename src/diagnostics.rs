use std::fmt;

use crate::source::SourceText;
use crate::token::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Elaboration attached to a preceding diagnostic.
    Note,
    /// A note not tied to a particular location.
    GenericNote,
    Warning,
    LexicalError,
    SyntaxError,
    SemanticError,
}

impl Severity {
    /// Blocking diagnostics stop the pipeline before code generation.
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            Severity::LexicalError | Severity::SyntaxError | Severity::SemanticError
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Note | Severity::GenericNote => "note",
            Severity::Warning => "warning",
            Severity::LexicalError => "lexical error",
            Severity::SyntaxError => "syntax error",
            Severity::SemanticError => "semantic error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::GenericNote => write!(f, "{}: {}", self.severity.label(), self.message),
            _ => write!(
                f,
                "{} at {}: {}",
                self.severity.label(),
                self.span,
                self.message
            ),
        }
    }
}

/// Append-only collector shared by the lexer, parser and semantic checker.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, severity: Severity, message: impl Into<String>, span: Span) {
        let diagnostic = Diagnostic {
            severity,
            message: message.into(),
            span,
        };
        log::debug!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub fn lexical_error(&mut self, message: impl Into<String>, span: Span) {
        self.report(Severity::LexicalError, message, span);
    }

    pub fn syntax_error(&mut self, message: impl Into<String>, span: Span) {
        self.report(Severity::SyntaxError, message, span);
    }

    pub fn semantic_error(&mut self, message: impl Into<String>, span: Span) {
        self.report(Severity::SemanticError, message, span);
    }

    pub fn warning(&mut self, message: impl Into<String>, span: Span) {
        self.report(Severity::Warning, message, span);
    }

    pub fn note(&mut self, message: impl Into<String>, span: Span) {
        self.report(Severity::Note, message, span);
    }

    pub fn generic_note(&mut self, message: impl Into<String>) {
        self.report(Severity::GenericNote, message, Span::default());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_blocking(&self) -> bool {
        self.entries.iter().any(|d| d.severity.is_blocking())
    }

    pub fn blocking(&self) -> Vec<&Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity.is_blocking())
            .collect()
    }

    pub fn advisory(&self) -> Vec<&Diagnostic> {
        self.entries
            .iter()
            .filter(|d| !d.severity.is_blocking())
            .collect()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<&Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == severity)
            .collect()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Plain-text rendering: each diagnostic followed by the line it points at.
    pub fn render(&self, source: &SourceText) -> String {
        let mut out = String::new();
        for diagnostic in &self.entries {
            out.push_str(&diagnostic.to_string());
            out.push('\n');
            if diagnostic.severity == Severity::GenericNote {
                continue;
            }
            if let Some(line) = source.line(diagnostic.span.line) {
                out.push_str("    ");
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separates_blocking_from_advisory() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warning("unused", Span::new(0, 0));
        diagnostics.note("see here", Span::new(0, 0));
        assert!(!diagnostics.has_blocking());

        diagnostics.semantic_error("bad", Span::new(1, 2));
        assert!(diagnostics.has_blocking());
        assert_eq!(diagnostics.blocking().len(), 1);
        assert_eq!(diagnostics.advisory().len(), 2);
        assert_eq!(diagnostics.count(Severity::SemanticError), 1);
    }

    #[test]
    fn renders_with_source_line() {
        let source = SourceText::new("var x : int;\nx := \"a\";\n", 4);
        let mut diagnostics = Diagnostics::new();
        diagnostics.semantic_error("type mismatch", Span::new(1, 0));
        diagnostics.generic_note("stopped");
        assert_eq!(
            diagnostics.render(&source),
            "semantic error at 2:1: type mismatch\n    x := \"a\";\nnote: stopped\n"
        );
    }
}
