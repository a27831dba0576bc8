//! Structured diagnostic messages for per-unit build failures.

use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A structured diagnostic attached to a single build unit.
///
/// Carries a severity, a stable short code (`directive-syntax`,
/// `config-conflict`, `compile`, `load`), the offending file, and an
/// optional line location with the source text of that line.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// Stable machine-readable code identifying the failure class.
    pub code: String,
    /// The main diagnostic message.
    pub message: String,
    /// The source file the diagnostic refers to.
    pub file: PathBuf,
    /// 1-indexed line number, when the failure has one.
    pub line: Option<u32>,
    /// The text of the offending line, when available.
    pub line_text: Option<String>,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates a new error diagnostic for the given file.
    pub fn error(code: impl Into<String>, message: impl Into<String>, file: PathBuf) -> Self {
        Self {
            severity: Severity::Error,
            code: code.into(),
            message: message.into(),
            file,
            line: None,
            line_text: None,
            notes: Vec::new(),
        }
    }

    /// Creates a new warning diagnostic for the given file.
    pub fn warning(code: impl Into<String>, message: impl Into<String>, file: PathBuf) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message, file)
        }
    }

    /// Attaches a 1-indexed line number and its source text.
    pub fn with_line(mut self, line: u32, text: impl Into<String>) -> Self {
        self.line = Some(line);
        self.line_text = Some(text.into());
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_error() {
        let diag = Diagnostic::error("compile", "compiler exited with 1", PathBuf::from("m.cpp"));
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.code, "compile");
        assert!(diag.line.is_none());
    }

    #[test]
    fn create_warning() {
        let diag = Diagnostic::warning("stale-cache", "entry dropped", PathBuf::from("m.cpp"));
        assert_eq!(diag.severity, Severity::Warning);
    }

    #[test]
    fn builder_methods() {
        let diag = Diagnostic::error("directive-syntax", "unknown key", PathBuf::from("m.cpp"))
            .with_line(3, "cfg['bogus'] = 1")
            .with_note("recognized keys: compiler_args, include_dirs, sources, dependencies");
        assert_eq!(diag.line, Some(3));
        assert_eq!(diag.line_text.as_deref(), Some("cfg['bogus'] = 1"));
        assert_eq!(diag.notes.len(), 1);
    }
}
