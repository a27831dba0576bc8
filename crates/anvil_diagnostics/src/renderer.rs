//! Diagnostic rendering for terminal and machine-readable output.

use crate::diagnostic::Diagnostic;

/// Renders a diagnostic in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// error[directive-syntax]: unknown configuration key 'bogus'
///   --> fixtures/mymod.cpp:3
///   3 | cfg['bogus'] = ['x']
///    = note: recognized keys: compiler_args, include_dirs, ...
/// ```
pub fn render_text(diag: &Diagnostic) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{}[{}]: {}\n",
        diag.severity, diag.code, diag.message
    ));

    match diag.line {
        Some(line) => {
            out.push_str(&format!("  --> {}:{line}\n", diag.file.display()));
            if let Some(text) = &diag.line_text {
                out.push_str(&format!("  {line} | {text}\n"));
            }
        }
        None => {
            out.push_str(&format!("  --> {}\n", diag.file.display()));
        }
    }

    for note in &diag.notes {
        out.push_str(&format!("   = note: {note}\n"));
    }

    out
}

/// Renders a diagnostic as a single-line JSON object.
pub fn render_json(diag: &Diagnostic) -> String {
    // Diagnostic is a plain serde struct; serialization cannot fail.
    serde_json::to_string(diag).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Severity;
    use std::path::PathBuf;

    #[test]
    fn render_error_with_line() {
        let diag = Diagnostic::error(
            "directive-syntax",
            "unknown configuration key 'bogus'",
            PathBuf::from("fixtures/mymod.cpp"),
        )
        .with_line(3, "cfg['bogus'] = ['x']")
        .with_note("recognized keys: compiler_args, include_dirs");

        let output = render_text(&diag);
        assert!(output.contains("error[directive-syntax]: unknown configuration key 'bogus'"));
        assert!(output.contains("--> fixtures/mymod.cpp:3"));
        assert!(output.contains("3 | cfg['bogus'] = ['x']"));
        assert!(output.contains("= note: recognized keys"));
    }

    #[test]
    fn render_error_without_line() {
        let diag = Diagnostic::error("compile", "compiler exited with 1", PathBuf::from("m.cpp"));
        let output = render_text(&diag);
        assert!(output.contains("error[compile]: compiler exited with 1"));
        assert!(output.contains("--> m.cpp\n"));
        assert!(!output.contains(" | "));
    }

    #[test]
    fn render_json_roundtrip() {
        let diag = Diagnostic::error("load", "missing entry symbol", PathBuf::from("m.cpp"))
            .with_line(1, "// anvil");
        let json = render_json(&diag);
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back.severity, Severity::Error);
        assert_eq!(back.code, "load");
        assert_eq!(back.line, Some(1));
    }
}
