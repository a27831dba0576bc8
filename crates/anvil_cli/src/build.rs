//! The `anvil build` subcommand.

use std::path::Path;

use anvil_cache::BuildOutcome;
use anvil_diagnostics::{render_json, render_text, Diagnostic};
use anvil_importer::{BuildReport, ImportError, Importer, UnitState};

use crate::{load_settings_for, BuildArgs, GlobalArgs, ReportFormat};

/// Builds every requested file or directory tree.
///
/// Exit code 0 when every unit built, 1 when any failed. One unit's
/// failure never stops the remaining units.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut settings = load_settings_for(global)?;
    if args.force {
        settings.build.force_rebuild = true;
    }
    let importer = Importer::new(settings);

    let mut reports = Vec::new();
    let defaults = vec![".".to_string()];
    let paths = if args.paths.is_empty() {
        &defaults
    } else {
        &args.paths
    };

    for raw in paths {
        let path = Path::new(raw);
        if path.is_file() {
            reports.push(build_one(&importer, path));
        } else if path.is_dir() {
            reports.extend(importer.build_all(path)?);
        } else {
            return Err(format!("no such file or directory: {raw}").into());
        }
    }

    let mut failures = 0;
    for report in &reports {
        match (&report.error, report.outcome) {
            (Some(error), _) => {
                failures += 1;
                emit_failure(report, error, args.format, global);
            }
            (None, outcome) => {
                if global.verbose {
                    let verdict = match outcome {
                        Some(BuildOutcome::Hit) => "cached",
                        _ => "compiled",
                    };
                    eprintln!("{verdict} {}", report.path.display());
                }
            }
        }
    }

    if !global.quiet {
        eprintln!(
            "{} module(s) up to date, {} failed",
            reports.len() - failures,
            failures
        );
    }

    Ok(if failures > 0 { 1 } else { 0 })
}

/// Builds a single explicitly-named file into a report.
fn build_one(importer: &Importer, path: &Path) -> BuildReport {
    match importer.build_from_path(path) {
        Ok((_, outcome)) => BuildReport {
            path: path.to_path_buf(),
            state: match outcome {
                BuildOutcome::Hit => UnitState::CacheHit,
                BuildOutcome::Rebuilt => UnitState::Compiling,
            },
            outcome: Some(outcome),
            error: None,
        },
        Err(error) => BuildReport {
            path: path.to_path_buf(),
            state: UnitState::Failed,
            outcome: None,
            error: Some(error),
        },
    }
}

/// Renders one unit's failure to stderr.
fn emit_failure(report: &BuildReport, error: &ImportError, format: ReportFormat, global: &GlobalArgs) {
    let diag = to_diagnostic(&report.path, error);
    match format {
        ReportFormat::Json => eprintln!("{}", render_json(&diag)),
        ReportFormat::Text => {
            let text = render_text(&diag);
            if global.color {
                // Color only the severity prefix on the first line.
                eprint!("{}", colorize_first_line(&text));
            } else {
                eprint!("{text}");
            }
        }
    }
}

/// Maps a pipeline error into a structured diagnostic.
///
/// Syntax errors carry the statement text with comment prefixes already
/// stripped; the source file is re-read so the rendered snippet shows
/// the line as written.
fn to_diagnostic(path: &Path, error: &ImportError) -> Diagnostic {
    let mut diag = Diagnostic::error(error.code(), error.to_string(), path.to_path_buf());
    if let ImportError::Directive(anvil_directive::DirectiveError::Syntax {
        line, text, ..
    }) = error
    {
        let snippet = anvil_source::SourceUnit::load(path)
            .ok()
            .and_then(|unit| unit.line_text(*line).map(str::to_string))
            .unwrap_or_else(|| text.clone());
        diag = diag.with_line(*line, snippet);
    }
    diag
}

fn colorize_first_line(text: &str) -> String {
    match text.split_once('\n') {
        Some((first, rest)) => format!("\x1b[31m{first}\x1b[0m\n{rest}"),
        None => format!("\x1b[31m{text}\x1b[0m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_config::Shape;

    #[test]
    fn diagnostic_from_syntax_error_carries_line() {
        let error = ImportError::Directive(anvil_directive::DirectiveError::Syntax {
            path: std::path::PathBuf::from("m.cpp"),
            line: 3,
            text: "cfg['bogus'] = ['x']".to_string(),
            reason: "unknown configuration key 'bogus'".to_string(),
        });
        let diag = to_diagnostic(Path::new("m.cpp"), &error);
        assert_eq!(diag.code, "directive-syntax");
        assert_eq!(diag.line, Some(3));
        assert!(diag.message.contains("unknown configuration key"));
    }

    #[test]
    fn diagnostic_from_conflict_has_no_line() {
        let error = ImportError::Config(anvil_config::ConfigError::Conflict {
            key: "sources".to_string(),
            first: Shape::Scalar,
            second: Shape::List,
        });
        let diag = to_diagnostic(Path::new("m.cpp"), &error);
        assert_eq!(diag.code, "config-conflict");
        assert!(diag.line.is_none());
    }

    #[test]
    fn colorize_wraps_first_line_only() {
        let out = colorize_first_line("error[x]: boom\n  --> m.cpp\n");
        assert!(out.starts_with("\x1b[31merror[x]: boom\x1b[0m\n"));
        assert!(out.contains("  --> m.cpp"));
    }
}
