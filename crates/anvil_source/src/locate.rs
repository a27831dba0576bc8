//! Module location on a search path and discovery of buildable units.

use crate::error::SourceError;
use crate::source_unit::SourceKind;
use std::path::{Path, PathBuf};

/// Finds the source file for a dotted module name on a search path.
///
/// `pkg.inner.mymod` is looked up as `pkg/inner/mymod.<ext>` under each
/// search directory in order, trying each extension in `exts` order. When
/// `opt_in_marker` is set, candidate files whose first line does not
/// contain the marker are skipped; presence on the search path alone is
/// not consent to be compiled.
pub fn find_module_source(
    module: &str,
    search_paths: &[PathBuf],
    exts: &[String],
    opt_in_marker: Option<&str>,
) -> Result<PathBuf, SourceError> {
    let relative: PathBuf = module.split('.').collect();

    for dir in search_paths {
        if !dir.is_dir() {
            continue;
        }
        for ext in exts {
            let candidate = dir.join(relative.with_extension(ext.trim_start_matches('.')));
            if !candidate.is_file() {
                continue;
            }
            if let Some(marker) = opt_in_marker {
                if !first_line_contains(&candidate, marker) {
                    continue;
                }
            }
            return Ok(candidate);
        }
    }

    Err(SourceError::ModuleNotFound {
        module: module.to_string(),
        searched: search_paths.len(),
    })
}

/// Recursively discovers buildable source files under `root`.
///
/// A file is eligible when its extension names a recognized source kind
/// and its first line contains `marker`. Results are sorted by path for
/// deterministic build order.
pub fn discover_units(root: &Path, marker: &str) -> Result<Vec<PathBuf>, SourceError> {
    let mut found = Vec::new();
    walk_dir(root, marker, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk_dir(dir: &Path, marker: &str, found: &mut Vec<PathBuf>) -> Result<(), SourceError> {
    let entries = std::fs::read_dir(dir).map_err(|e| SourceError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| SourceError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            walk_dir(&path, marker, found)?;
        } else if SourceKind::from_path(&path).is_some() && first_line_contains(&path, marker) {
            found.push(path);
        }
    }
    Ok(())
}

/// Checks whether the first line of the file at `path` contains `marker`.
///
/// Unreadable files read as "no marker" so a single bad file cannot abort
/// a directory walk.
fn first_line_contains(path: &Path, marker: &str) -> bool {
    match std::fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .next()
            .map(|l| l.contains(marker))
            .unwrap_or(false),
        Err(_) => false,
    }
}
