//! Merging directive-populated configuration with defaults into an
//! immutable snapshot.

use crate::bindgen::Bindgen;
use crate::error::ConfigError;
use crate::settings::Settings;
use crate::types::{BuildConfig, ConfigKey, Value};
use anvil_common::ContentHash;
use anvil_source::{SourceKind, SourceUnit};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// An immutable, fully-merged build configuration for one source unit.
///
/// Produced by [`resolve`]; nothing mutates it afterwards. The compiler
/// invoker consumes it directly and the build cache hashes it via
/// [`config_hash`](ResolvedConfig::config_hash).
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// The module name the artifact must export an entry point for.
    pub module_name: String,
    /// The primary source file.
    pub source_path: PathBuf,
    /// The source language of the primary file.
    pub kind: SourceKind,
    /// Compiler arguments, defaults first.
    pub compiler_args: Vec<String>,
    /// Linker arguments.
    pub linker_args: Vec<String>,
    /// Include directories, absolutized.
    pub include_dirs: Vec<PathBuf>,
    /// Library search directories, absolutized.
    pub library_dirs: Vec<PathBuf>,
    /// Libraries to link against.
    pub libraries: Vec<String>,
    /// Extra source files compiled into the module, absolutized.
    pub sources: Vec<PathBuf>,
    /// Declared dependency files, absolutized. These participate in
    /// cache invalidation but are not compiled.
    pub dependencies: Vec<PathBuf>,
    /// Whether extra translation units may compile concurrently.
    pub parallel: bool,
}

impl ResolvedConfig {
    /// A deterministic hash of this snapshot for cache keying.
    pub fn config_hash(&self) -> ContentHash {
        // Field order is fixed by the struct definition, so the JSON
        // form is canonical.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        ContentHash::from_bytes(&bytes)
    }

    /// A copy of this snapshot compiling a substitute primary source.
    ///
    /// Script-form directive blocks are stripped into a rendered copy of
    /// the source before compilation; the rendered file stands in as the
    /// primary translation unit while cache keys stay tied to the
    /// original.
    pub fn with_primary_source(&self, source_path: PathBuf) -> ResolvedConfig {
        ResolvedConfig {
            source_path,
            ..self.clone()
        }
    }
}

/// Merges a directive-populated [`BuildConfig`] with defaults.
///
/// Defaults: the configured standard flag, the binding layer's two
/// include directories, and the source file's own directory. Scalar keys
/// override defaults; list keys append to them unless the directive
/// explicitly cleared the key. Relative paths are absolutized against
/// the source file's directory.
pub fn resolve(
    unit: &SourceUnit,
    directives: &BuildConfig,
    settings: &Settings,
    bindgen: &Bindgen,
) -> Result<ResolvedConfig, ConfigError> {
    validate_shapes(directives)?;

    let base = unit.dir();

    let directive_args = string_items(directives, ConfigKey::CompilerArgs);
    let mut compiler_args = Vec::new();
    let has_std_override = directive_args.iter().any(|a| a.starts_with("-std="));
    if !has_std_override && !directives.is_cleared(ConfigKey::CompilerArgs) {
        compiler_args.push(settings.std_flag());
    }
    compiler_args.extend(directive_args);

    let mut include_dirs = Vec::new();
    if !directives.is_cleared(ConfigKey::IncludeDirs) {
        include_dirs.push(bindgen.include(false).to_path_buf());
        include_dirs.push(bindgen.include(true).to_path_buf());
        include_dirs.push(base.to_path_buf());
    }
    include_dirs.extend(path_items(directives, ConfigKey::IncludeDirs, base));
    dedup_paths(&mut include_dirs);

    let parallel = match directives.get(ConfigKey::Parallel) {
        Some(Value::Bool(b)) => *b,
        _ => false,
    };

    Ok(ResolvedConfig {
        module_name: unit.module_name().to_string(),
        source_path: unit.path.clone(),
        kind: unit.kind,
        compiler_args,
        linker_args: string_items(directives, ConfigKey::LinkerArgs),
        include_dirs,
        library_dirs: path_items(directives, ConfigKey::LibraryDirs, base),
        libraries: string_items(directives, ConfigKey::Libraries),
        sources: path_items(directives, ConfigKey::Sources, base),
        dependencies: path_items(directives, ConfigKey::Dependencies, base),
        parallel,
    })
}

/// Checks every assigned key against its schema shape.
///
/// `parallel` is the single scalar key and must hold a boolean; every
/// other key must hold a list.
fn validate_shapes(directives: &BuildConfig) -> Result<(), ConfigError> {
    for key in ConfigKey::ALL {
        if let Some(value) = directives.get(key) {
            let matches_schema = match key.schema_shape() {
                crate::types::Shape::List => matches!(value, Value::List(_)),
                crate::types::Shape::Scalar => matches!(value, Value::Bool(_)),
            };
            if !matches_schema {
                return Err(ConfigError::Conflict {
                    key: key.name().to_string(),
                    first: key.schema_shape(),
                    second: value.shape(),
                });
            }
        }
    }
    Ok(())
}

/// Extracts a list key's items as strings.
fn string_items(directives: &BuildConfig, key: ConfigKey) -> Vec<String> {
    match directives.get(key) {
        Some(Value::List(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Extracts a list key's items as paths absolutized against `base`.
fn path_items(directives: &BuildConfig, key: ConfigKey, base: &Path) -> Vec<PathBuf> {
    string_items(directives, key)
        .into_iter()
        .map(|s| make_absolute(base, Path::new(&s)))
        .collect()
}

/// Absolutizes `path` against `base` unless it is already absolute.
pub fn make_absolute(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Removes duplicate paths, keeping the first occurrence of each.
fn dedup_paths(paths: &mut Vec<PathBuf>) {
    let mut seen = std::collections::HashSet::new();
    paths.retain(|p| seen.insert(p.clone()));
}
