//! The directive key vocabulary and the mutable build-config record.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// The fixed vocabulary of configuration keys directives may write to.
///
/// Directive evaluation is a restricted mutation language over exactly
/// these keys; anything else is rejected rather than executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKey {
    /// Extra compiler arguments (e.g. `-std=c++14`, `-O2`).
    CompilerArgs,
    /// Extra linker arguments.
    LinkerArgs,
    /// Additional include directories, relative to the source file.
    IncludeDirs,
    /// Additional library search directories.
    LibraryDirs,
    /// Libraries to link against (`-l` names).
    Libraries,
    /// Extra source files compiled into the same module.
    Sources,
    /// Files whose content participates in cache invalidation.
    Dependencies,
    /// Whether extra translation units may be compiled concurrently.
    Parallel,
}

impl ConfigKey {
    /// All keys, in canonical serialization order.
    pub const ALL: [ConfigKey; 8] = [
        ConfigKey::CompilerArgs,
        ConfigKey::LinkerArgs,
        ConfigKey::IncludeDirs,
        ConfigKey::LibraryDirs,
        ConfigKey::Libraries,
        ConfigKey::Sources,
        ConfigKey::Dependencies,
        ConfigKey::Parallel,
    ];

    /// Parses a key name, accepting the legacy aliases
    /// `extra_compile_args` and `extra_link_args`.
    pub fn parse(name: &str) -> Option<ConfigKey> {
        match name {
            "compiler_args" | "extra_compile_args" => Some(ConfigKey::CompilerArgs),
            "linker_args" | "extra_link_args" => Some(ConfigKey::LinkerArgs),
            "include_dirs" => Some(ConfigKey::IncludeDirs),
            "library_dirs" => Some(ConfigKey::LibraryDirs),
            "libraries" => Some(ConfigKey::Libraries),
            "sources" => Some(ConfigKey::Sources),
            "dependencies" => Some(ConfigKey::Dependencies),
            "parallel" => Some(ConfigKey::Parallel),
            _ => None,
        }
    }

    /// The canonical name of this key.
    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::CompilerArgs => "compiler_args",
            ConfigKey::LinkerArgs => "linker_args",
            ConfigKey::IncludeDirs => "include_dirs",
            ConfigKey::LibraryDirs => "library_dirs",
            ConfigKey::Libraries => "libraries",
            ConfigKey::Sources => "sources",
            ConfigKey::Dependencies => "dependencies",
            ConfigKey::Parallel => "parallel",
        }
    }

    /// The shape this key's value must have after resolution.
    pub fn schema_shape(self) -> Shape {
        match self {
            ConfigKey::Parallel => Shape::Scalar,
            _ => Shape::List,
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamically-shaped directive value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A string scalar.
    Str(String),
    /// A boolean scalar.
    Bool(bool),
    /// A list of strings.
    List(Vec<String>),
}

impl Value {
    /// The shape of this value.
    pub fn shape(&self) -> Shape {
        match self {
            Value::Str(_) | Value::Bool(_) => Shape::Scalar,
            Value::List(_) => Shape::List,
        }
    }
}

/// The shape of a configuration value: scalar or list.
///
/// Shape is what conflicts are detected over: assigning a scalar and
/// then a list (or the reverse) to the same key is a configuration bug,
/// not a merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// A single string or boolean.
    Scalar,
    /// A list of strings.
    List,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => f.write_str("scalar"),
            Shape::List => f.write_str("list"),
        }
    }
}

/// The mutable build-config record populated during directive evaluation.
///
/// Built fresh per build attempt and discarded after resolution. The
/// shape of each key is locked by its first assignment; a later
/// assignment of a different shape fails with
/// [`ConfigError::Conflict`]. Keys may also be explicitly cleared, which
/// suppresses their resolved defaults.
#[derive(Debug, Default)]
pub struct BuildConfig {
    values: HashMap<ConfigKey, Value>,
    cleared: HashSet<ConfigKey>,
}

impl BuildConfig {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a key, locking its shape on first assignment.
    pub fn set(&mut self, key: ConfigKey, value: Value) -> Result<(), ConfigError> {
        if let Some(existing) = self.values.get(&key) {
            if existing.shape() != value.shape() {
                return Err(ConfigError::Conflict {
                    key: key.name().to_string(),
                    first: existing.shape(),
                    second: value.shape(),
                });
            }
        }
        self.values.insert(key, value);
        Ok(())
    }

    /// Appends to a list-valued key (`+=`).
    ///
    /// The key must hold a list (or be unset), and the value must be a
    /// list; anything else is a shape conflict.
    pub fn append(&mut self, key: ConfigKey, value: Value) -> Result<(), ConfigError> {
        let Value::List(items) = value else {
            return Err(ConfigError::Conflict {
                key: key.name().to_string(),
                first: Shape::List,
                second: value.shape(),
            });
        };
        match self.values.get_mut(&key) {
            Some(Value::List(existing)) => {
                existing.extend(items);
                Ok(())
            }
            Some(other) => Err(ConfigError::Conflict {
                key: key.name().to_string(),
                first: other.shape(),
                second: Shape::List,
            }),
            None => {
                self.values.insert(key, Value::List(items));
                Ok(())
            }
        }
    }

    /// Prepends items to a list-valued key, keeping any existing items
    /// after the new ones.
    ///
    /// Used by `setup_bindgen` so a directive-specified standard flag
    /// appearing later on the command line wins over the injected one.
    pub fn prepend(&mut self, key: ConfigKey, items: Vec<String>) -> Result<(), ConfigError> {
        match self.values.get_mut(&key) {
            Some(Value::List(existing)) => {
                let mut merged = items;
                merged.append(existing);
                *existing = merged;
                Ok(())
            }
            Some(other) => Err(ConfigError::Conflict {
                key: key.name().to_string(),
                first: other.shape(),
                second: Shape::List,
            }),
            None => {
                self.values.insert(key, Value::List(items));
                Ok(())
            }
        }
    }

    /// Explicitly clears a list key, suppressing its resolved defaults.
    pub fn clear(&mut self, key: ConfigKey) -> Result<(), ConfigError> {
        if key.schema_shape() != Shape::List {
            return Err(ConfigError::Conflict {
                key: key.name().to_string(),
                first: Shape::Scalar,
                second: Shape::List,
            });
        }
        self.values.insert(key, Value::List(Vec::new()));
        self.cleared.insert(key);
        Ok(())
    }

    /// Returns the current value of a key, if assigned.
    pub fn get(&self, key: ConfigKey) -> Option<&Value> {
        self.values.get(&key)
    }

    /// Returns `true` if the key was explicitly cleared.
    pub fn is_cleared(&self, key: ConfigKey) -> bool {
        self.cleared.contains(&key)
    }

    /// Returns `true` if no directive wrote to this record.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.cleared.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_parse_canonical() {
        assert_eq!(ConfigKey::parse("sources"), Some(ConfigKey::Sources));
        assert_eq!(ConfigKey::parse("parallel"), Some(ConfigKey::Parallel));
        assert_eq!(ConfigKey::parse("bogus"), None);
    }

    #[test]
    fn key_parse_legacy_aliases() {
        assert_eq!(
            ConfigKey::parse("extra_compile_args"),
            Some(ConfigKey::CompilerArgs)
        );
        assert_eq!(
            ConfigKey::parse("extra_link_args"),
            Some(ConfigKey::LinkerArgs)
        );
    }

    #[test]
    fn key_names_roundtrip() {
        for key in ConfigKey::ALL {
            assert_eq!(ConfigKey::parse(key.name()), Some(key));
        }
    }

    #[test]
    fn set_and_get() {
        let mut cfg = BuildConfig::new();
        cfg.set(
            ConfigKey::CompilerArgs,
            Value::List(vec!["-std=c++14".to_string()]),
        )
        .unwrap();
        match cfg.get(ConfigKey::CompilerArgs) {
            Some(Value::List(items)) => assert_eq!(items, &["-std=c++14"]),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn shape_locked_by_first_assignment() {
        let mut cfg = BuildConfig::new();
        cfg.set(ConfigKey::Sources, Value::Str("one.cpp".to_string()))
            .unwrap();
        let err = cfg
            .set(
                ConfigKey::Sources,
                Value::List(vec!["two.cpp".to_string()]),
            )
            .unwrap_err();
        match err {
            ConfigError::Conflict { key, first, second } => {
                assert_eq!(key, "sources");
                assert_eq!(first, Shape::Scalar);
                assert_eq!(second, Shape::List);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn same_shape_reassignment_overrides() {
        let mut cfg = BuildConfig::new();
        cfg.set(ConfigKey::Parallel, Value::Bool(false)).unwrap();
        cfg.set(ConfigKey::Parallel, Value::Bool(true)).unwrap();
        assert_eq!(cfg.get(ConfigKey::Parallel), Some(&Value::Bool(true)));
    }

    #[test]
    fn append_extends_list() {
        let mut cfg = BuildConfig::new();
        cfg.set(ConfigKey::Libraries, Value::List(vec!["m".to_string()]))
            .unwrap();
        cfg.append(ConfigKey::Libraries, Value::List(vec!["dl".to_string()]))
            .unwrap();
        assert_eq!(
            cfg.get(ConfigKey::Libraries),
            Some(&Value::List(vec!["m".to_string(), "dl".to_string()]))
        );
    }

    #[test]
    fn append_to_unset_key() {
        let mut cfg = BuildConfig::new();
        cfg.append(
            ConfigKey::Dependencies,
            Value::List(vec!["thing.h".to_string()]),
        )
        .unwrap();
        assert_eq!(
            cfg.get(ConfigKey::Dependencies),
            Some(&Value::List(vec!["thing.h".to_string()]))
        );
    }

    #[test]
    fn append_scalar_conflicts() {
        let mut cfg = BuildConfig::new();
        let err = cfg
            .append(ConfigKey::Libraries, Value::Str("m".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Conflict { .. }));
    }

    #[test]
    fn append_to_scalar_conflicts() {
        let mut cfg = BuildConfig::new();
        cfg.set(ConfigKey::Libraries, Value::Str("m".to_string()))
            .unwrap();
        let err = cfg
            .append(ConfigKey::Libraries, Value::List(vec!["dl".to_string()]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Conflict { .. }));
    }

    #[test]
    fn prepend_orders_before_existing() {
        let mut cfg = BuildConfig::new();
        cfg.set(
            ConfigKey::CompilerArgs,
            Value::List(vec!["-std=c++17".to_string()]),
        )
        .unwrap();
        cfg.prepend(
            ConfigKey::CompilerArgs,
            vec!["-std=c++11".to_string(), "-fvisibility=hidden".to_string()],
        )
        .unwrap();
        assert_eq!(
            cfg.get(ConfigKey::CompilerArgs),
            Some(&Value::List(vec![
                "-std=c++11".to_string(),
                "-fvisibility=hidden".to_string(),
                "-std=c++17".to_string(),
            ]))
        );
    }

    #[test]
    fn clear_marks_key() {
        let mut cfg = BuildConfig::new();
        cfg.clear(ConfigKey::IncludeDirs).unwrap();
        assert!(cfg.is_cleared(ConfigKey::IncludeDirs));
        assert_eq!(
            cfg.get(ConfigKey::IncludeDirs),
            Some(&Value::List(Vec::new()))
        );
    }

    #[test]
    fn clear_scalar_key_conflicts() {
        let mut cfg = BuildConfig::new();
        assert!(cfg.clear(ConfigKey::Parallel).is_err());
    }

    #[test]
    fn empty_record() {
        let cfg = BuildConfig::new();
        assert!(cfg.is_empty());
        assert!(cfg.get(ConfigKey::Sources).is_none());
        assert!(!cfg.is_cleared(ConfigKey::Sources));
    }
}
