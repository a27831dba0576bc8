//! Build configuration: directive-populated records, defaults, and the
//! merged immutable snapshot handed to the compiler invoker.
//!
//! This crate defines the fixed key vocabulary directives may write to,
//! the mutable [`BuildConfig`] record directive evaluation populates, the
//! [`resolve`] step that merges it with defaults into a [`ResolvedConfig`],
//! tool-level [`Settings`] loaded from `anvil.toml`, and the opaque
//! binding-layer collaborator supplying default include directories.

#![warn(missing_docs)]

pub mod bindgen;
pub mod error;
pub mod resolve;
pub mod settings;
pub mod types;

pub use bindgen::Bindgen;
pub use error::ConfigError;
pub use resolve::{resolve, ResolvedConfig};
pub use settings::{load_settings, load_settings_from_str, Settings};
pub use types::{BuildConfig, ConfigKey, Shape, Value};

/// The marker word a source file's head must contain to opt in to being
/// discovered and compiled by directory walks and search-path lookups.
pub const OPT_IN_MARKER: &str = "anvil";
