//! Error types for configuration assembly and settings loading.

use crate::types::Shape;

/// Errors that can occur while assembling a build configuration or
/// loading tool settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Two directive statements assigned incompatible shapes to one key,
    /// or a key's final value does not match its schema shape.
    #[error("conflicting types for '{key}': {first}, then {second}")]
    Conflict {
        /// The configuration key with conflicting assignments.
        key: String,
        /// The shape established first (or expected by the schema).
        first: Shape,
        /// The shape of the offending assignment.
        second: Shape,
    },

    /// An I/O error occurred while reading the settings file.
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file could not be parsed.
    #[error("failed to parse settings: {0}")]
    Parse(String),
}
