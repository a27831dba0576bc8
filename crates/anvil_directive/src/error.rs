//! Error types for directive extraction and evaluation.

use anvil_config::ConfigError;
use std::path::PathBuf;

/// Errors that can occur while extracting or evaluating a directive block.
///
/// The absence of a directive block is not an error; extraction returns
/// `None` and resolution proceeds with defaults.
#[derive(Debug, thiserror::Error)]
pub enum DirectiveError {
    /// The directive block is malformed.
    #[error("{path}:{line}: directive syntax error: {reason}")]
    Syntax {
        /// The source file containing the block.
        path: PathBuf,
        /// 1-indexed line number of the offending statement.
        line: u32,
        /// The text of the offending line.
        text: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A configuration mutation failed (shape conflict).
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DirectiveError {
    /// Convenience constructor for syntax errors.
    pub fn syntax(
        path: &std::path::Path,
        line: u32,
        text: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DirectiveError::Syntax {
            path: path.to_path_buf(),
            line,
            text: text.into(),
            reason: reason.into(),
        }
    }
}
