//! Error types for artifact loading.

use std::path::PathBuf;

/// Errors that can occur while loading a compiled artifact.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The shared object could not be opened at all.
    #[error("failed to open artifact {path}: {source}")]
    Open {
        /// The artifact path.
        path: PathBuf,
        /// The underlying loader error.
        source: libloading::Error,
    },

    /// Neither entry convention's symbol is exported for the expected
    /// module name. A fixture/name mismatch is a configuration bug, not
    /// a transient fault.
    #[error(
        "artifact {path} exports no entry point for module '{module}' \
         (expected '{register_symbol}' or '{init_symbol}')"
    )]
    MissingEntry {
        /// The module name the entry was expected for.
        module: String,
        /// The builder-reference symbol that was tried first.
        register_symbol: String,
        /// The legacy initializer symbol that was tried second.
        init_symbol: String,
        /// The artifact path.
        path: PathBuf,
    },

    /// The legacy initializer ran but returned a null module handle.
    #[error("initializer for module '{module}' returned a null handle")]
    InitFailed {
        /// The module whose initializer failed.
        module: String,
    },
}
