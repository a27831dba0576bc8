//! Error types for source loading and module location.

use std::path::PathBuf;

/// Errors that can occur while loading source files or locating modules.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// An I/O error occurred while reading a source file.
    #[error("failed to read source {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file extension is not a recognized native-module source.
    #[error("unrecognized source extension for {path}")]
    UnrecognizedExtension {
        /// The offending path.
        path: PathBuf,
    },

    /// No source file matching the module name was found on the search path.
    #[error("no source file found for module '{module}' (searched {searched} directories)")]
    ModuleNotFound {
        /// The dotted module name that was requested.
        module: String,
        /// How many directories were searched.
        searched: usize,
    },
}
