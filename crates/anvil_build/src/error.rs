//! Error types for compiler invocation.

use std::path::PathBuf;

/// Errors that can occur while invoking the native toolchain.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The compiler exited with a nonzero status. Terminal for this
    /// build attempt; the stderr text is the report.
    #[error("compiler exited with status {exit_code}:\n{stderr}")]
    Compile {
        /// The compiler's exit code (-1 when killed by a signal).
        exit_code: i32,
        /// Everything the compiler wrote to stderr.
        stderr: String,
    },

    /// The compiler executable could not be started.
    #[error("failed to run compiler '{compiler}': {source}")]
    Toolchain {
        /// The compiler executable that failed to start.
        compiler: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The compiler exceeded the configured time bound and was killed.
    #[error("compiler '{compiler}' timed out after {secs}s")]
    Timeout {
        /// The compiler executable.
        compiler: String,
        /// The configured bound in seconds.
        secs: u64,
    },

    /// An I/O error in the build scratch area.
    #[error("build I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
