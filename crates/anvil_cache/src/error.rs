//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Most read paths are fail-safe: a corrupt manifest or artifact reads
/// as a cache miss rather than surfacing one of these. This enum covers
/// the write paths and dependency reads, where failure must abort the
/// unit's build.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A declared dependency or extra source could not be read while
    /// computing the composite key.
    #[error("failed to read dependency {path}: {source}")]
    DependencyRead {
        /// The dependency path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A serialization or deserialization error occurred.
    #[error("cache serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = CacheError::Io {
            path: PathBuf::from("/tmp/cache/manifest.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cache I/O error"));
        assert!(msg.contains("manifest.json"));
    }

    #[test]
    fn dependency_read_display() {
        let err = CacheError::DependencyRead {
            path: PathBuf::from("thing.h"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("failed to read dependency thing.h"));
    }

    #[test]
    fn serialization_display() {
        let err = CacheError::Serialization {
            reason: "bad record".to_string(),
        };
        assert!(err.to_string().contains("bad record"));
    }
}
