//! The unified error type of the import pipeline.

use anvil_build::BuildError;
use anvil_cache::{CacheError, GetOrBuildError};
use anvil_config::ConfigError;
use anvil_directive::DirectiveError;
use anvil_loader::LoadError;
use anvil_source::SourceError;

/// Any failure that aborts a single unit's import.
///
/// Every variant is fatal for the offending unit and harmless to every
/// other unit and to the cache: failed builds are never recorded.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Reading or locating the source file failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The directive block is malformed.
    #[error(transparent)]
    Directive(#[from] DirectiveError),

    /// Configuration resolution failed (type conflict).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A cache-side failure.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The compiler failed. Terminal, never retried.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// The artifact could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The scratch build directory could not be created.
    #[error("failed to create build directory: {0}")]
    Scratch(std::io::Error),
}

impl From<GetOrBuildError<BuildError>> for ImportError {
    fn from(err: GetOrBuildError<BuildError>) -> Self {
        match err {
            GetOrBuildError::Cache(e) => ImportError::Cache(e),
            GetOrBuildError::Build(e) => ImportError::Build(e),
        }
    }
}

impl ImportError {
    /// Stable short code naming the failure class, for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::Source(_) => "source",
            ImportError::Directive(DirectiveError::Syntax { .. }) => "directive-syntax",
            ImportError::Directive(DirectiveError::Config(_)) => "config-conflict",
            ImportError::Config(_) => "config-conflict",
            ImportError::Cache(_) => "cache",
            ImportError::Build(_) => "compile",
            ImportError::Load(_) => "load",
            ImportError::Scratch(_) => "scratch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let err = ImportError::Config(ConfigError::Conflict {
            key: "sources".to_string(),
            first: anvil_config::Shape::Scalar,
            second: anvil_config::Shape::List,
        });
        assert_eq!(err.code(), "config-conflict");

        let err = ImportError::Build(BuildError::Compile {
            exit_code: 1,
            stderr: String::new(),
        });
        assert_eq!(err.code(), "compile");
    }

    #[test]
    fn get_or_build_error_maps() {
        let err: ImportError = GetOrBuildError::Build(BuildError::Compile {
            exit_code: 2,
            stderr: "boom".to_string(),
        })
        .into();
        assert!(matches!(err, ImportError::Build(_)));
    }
}
