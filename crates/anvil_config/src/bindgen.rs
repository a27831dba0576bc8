//! The opaque binding-layer collaborator.
//!
//! The resolver and the `setup_bindgen(cfg)` directive call need the
//! binding library's include directories. The library is external; all
//! this tool sees of it is a two-valued query returning the system-site
//! and user-site include paths.

use std::path::{Path, PathBuf};

/// Environment variable overriding the system-site include directory.
pub const SYSTEM_INCLUDE_ENV: &str = "ANVIL_BINDGEN_INCLUDE";

/// Environment variable overriding the user-site include directory.
pub const USER_INCLUDE_ENV: &str = "ANVIL_BINDGEN_USER_INCLUDE";

/// Handle to the binding layer's include-directory query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindgen {
    system_include: PathBuf,
    user_include: PathBuf,
}

impl Bindgen {
    /// Creates a handle with explicit include directories.
    pub fn new(system_include: PathBuf, user_include: PathBuf) -> Self {
        Self {
            system_include,
            user_include,
        }
    }

    /// Creates a handle from the environment, falling back to the
    /// conventional install locations.
    pub fn from_env() -> Self {
        let system_include = std::env::var(SYSTEM_INCLUDE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/usr/local/include"));
        let user_include = std::env::var(USER_INCLUDE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                Path::new(&home).join(".local/include")
            });
        Self {
            system_include,
            user_include,
        }
    }

    /// The include query: `include(false)` is the system-site path,
    /// `include(true)` the user-site path.
    pub fn include(&self, user: bool) -> &Path {
        if user {
            &self.user_include
        } else {
            &self.system_include
        }
    }
}
