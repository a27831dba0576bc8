//! Tool-level settings loaded from an optional `anvil.toml`.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the settings file looked up in the working directory.
pub const SETTINGS_FILE: &str = "anvil.toml";

/// Tool-level settings controlling how units are discovered, compiled,
/// and cached.
///
/// Every field has a default; a missing `anvil.toml` is not an error.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    /// Source discovery settings.
    #[serde(default)]
    pub source: SourceSettings,
    /// Build behavior settings.
    #[serde(default)]
    pub build: BuildSettings,
    /// Toolchain override settings.
    #[serde(default)]
    pub toolchain: ToolchainSettings,
    /// Cache location settings.
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Which files are eligible native-module sources.
#[derive(Debug, Deserialize)]
pub struct SourceSettings {
    /// Recognized file extensions, in lookup order.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec![".cpp".to_string(), ".c".to_string()]
}

/// Build behavior: rebuild policy, language standard, compile timeout.
#[derive(Debug, Deserialize)]
pub struct BuildSettings {
    /// Always recompile, ignoring cache hits.
    #[serde(default)]
    pub force_rebuild: bool,
    /// Never recompile; trust whatever artifact the cache holds.
    #[serde(default)]
    pub release_mode: bool,
    /// Default language standard injected when a directive does not
    /// specify one (e.g. `c++11`).
    #[serde(default = "default_std")]
    pub std: String,
    /// Upper bound on a single compiler invocation, in seconds.
    /// Absent means wait indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            force_rebuild: false,
            release_mode: false,
            std: default_std(),
            timeout_secs: None,
        }
    }
}

fn default_std() -> String {
    "c++11".to_string()
}

/// Compiler overrides. Unset fields fall back to the `CXX`/`CC`
/// environment variables, then to `c++`/`cc`.
#[derive(Debug, Default, Deserialize)]
pub struct ToolchainSettings {
    /// C++ compiler executable.
    pub cxx: Option<String>,
    /// C compiler executable.
    pub cc: Option<String>,
}

/// Where compiled artifacts and the manifest live.
#[derive(Debug, Default, Deserialize)]
pub struct CacheSettings {
    /// Cache directory override. Defaults to `.anvil-cache` in the
    /// working directory (or `ANVIL_CACHE_DIR` when set).
    pub dir: Option<PathBuf>,
}

impl Settings {
    /// Resolves the cache directory: explicit setting, then the
    /// `ANVIL_CACHE_DIR` environment variable, then `.anvil-cache`.
    pub fn cache_dir(&self) -> PathBuf {
        if let Some(dir) = &self.cache.dir {
            return dir.clone();
        }
        if let Ok(dir) = std::env::var("ANVIL_CACHE_DIR") {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }
        PathBuf::from(".anvil-cache")
    }

    /// The standard flag injected into default compiler arguments.
    pub fn std_flag(&self) -> String {
        format!("-std={}", self.build.std)
    }
}

/// Loads settings from `<dir>/anvil.toml`, falling back to defaults when
/// the file does not exist.
pub fn load_settings(dir: &Path) -> Result<Settings, ConfigError> {
    let path = dir.join(SETTINGS_FILE);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(&path)?;
    load_settings_from_str(&content)
}

/// Parses settings from a TOML string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_settings_from_str(content: &str) -> Result<Settings, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.source.extensions, vec![".cpp", ".c"]);
        assert!(!s.build.force_rebuild);
        assert!(!s.build.release_mode);
        assert_eq!(s.build.std, "c++11");
        assert!(s.build.timeout_secs.is_none());
        assert!(s.toolchain.cxx.is_none());
        assert_eq!(s.std_flag(), "-std=c++11");
    }

    #[test]
    fn parse_full_settings() {
        let toml = r#"
[source]
extensions = [".cpp", ".cc", ".c"]

[build]
force_rebuild = true
std = "c++17"
timeout_secs = 120

[toolchain]
cxx = "clang++"
cc = "clang"

[cache]
dir = "/tmp/anvil-cache"
"#;
        let s = load_settings_from_str(toml).unwrap();
        assert_eq!(s.source.extensions.len(), 3);
        assert!(s.build.force_rebuild);
        assert_eq!(s.build.std, "c++17");
        assert_eq!(s.build.timeout_secs, Some(120));
        assert_eq!(s.toolchain.cxx.as_deref(), Some("clang++"));
        assert_eq!(s.cache_dir(), PathBuf::from("/tmp/anvil-cache"));
        assert_eq!(s.std_flag(), "-std=c++17");
    }

    #[test]
    fn partial_sections_use_defaults() {
        let toml = r#"
[build]
release_mode = true
"#;
        let s = load_settings_from_str(toml).unwrap();
        assert!(s.build.release_mode);
        assert_eq!(s.build.std, "c++11");
        assert_eq!(s.source.extensions, vec![".cpp", ".c"]);
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_settings_from_str("not toml {{{").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings(dir.path()).unwrap();
        assert_eq!(s.build.std, "c++11");
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "[build]\nstd = \"c++20\"\n").unwrap();
        let s = load_settings(dir.path()).unwrap();
        assert_eq!(s.build.std, "c++20");
    }

    #[test]
    fn explicit_cache_dir_wins() {
        let s = load_settings_from_str("[cache]\ndir = \"/x/y\"\n").unwrap();
        assert_eq!(s.cache_dir(), PathBuf::from("/x/y"));
    }
}
