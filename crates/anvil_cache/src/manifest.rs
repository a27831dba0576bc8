//! Cache manifest tracking per-unit build state.
//!
//! The manifest is stored as `manifest.json` in the cache directory. It
//! records the composite key and artifact file for every built source
//! unit, enabling hit detection without touching the compiler.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anvil_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Name of the manifest file within the cache directory.
const MANIFEST_FILE: &str = "manifest.json";

/// Top-level cache manifest tracking all built units.
///
/// Serialized as `manifest.json` in the cache directory and versioned by
/// the tool version that produced it; a version mismatch discards the
/// whole manifest rather than trusting stale entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Tool version that produced this cache.
    pub tool_version: String,

    /// Per-unit cache state, keyed by the primary source path.
    pub units: HashMap<PathBuf, UnitCache>,
}

/// Cached state for a single source unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitCache {
    /// Composite key over source content, resolved config, and
    /// dependency contents at build time.
    pub composite_key: ContentHash,

    /// File name of the artifact within the module store.
    pub artifact_file: String,

    /// The module name the artifact exports an entry point for.
    pub module_name: String,

    /// Declared dependencies and extra sources captured at build time.
    pub inputs: Vec<PathBuf>,

    /// Build time, seconds since the Unix epoch.
    pub built_at: u64,
}

impl CacheManifest {
    /// Creates a new, empty manifest for the given tool version.
    pub fn new(tool_version: &str) -> Self {
        Self {
            tool_version: tool_version.to_string(),
            units: HashMap::new(),
        }
    }

    /// Loads the manifest from the cache directory, returning `None` if
    /// the file doesn't exist or can't be parsed.
    ///
    /// This is fail-safe: any error results in `None`, triggering a full
    /// rebuild.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let path = cache_dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Saves the manifest to the cache directory, creating it if needed.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(cache_dir).map_err(|e| CacheError::Io {
            path: cache_dir.to_path_buf(),
            source: e,
        })?;
        let path = cache_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| CacheError::Io { path, source: e })
    }

    /// Returns `true` if this manifest was produced by a compatible tool
    /// version.
    pub fn is_compatible(&self, current_version: &str) -> bool {
        self.tool_version == current_version
    }
}
