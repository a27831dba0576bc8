//! High-level cache orchestrator.
//!
//! The `BuildCache` type ties together the manifest, module store, and
//! composite-key computation into the single `get_or_build` entry point
//! the build pipeline uses. It guarantees at most one compilation per
//! composite key even under concurrent requests, and never records a
//! failed build.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use anvil_common::ContentHash;
use anvil_config::ResolvedConfig;
use anvil_source::SourceUnit;

use crate::error::CacheError;
use crate::keys::composite_key;
use crate::manifest::{CacheManifest, UnitCache};
use crate::store::ModuleStore;

/// Rebuild policy knobs mirrored from tool settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct RebuildPolicy {
    /// Always recompile, ignoring cache hits.
    pub force_rebuild: bool,
    /// Never recompile; trust whatever artifact the manifest names.
    pub release_mode: bool,
}

/// A compiled, loadable module artifact owned by the cache.
///
/// The loader borrows the path; only cache invalidation or a source
/// change destroys the underlying file.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Path of the stored shared object.
    pub path: PathBuf,
    /// The composite key this artifact was built under.
    pub key: ContentHash,
    /// The module name the artifact exports an entry point for.
    pub module_name: String,
}

/// Whether `get_or_build` reused a cached artifact or compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// A valid cached artifact was returned; the compiler did not run.
    Hit,
    /// The artifact was (re)compiled and stored.
    Rebuilt,
}

/// Error from [`BuildCache::get_or_build`]: either a cache failure or
/// the caller's build failure, passed through untouched.
#[derive(Debug, thiserror::Error)]
pub enum GetOrBuildError<E: std::error::Error + 'static> {
    /// A cache-side failure (dependency read, store write, manifest save).
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The build closure failed. The failure is not cached.
    #[error(transparent)]
    Build(E),
}

/// High-level cache manager for incremental module builds.
pub struct BuildCache {
    /// Root directory for all cache files.
    cache_dir: PathBuf,

    /// Tool version string for compatibility checks.
    tool_version: String,

    /// Rebuild policy from settings.
    policy: RebuildPolicy,

    /// Content-addressed artifact store.
    store: ModuleStore,

    /// The manifest tracking per-unit state.
    manifest: Mutex<CacheManifest>,

    /// Per-composite-key build locks. Concurrent requesters for one key
    /// serialize here; the losers observe the winner's artifact.
    key_locks: Mutex<HashMap<ContentHash, Arc<Mutex<()>>>>,
}

impl BuildCache {
    /// Loads an existing cache or creates a fresh one.
    ///
    /// A manifest from an incompatible tool version is discarded. This is
    /// fail-safe: any problem with the existing cache starts fresh.
    pub fn load_or_create(cache_dir: &Path, tool_version: &str) -> Self {
        let manifest = CacheManifest::load(cache_dir)
            .filter(|m| m.is_compatible(tool_version))
            .unwrap_or_else(|| CacheManifest::new(tool_version));

        Self {
            cache_dir: cache_dir.to_path_buf(),
            tool_version: tool_version.to_string(),
            policy: RebuildPolicy::default(),
            store: ModuleStore::new(cache_dir),
            manifest: Mutex::new(manifest),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the rebuild policy.
    pub fn with_policy(mut self, policy: RebuildPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the cached artifact for a unit, or builds it.
    ///
    /// On a hit (manifest entry with a matching composite key and a
    /// validated artifact file) the compiler never runs. On a miss the
    /// build closure runs exactly once per key even under concurrency,
    /// its product is installed into the store, and the manifest is
    /// updated. A failing closure leaves the cache untouched.
    pub fn get_or_build<F, E>(
        &self,
        unit: &SourceUnit,
        config: &ResolvedConfig,
        build_fn: F,
    ) -> Result<(Artifact, BuildOutcome), GetOrBuildError<E>>
    where
        F: FnOnce() -> Result<PathBuf, E>,
        E: std::error::Error + 'static,
    {
        let key = composite_key(unit, config)?;

        if self.policy.release_mode {
            if let Some(artifact) = self.lookup_trusting(unit, &key) {
                return Ok((artifact, BuildOutcome::Hit));
            }
        }

        if !self.policy.force_rebuild {
            if let Some(artifact) = self.lookup(unit, &key) {
                return Ok((artifact, BuildOutcome::Hit));
            }
        }

        let key_lock = self.key_lock(&key);
        let _guard = lock(&key_lock);

        // A concurrent winner may have built while we waited for the key
        // lock; re-check before compiling.
        if !self.policy.force_rebuild {
            if let Some(artifact) = self.lookup(unit, &key) {
                return Ok((artifact, BuildOutcome::Hit));
            }
        }

        let built = build_fn().map_err(GetOrBuildError::Build)?;
        let file_name = self
            .store
            .install(&key, &built, &self.tool_version)
            .map_err(GetOrBuildError::Cache)?;
        let artifact_path = self.store.artifact_path(&file_name);

        let mut inputs: Vec<PathBuf> = config.sources.clone();
        inputs.extend(config.dependencies.iter().cloned());

        {
            let mut manifest = lock(&self.manifest);
            manifest.units.insert(
                unit.path.clone(),
                UnitCache {
                    composite_key: key,
                    artifact_file: file_name,
                    module_name: config.module_name.clone(),
                    inputs,
                    built_at: now_secs(),
                },
            );
            manifest
                .save(&self.cache_dir)
                .map_err(GetOrBuildError::Cache)?;
        }

        Ok((
            Artifact {
                path: artifact_path,
                key,
                module_name: config.module_name.clone(),
            },
            BuildOutcome::Rebuilt,
        ))
    }

    /// Drops a unit's manifest entry so its next request rebuilds.
    ///
    /// Used when a cache-valid artifact turns out not to load (corrupt
    /// file, wrong architecture).
    pub fn invalidate(&self, source_path: &Path) -> Result<(), CacheError> {
        let mut manifest = lock(&self.manifest);
        if manifest.units.remove(source_path).is_some() {
            manifest.save(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Removes artifacts not referenced by the manifest.
    pub fn gc(&self) -> Result<usize, CacheError> {
        let manifest = lock(&self.manifest);
        let live: Vec<&str> = manifest
            .units
            .values()
            .map(|u| u.artifact_file.as_str())
            .collect();
        self.store.gc(&live)
    }

    /// Drops every manifest entry and every stored artifact.
    ///
    /// Returns the number of artifact files removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        {
            let mut manifest = lock(&self.manifest);
            manifest.units.clear();
            manifest.save(&self.cache_dir)?;
        }
        self.store.gc(&[])
    }

    /// Number of units the manifest currently tracks.
    pub fn entry_count(&self) -> usize {
        lock(&self.manifest).units.len()
    }

    /// A copy of the manifest entry for a source path, if present.
    pub fn entry(&self, source_path: &Path) -> Option<UnitCache> {
        lock(&self.manifest).units.get(source_path).cloned()
    }

    /// Manifest hit with full validation of the stored artifact.
    fn lookup(&self, unit: &SourceUnit, key: &ContentHash) -> Option<Artifact> {
        let manifest = lock(&self.manifest);
        let entry = manifest.units.get(&unit.path)?;
        if entry.composite_key != *key {
            return None;
        }
        if !self.store.validate(&entry.artifact_file) {
            return None;
        }
        Some(Artifact {
            path: self.store.artifact_path(&entry.artifact_file),
            key: *key,
            module_name: entry.module_name.clone(),
        })
    }

    /// Release-mode hit: the manifest entry is trusted as long as the
    /// artifact file exists, regardless of key or trailer state.
    fn lookup_trusting(&self, unit: &SourceUnit, key: &ContentHash) -> Option<Artifact> {
        let manifest = lock(&self.manifest);
        let entry = manifest.units.get(&unit.path)?;
        let path = self.store.artifact_path(&entry.artifact_file);
        if !path.exists() {
            return None;
        }
        Some(Artifact {
            path,
            key: *key,
            module_name: entry.module_name.clone(),
        })
    }

    /// Returns the build lock for a composite key, creating it on first use.
    fn key_lock(&self, key: &ContentHash) -> Arc<Mutex<()>> {
        let mut locks = lock(&self.key_locks);
        locks.entry(*key).or_default().clone()
    }
}

/// Locks a mutex, recovering the guard if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
