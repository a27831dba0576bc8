//! Composite cache-key computation.

use anvil_common::{CompositeHasher, ContentHash};
use anvil_config::ResolvedConfig;
use anvil_source::SourceUnit;

use crate::error::CacheError;

/// Computes the composite key for a (source, configuration) pair.
///
/// The key covers the source content hash, the resolved configuration
/// hash, and the path and current content of every extra source and
/// declared dependency, read from disk at call time. Changing any byte
/// of any input therefore changes the key and invalidates the entry.
///
/// Tracking is one level deep: headers included *by* a dependency do not
/// participate unless they are declared themselves.
pub fn composite_key(
    unit: &SourceUnit,
    config: &ResolvedConfig,
) -> Result<ContentHash, CacheError> {
    let mut hasher = CompositeHasher::new();
    hasher.update_hash(&unit.content_hash);
    hasher.update_hash(&config.config_hash());

    for path in config.sources.iter().chain(config.dependencies.iter()) {
        hasher.update(path.display().to_string().as_bytes());
        let content = std::fs::read(path).map_err(|e| CacheError::DependencyRead {
            path: path.clone(),
            source: e,
        })?;
        hasher.update(&content);
    }

    Ok(hasher.finish())
}
