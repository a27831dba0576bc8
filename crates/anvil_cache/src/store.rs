//! Content-addressed storage for compiled module artifacts.
//!
//! Artifacts are shared objects produced by the compiler, stored under
//! `<cache_dir>/modules/` with content-hash-addressed file names. Each
//! stored artifact carries a metadata trailer *appended after* the
//! shared-object payload, holding magic bytes, a format version, the
//! tool version, and a payload checksum for validation. The payload must
//! remain directly loadable, which is why the record goes at the end;
//! a dynamic loader ignores trailing bytes.

use std::path::{Path, PathBuf};

use anvil_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Subdirectory of the cache holding compiled modules.
const MODULES_SUBDIR: &str = "modules";

/// Magic bytes closing every stored artifact.
const TRAILER_MAGIC: [u8; 8] = *b"ANVILMOD";

/// Current trailer format version. Increment on breaking changes.
const TRAILER_FORMAT_VERSION: u32 = 1;

/// Metadata record appended to every stored artifact.
///
/// Laid out as `[payload][record][u32 record length LE][magic]` so the
/// record can be found by reading the file tail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactTrailer {
    /// Trailer format version.
    pub format_version: u32,

    /// Tool version that produced this artifact.
    pub tool_version: String,

    /// Content hash of the shared-object payload.
    pub checksum: ContentHash,
}

/// Content-addressed store for compiled module artifacts.
pub struct ModuleStore {
    /// Root cache directory.
    cache_dir: PathBuf,
}

impl ModuleStore {
    /// Creates a store rooted at the given cache directory.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    /// The file name an artifact with the given key is stored under.
    pub fn artifact_file_name(key: &ContentHash) -> String {
        format!("{key}.{}", std::env::consts::DLL_EXTENSION)
    }

    /// The full path of a stored artifact file.
    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.cache_dir.join(MODULES_SUBDIR).join(file_name)
    }

    /// Installs a freshly-built shared object into the store.
    ///
    /// Reads the compiler's output, appends the metadata trailer, writes
    /// to a temporary file in the store directory, and renames it into
    /// place so concurrent readers never observe a partial artifact.
    /// Returns the stored file name.
    pub fn install(
        &self,
        key: &ContentHash,
        built: &Path,
        tool_version: &str,
    ) -> Result<String, CacheError> {
        let modules_dir = self.cache_dir.join(MODULES_SUBDIR);
        std::fs::create_dir_all(&modules_dir).map_err(|e| CacheError::Io {
            path: modules_dir.clone(),
            source: e,
        })?;

        let payload = std::fs::read(built).map_err(|e| CacheError::Io {
            path: built.to_path_buf(),
            source: e,
        })?;

        let trailer = ArtifactTrailer {
            format_version: TRAILER_FORMAT_VERSION,
            tool_version: tool_version.to_string(),
            checksum: ContentHash::from_bytes(&payload),
        };
        let record = bincode::serde::encode_to_vec(&trailer, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        let mut output = payload;
        output.reserve(record.len() + 12);
        let record_len = record.len() as u32;
        output.extend_from_slice(&record);
        output.extend_from_slice(&record_len.to_le_bytes());
        output.extend_from_slice(&TRAILER_MAGIC);

        let file_name = Self::artifact_file_name(key);
        let final_path = modules_dir.join(&file_name);
        let tmp_path = modules_dir.join(format!("{file_name}.tmp"));
        std::fs::write(&tmp_path, &output).map_err(|e| CacheError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp_path, &final_path).map_err(|e| CacheError::Io {
            path: final_path.clone(),
            source: e,
        })?;

        Ok(file_name)
    }

    /// Validates a stored artifact's trailer.
    ///
    /// Returns `false` when the file is missing, the magic or format
    /// version is wrong, or the payload checksum does not verify. This is
    /// fail-safe: corruption reads as a cache miss.
    pub fn validate(&self, file_name: &str) -> bool {
        self.read_trailer(file_name).is_some()
    }

    /// Reads and validates the trailer of a stored artifact.
    fn read_trailer(&self, file_name: &str) -> Option<ArtifactTrailer> {
        let path = self.artifact_path(file_name);
        let raw = std::fs::read(&path).ok()?;

        if raw.len() < 12 {
            return None;
        }
        let (rest, magic) = raw.split_at(raw.len() - 8);
        if magic != TRAILER_MAGIC {
            return None;
        }
        let (rest, len_bytes) = rest.split_at(rest.len() - 4);
        let record_len = u32::from_le_bytes(len_bytes.try_into().ok()?) as usize;
        if rest.len() < record_len {
            return None;
        }
        let (payload, record) = rest.split_at(rest.len() - record_len);

        let trailer: ArtifactTrailer =
            bincode::serde::decode_from_slice(record, bincode::config::standard())
                .ok()?
                .0;

        if trailer.format_version != TRAILER_FORMAT_VERSION {
            return None;
        }
        if ContentHash::from_bytes(payload) != trailer.checksum {
            return None;
        }

        Some(trailer)
    }

    /// Removes stored artifacts whose file names are not in `live`.
    ///
    /// Returns the number of files removed. Leftover temporary files are
    /// collected too.
    pub fn gc(&self, live: &[&str]) -> Result<usize, CacheError> {
        let dir = self.cache_dir.join(MODULES_SUBDIR);
        if !dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        let entries = std::fs::read_dir(&dir).map_err(|e| CacheError::Io {
            path: dir.clone(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::Io {
                path: dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !live.contains(&name) {
                std::fs::remove_file(&path).map_err(|e| CacheError::Io {
                    path: path.clone(),
                    source: e,
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> (tempfile::TempDir, ModuleStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ModuleStore::new(dir.path());
        (dir, store)
    }

    fn install_bytes(dir: &Path, store: &ModuleStore, data: &[u8]) -> String {
        let built = dir.join("built.out");
        std::fs::write(&built, data).unwrap();
        let key = ContentHash::from_bytes(data);
        store.install(&key, &built, "0.1.0").unwrap()
    }

    #[test]
    fn install_and_validate() {
        let (dir, store) = make_store();
        let name = install_bytes(dir.path(), &store, b"fake shared object");
        assert!(store.validate(&name));
    }

    #[test]
    fn payload_precedes_trailer() {
        let (dir, store) = make_store();
        let data = b"\x7fELF fake shared object";
        let name = install_bytes(dir.path(), &store, data);

        // The payload must remain at the front of the file so a dynamic
        // loader can map it while ignoring the trailing record.
        let stored = std::fs::read(store.artifact_path(&name)).unwrap();
        assert!(stored.starts_with(data));
        assert!(stored.ends_with(&TRAILER_MAGIC));
    }

    #[test]
    fn validate_missing_returns_false() {
        let (_dir, store) = make_store();
        assert!(!store.validate("nonexistent.so"));
    }

    #[test]
    fn validate_truncated_returns_false() {
        let (_dir, store) = make_store();
        let modules = store.cache_dir.join(MODULES_SUBDIR);
        std::fs::create_dir_all(&modules).unwrap();
        std::fs::write(modules.join("short.so"), b"tiny").unwrap();
        assert!(!store.validate("short.so"));
    }

    #[test]
    fn validate_wrong_magic_returns_false() {
        let (_dir, store) = make_store();
        let modules = store.cache_dir.join(MODULES_SUBDIR);
        std::fs::create_dir_all(&modules).unwrap();
        let mut data = b"payload".to_vec();
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(b"BADMAGIC");
        std::fs::write(modules.join("bad.so"), data).unwrap();
        assert!(!store.validate("bad.so"));
    }

    #[test]
    fn validate_tampered_payload_returns_false() {
        let (dir, store) = make_store();
        let name = install_bytes(dir.path(), &store, b"original payload");

        // Flip a byte inside the payload, leaving the trailer intact.
        let path = store.artifact_path(&name);
        let mut data = std::fs::read(&path).unwrap();
        data[0] ^= 0xff;
        std::fs::write(&path, data).unwrap();

        assert!(!store.validate(&name));
    }

    #[test]
    fn install_is_atomic_no_tmp_left_behind() {
        let (dir, store) = make_store();
        let name = install_bytes(dir.path(), &store, b"object bytes");
        let modules = store.cache_dir.join(MODULES_SUBDIR);
        let leftovers: Vec<_> = std::fs::read_dir(&modules)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert!(store.artifact_path(&name).exists());
    }

    #[test]
    fn reinstall_same_key_overwrites() {
        let (dir, store) = make_store();
        let built = dir.path().join("built.out");
        std::fs::write(&built, b"object bytes").unwrap();
        let key = ContentHash::from_bytes(b"stable key");

        let first = store.install(&key, &built, "0.1.0").unwrap();
        let second = store.install(&key, &built, "0.1.0").unwrap();
        assert_eq!(first, second);
        assert!(store.validate(&second));
    }

    #[test]
    fn gc_removes_stale_artifacts() {
        let (dir, store) = make_store();
        let live = install_bytes(dir.path(), &store, b"live artifact");
        let _stale = install_bytes(dir.path(), &store, b"stale artifact");

        let removed = store.gc(&[live.as_str()]).unwrap();
        assert_eq!(removed, 1);
        assert!(store.validate(&live));
    }

    #[test]
    fn gc_nonexistent_dir_returns_zero() {
        let (_dir, store) = make_store();
        assert_eq!(store.gc(&[]).unwrap(), 0);
    }
}
