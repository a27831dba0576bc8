//! Source unit representation with line-start indexing and content hashing.

use crate::error::SourceError;
use anvil_common::ContentHash;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source language of a native-module file, detected from its extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// A C translation unit (`.c`).
    C,
    /// A C++ translation unit (`.cpp`, `.cc`, `.cxx`).
    Cpp,
}

impl SourceKind {
    /// Detects the source kind from a file extension.
    ///
    /// Returns `None` for unrecognized extensions.
    pub fn from_path(path: &Path) -> Option<SourceKind> {
        match path.extension()?.to_str()? {
            "c" => Some(SourceKind::C),
            "cpp" | "cc" | "cxx" => Some(SourceKind::Cpp),
            _ => None,
        }
    }
}

/// A source file loaded for a single build attempt.
///
/// Stores the file's content along with its XXH3-128 content hash and
/// precomputed line-start offsets for line/column resolution in directive
/// diagnostics. Immutable once read; loading the same path again produces
/// a fresh unit with a fresh hash.
#[derive(Debug)]
pub struct SourceUnit {
    /// The filesystem path of this file.
    pub path: PathBuf,
    /// The full text content of the file.
    pub content: String,
    /// Hash of the file content for cache invalidation.
    pub content_hash: ContentHash,
    /// The source language of this unit.
    pub kind: SourceKind,
    /// Byte offsets of each line start (the first entry is always 0).
    line_starts: Vec<u32>,
}

impl SourceUnit {
    /// Reads a source file from disk.
    ///
    /// Fails with [`SourceError::UnrecognizedExtension`] if the path does
    /// not carry a recognized native-module extension.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let kind = SourceKind::from_path(path).ok_or_else(|| SourceError::UnrecognizedExtension {
            path: path.to_path_buf(),
        })?;
        let content = std::fs::read_to_string(path).map_err(|e| SourceError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::from_content(path, content, kind))
    }

    /// Creates a unit from in-memory content, for tests and synthetic sources.
    pub fn from_content(path: &Path, content: String, kind: SourceKind) -> Self {
        let line_starts = compute_line_starts(&content);
        let content_hash = ContentHash::from_bytes(content.as_bytes());
        Self {
            path: path.to_path_buf(),
            content,
            content_hash,
            kind,
            line_starts,
        }
    }

    /// The module name this unit builds by default: its file stem.
    pub fn module_name(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("module")
    }

    /// The directory containing this unit, used as the base for relative
    /// directive paths and as an implicit include directory.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Converts a byte offset into 1-indexed (line, column) coordinates.
    pub fn line_col(&self, byte_offset: u32) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&byte_offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line = (line_idx as u32) + 1;
        let col = byte_offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    /// Returns the text of a 1-indexed line, without its trailing newline.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let idx = line.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)? as usize;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&e| e as usize)
            .unwrap_or(self.content.len());
        Some(self.content[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Returns `true` if the first line of the unit contains `marker`.
    ///
    /// Build-on-import is opt-in for files found by directory walks and
    /// search-path lookups; the marker in the head of the file is the
    /// opt-in signal.
    pub fn first_line_contains(&self, marker: &str) -> bool {
        self.content
            .lines()
            .next()
            .map(|l| l.contains(marker))
            .unwrap_or(false)
    }
}

/// Computes the byte offsets of each line start in the given content.
fn compute_line_starts(content: &str) -> Vec<u32> {
    let mut starts = vec![0u32];
    for (i, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            starts.push((i + 1) as u32);
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_unit(content: &str) -> SourceUnit {
        SourceUnit::from_content(Path::new("test.cpp"), content.to_string(), SourceKind::Cpp)
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(SourceKind::from_path(Path::new("a.c")), Some(SourceKind::C));
        assert_eq!(
            SourceKind::from_path(Path::new("a.cpp")),
            Some(SourceKind::Cpp)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("a.cc")),
            Some(SourceKind::Cpp)
        );
        assert_eq!(SourceKind::from_path(Path::new("a.rs")), None);
        assert_eq!(SourceKind::from_path(Path::new("a")), None);
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let err = SourceUnit::load(Path::new("module.txt")).unwrap_err();
        assert!(matches!(err, SourceError::UnrecognizedExtension { .. }));
    }

    #[test]
    fn load_missing_file_errors() {
        let err = SourceUnit::load(Path::new("/nonexistent/module.cpp")).unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mymod.cpp");
        std::fs::write(&path, "int add(int a, int b) { return a + b; }\n").unwrap();

        let unit = SourceUnit::load(&path).unwrap();
        assert_eq!(unit.module_name(), "mymod");
        assert_eq!(unit.kind, SourceKind::Cpp);
        assert_eq!(unit.dir(), dir.path());
    }

    #[test]
    fn reload_after_change_rehashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mymod.cpp");
        std::fs::write(&path, "int x = 1;\n").unwrap();
        let first = SourceUnit::load(&path).unwrap();

        std::fs::write(&path, "int x = 2;\n").unwrap();
        let second = SourceUnit::load(&path).unwrap();
        assert_ne!(first.content_hash, second.content_hash);
    }

    #[test]
    fn line_col_resolution() {
        let unit = make_unit("abc\ndef\nghi");
        assert_eq!(unit.line_col(0), (1, 1));
        assert_eq!(unit.line_col(4), (2, 1));
        assert_eq!(unit.line_col(5), (2, 2));
        assert_eq!(unit.line_col(8), (3, 1));
    }

    #[test]
    fn line_text_lookup() {
        let unit = make_unit("first\nsecond\nthird");
        assert_eq!(unit.line_text(1), Some("first"));
        assert_eq!(unit.line_text(2), Some("second"));
        assert_eq!(unit.line_text(3), Some("third"));
        assert_eq!(unit.line_text(4), None);
        assert_eq!(unit.line_text(0), None);
    }

    #[test]
    fn line_text_strips_crlf() {
        let unit = make_unit("one\r\ntwo\r\n");
        assert_eq!(unit.line_text(1), Some("one"));
        assert_eq!(unit.line_text(2), Some("two"));
    }

    #[test]
    fn empty_file() {
        let unit = make_unit("");
        assert_eq!(unit.line_col(0), (1, 1));
        assert!(!unit.first_line_contains("anvil"));
    }

    #[test]
    fn first_line_marker() {
        let unit = make_unit("// anvil\nint main() {}\n");
        assert!(unit.first_line_contains("anvil"));
        let unit = make_unit("int main() {}\n// anvil\n");
        assert!(!unit.first_line_contains("anvil"));
    }

    #[test]
    fn content_hash_computed() {
        let unit = make_unit("test content");
        assert_eq!(unit.content_hash, ContentHash::from_bytes(b"test content"));
    }
}
