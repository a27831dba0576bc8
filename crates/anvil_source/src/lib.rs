//! Source file management for the anvil build pipeline.
//!
//! This crate provides [`SourceUnit`], a loaded source file with its
//! content hash and line-start table, plus module location on a search
//! path and recursive discovery of buildable units in a directory tree.

#![warn(missing_docs)]

pub mod error;
pub mod locate;
pub mod source_unit;

pub use error::SourceError;
pub use locate::{discover_units, find_module_source};
pub use source_unit::{SourceKind, SourceUnit};
