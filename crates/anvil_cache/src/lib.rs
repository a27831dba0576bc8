//! Incremental build cache for compiled native modules.
//!
//! This crate maps (source content, resolved configuration, dependency
//! contents) onto compiled shared-object artifacts, skipping the compiler
//! entirely when nothing changed. All cache reads are fail-safe:
//! corruption or version mismatches read as misses, never as errors, and
//! failed builds are never recorded as successes.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod keys;
pub mod manifest;
pub mod store;

pub use cache::{Artifact, BuildCache, BuildOutcome, GetOrBuildError, RebuildPolicy};
pub use error::CacheError;
pub use keys::composite_key;
pub use manifest::{CacheManifest, UnitCache};
pub use store::ModuleStore;
