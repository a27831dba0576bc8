//! Shared foundational types used across the anvil toolchain.
//!
//! This crate provides content hashing for cache invalidation and the
//! streaming composite hasher used to derive build-cache keys.

#![warn(missing_docs)]

pub mod hash;

pub use hash::{CompositeHasher, ContentHash};
