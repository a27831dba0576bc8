//! Loading compiled module artifacts into the host process.
//!
//! A built artifact must export exactly one entry point keyed by its
//! module name. Two conventions exist, selected by symbol presence at
//! load time: the builder-reference convention
//! (`anvil_register_<name>`), where the module registers named functions
//! into a [`ModuleRegistry`], and the legacy single-initializer
//! convention (`anvil_init_<name>`), returning an opaque handle. The raw
//! path ([`load_raw`]) uses the same symbols with no directive pipeline
//! in front of it.

#![warn(missing_docs)]

pub mod error;
pub mod module;
pub mod registry;

pub use error::LoadError;
pub use module::{load, load_raw, EntryConvention, LoadedModule};
pub use registry::{ModuleRegistry, RawModuleBuilder};
