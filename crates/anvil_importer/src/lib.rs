//! The build-and-load pipeline tying every stage together.
//!
//! For one source unit the pipeline runs: read and hash the source,
//! extract and evaluate its directive block, resolve the configuration,
//! consult the build cache (compiling on a miss), and finally load the
//! artifact's entry point into the host process. Each unit progresses
//! through an explicit state machine; failures are terminal for that
//! unit only.

#![warn(missing_docs)]

pub mod error;
pub mod importer;
pub mod state;

pub use error::ImportError;
pub use importer::{BuildReport, Importer, TOOL_VERSION};
pub use state::{UnitProgress, UnitState};
