//! Native toolchain invocation.
//!
//! Given a resolved configuration, this crate selects a compiler,
//! assembles the argument list, and synchronously invokes the toolchain
//! to produce a shared object. A nonzero exit is terminal for the build
//! attempt: the compiler's stderr is captured and reported, never
//! retried.

#![warn(missing_docs)]

pub mod error;
pub mod invoke;
pub mod toolchain;

pub use error::BuildError;
pub use invoke::compile_module;
pub use toolchain::{probe_compiler, select_compiler};
