//! Structured build diagnostics with text and JSON rendering.
//!
//! Each failed build step produces a [`Diagnostic`] carrying a severity,
//! a stable code, the offending file, and an optional line with its source
//! text. Renderers format diagnostics for terminal or machine consumption.

#![warn(missing_docs)]

pub mod diagnostic;
pub mod renderer;
pub mod severity;

pub use diagnostic::Diagnostic;
pub use renderer::{render_json, render_text};
pub use severity::Severity;
