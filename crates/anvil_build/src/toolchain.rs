//! Compiler selection.

use anvil_config::Settings;
use anvil_source::SourceKind;
use std::process::Command;

/// Selects the compiler executable for a source kind.
///
/// Order: explicit settings override, then the `CXX`/`CC` environment
/// variable, then the conventional `c++`/`cc` driver names.
pub fn select_compiler(kind: SourceKind, settings: &Settings) -> String {
    let (override_, env_var, fallback) = match kind {
        SourceKind::Cpp => (&settings.toolchain.cxx, "CXX", "c++"),
        SourceKind::C => (&settings.toolchain.cc, "CC", "cc"),
    };
    if let Some(compiler) = override_ {
        return compiler.clone();
    }
    if let Ok(compiler) = std::env::var(env_var) {
        if !compiler.is_empty() {
            return compiler;
        }
    }
    fallback.to_string()
}

/// Checks whether a compiler executable can be started at all.
///
/// Used by callers that want to degrade gracefully (tests, doctor-style
/// commands) rather than to gate real builds, which surface the spawn
/// failure as a [`BuildError`](crate::BuildError) instead.
pub fn probe_compiler(compiler: &str) -> bool {
    Command::new(compiler)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
