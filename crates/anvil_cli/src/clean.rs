//! The `anvil clean` subcommand.

use anvil_cache::BuildCache;
use anvil_importer::TOOL_VERSION;

use crate::{load_settings_for, CleanArgs, GlobalArgs};

/// Drops cached artifacts.
///
/// By default the whole cache is cleared; with `--gc`, only artifacts
/// no manifest entry references are removed.
pub fn run(args: &CleanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let settings = load_settings_for(global)?;
    let cache = BuildCache::load_or_create(&settings.cache_dir(), TOOL_VERSION);

    let removed = if args.gc { cache.gc()? } else { cache.clear()? };

    if !global.quiet {
        eprintln!("removed {removed} artifact(s)");
    }
    Ok(0)
}
