//! The `anvil run` subcommand: build a file, load it, call its `main`.

use std::path::Path;

use anvil_importer::Importer;

use crate::{load_settings_for, GlobalArgs, RunArgs};

/// Builds and loads the file, then invokes its exported `main`.
///
/// The module's `main` must be a no-argument function returning an
/// `int`, registered through the module builder or exported directly.
/// Its return value becomes the process exit code.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let settings = load_settings_for(global)?;
    let importer = Importer::new(settings);

    let path = Path::new(&args.file);
    let module = importer.import_from_path(path)?;

    let Some(entry) = module.function("main") else {
        return Err(format!(
            "module '{}' does not expose a 'main' function",
            module.module_name()
        )
        .into());
    };

    if global.verbose {
        eprintln!("launching {}", module.module_name());
    }

    // SAFETY: the run convention is a no-argument main returning int;
    // the module opted in to it by exposing the name.
    let entry: extern "C" fn() -> i32 = unsafe { std::mem::transmute(entry) };
    Ok(entry())
}
