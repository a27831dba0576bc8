//! Anvil CLI — the command-line interface for the anvil module builder.
//!
//! Provides `anvil build` for compiling directive-annotated source files
//! (or whole directory trees of them), `anvil run` for building and
//! invoking a module's exported `main`, and `anvil clean` for dropping
//! cached artifacts.

#![warn(missing_docs)]

mod build;
mod clean;
mod run;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Anvil — a directive-driven incremental native-module builder.
#[derive(Parser, Debug)]
#[command(name = "anvil", version, about = "Anvil native-module builder")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `anvil.toml` settings file (or its directory).
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build one or more source files or directory trees.
    Build(BuildArgs),
    /// Build a source file, load it, and call its exported `main`.
    Run(RunArgs),
    /// Drop cached artifacts.
    Clean(CleanArgs),
}

/// Arguments for the `anvil build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Files or directories to build. A directory is walked recursively
    /// for eligible opted-in source files. Defaults to the current
    /// directory.
    pub paths: Vec<String>,

    /// Force rebuild, ignoring cache hits.
    #[arg(short, long)]
    pub force: bool,

    /// Output format for failure reports.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `anvil run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// The source file to build and run.
    pub file: String,
}

/// Arguments for the `anvil clean` subcommand.
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Only remove artifacts no manifest entry references, keeping
    /// valid cached builds.
    #[arg(long)]
    pub gc: bool,
}

/// Failure report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output, one object per line.
    Json,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom settings file or directory.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => atty_is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Run(ref args) => run::run(args, &global),
        Command::Clean(ref args) => clean::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Rough terminal detection — checks if stdout is a terminal.
fn atty_is_terminal() -> bool {
    // Use a simple heuristic: check the TERM env var.
    std::env::var("TERM").is_ok()
}

/// Loads settings honoring the `--config` flag.
///
/// `--config` may point at an `anvil.toml` file or at a directory
/// containing one; without it the current directory is used.
pub fn load_settings_for(global: &GlobalArgs) -> Result<anvil_config::Settings, Box<dyn std::error::Error>> {
    use std::path::{Path, PathBuf};

    let dir: PathBuf = match &global.config {
        Some(config) => {
            let p = Path::new(config);
            if p.is_file() {
                p.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."))
            } else {
                p.to_path_buf()
            }
        }
        None => PathBuf::from("."),
    };
    Ok(anvil_config::load_settings(&dir)?)
}
