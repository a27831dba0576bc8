//! Argument assembly and blocking compiler invocation.

use anvil_config::{ResolvedConfig, Settings};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::BuildError;
use crate::toolchain::select_compiler;

/// Compiles a module's shared object into `out_dir`.
///
/// The invocation is synchronous; the caller suspends until the
/// toolchain finishes or exceeds the configured timeout. With `parallel`
/// set and extra sources present, each translation unit is compiled to
/// an object file concurrently and the objects are linked; otherwise a
/// single compile-and-link invocation is used. Returns the path of the
/// produced shared object inside `out_dir`.
pub fn compile_module(
    config: &ResolvedConfig,
    settings: &Settings,
    out_dir: &Path,
) -> Result<PathBuf, BuildError> {
    let compiler = select_compiler(config.kind, settings);
    let output = out_dir.join(format!(
        "{}.{}",
        config.module_name,
        std::env::consts::DLL_EXTENSION
    ));

    let mut units: Vec<&Path> = config.sources.iter().map(PathBuf::as_path).collect();
    units.push(config.source_path.as_path());

    if config.parallel && units.len() > 1 {
        let objects: Vec<PathBuf> = units
            .par_iter()
            .enumerate()
            .map(|(i, unit)| {
                let object = out_dir.join(format!("{}-{i}.o", config.module_name));
                let args = object_args(config, unit, &object);
                run_compiler(&compiler, &args, settings)?;
                Ok(object)
            })
            .collect::<Result<_, BuildError>>()?;

        let args = link_args(config, &objects, &output);
        run_compiler(&compiler, &args, settings)?;
    } else {
        let args = single_invocation_args(config, &units, &output);
        run_compiler(&compiler, &args, settings)?;
    }

    Ok(output)
}

/// Arguments for the one-shot compile-and-link invocation.
fn single_invocation_args(config: &ResolvedConfig, units: &[&Path], output: &Path) -> Vec<String> {
    let mut args = config.compiler_args.clone();
    args.push("-fPIC".to_string());
    args.push("-shared".to_string());
    for dir in &config.include_dirs {
        args.push(format!("-I{}", dir.display()));
    }
    for unit in units {
        args.push(unit.display().to_string());
    }
    extend_link_args(config, &mut args);
    args.push("-o".to_string());
    args.push(output.display().to_string());
    args
}

/// Arguments compiling one translation unit to an object file.
fn object_args(config: &ResolvedConfig, unit: &Path, object: &Path) -> Vec<String> {
    let mut args = config.compiler_args.clone();
    args.push("-fPIC".to_string());
    args.push("-c".to_string());
    for dir in &config.include_dirs {
        args.push(format!("-I{}", dir.display()));
    }
    args.push(unit.display().to_string());
    args.push("-o".to_string());
    args.push(object.display().to_string());
    args
}

/// Arguments linking object files into the shared object.
fn link_args(config: &ResolvedConfig, objects: &[PathBuf], output: &Path) -> Vec<String> {
    let mut args = vec!["-shared".to_string()];
    for object in objects {
        args.push(object.display().to_string());
    }
    extend_link_args(config, &mut args);
    args.push("-o".to_string());
    args.push(output.display().to_string());
    args
}

fn extend_link_args(config: &ResolvedConfig, args: &mut Vec<String>) {
    for dir in &config.library_dirs {
        args.push(format!("-L{}", dir.display()));
    }
    for lib in &config.libraries {
        args.push(format!("-l{lib}"));
    }
    args.extend(config.linker_args.iter().cloned());
}

/// Runs the compiler, blocking until exit or timeout.
fn run_compiler(compiler: &str, args: &[String], settings: &Settings) -> Result<(), BuildError> {
    match settings.build.timeout_secs {
        None => {
            let output = Command::new(compiler).args(args).output().map_err(|e| {
                BuildError::Toolchain {
                    compiler: compiler.to_string(),
                    source: e,
                }
            })?;
            check_status(compiler, output.status.code(), &output.stderr)
        }
        Some(secs) => run_with_timeout(compiler, args, secs),
    }
}

/// Polls a spawned compiler, killing it when the bound expires.
fn run_with_timeout(compiler: &str, args: &[String], secs: u64) -> Result<(), BuildError> {
    let mut child = Command::new(compiler)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| BuildError::Toolchain {
            compiler: compiler.to_string(),
            source: e,
        })?;

    let deadline = Instant::now() + Duration::from_secs(secs);
    loop {
        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(BuildError::Timeout {
                        compiler: compiler.to_string(),
                        secs,
                    });
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(e) => {
                return Err(BuildError::Toolchain {
                    compiler: compiler.to_string(),
                    source: e,
                })
            }
        }
    }

    let output = child.wait_with_output().map_err(|e| BuildError::Toolchain {
        compiler: compiler.to_string(),
        source: e,
    })?;
    check_status(compiler, output.status.code(), &output.stderr)
}

fn check_status(_compiler: &str, code: Option<i32>, stderr: &[u8]) -> Result<(), BuildError> {
    match code {
        Some(0) => Ok(()),
        other => Err(BuildError::Compile {
            exit_code: other.unwrap_or(-1),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::probe_compiler;
    use anvil_config::{resolve, Bindgen, BuildConfig, ConfigKey, Settings, Value};
    use anvil_source::SourceUnit;
    use std::path::Path;

    fn bindgen_for(dir: &Path) -> Bindgen {
        // Point the binding-layer query at real directories so `-I`
        // flags do not reference nonexistent paths.
        Bindgen::new(dir.to_path_buf(), dir.to_path_buf())
    }

    fn resolved(dir: &Path, name: &str, content: &str, directives: BuildConfig) -> ResolvedConfig {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        let unit = SourceUnit::load(&path).unwrap();
        resolve(&unit, &directives, &Settings::default(), &bindgen_for(dir)).unwrap()
    }

    fn have_c_compiler() -> bool {
        probe_compiler(&select_compiler(anvil_source::SourceKind::C, &Settings::default()))
    }

    #[test]
    fn single_invocation_arg_order() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = resolved(dir.path(), "m.c", "int f(void) { return 1; }\n", BuildConfig::new());
        let out = dir.path().join("m.so");
        let units = vec![cfg.source_path.as_path()];
        let args = single_invocation_args(&cfg, &units, &out);

        assert_eq!(args[0], "-std=c++11");
        assert!(args.contains(&"-fPIC".to_string()));
        assert!(args.contains(&"-shared".to_string()));
        let src_pos = args
            .iter()
            .position(|a| a.ends_with("m.c"))
            .expect("source missing");
        let out_pos = args.iter().position(|a| a == "-o").unwrap();
        assert!(src_pos < out_pos);
        assert_eq!(args[out_pos + 1], out.display().to_string());
    }

    #[test]
    fn link_related_args_present() {
        let dir = tempfile::tempdir().unwrap();
        let mut directives = BuildConfig::new();
        directives
            .set(ConfigKey::Libraries, Value::List(vec!["m".to_string()]))
            .unwrap();
        directives
            .set(
                ConfigKey::LibraryDirs,
                Value::List(vec!["/opt/lib".to_string()]),
            )
            .unwrap();
        directives
            .set(
                ConfigKey::LinkerArgs,
                Value::List(vec!["-Wl,-rpath,/opt/lib".to_string()]),
            )
            .unwrap();
        let cfg = resolved(dir.path(), "m.c", "int f(void) { return 1; }\n", directives);
        let out = dir.path().join("m.so");
        let units = vec![cfg.source_path.as_path()];
        let args = single_invocation_args(&cfg, &units, &out);

        assert!(args.contains(&"-L/opt/lib".to_string()));
        assert!(args.contains(&"-lm".to_string()));
        assert!(args.contains(&"-Wl,-rpath,/opt/lib".to_string()));
    }

    #[test]
    fn object_args_compile_only() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = resolved(dir.path(), "m.c", "int f(void) { return 1; }\n", BuildConfig::new());
        let object = dir.path().join("m-0.o");
        let args = object_args(&cfg, &cfg.source_path, &object);
        assert!(args.contains(&"-c".to_string()));
        assert!(!args.contains(&"-shared".to_string()));
    }

    #[test]
    fn compile_trivial_c_module() {
        if !have_c_compiler() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut directives = BuildConfig::new();
        // The default standard flag targets C++; this is a C unit.
        directives
            .set(
                ConfigKey::CompilerArgs,
                Value::List(vec!["-std=c99".to_string()]),
            )
            .unwrap();
        let cfg = resolved(
            dir.path(),
            "m.c",
            "int add(int a, int b) { return a + b; }\n",
            directives,
        );

        let out_dir = tempfile::tempdir().unwrap();
        let artifact = compile_module(&cfg, &Settings::default(), out_dir.path()).unwrap();
        assert!(artifact.exists());
        assert!(artifact.display().to_string().contains("m."));
    }

    #[test]
    fn compile_error_reports_stderr_and_status() {
        if !have_c_compiler() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut directives = BuildConfig::new();
        directives
            .set(
                ConfigKey::CompilerArgs,
                Value::List(vec!["-std=c99".to_string()]),
            )
            .unwrap();
        let cfg = resolved(dir.path(), "broken.c", "int f( { not c\n", directives);

        let out_dir = tempfile::tempdir().unwrap();
        let err = compile_module(&cfg, &Settings::default(), out_dir.path()).unwrap_err();
        match err {
            BuildError::Compile { exit_code, stderr } => {
                assert_ne!(exit_code, 0);
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_compiler_is_toolchain_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = resolved(dir.path(), "m.c", "int f(void) { return 1; }\n", BuildConfig::new());
        let settings: Settings = anvil_config::load_settings_from_str(
            "[toolchain]\ncc = \"definitely-not-a-compiler-xyz\"\n",
        )
        .unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        let err = compile_module(&cfg, &settings, out_dir.path()).unwrap_err();
        assert!(matches!(err, BuildError::Toolchain { .. }));
    }

    #[test]
    fn parallel_build_links_objects() {
        if !have_c_compiler() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("square.c"),
            "int square(int x) { return x * x; }\n",
        )
        .unwrap();

        let mut directives = BuildConfig::new();
        directives
            .set(
                ConfigKey::CompilerArgs,
                Value::List(vec!["-std=c99".to_string()]),
            )
            .unwrap();
        directives
            .set(
                ConfigKey::Sources,
                Value::List(vec!["square.c".to_string()]),
            )
            .unwrap();
        directives.set(ConfigKey::Parallel, Value::Bool(true)).unwrap();
        let cfg = resolved(
            dir.path(),
            "sum.c",
            "int square(int x);\nint square_sum(int x, int y) { return square(x) + square(y); }\n",
            directives,
        );

        let out_dir = tempfile::tempdir().unwrap();
        let artifact = compile_module(&cfg, &Settings::default(), out_dir.path()).unwrap();
        assert!(artifact.exists());
    }

    #[test]
    fn timeout_kills_runaway_compiler() {
        // `yes` treats the compiler flags as text to repeat and never
        // exits, standing in for a hung toolchain.
        let settings: Settings = anvil_config::load_settings_from_str(
            "[build]\ntimeout_secs = 1\n[toolchain]\ncc = \"yes\"\n",
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cfg = resolved(dir.path(), "m.c", "int f(void) { return 1; }\n", BuildConfig::new());

        let out_dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let err = compile_module(&cfg, &settings, out_dir.path()).unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(30));
        match err {
            BuildError::Timeout { secs, .. } => assert_eq!(secs, 1),
            other => panic!("unexpected error: {other}"),
        }
    }
}
