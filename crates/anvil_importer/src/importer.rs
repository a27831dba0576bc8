//! The importer: build pipeline orchestration and the public API.

use std::path::{Path, PathBuf};

use anvil_build::compile_module;
use anvil_cache::{Artifact, BuildCache, BuildOutcome, RebuildPolicy};
use anvil_config::{resolve, Bindgen, BuildConfig, ResolvedConfig, Settings, OPT_IN_MARKER};
use anvil_directive::{evaluate, extract, strip_directives, DirectiveBlock};
use anvil_loader::{load, LoadedModule};
use anvil_source::{discover_units, find_module_source, SourceUnit};

use crate::error::ImportError;
use crate::state::{UnitProgress, UnitState};

/// Tool version string baked into cache manifests and artifacts.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Outcome of one unit in a [`Importer::build_all`] sweep.
///
/// One unit's failure never aborts the sweep or touches other units.
#[derive(Debug)]
pub struct BuildReport {
    /// The unit's source path.
    pub path: PathBuf,
    /// The last state the unit reached.
    pub state: UnitState,
    /// Hit or rebuilt, when the build succeeded.
    pub outcome: Option<BuildOutcome>,
    /// The failure, when it did not.
    pub error: Option<ImportError>,
}

impl BuildReport {
    /// Returns `true` if the unit built successfully.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// The top-level handle driving directive-based module builds.
///
/// Owns the settings, the binding-layer query, and the build cache. One
/// importer serves any number of units; per-unit failures are isolated.
pub struct Importer {
    settings: Settings,
    bindgen: Bindgen,
    cache: BuildCache,
}

impl Importer {
    /// Creates an importer with the given settings, an environment-based
    /// binding-layer query, and a cache in the settings' cache directory.
    pub fn new(settings: Settings) -> Self {
        let bindgen = Bindgen::from_env();
        Self::with_bindgen(settings, bindgen)
    }

    /// Creates an importer with an explicit binding-layer query.
    pub fn with_bindgen(settings: Settings, bindgen: Bindgen) -> Self {
        let policy = RebuildPolicy {
            force_rebuild: settings.build.force_rebuild,
            release_mode: settings.build.release_mode,
        };
        let cache = BuildCache::load_or_create(&settings.cache_dir(), TOOL_VERSION)
            .with_policy(policy);
        Self {
            settings,
            bindgen,
            cache,
        }
    }

    /// The importer's settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The importer's build cache.
    pub fn cache(&self) -> &BuildCache {
        &self.cache
    }

    /// Resolves a unit's directives into its final configuration.
    ///
    /// This is the first half of the pipeline: extract the directive
    /// block (absence is fine), evaluate it, merge with defaults.
    pub fn resolve_config(&self, unit: &SourceUnit) -> Result<ResolvedConfig, ImportError> {
        Ok(self.prepare(unit)?.0)
    }

    /// Resolves the configuration and reports whether the unit needs a
    /// rendered (directive-stripped) copy before it can compile.
    fn prepare(&self, unit: &SourceUnit) -> Result<(ResolvedConfig, bool), ImportError> {
        let block = extract(unit)?;
        let directives = match &block {
            Some(block) => evaluate(block, unit, &self.settings, &self.bindgen)?,
            None => BuildConfig::new(),
        };
        let config = resolve(unit, &directives, &self.settings, &self.bindgen)?;
        let needs_render = matches!(block, Some(DirectiveBlock::Script { .. }));
        Ok((config, needs_render))
    }

    /// Builds the artifact for a source file, without loading it.
    pub fn build_from_path(&self, path: &Path) -> Result<(Artifact, BuildOutcome), ImportError> {
        let mut progress = UnitProgress::new();
        self.run_build(path, &mut progress)
    }

    /// Builds (if needed) and loads the module defined by a source file.
    ///
    /// When a cache-valid artifact fails to load (corrupt file, wrong
    /// architecture) the entry is invalidated and the unit rebuilt once
    /// before the failure is reported.
    pub fn import_from_path(&self, path: &Path) -> Result<LoadedModule, ImportError> {
        let mut progress = UnitProgress::new();
        let result = self.run_import(path, &mut progress);
        if result.is_err() {
            progress.fail();
        }
        result
    }

    /// Finds a dotted module name on a search path and imports it.
    ///
    /// With `opt_in` set, only files whose first line carries the
    /// marker word are considered; an explicit import of a known path
    /// should use [`import_from_path`](Importer::import_from_path)
    /// instead.
    pub fn import_module(
        &self,
        module: &str,
        search_paths: &[PathBuf],
        opt_in: bool,
    ) -> Result<LoadedModule, ImportError> {
        let marker = opt_in.then_some(OPT_IN_MARKER);
        let path = find_module_source(
            module,
            search_paths,
            &self.settings.source.extensions,
            marker,
        )?;
        self.import_from_path(&path)
    }

    /// Walks a directory tree and builds every opted-in unit.
    ///
    /// Eligibility is a recognized extension plus the marker word in the
    /// first line. Per-unit failures land in that unit's report; the
    /// sweep continues.
    pub fn build_all(&self, root: &Path) -> Result<Vec<BuildReport>, ImportError> {
        let paths = discover_units(root, OPT_IN_MARKER)?;
        let mut reports = Vec::with_capacity(paths.len());
        for path in paths {
            let mut progress = UnitProgress::new();
            let report = match self.run_build(&path, &mut progress) {
                Ok((_, outcome)) => BuildReport {
                    path,
                    state: progress.state(),
                    outcome: Some(outcome),
                    error: None,
                },
                Err(error) => {
                    progress.fail();
                    BuildReport {
                        path,
                        state: progress.state(),
                        outcome: None,
                        error: Some(error),
                    }
                }
            };
            reports.push(report);
        }
        Ok(reports)
    }

    /// The build half of the pipeline, advancing the state machine up to
    /// the point where an artifact exists.
    fn run_build(
        &self,
        path: &Path,
        progress: &mut UnitProgress,
    ) -> Result<(Artifact, BuildOutcome), ImportError> {
        let unit = SourceUnit::load(path)?;
        let (config, needs_render) = self.prepare(&unit)?;
        progress.advance(UnitState::DirectivesResolved);

        // The scratch directory must outlive the build closure: the
        // cache copies the product into the store after the closure
        // returns.
        let scratch = tempfile::tempdir().map_err(ImportError::Scratch)?;
        let (artifact, outcome) = self.cache.get_or_build(&unit, &config, || {
            let build_config = if needs_render {
                // A script block is not source code; compile a rendered
                // copy with the block stripped, line numbers preserved.
                let file_name = unit
                    .path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unit.cpp");
                let rendered = scratch.path().join(format!("rendered.{file_name}"));
                std::fs::write(&rendered, strip_directives(&unit.content)).map_err(|e| {
                    anvil_build::BuildError::Io {
                        path: rendered.clone(),
                        source: e,
                    }
                })?;
                config.with_primary_source(rendered)
            } else {
                config.clone()
            };
            compile_module(&build_config, &self.settings, scratch.path())
        })?;

        match outcome {
            BuildOutcome::Hit => progress.advance(UnitState::CacheHit),
            BuildOutcome::Rebuilt => {
                progress.advance(UnitState::CacheMiss);
                progress.advance(UnitState::Compiling);
            }
        }
        Ok((artifact, outcome))
    }

    /// The full pipeline: build, then load, with one rebuild fallback
    /// for cache-valid artifacts that fail to load.
    fn run_import(
        &self,
        path: &Path,
        progress: &mut UnitProgress,
    ) -> Result<LoadedModule, ImportError> {
        let (artifact, outcome) = self.run_build(path, progress)?;

        let module = match load(&artifact.path, &artifact.module_name) {
            Ok(module) => module,
            Err(first_failure) if outcome == BuildOutcome::Hit => {
                self.cache.invalidate(path)?;
                let mut retry = UnitProgress::new();
                match self.run_build(path, &mut retry) {
                    Ok((artifact, _)) => {
                        *progress = retry;
                        load(&artifact.path, &artifact.module_name)?
                    }
                    Err(_) => return Err(first_failure.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        progress.advance(UnitState::Loaded);
        Ok(module)
    }
}
