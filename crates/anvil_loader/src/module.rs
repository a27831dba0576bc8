//! Loading artifacts and selecting the entry convention.

use std::ffi::c_void;
use std::path::Path;

use libloading::Library;

use crate::error::LoadError;
use crate::registry::{register_callback, ModuleRegistry, RawModuleBuilder};

/// Which entry convention the artifact exported.
///
/// A capability tag selected by symbol lookup at load time; the two
/// conventions are a historical API migration, not a type hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryConvention {
    /// `anvil_register_<name>(builder)`: the module fills a
    /// [`ModuleRegistry`] through the builder reference.
    Register,
    /// `anvil_init_<name>() -> handle`: a single initializer returning
    /// an opaque, non-null module handle.
    Init,
}

/// A compiled module mapped into the host process.
///
/// Owns the underlying library; every pointer handed out (registered
/// functions, raw symbols) is valid only while this value lives.
#[derive(Debug)]
pub struct LoadedModule {
    library: Library,
    module_name: String,
    convention: EntryConvention,
    registry: ModuleRegistry,
    init_handle: Option<*mut c_void>,
}

impl LoadedModule {
    /// The module name this artifact was loaded as.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// The entry convention selected at load time.
    pub fn convention(&self) -> EntryConvention {
        self.convention
    }

    /// Functions the module registered (builder-reference convention;
    /// empty under the initializer convention).
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// The opaque handle the legacy initializer returned, if that
    /// convention was used.
    pub fn init_handle(&self) -> Option<*mut c_void> {
        self.init_handle
    }

    /// Looks up a callable by name: registered functions first, then a
    /// direct export of the same name.
    pub fn function(&self, name: &str) -> Option<*const c_void> {
        if let Some(func) = self.registry.get(name) {
            return Some(func);
        }
        // Fall back to a plain exported symbol, which is how raw
        // extensions expose their callables.
        unsafe {
            self.library
                .get::<*const c_void>(name.as_bytes())
                .ok()
                .map(|sym| *sym)
        }
    }

    /// Returns `true` if the library exports a symbol with this name.
    pub fn has_symbol(&self, name: &str) -> bool {
        unsafe { self.library.get::<*const c_void>(name.as_bytes()).is_ok() }
    }
}

/// Loads an artifact built by the directive pipeline.
///
/// The entry convention is selected by symbol presence: the
/// builder-reference symbol wins, then the legacy initializer. An
/// artifact exporting neither for `module_name` fails with
/// [`LoadError::MissingEntry`].
pub fn load(path: &Path, module_name: &str) -> Result<LoadedModule, LoadError> {
    load_inner(path, module_name)
}

/// Loads a raw extension directly.
///
/// The raw path has no directive block and no dependency resolution in
/// front of it; it resolves the same entry symbols as [`load`] against
/// an artifact produced outside the cache pipeline.
pub fn load_raw(path: &Path, module_name: &str) -> Result<LoadedModule, LoadError> {
    load_inner(path, module_name)
}

fn load_inner(path: &Path, module_name: &str) -> Result<LoadedModule, LoadError> {
    // SAFETY: loading a shared object runs its constructors; the
    // artifacts here are modules built for this tool's entry ABI.
    let library = unsafe { Library::new(path) }.map_err(|e| LoadError::Open {
        path: path.to_path_buf(),
        source: e,
    })?;

    let register_symbol = format!("anvil_register_{module_name}");
    let init_symbol = format!("anvil_init_{module_name}");

    // SAFETY: the symbol types are the documented entry signatures; a
    // module exporting these names with other signatures is malformed.
    // The fn pointers are copied out of their symbols so the library can
    // move into the returned value; they stay valid while it is mapped.
    let register_fn = unsafe {
        library
            .get::<unsafe extern "C" fn(*mut RawModuleBuilder)>(register_symbol.as_bytes())
            .ok()
            .map(|sym| *sym)
    };
    if let Some(register) = register_fn {
        let mut registry = ModuleRegistry::new();
        let mut builder = RawModuleBuilder {
            ctx: &mut registry as *mut ModuleRegistry as *mut c_void,
            add_fn: register_callback,
        };
        // SAFETY: the builder outlives the call and its ctx points at
        // the registry above.
        unsafe { register(&mut builder) };
        return Ok(LoadedModule {
            library,
            module_name: module_name.to_string(),
            convention: EntryConvention::Register,
            registry,
            init_handle: None,
        });
    }

    let init_fn = unsafe {
        library
            .get::<unsafe extern "C" fn() -> *mut c_void>(init_symbol.as_bytes())
            .ok()
            .map(|sym| *sym)
    };
    if let Some(init) = init_fn {
        // SAFETY: the initializer takes no arguments and returns an
        // opaque handle per the entry convention.
        let handle = unsafe { init() };
        if handle.is_null() {
            return Err(LoadError::InitFailed {
                module: module_name.to_string(),
            });
        }
        return Ok(LoadedModule {
            library,
            module_name: module_name.to_string(),
            convention: EntryConvention::Init,
            registry: ModuleRegistry::new(),
            init_handle: Some(handle),
        });
    }

    Err(LoadError::MissingEntry {
        module: module_name.to_string(),
        register_symbol,
        init_symbol,
        path: path.to_path_buf(),
    })
}
