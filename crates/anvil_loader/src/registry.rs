//! The module registry filled by the builder-reference entry convention.

use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr};

/// Named function pointers a module registered at load time.
///
/// The pointers stay valid for as long as the owning
/// [`LoadedModule`](crate::LoadedModule) keeps its library mapped; the
/// registry is only handed out by reference from there.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    functions: HashMap<String, *const c_void>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a registered function pointer by name.
    pub fn get(&self, name: &str) -> Option<*const c_void> {
        self.functions.get(name).copied()
    }

    /// The registered function names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if the module registered nothing.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub(crate) fn insert(&mut self, name: String, func: *const c_void) {
        self.functions.insert(name, func);
    }
}

/// The C-ABI builder handed by mutable reference to
/// `anvil_register_<name>`.
///
/// The module calls `add_fn(ctx, "name", fn_ptr)` once per exported
/// function. `ctx` is opaque to the module; it points back at the
/// [`ModuleRegistry`] being filled.
#[repr(C)]
pub struct RawModuleBuilder {
    /// Opaque registry pointer, passed back through `add_fn`.
    pub ctx: *mut c_void,
    /// Registration callback: `(ctx, function name, function pointer)`.
    pub add_fn: unsafe extern "C" fn(*mut c_void, *const c_char, *const c_void),
}

/// The registration callback installed into every [`RawModuleBuilder`].
///
/// # Safety
/// `ctx` must be the `ModuleRegistry` pointer the builder was created
/// with, and `name` must be a valid NUL-terminated string; both hold for
/// builders constructed by [`module::load`](crate::module::load).
pub(crate) unsafe extern "C" fn register_callback(
    ctx: *mut c_void,
    name: *const c_char,
    func: *const c_void,
) {
    if ctx.is_null() || name.is_null() {
        return;
    }
    let registry = &mut *(ctx as *mut ModuleRegistry);
    let name = CStr::from_ptr(name).to_string_lossy().into_owned();
    registry.insert(name, func);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    extern "C" fn sample_fn() {}

    #[test]
    fn empty_registry() {
        let registry = ModuleRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("add").is_none());
    }

    #[test]
    fn callback_registers_function() {
        let mut registry = ModuleRegistry::new();
        let name = CString::new("add").unwrap();
        unsafe {
            register_callback(
                &mut registry as *mut ModuleRegistry as *mut c_void,
                name.as_ptr(),
                sample_fn as *const c_void,
            );
        }
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("add"), Some(sample_fn as *const c_void));
        assert_eq!(registry.names(), vec!["add"]);
    }

    #[test]
    fn callback_ignores_null_name() {
        let mut registry = ModuleRegistry::new();
        unsafe {
            register_callback(
                &mut registry as *mut ModuleRegistry as *mut c_void,
                std::ptr::null(),
                sample_fn as *const c_void,
            );
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn reregistration_overwrites() {
        let mut registry = ModuleRegistry::new();
        registry.insert("f".to_string(), sample_fn as *const c_void);
        registry.insert("f".to_string(), std::ptr::null());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("f"), Some(std::ptr::null()));
    }
}
