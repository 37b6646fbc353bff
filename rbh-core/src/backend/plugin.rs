//! Dynamic backend-plugin loading (C5 / spec.md §6).
//!
//! An unknown URI scheme is resolved by `dlopen`-ing a shared library named
//! `rbh-<name>` and calling its exported `rbh_backend_factory` symbol, where
//! `<name>` is ordinarily just the URI's scheme — except under the generic
//! dispatch scheme `rbh:`, where spec.md §6's own worked example
//! (`rbh:myplugin:arg` names the plugin-loaded backend `myplugin`) puts the
//! real plugin name in the path instead, since `rbh:` itself isn't a plugin.
//! The opaque-handle-plus-function-pointer shape of [`BackendFactoryFn`]
//! is a structural copy of the teacher's `EngineClientOps` /
//! `FileSystemClientOps` / `JsonHandlerOps` (`kernel/src/ffi/mod.rs`);
//! loaded libraries are pinned in a process-wide registry the same way the
//! teacher's `ReferenceSet` pins in-flight expression nodes behind a stable
//! handle, just for `Library`s instead of `Expression`s.
//!
//! Like the teacher's own FFI layer, this assumes the plugin was built
//! against an ABI-compatible `rbh-core` (the opaque pointer is a leaked
//! `Box<Box<dyn Backend>>`, not a C-stable layout) — a real deployment
//! would pin a compiler/crate version per plugin, exactly as delta-kernel's
//! FFI module pins itself to one engine build.

use std::collections::HashMap;
use std::ffi::{c_char, CString};
use std::sync::Mutex;

use libloading::Library;
use once_cell::sync::OnceCell;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::uri::Uri;

/// Well-known exported symbol every plugin must provide.
pub const FACTORY_SYMBOL: &[u8] = b"rbh_backend_factory";

/// `extern "C" fn(uri, err_out) -> *mut c_void`.
///
/// On success returns a non-null pointer obtained from
/// `Box::into_raw(Box::new(backend))` where `backend: Box<dyn Backend>`
/// (double-boxed so the FFI-visible pointer is thin). On failure returns
/// null and writes a `CString`-owned message pointer to `*err_out` (the
/// caller frees it with `CString::from_raw`).
pub type BackendFactoryFn =
    unsafe extern "C" fn(uri: *const c_char, err_out: *mut *mut c_char) -> *mut std::ffi::c_void;

fn pinned_libraries() -> &'static Mutex<Vec<Library>> {
    static LIBRARIES: OnceCell<Mutex<Vec<Library>>> = OnceCell::new();
    LIBRARIES.get_or_init(|| Mutex::new(Vec::new()))
}

/// The name a plugin library is loaded under: the URI's scheme, unless the
/// scheme is the generic dispatch scheme `rbh`, in which case the name is
/// the first `:`-delimited segment of the path (spec.md §6 —
/// `rbh:myplugin:arg` names the plugin `myplugin`, with `arg` left for the
/// plugin itself to interpret).
fn plugin_name<'a>(uri: &Uri<'a>) -> Result<&'a str> {
    if uri.scheme != "rbh" {
        return Ok(uri.scheme);
    }
    let name = uri.path.split(':').next().unwrap_or("");
    if name.is_empty() {
        return Err(Error::invalid_input(
            "rbh: dispatch URI is missing a plugin name in its path",
        ));
    }
    Ok(name)
}

/// Loads `rbh-<name>` (see [`plugin_name`]), resolves its factory symbol
/// and constructs a backend from `uri`. The loaded library is pinned for
/// the remaining lifetime of the process — spec.md §4.4's "registries may
/// pin it".
pub fn load_backend(uri: &Uri<'_>, _options: &HashMap<String, String>) -> Result<Box<dyn Backend>> {
    let name = plugin_name(uri)?;
    let filename = libloading::library_filename(format!("rbh-{name}"));

    // "global-now, no-unload, local-scope" (spec.md §6): RTLD_GLOBAL so the
    // plugin's own transitive dependencies resolve against it, RTLD_NOW so
    // load-time symbol errors surface immediately rather than at first use.
    #[cfg(unix)]
    let library = unsafe {
        use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};
        UnixLibrary::open(Some(&filename), RTLD_GLOBAL | RTLD_NOW)
            .map(Library::from)
            .map_err(|e| Error::BackendUnavailable(format!("{}: {e}", filename.to_string_lossy())))?
    };
    #[cfg(not(unix))]
    let library = unsafe {
        Library::new(&filename)
            .map_err(|e| Error::BackendUnavailable(format!("{}: {e}", filename.to_string_lossy())))?
    };

    let factory: BackendFactoryFn = unsafe {
        *library
            .get::<BackendFactoryFn>(FACTORY_SYMBOL)
            .map_err(|e| Error::BackendUnavailable(format!("missing {FACTORY_SYMBOL:?}: {e}")))?
    };

    let uri_c = CString::new(uri.to_owned_string())
        .map_err(|_| Error::invalid_input("uri contains an interior NUL byte"))?;
    let mut err_out: *mut c_char = std::ptr::null_mut();
    let handle = unsafe { factory(uri_c.as_ptr(), &mut err_out) };

    // Pin the library before touching `handle` so a backend that spawns
    // background work referencing its own code stays valid.
    pinned_libraries()
        .lock()
        .expect("plugin registry mutex poisoned")
        .push(library);

    if handle.is_null() {
        let message = if err_out.is_null() {
            "plugin factory returned null with no error message".to_owned()
        } else {
            let owned = unsafe { CString::from_raw(err_out) };
            owned.to_string_lossy().into_owned()
        };
        return Err(Error::BackendUnavailable(message));
    }

    let boxed: Box<Box<dyn Backend>> = unsafe { Box::from_raw(handle as *mut Box<dyn Backend>) };
    Ok(*boxed)
}

/// Helper for plugin authors: packages a constructed backend behind the
/// ABI `load_backend` expects. Exported so `demos/rbh-demo-plugin` (and any
/// other plugin) doesn't have to hand-write the double-box dance.
///
/// # Safety
/// The returned pointer must be handed to the host's `rbh_backend_factory`
/// return value unmodified; it is reconstituted with `Box::from_raw` on the
/// host side.
pub unsafe fn leak_backend_handle(backend: Box<dyn Backend>) -> *mut std::ffi::c_void {
    Box::into_raw(Box::new(backend)) as *mut std::ffi::c_void
}

/// Helper for plugin authors: builds the `err_out` side of the ABI.
///
/// # Safety
/// `err_out` must be a valid, non-null, writable `*mut *mut c_char` (the
/// `err_out` parameter `rbh_backend_factory` received).
pub unsafe fn write_factory_error(err_out: *mut *mut c_char, message: &str) {
    if let Ok(c_message) = CString::new(message) {
        *err_out = c_message.into_raw();
    }
}
