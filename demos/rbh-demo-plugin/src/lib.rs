//! Reference out-of-tree backend plugin.
//!
//! Demonstrates the C5 plugin ABI end to end: a `cdylib` that exports
//! `rbh_backend_factory` and hands back a [`MemoryBackend`] wrapped behind
//! the host's double-boxing convention
//! (`rbh_core::backend::plugin::leak_backend_handle`). A real backend would
//! replace `MemoryBackend` with whatever storage driver it wraps; the ABI
//! boundary itself — symbol name, signature, error-string convention — is
//! unchanged.

use std::ffi::{c_char, CStr};

use rbh_core::backend::memory::MemoryBackend;
use rbh_core::backend::plugin::{leak_backend_handle, write_factory_error};
use rbh_core::Backend;

/// The symbol `rbh_core::backend::plugin::load_backend` looks up by name.
///
/// # Safety
/// `uri` must be a valid, non-null, NUL-terminated C string; `err_out` must
/// be a valid, non-null, writable `*mut *mut c_char`. Both are upheld by the
/// host, which is the only intended caller.
#[no_mangle]
pub unsafe extern "C" fn rbh_backend_factory(
    uri: *const c_char,
    err_out: *mut *mut c_char,
) -> *mut std::ffi::c_void {
    let uri_str = match CStr::from_ptr(uri).to_str() {
        Ok(s) => s,
        Err(_) => {
            write_factory_error(err_out, "uri is not valid UTF-8");
            return std::ptr::null_mut();
        }
    };

    tracing::debug!(uri = uri_str, "rbh-demo-plugin: constructing backend");

    let backend: Box<dyn Backend> = Box::new(MemoryBackend::new());
    leak_backend_handle(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn factory_returns_a_non_null_handle() {
        let uri = CString::new("rbh-demo-plugin:///").unwrap();
        let mut err_out: *mut c_char = std::ptr::null_mut();
        let handle = unsafe { rbh_backend_factory(uri.as_ptr(), &mut err_out) };
        assert!(!handle.is_null());
        assert!(err_out.is_null());

        // Reconstitute and drop it the way the host would, so this test
        // doesn't leak the allocation.
        unsafe {
            drop(Box::from_raw(handle as *mut Box<dyn Backend>));
        }
    }
}
