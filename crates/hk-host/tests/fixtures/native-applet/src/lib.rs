//! A native applet library exporting the descriptor ABI.
//!
//! It describes `clock` and returns NULL for every other name, so one build
//! can be installed under several names.

use std::ffi::{c_char, CStr, CString};

const CLOCK: &str = r#"{"controls": [
    {"kind": "text", "text": "tick"},
    {"kind": "button", "id": "now", "label": "Now", "action": {"method": "get", "path": "clock"}}
]}"#;

/// # Safety
///
/// `name` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn housekeeper_applet_descriptor(name: *const c_char) -> *mut c_char {
    if name.is_null() {
        return std::ptr::null_mut();
    }
    match CStr::from_ptr(name).to_str() {
        Ok("clock") => CString::new(CLOCK)
            .map(CString::into_raw)
            .unwrap_or(std::ptr::null_mut()),
        _ => std::ptr::null_mut(),
    }
}

/// # Safety
///
/// `descriptor` must come from `housekeeper_applet_descriptor` and be freed
/// only once.
#[no_mangle]
pub unsafe extern "C" fn housekeeper_applet_free(descriptor: *mut c_char) {
    if !descriptor.is_null() {
        drop(CString::from_raw(descriptor));
    }
}
