/*
 *  vidref soft module - FFI Types
 *
 *  C ABI types matching the vidref renderer module interface
 *  These types must match exactly with the host's FFI types
 */

use std::ffi::{c_char, c_int, c_void};

/// Module ABI version
pub const VIDREF_ABI_VERSION_MAJOR: u32 = 1;
pub const VIDREF_ABI_VERSION_MINOR: u32 = 0;

/// Print levels for the host print callback
pub const PRINT_ALL: c_int = 0;
pub const PRINT_DEVELOPER: c_int = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct UserCmd {
    pub msec: u8,
    pub buttons: u8,
    pub angles: [i16; 3],
    pub forwardmove: i16,
    pub sidemove: i16,
    pub upmove: i16,
    pub impulse: u8,
    pub lightlevel: u8,
}

pub type KeyEventFn = extern "C" fn(user: *mut c_void, key: c_int, down: bool);
pub type CenterViewFn = extern "C" fn(user: *mut c_void);
pub type PrintFn = extern "C" fn(level: c_int, message: *const c_char);
pub type NewWindowFn = extern "C" fn(user: *mut c_void, width: c_int, height: c_int);
pub type RequestRestartFn = extern "C" fn(user: *mut c_void);

#[repr(C)]
pub struct RefImports {
    pub user: *mut c_void,
    pub print: PrintFn,
    pub new_window: NewWindowFn,
    pub request_restart: RequestRestartFn,
}

#[repr(C)]
pub struct InState {
    pub user: *mut c_void,
    pub viewangles: *mut f32,
    pub in_strafe_state: *mut c_int,
    pub center_view: CenterViewFn,
    pub key_event: KeyEventFn,
}

/// Copy a string into a C buffer, always null-terminated
pub fn copy_str_to_buffer(s: &str, buffer: *mut c_char, buffer_size: usize) {
    if buffer.is_null() || buffer_size == 0 {
        return;
    }

    let bytes = s.as_bytes();
    let copy_len = bytes.len().min(buffer_size - 1);

    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, buffer, copy_len);
        *buffer.add(copy_len) = 0;
    }
}
