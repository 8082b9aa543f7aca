/*
 *  vid/ffi.rs
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
 *
 *  C ABI types for renderer modules
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

//! FFI types for renderer modules
//!
//! A renderer module is a shared object exporting one `extern "C"` function
//! per entry point listed in [`REQUIRED_SYMBOLS`]. All types crossing the
//! boundary are `#[repr(C)]`; module crates carry a copy of these
//! definitions that must match exactly.

use std::ffi::{c_char, c_int, c_void};

/// Module ABI version
pub const VIDREF_ABI_VERSION_MAJOR: u32 = 1;
pub const VIDREF_ABI_VERSION_MINOR: u32 = 0;

/// Size of the diagnostic buffer handed to render init
pub const VIDREF_INIT_MESSAGE_SIZE: usize = 128;

/// Print levels for the host print callback
pub const PRINT_ALL: c_int = 0;
pub const PRINT_DEVELOPER: c_int = 1;

/// One frame of movement input, filled in by the pointer device
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
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

/// Host services passed to render init
#[repr(C)]
pub struct RefImports {
    pub user: *mut c_void,
    pub print: PrintFn,
    pub new_window: NewWindowFn,
    pub request_restart: RequestRestartFn,
}

/// Shared input state handed to pointer-device init.
///
/// `viewangles` points at three floats and `in_strafe_state` at one int,
/// both owned by the host and valid until pointer shutdown returns.
#[repr(C)]
pub struct InState {
    pub user: *mut c_void,
    pub viewangles: *mut f32,
    pub in_strafe_state: *mut c_int,
    pub center_view: CenterViewFn,
    pub key_event: KeyEventFn,
}

pub type AbiVersionFn = extern "C" fn(major: *mut u32, minor: *mut u32);
pub type RInitFn = extern "C" fn(
    imports: *const RefImports,
    width: c_int,
    height: c_int,
    message: *mut c_char,
    message_len: usize,
) -> bool;
pub type RShutdownFn = extern "C" fn();
pub type KbdInitFn = extern "C" fn(key_event: KeyEventFn, user: *mut c_void);
pub type KbdUpdateFn = extern "C" fn();
pub type KbdCloseFn = extern "C" fn();
pub type InInitFn = extern "C" fn(state: *mut InState);
pub type InShutdownFn = extern "C" fn();
pub type InActivateFn = extern "C" fn(active: bool);
pub type InCommandsFn = extern "C" fn();
pub type InMoveFn = extern "C" fn(cmd: *mut UserCmd);
pub type InFrameFn = extern "C" fn();

pub const SYM_ABI_VERSION: &str = "vidref_abi_version";
pub const SYM_R_INIT: &str = "vidref_r_init";
pub const SYM_R_SHUTDOWN: &str = "vidref_r_shutdown";
pub const SYM_KBD_INIT: &str = "vidref_kbd_init";
pub const SYM_KBD_UPDATE: &str = "vidref_kbd_update";
pub const SYM_KBD_CLOSE: &str = "vidref_kbd_close";
pub const SYM_IN_INIT: &str = "vidref_in_init";
pub const SYM_IN_SHUTDOWN: &str = "vidref_in_shutdown";
pub const SYM_IN_ACTIVATE: &str = "vidref_in_activate";
pub const SYM_IN_COMMANDS: &str = "vidref_in_commands";
pub const SYM_IN_MOVE: &str = "vidref_in_move";
pub const SYM_IN_FRAME: &str = "vidref_in_frame";

/// Every entry point a module must export to be bindable
pub const REQUIRED_SYMBOLS: [&str; 12] = [
    SYM_ABI_VERSION,
    SYM_R_INIT,
    SYM_R_SHUTDOWN,
    SYM_KBD_INIT,
    SYM_KBD_UPDATE,
    SYM_KBD_CLOSE,
    SYM_IN_INIT,
    SYM_IN_SHUTDOWN,
    SYM_IN_ACTIVATE,
    SYM_IN_COMMANDS,
    SYM_IN_MOVE,
    SYM_IN_FRAME,
];

/// Extract a null-terminated string from a C buffer
pub fn extract_string(buffer: &[c_char]) -> String {
    let len = buffer.iter()
        .position(|&c| c == 0)
        .unwrap_or(buffer.len());

    let bytes: Vec<u8> = buffer[..len]
        .iter()
        .map(|&c| c as u8)
        .collect();

    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_string_stops_at_nul() {
        let mut buf = [0 as c_char; 8];
        for (i, b) in b"no gl".iter().enumerate() {
            buf[i] = *b as c_char;
        }
        assert_eq!(extract_string(&buf), "no gl");
    }

    #[test]
    fn test_extract_string_unterminated() {
        let buf = [b'x' as c_char; 4];
        assert_eq!(extract_string(&buf), "xxxx");
    }

    #[test]
    fn test_required_symbols_are_unique() {
        let mut names = REQUIRED_SYMBOLS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), REQUIRED_SYMBOLS.len());
    }
}
