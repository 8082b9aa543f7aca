/*
 *  vidref soft module - Renderer Implementation
 *
 *  Headless software renderer exported through the vidref module ABI
 */

use std::cell::RefCell;
use std::ffi::{c_char, c_int, c_void, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::ffi::*;

/// Geometry used when the host leaves the choice to the module
pub const DEFAULT_WIDTH: c_int = 640;
pub const DEFAULT_HEIGHT: c_int = 480;

const VERSION_BANNER: &str = "ref_soft version: 1.0\n";

/// Host callbacks copied out of `RefImports`
#[derive(Clone, Copy)]
struct Host {
    user: *mut c_void,
    print: PrintFn,
    new_window: NewWindowFn,
}

/// Pointer-device hooks copied out of `InState`
#[derive(Clone, Copy)]
struct PointerHooks {
    user: *mut c_void,
    center_view: CenterViewFn,
}

/// Module state between calls. The host drives every entry point from
/// one thread.
#[derive(Default)]
struct SoftState {
    host: Option<Host>,
    keyboard: Option<(KeyEventFn, *mut c_void)>,
    pointer: Option<PointerHooks>,
    width: c_int,
    height: c_int,
    pointer_active: bool,
    recenter_pending: bool,
}

impl SoftState {
    fn print(&self, level: c_int, message: &str) {
        if let (Some(host), Ok(text)) = (self.host, CString::new(message)) {
            (host.print)(level, text.as_ptr());
        }
    }
}

thread_local! {
    static STATE: RefCell<SoftState> = RefCell::new(SoftState::default());
}

fn with_state<R>(f: impl FnOnce(&mut SoftState) -> R) -> R {
    STATE.with(|s| f(&mut s.borrow_mut()))
}

/// Macro to catch panics in FFI functions
macro_rules! catch_panic {
    ($message:expr, $len:expr, $code:block) => {
        match catch_unwind(AssertUnwindSafe(|| $code)) {
            Ok(result) => result,
            Err(panic_info) => {
                let text = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    format!("module panic: {}", s)
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    format!("module panic: {}", s)
                } else {
                    "module panic: unknown error".to_string()
                };
                copy_str_to_buffer(&text, $message, $len);
                false
            }
        }
    };
    ($code:block) => {
        let _ = catch_unwind(AssertUnwindSafe(|| $code));
    };
}

// ============================================================================
// Exported entry points
// ============================================================================

#[no_mangle]
pub extern "C" fn vidref_abi_version(major: *mut u32, minor: *mut u32) {
    if !major.is_null() && !minor.is_null() {
        unsafe {
            *major = VIDREF_ABI_VERSION_MAJOR;
            *minor = VIDREF_ABI_VERSION_MINOR;
        }
    }
}

/// Render init. A zero width or height selects the default geometry.
#[no_mangle]
pub extern "C" fn vidref_r_init(
    imports: *const RefImports,
    width: c_int,
    height: c_int,
    message: *mut c_char,
    message_len: usize,
) -> bool {
    catch_panic!(message, message_len, {
        if imports.is_null() {
            copy_str_to_buffer("null imports passed to r_init", message, message_len);
            return false;
        }

        let imports = unsafe { &*imports };
        let host = Host {
            user: imports.user,
            print: imports.print,
            new_window: imports.new_window,
        };

        let (width, height) = if width > 0 && height > 0 {
            (width, height)
        } else {
            (DEFAULT_WIDTH, DEFAULT_HEIGHT)
        };

        with_state(|s| {
            s.host = Some(host);
            s.width = width;
            s.height = height;
            s.print(PRINT_ALL, VERSION_BANNER);
        });

        #[cfg(feature = "debug-logging")]
        log::debug!("soft: window {}x{}", width, height);

        (host.new_window)(host.user, width, height);
        true
    })
}

#[no_mangle]
pub extern "C" fn vidref_r_shutdown() {
    catch_panic!({
        with_state(|s| {
            let message = format!("ref_soft shutdown ({}x{})\n", s.width, s.height);
            s.print(PRINT_DEVELOPER, &message);
            s.host = None;
            s.width = 0;
            s.height = 0;
        });
    });
}

#[no_mangle]
pub extern "C" fn vidref_kbd_init(key_event: KeyEventFn, user: *mut c_void) {
    with_state(|s| s.keyboard = Some((key_event, user)));
}

/// No keyboard device behind a headless surface
#[no_mangle]
pub extern "C" fn vidref_kbd_update() {}

#[no_mangle]
pub extern "C" fn vidref_kbd_close() {
    with_state(|s| {
        s.keyboard.take();
    });
}

#[no_mangle]
pub extern "C" fn vidref_in_init(state: *mut InState) {
    if state.is_null() {
        return;
    }
    let state = unsafe { &*state };
    with_state(|s| {
        s.pointer = Some(PointerHooks {
            user: state.user,
            center_view: state.center_view,
        });
        s.pointer_active = false;
    });
}

#[no_mangle]
pub extern "C" fn vidref_in_shutdown() {
    with_state(|s| {
        s.pointer = None;
        s.pointer_active = false;
        s.recenter_pending = false;
    });
}

/// Grabbing the pointer recentres the view on the next frame
#[no_mangle]
pub extern "C" fn vidref_in_activate(active: bool) {
    with_state(|s| {
        if active && !s.pointer_active {
            s.recenter_pending = true;
        }
        s.pointer_active = active;
    });
}

#[no_mangle]
pub extern "C" fn vidref_in_commands() {}

#[no_mangle]
pub extern "C" fn vidref_in_move(cmd: *mut UserCmd) {
    if cmd.is_null() {
        return;
    }
    // no pointer motion to add; leave the command untouched
}

#[no_mangle]
pub extern "C" fn vidref_in_frame() {
    let recenter = with_state(|s| {
        let hooks = s.pointer.filter(|_| s.recenter_pending);
        s.recenter_pending = false;
        hooks
    });

    // called outside the borrow; the host may call back in
    if let Some(hooks) = recenter {
        (hooks.center_view)(hooks.user);
    }
}
