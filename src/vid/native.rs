/*
 *  vid/native.rs
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
 *
 *  Native module adapter - wraps C ABI entry points as Rust trait objects
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

use std::ffi::{c_char, c_int, c_void, CStr};
use std::rc::Rc;
use log::debug;
use libloading::Library;

use super::binding::{Bindings, KeyboardOps, PointerOps, VideoOps};
use super::error::LoadError;
use super::ffi::*;
use super::host::HostLink;
use super::loader::{check_abi_version, RendererModule};

/// A renderer module opened from a shared object.
///
/// The entry points copied out of `library` by [`resolve`](Self::resolve)
/// are plain function pointers; they dangle once this value is dropped,
/// which is why the binding table is always cleared first.
pub struct NativeModule {
    name: String,
    library: Library,
}

impl NativeModule {
    pub(crate) fn new(name: &str, library: Library) -> Self {
        Self { name: name.to_string(), library }
    }

    fn symbol<T: Copy>(&self, symbol: &str) -> Result<T, LoadError> {
        // SAFETY: T is one of the fn pointer types from `ffi`, which the
        // module contract defines for each exported name.
        unsafe { self.library.get::<T>(symbol.as_bytes()) }
            .map(|s| *s)
            .map_err(|e| {
                debug!("{}: {}", self.name, e);
                LoadError::SymbolResolutionFailure {
                    name: self.name.clone(),
                    symbol: symbol.to_string(),
                }
            })
    }

    fn check_abi(&self) -> Result<(), LoadError> {
        let abi_version: AbiVersionFn = self.symbol(SYM_ABI_VERSION)?;

        let mut major = 0u32;
        let mut minor = 0u32;
        abi_version(&mut major, &mut minor);

        check_abi_version(&self.name, major, minor)
    }
}

impl RendererModule for NativeModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, link: &Rc<HostLink>) -> Result<Bindings, LoadError> {
        self.check_abi()?;

        // everything is looked up before anything is built
        let r_init: RInitFn = self.symbol(SYM_R_INIT)?;
        let r_shutdown: RShutdownFn = self.symbol(SYM_R_SHUTDOWN)?;
        let kbd_init: KbdInitFn = self.symbol(SYM_KBD_INIT)?;
        let kbd_update: KbdUpdateFn = self.symbol(SYM_KBD_UPDATE)?;
        let kbd_close: KbdCloseFn = self.symbol(SYM_KBD_CLOSE)?;
        let in_init: InInitFn = self.symbol(SYM_IN_INIT)?;
        let in_shutdown: InShutdownFn = self.symbol(SYM_IN_SHUTDOWN)?;
        let in_activate: InActivateFn = self.symbol(SYM_IN_ACTIVATE)?;
        let in_commands: InCommandsFn = self.symbol(SYM_IN_COMMANDS)?;
        let in_move: InMoveFn = self.symbol(SYM_IN_MOVE)?;
        let in_frame: InFrameFn = self.symbol(SYM_IN_FRAME)?;

        let user = link_user(link);

        let video = NativeVideo {
            r_init,
            r_shutdown,
            imports: Box::new(RefImports {
                user,
                print: host_print,
                new_window: host_new_window,
                request_restart: host_request_restart,
            }),
            _link: Rc::clone(link),
        };

        let keyboard = NativeKeyboard {
            init: kbd_init,
            update: kbd_update,
            close: kbd_close,
            link: Rc::clone(link),
        };

        let pointer = NativePointer {
            init: in_init,
            shutdown: in_shutdown,
            activate: in_activate,
            commands: in_commands,
            movement: in_move,
            frame: in_frame,
            state: Box::new(InState {
                user,
                viewangles: link.viewangles_ptr(),
                in_strafe_state: link.strafe_state_ptr(),
                center_view: host_center_view,
                key_event: host_key_event,
            }),
            _link: Rc::clone(link),
        };

        Ok(Bindings::new(Box::new(video), Box::new(keyboard), Box::new(pointer)))
    }
}

struct NativeVideo {
    r_init: RInitFn,
    r_shutdown: RShutdownFn,
    imports: Box<RefImports>,
    // keeps `imports.user` alive
    _link: Rc<HostLink>,
}

impl VideoOps for NativeVideo {
    fn init(&mut self, width: i32, height: i32) -> Result<(), String> {
        let mut message = [0 as c_char; VIDREF_INIT_MESSAGE_SIZE];

        let ok = (self.r_init)(
            &*self.imports,
            width,
            height,
            message.as_mut_ptr(),
            message.len(),
        );

        if ok {
            return Ok(());
        }

        let message = extract_string(&message);
        if message.is_empty() {
            Err("no diagnostic given".to_string())
        } else {
            Err(message)
        }
    }

    fn shutdown(&mut self) {
        (self.r_shutdown)();
    }
}

struct NativeKeyboard {
    init: KbdInitFn,
    update: KbdUpdateFn,
    close: KbdCloseFn,
    link: Rc<HostLink>,
}

impl KeyboardOps for NativeKeyboard {
    fn init(&mut self) {
        (self.init)(host_key_event, link_user(&self.link));
    }

    fn update(&mut self) {
        (self.update)();
    }

    fn close(&mut self) {
        (self.close)();
    }
}

struct NativePointer {
    init: InInitFn,
    shutdown: InShutdownFn,
    activate: InActivateFn,
    commands: InCommandsFn,
    movement: InMoveFn,
    frame: InFrameFn,
    // handed to the module by address, so it lives in a Box
    state: Box<InState>,
    _link: Rc<HostLink>,
}

impl PointerOps for NativePointer {
    fn init(&mut self) {
        (self.init)(&mut *self.state);
    }

    fn shutdown(&mut self) {
        (self.shutdown)();
    }

    fn activate(&mut self, active: bool) {
        (self.activate)(active);
    }

    fn commands(&mut self) {
        (self.commands)();
    }

    fn movement(&mut self, cmd: &mut UserCmd) {
        (self.movement)(cmd);
    }

    fn frame(&mut self) {
        (self.frame)();
    }
}

fn link_user(link: &Rc<HostLink>) -> *mut c_void {
    Rc::as_ptr(link) as *mut c_void
}

/// # Safety
/// `user` must be null or come from [`link_user`] on a live link.
unsafe fn link_from<'a>(user: *mut c_void) -> Option<&'a HostLink> {
    unsafe { (user as *const HostLink).as_ref() }
}

extern "C" fn host_print(level: c_int, message: *const c_char) {
    if message.is_null() {
        return;
    }
    // SAFETY: the module passes a null-terminated string
    let message = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    HostLink::print(level, &message);
}

extern "C" fn host_new_window(user: *mut c_void, width: c_int, height: c_int) {
    // SAFETY: `user` is the pointer placed in RefImports by `resolve`
    if let Some(link) = unsafe { link_from(user) } {
        link.new_window(width, height);
    }
}

extern "C" fn host_request_restart(user: *mut c_void) {
    // SAFETY: as above
    if let Some(link) = unsafe { link_from(user) } {
        link.request_restart();
    }
}

extern "C" fn host_center_view(user: *mut c_void) {
    // SAFETY: `user` is the pointer placed in InState by `resolve`
    if let Some(link) = unsafe { link_from(user) } {
        link.center_view();
    }
}

extern "C" fn host_key_event(user: *mut c_void, key: c_int, down: bool) {
    // SAFETY: `user` is the pointer given to keyboard or pointer init
    if let Some(link) = unsafe { link_from(user) } {
        link.key_event(key, down);
    }
}
