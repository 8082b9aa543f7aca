/*
 *  vid/host.rs
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
 *
 *  Host state shared with the loaded renderer module
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

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use log::{debug, info, warn};

use super::ffi::PRINT_ALL;

/// Receiver for input produced by the module's keyboard and pointer code
pub trait InputSink {
    fn key_event(&mut self, key: i32, down: bool);

    fn center_view(&mut self);
}

/// Sink that only logs, for hosts without an input dispatcher
#[derive(Debug, Default)]
pub struct LogSink;

impl InputSink for LogSink {
    fn key_event(&mut self, key: i32, down: bool) {
        debug!("key {} {}", key, if down { "down" } else { "up" });
    }

    fn center_view(&mut self) {
        debug!("center view");
    }
}

/// Negotiated video size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VidDef {
    pub width: i32,
    pub height: i32,
}

/// State the host shares with whichever module is bound.
///
/// Held in an `Rc` by the lifecycle coordinator and by every binding, so
/// the raw pointers handed across the C ABI stay valid for as long as a
/// binding can use them. Single threaded; interior mutability only.
pub struct HostLink {
    viddef: Cell<VidDef>,
    restart_requested: Cell<bool>,
    viewangles: Cell<[f32; 3]>,
    strafe_state: Cell<i32>,
    sink: RefCell<Box<dyn InputSink>>,
}

impl HostLink {
    pub fn new(sink: Box<dyn InputSink>) -> Rc<Self> {
        Rc::new(Self {
            viddef: Cell::new(VidDef::default()),
            restart_requested: Cell::new(false),
            viewangles: Cell::new([0.0; 3]),
            strafe_state: Cell::new(0),
            sink: RefCell::new(sink),
        })
    }

    pub fn vid_def(&self) -> VidDef {
        self.viddef.get()
    }

    /// The module created or resized its output surface.
    /// The size survives teardown until the next module overwrites it.
    pub fn new_window(&self, width: i32, height: i32) {
        debug!("new window {}x{}", width, height);
        self.viddef.set(VidDef { width, height });
    }

    /// Ask for a full re-selection. Picked up by the coordinator after the
    /// current pass; never acted on from inside a module call.
    pub fn request_restart(&self) {
        self.restart_requested.set(true);
    }

    pub fn take_restart_request(&self) -> bool {
        self.restart_requested.replace(false)
    }

    pub fn viewangles(&self) -> [f32; 3] {
        self.viewangles.get()
    }

    pub fn key_event(&self, key: i32, down: bool) {
        match self.sink.try_borrow_mut() {
            Ok(mut sink) => sink.key_event(key, down),
            Err(_) => warn!("dropping key {} raised from inside the input sink", key),
        }
    }

    pub fn center_view(&self) {
        match self.sink.try_borrow_mut() {
            Ok(mut sink) => sink.center_view(),
            Err(_) => warn!("dropping center view raised from inside the input sink"),
        }
    }

    /// Route a module diagnostic to the log
    pub fn print(level: i32, message: &str) {
        let message = message.trim_end();
        if level == PRINT_ALL {
            info!("{}", message);
        } else {
            debug!("{}", message);
        }
    }

    pub(crate) fn viewangles_ptr(&self) -> *mut f32 {
        self.viewangles.as_ptr().cast()
    }

    pub(crate) fn strafe_state_ptr(&self) -> *mut i32 {
        self.strafe_state.as_ptr()
    }
}
