/*
 *  vidref soft module
 *
 *  A headless software renderer module for the vidref loader.
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 */

//! # vidref soft renderer module
//!
//! Builds `libvidref_soft.so`, which the loader finds for `vid_ref soft`
//! (and as the last built-in fallback).
//!
//! ## Behaviour
//!
//! - render init reports a 640x480 window unless the host asks for a size
//! - no keyboard or pointer device; grabbing the pointer only recentres
//!   the view
//! - panics inside render init are caught and reported as an init failure
//!
//! ## Usage
//!
//! ```yaml
//! driver_path: /usr/lib/vidref
//! cvars:
//!   vid_ref: soft
//! ```

mod ffi;
mod plugin;

pub use plugin::{
    vidref_abi_version, vidref_in_activate, vidref_in_commands, vidref_in_frame,
    vidref_in_init, vidref_in_move, vidref_in_shutdown, vidref_kbd_close, vidref_kbd_init,
    vidref_kbd_update, vidref_r_init, vidref_r_shutdown,
};
