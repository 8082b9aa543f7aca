/*
 *  vid/mod.rs
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
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

//! Video subsystem: renderer module selection, binding and hot swap.
//!
//! The pieces, bottom up:
//!
//! - [`loader`] opens a module by name and owns its handle.
//! - [`binding`] resolves the module's entry points into a table that is
//!   either fully populated or empty.
//! - [`privilege`] drops elevated process identity once, after the first
//!   successful render init.
//! - [`fallback`] walks the candidate list until one module survives the
//!   whole init chain.
//! - [`lifecycle`] decides when to swap and keeps the rest of the host
//!   away from a half-loaded module.

pub mod binding;
pub mod error;
pub mod fallback;
pub mod ffi;
pub mod host;
pub mod lifecycle;
pub mod loader;
pub mod mock;
pub mod modes;
pub mod privilege;

#[cfg(feature = "plugin-system")]
pub mod native;

pub use binding::{ActiveRef, BindingTable, Bindings, KeyboardOps, PointerOps, VideoOps};
pub use error::{LoadError, VidError};
pub use fallback::{candidate_sequence, CandidateOrigin, DriverCandidate, DriverFallbackController, FALLBACK_DRIVERS};
pub use host::{HostLink, InputSink, LogSink, VidDef};
pub use lifecycle::{input_init, vid_restart_f, InputFocus, VidHost, VidState, VidSystem, MAX_SELECTION_PASSES};
pub use loader::{check_abi_version, BoxedModule, LoadedModule, ModuleLoader, RendererModule};
pub use modes::{get_mode_info, VideoMode, CUSTOM_MODE, VID_MODES};
pub use privilege::{Identity, PrivilegeDropper, PrivilegeState, ProcessIdentity};

#[cfg(feature = "plugin-system")]
pub use loader::NativeLoader;

// variable names
pub const VID_REF: &str = "vid_ref";
pub const VID_XPOS: &str = "vid_xpos";
pub const VID_YPOS: &str = "vid_ypos";
pub const VID_FULLSCREEN: &str = "vid_fullscreen";
pub const VID_GAMMA: &str = "vid_gamma";
pub const R_CUSTOMWIDTH: &str = "r_customwidth";
pub const R_CUSTOMHEIGHT: &str = "r_customheight";
pub const IN_JOYSTICK: &str = "in_joystick";

/// Environment switch some accelerated drivers read to skip their
/// startup splash
pub const VENDOR_SPLASH_ENV: &str = "FX_GLIDE_NO_SPLASH";

/// Turn off the vendor splash before any module is opened.
///
/// Call from `main` before other threads exist.
pub fn disable_vendor_splash() {
    // SAFETY: single threaded at this point, see above
    unsafe { std::env::set_var(VENDOR_SPLASH_ENV, "0") };
}
