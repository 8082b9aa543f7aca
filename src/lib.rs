/*
 *  lib.rs
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

//! Runtime loader for the renderer/input backend module.
//!
//! A single renderer module is picked from an ordered candidate list
//! (the configured `vid_ref` first, then a fixed fallback list), bound
//! against a table of video, keyboard and pointer operations, and swapped
//! out safely whenever `vid_ref` is marked modified.
//!
//! - [`cvar`] and [`cmd`] are the configuration variable store and the
//!   console command registry the video subsystem talks to.
//! - [`config`] persists archived variables between runs.
//! - [`vid`] is the subsystem itself.

pub mod cmd;
pub mod config;
pub mod cvar;
pub mod vid;

pub use cmd::Commands;
pub use cvar::{Cvar, CvarFlags, Cvars};
pub use vid::{VidError, VidHost, VidState, VidSystem};
