/*
 *  vid/modes.rs
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
 *
 *  Video mode catalog
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

use crate::cvar::Cvars;
use super::{R_CUSTOMHEIGHT, R_CUSTOMWIDTH};

/// Mode index meaning "use r_customwidth/r_customheight"
pub const CUSTOM_MODE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoMode {
    pub description: &'static str,
    pub width: i32,
    pub height: i32,
    pub mode: i32,
}

const fn m(description: &'static str, width: i32, height: i32, mode: i32) -> VideoMode {
    VideoMode { description, width, height, mode }
}

// menus list these by index, keep the order stable
pub const VID_MODES: [VideoMode; 31] = [
    m("Mode 0: 320x240", 320, 240, 0),
    m("Mode 1: 400x300", 400, 300, 1),
    m("Mode 2: 512x384", 512, 384, 2),
    m("Mode 3: 640x480", 640, 480, 3),
    m("Mode 4: 800x600", 800, 600, 4),
    m("Mode 5: 960x720", 960, 720, 5),
    m("Mode 6: 1024x768", 1024, 768, 6),
    m("Mode 7: 1152x864", 1152, 864, 7),
    m("Mode 8: 1280x960", 1280, 960, 8),
    m("Mode 9: 1280x1024", 1280, 1024, 9),
    m("Mode 10: 1400x1050", 1400, 1050, 10),
    m("Mode 11: 1600x1200", 1600, 1200, 11),
    m("Mode 12: 1920x1440", 1920, 1440, 12),
    m("Mode 13: 2048x1536", 2048, 1536, 13),
    m("Mode 14: 800x480", 800, 480, 14),
    m("Mode 15: 856x480", 856, 480, 15),
    m("Mode 16: 1024x600", 1024, 600, 16),
    m("Mode 17: 1280x720", 1280, 720, 17),
    m("Mode 18: 1280x768", 1280, 768, 18),
    m("Mode 19: 1280x800", 1280, 800, 19),
    m("Mode 20: 1360x768", 1360, 768, 20),
    m("Mode 21: 1366x768", 1366, 768, 21),
    m("Mode 22: 1440x900", 1440, 900, 22),
    m("Mode 23: 1600x900", 1600, 900, 23),
    m("Mode 24: 1600x1024", 1600, 1024, 24),
    m("Mode 25: 1680x1050", 1680, 1050, 25),
    m("Mode 26: 1920x1080", 1920, 1080, 26),
    m("Mode 27: 1920x1200", 1920, 1200, 27),
    m("Mode 28: 2560x1080", 2560, 1080, 28),
    m("Mode 29: 2560x1440", 2560, 1440, 29),
    m("Mode 30: 2560x1600", 2560, 1600, 30),
];

/// Width and height for a mode index. `-1` reads the custom size from
/// configuration; any other index outside the catalog gives `None`.
pub fn get_mode_info(mode: i32, cvars: &Cvars) -> Option<(i32, i32)> {
    if mode == CUSTOM_MODE {
        return Some((cvars.value_i32(R_CUSTOMWIDTH), cvars.value_i32(R_CUSTOMHEIGHT)));
    }

    let entry = usize::try_from(mode).ok().and_then(|i| VID_MODES.get(i))?;
    Some((entry.width, entry.height))
}
