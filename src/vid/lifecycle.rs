/*
 *  vid/lifecycle.rs
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
 *
 *  Video lifecycle coordinator
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

use std::rc::Rc;
use log::{error, info};

use crate::cmd::Commands;
use crate::cvar::{CvarFlags, Cvars};
use super::binding::ActiveRef;
use super::error::VidError;
use super::fallback::{candidate_sequence, DriverFallbackController, FALLBACK_DRIVERS};
use super::ffi::UserCmd;
use super::host::{HostLink, InputSink, VidDef};
use super::loader::ModuleLoader;
use super::privilege::{Identity, PrivilegeDropper, PrivilegeState};
use super::{
    IN_JOYSTICK, R_CUSTOMHEIGHT, R_CUSTOMWIDTH, VID_FULLSCREEN, VID_GAMMA, VID_REF, VID_XPOS,
    VID_YPOS,
};

/// Upper bound on back-to-back selection passes in one `check_changes`
pub const MAX_SELECTION_PASSES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VidState {
    Uninitialized,
    Loading,
    Active,
    /// Terminal; the host is expected to exit
    Fatal,
}

/// Subsystems the coordinator notifies around a module swap
pub trait VidHost {
    /// Silence audio before the current module goes away
    fn stop_all_sounds(&mut self);

    /// While set, nothing may draw through the module
    fn set_disable_screen(&mut self, disabled: bool);

    /// Cleared on every swap; the host re-registers its media afterwards
    fn set_refresh_prepped(&mut self, prepped: bool);
}

/// Where keyboard/pointer focus currently is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputFocus {
    pub refresh_prepped: bool,
    pub console: bool,
    pub menu: bool,
}

impl InputFocus {
    /// The pointer is only grabbed for gameplay
    pub fn wants_pointer(&self) -> bool {
        self.refresh_prepped && !self.console && !self.menu
    }
}

/// Owns the active module and its bindings and decides when to swap them.
pub struct VidSystem {
    state: VidState,
    controller: DriverFallbackController,
    active: ActiveRef,
    link: Rc<HostLink>,
    max_passes: usize,
}

impl VidSystem {
    pub fn new(
        loader: Box<dyn ModuleLoader>,
        identity: Box<dyn Identity>,
        sink: Box<dyn InputSink>,
    ) -> Self {
        Self {
            state: VidState::Uninitialized,
            controller: DriverFallbackController::new(loader, PrivilegeDropper::new(identity)),
            active: ActiveRef::new(),
            link: HostLink::new(sink),
            max_passes: MAX_SELECTION_PASSES,
        }
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    /// Create the video variables with their defaults
    pub fn register_cvars(cvars: &mut Cvars, display_present: bool) {
        // with a display server around, try the windowed module
        let default_ref = if display_present { "softx" } else { "soft" };
        cvars.get(VID_REF, default_ref, CvarFlags::ARCHIVE);
        cvars.get(VID_XPOS, "3", CvarFlags::ARCHIVE);
        cvars.get(VID_YPOS, "22", CvarFlags::ARCHIVE);
        cvars.get(VID_FULLSCREEN, "0", CvarFlags::ARCHIVE);
        cvars.get(VID_GAMMA, "0.5", CvarFlags::ARCHIVE);
        cvars.get(R_CUSTOMWIDTH, "1600", CvarFlags::ARCHIVE);
        cvars.get(R_CUSTOMHEIGHT, "1024", CvarFlags::ARCHIVE);
    }

    /// Startup: variables, the restart command, then the first load
    pub fn init(
        &mut self,
        cvars: &mut Cvars,
        cmds: &mut Commands,
        host: &mut dyn VidHost,
    ) -> Result<(), VidError> {
        let display_present = std::env::var_os("DISPLAY").is_some();
        self.init_with_display(cvars, cmds, host, display_present)
    }

    pub fn init_with_display(
        &mut self,
        cvars: &mut Cvars,
        cmds: &mut Commands,
        host: &mut dyn VidHost,
        display_present: bool,
    ) -> Result<(), VidError> {
        Self::register_cvars(cvars, display_present);
        cmds.add("vid_restart", vid_restart_f);

        cvars.set_modified(VID_REF, true);
        self.check_changes(cvars, host)
    }

    /// Per-frame hook. When `vid_ref` is modified the current module is
    /// replaced, repeating the whole selection while the flag keeps being
    /// raised (up to the pass limit).
    pub fn check_changes(
        &mut self,
        cvars: &mut Cvars,
        host: &mut dyn VidHost,
    ) -> Result<(), VidError> {
        if self.state == VidState::Fatal {
            return Err(VidError::Halted);
        }

        // requested by the module between frames
        if self.link.take_restart_request() {
            cvars.set_modified(VID_REF, true);
        }

        if !cvars.is_modified(VID_REF) {
            return Ok(());
        }

        host.stop_all_sounds();

        let mut passes = 0;
        while cvars.is_modified(VID_REF) {
            if passes == self.max_passes {
                return Err(self.fail(VidError::RestartLoop { passes }));
            }
            passes += 1;

            cvars.set_modified(VID_REF, false);
            cvars.set_modified(VID_FULLSCREEN, true);
            host.set_refresh_prepped(false);
            host.set_disable_screen(true);
            self.state = VidState::Loading;

            let candidates = candidate_sequence(cvars.string(VID_REF), &FALLBACK_DRIVERS);
            match self.controller.select(&mut self.active, &self.link, &candidates, cvars) {
                Ok(name) => info!("Set vid_ref to {}", name),
                Err(e) => return Err(self.fail(e)),
            }

            // raised from inside the module's own init; handled by the next pass
            if self.link.take_restart_request() {
                cvars.set_modified(VID_REF, true);
            }
        }

        self.state = VidState::Active;
        host.set_disable_screen(false);
        Ok(())
    }

    /// Unload the active module, if any
    pub fn shutdown(&mut self) {
        if self.active.module.is_loaded() {
            info!("Shutting down {}", self.active.module.name().unwrap_or("?"));
        }
        self.active.teardown();
        if self.state != VidState::Fatal {
            self.state = VidState::Uninitialized;
        }
    }

    fn fail(&mut self, err: VidError) -> VidError {
        error!("VID_CheckChanges: {}", err);
        self.active.teardown();
        self.state = VidState::Fatal;
        err
    }

    pub fn state(&self) -> VidState {
        self.state
    }

    /// Name of the active module
    pub fn active_module(&self) -> Option<&str> {
        if self.active.is_active() {
            self.active.module.name()
        } else {
            None
        }
    }

    pub fn vid_def(&self) -> VidDef {
        self.link.vid_def()
    }

    pub fn link(&self) -> &Rc<HostLink> {
        &self.link
    }

    pub fn privilege_state(&self) -> PrivilegeState {
        self.controller.privileges().state()
    }

    pub fn in_commands(&mut self) {
        self.active.table.in_commands();
    }

    pub fn in_move(&mut self, cmd: &mut UserCmd) {
        self.active.table.in_move(cmd);
    }

    pub fn in_frame(&mut self, focus: InputFocus) {
        self.active.table.in_activate(focus.wants_pointer());
        self.active.table.in_frame();
    }

    pub fn kbd_update(&mut self) {
        self.active.table.kbd_update();
    }
}

/// `vid_restart`: reload the renderer module on the next frame
pub fn vid_restart_f(cvars: &mut Cvars) {
    cvars.set_modified(VID_REF, true);
}

/// Input variables; the devices themselves come with the module
pub fn input_init(cvars: &mut Cvars) {
    cvars.get(IN_JOYSTICK, "0", CvarFlags::ARCHIVE);
}
