/*
 *  vid/mock.rs
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
 *
 *  In-process test doubles for modules, process identity and the host
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

//! Scriptable stand-ins used by unit and integration tests.
//!
//! A [`MockLoader`] hands out [`MockModule`]s whose every operation is
//! recorded in a shared [`MockLog`], so tests can assert on the exact
//! sequence of calls made across a load, a failure or a teardown.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

use super::binding::{Bindings, KeyboardOps, PointerOps, VideoOps};
use super::error::LoadError;
use super::ffi::{UserCmd, VIDREF_ABI_VERSION_MINOR};
use super::host::HostLink;
use super::lifecycle::VidHost;
use super::loader::{check_abi_version, BoxedModule, ModuleLoader, RendererModule};
use super::privilege::Identity;

/// Window size reported by every mock module that initialises
pub const MOCK_WIDTH: i32 = 640;
pub const MOCK_HEIGHT: i32 = 480;

/// How a named mock module behaves when loaded
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Loads and initialises cleanly
    Ok,
    /// The loader cannot open it
    NotFound,
    /// Opens, but the named entry point is missing
    MissingSymbol(&'static str),
    /// Opens, but reports this ABI major version
    AbiMismatch(u32),
    /// Render init reports this diagnostic
    InitFails(String),
    /// Render init succeeds but asks for another selection pass while
    /// the shared counter is non-zero
    RestartOnInit(Rc<Cell<usize>>),
}

impl MockBehavior {
    pub fn restart_on_init(times: usize) -> Self {
        MockBehavior::RestartOnInit(Rc::new(Cell::new(times)))
    }
}

/// Everything the mocks observed
#[derive(Debug, Default)]
pub struct MockLog {
    /// `"<op>:<module>"` in call order
    pub events: Vec<String>,
    /// Every name passed to the loader, opened or not
    pub opened: Vec<String>,
    /// Modules currently open
    pub live: usize,
    /// High-water mark of `live`
    pub max_live: usize,
}

impl MockLog {
    fn record(&mut self, op: &str, name: &str) {
        self.events.push(format!("{}:{}", op, name));
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }
}

pub type SharedLog = Rc<RefCell<MockLog>>;

fn record(log: &SharedLog, op: &str, name: &str) {
    log.borrow_mut().record(op, name);
}

#[derive(Default)]
pub struct MockLoader {
    behaviors: HashMap<String, MockBehavior>,
    log: SharedLog,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a module; unscripted names are not found
    pub fn with(mut self, name: &str, behavior: MockBehavior) -> Self {
        self.behaviors.insert(name.to_string(), behavior);
        self
    }

    pub fn log(&self) -> SharedLog {
        Rc::clone(&self.log)
    }
}

impl ModuleLoader for MockLoader {
    fn open(&mut self, name: &str) -> Result<BoxedModule, LoadError> {
        self.log.borrow_mut().opened.push(name.to_string());

        let behavior = match self.behaviors.get(name) {
            None | Some(MockBehavior::NotFound) => {
                return Err(LoadError::LibraryNotFound {
                    name: name.to_string(),
                    reason: "no such mock module".to_string(),
                });
            }
            Some(behavior) => behavior.clone(),
        };

        {
            let mut log = self.log.borrow_mut();
            log.record("open", name);
            log.live += 1;
            log.max_live = log.max_live.max(log.live);
        }

        Ok(Box::new(MockModule {
            name: name.to_string(),
            behavior,
            log: Rc::clone(&self.log),
        }))
    }
}

pub struct MockModule {
    name: String,
    behavior: MockBehavior,
    log: SharedLog,
}

impl RendererModule for MockModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, link: &Rc<HostLink>) -> Result<Bindings, LoadError> {
        match self.behavior {
            MockBehavior::MissingSymbol(symbol) => {
                return Err(LoadError::SymbolResolutionFailure {
                    name: self.name.clone(),
                    symbol: symbol.to_string(),
                });
            }
            MockBehavior::AbiMismatch(major) => {
                check_abi_version(&self.name, major, VIDREF_ABI_VERSION_MINOR)?;
            }
            _ => {}
        }
        record(&self.log, "bind", &self.name);

        let part = || MockPart {
            name: self.name.clone(),
            behavior: self.behavior.clone(),
            log: Rc::clone(&self.log),
            link: Rc::clone(link),
        };
        Ok(Bindings::new(Box::new(part()), Box::new(part()), Box::new(part())))
    }
}

impl Drop for MockModule {
    fn drop(&mut self) {
        let mut log = self.log.borrow_mut();
        log.record("close", &self.name);
        log.live = log.live.saturating_sub(1);
    }
}

/// One operation group of a mock module
struct MockPart {
    name: String,
    behavior: MockBehavior,
    log: SharedLog,
    link: Rc<HostLink>,
}

impl MockPart {
    fn record(&self, op: &str) {
        record(&self.log, op, &self.name);
    }
}

impl VideoOps for MockPart {
    fn init(&mut self, _width: i32, _height: i32) -> Result<(), String> {
        self.record("r_init");
        match &self.behavior {
            MockBehavior::InitFails(message) => return Err(message.clone()),
            MockBehavior::RestartOnInit(remaining) if remaining.get() > 0 => {
                remaining.set(remaining.get() - 1);
                self.link.request_restart();
            }
            _ => {}
        }
        self.link.new_window(MOCK_WIDTH, MOCK_HEIGHT);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.record("r_shutdown");
    }
}

impl KeyboardOps for MockPart {
    fn init(&mut self) {
        self.record("kbd_init");
    }

    fn update(&mut self) {
        self.record("kbd_update");
    }

    fn close(&mut self) {
        self.record("kbd_close");
    }
}

impl PointerOps for MockPart {
    fn init(&mut self) {
        self.record("in_init");
    }

    fn shutdown(&mut self) {
        self.record("in_shutdown");
    }

    fn activate(&mut self, active: bool) {
        self.record(if active { "in_activate_on" } else { "in_activate_off" });
    }

    fn commands(&mut self) {
        self.record("in_commands");
    }

    fn movement(&mut self, cmd: &mut UserCmd) {
        self.record("in_move");
        cmd.forwardmove += 1;
    }

    fn frame(&mut self) {
        self.record("in_frame");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentityMode {
    Obey,
    Refuse,
    Ignore,
}

#[derive(Debug)]
struct IdentityState {
    real: (u32, u32),
    effective: (u32, u32),
    calls: usize,
}

/// Process identity double. Clones share state, so a test can keep one
/// to inspect after boxing the other.
#[derive(Debug, Clone)]
pub struct MockIdentity {
    state: Rc<RefCell<IdentityState>>,
    mode: IdentityMode,
}

impl MockIdentity {
    /// A set-uid-root process started by `uid:gid`
    pub fn setuid_root(uid: u32, gid: u32) -> Self {
        Self {
            state: Rc::new(RefCell::new(IdentityState {
                real: (uid, gid),
                effective: (0, 0),
                calls: 0,
            })),
            mode: IdentityMode::Obey,
        }
    }

    /// Every set call fails with EPERM
    pub fn refusing(mut self) -> Self {
        self.mode = IdentityMode::Refuse;
        self
    }

    /// Set calls report success but change nothing
    pub fn ignoring(mut self) -> Self {
        self.mode = IdentityMode::Ignore;
        self
    }

    /// Number of set calls made so far
    pub fn calls(&self) -> usize {
        self.state.borrow().calls
    }

    fn set(&mut self, apply: impl FnOnce(&mut IdentityState)) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls += 1;
        match self.mode {
            IdentityMode::Refuse => Err(io::Error::from(io::ErrorKind::PermissionDenied)),
            IdentityMode::Ignore => Ok(()),
            IdentityMode::Obey => {
                apply(&mut *state);
                Ok(())
            }
        }
    }
}

impl Identity for MockIdentity {
    fn real_ids(&self) -> (u32, u32) {
        self.state.borrow().real
    }

    fn effective_ids(&self) -> (u32, u32) {
        self.state.borrow().effective
    }

    fn set_gid(&mut self, gid: u32) -> io::Result<()> {
        self.set(|s| {
            s.real.1 = gid;
            s.effective.1 = gid;
        })
    }

    fn set_uid(&mut self, uid: u32) -> io::Result<()> {
        self.set(|s| {
            s.real.0 = uid;
            s.effective.0 = uid;
        })
    }
}

/// Records what the coordinator asked of the host
#[derive(Debug, Default)]
pub struct MockHost {
    pub sounds_stopped: usize,
    pub screen_disabled: bool,
    /// Every value passed to `set_disable_screen`, in order
    pub screen_history: Vec<bool>,
    pub refresh_prepped: bool,
}

impl VidHost for MockHost {
    fn stop_all_sounds(&mut self) {
        self.sounds_stopped += 1;
    }

    fn set_disable_screen(&mut self, disabled: bool) {
        self.screen_disabled = disabled;
        self.screen_history.push(disabled);
    }

    fn set_refresh_prepped(&mut self, prepped: bool) {
        self.refresh_prepped = prepped;
    }
}
