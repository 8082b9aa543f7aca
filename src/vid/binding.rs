/*
 *  vid/binding.rs
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
 *
 *  Binding table - operation groups bound to the active module
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
use log::debug;

use super::error::LoadError;
use super::ffi::UserCmd;
use super::host::HostLink;
use super::loader::{LoadedModule, RendererModule};

/// Render-level operations
pub trait VideoOps {
    /// Bring up the output surface. `0, 0` lets the module choose.
    /// On failure returns the module's diagnostic.
    fn init(&mut self, width: i32, height: i32) -> Result<(), String>;

    fn shutdown(&mut self);
}

/// Keyboard operations. Key events are delivered through the host link.
pub trait KeyboardOps {
    fn init(&mut self);

    fn update(&mut self);

    fn close(&mut self);
}

/// Pointer-device operations
pub trait PointerOps {
    fn init(&mut self);

    fn shutdown(&mut self);

    fn activate(&mut self, active: bool);

    fn commands(&mut self);

    fn movement(&mut self, cmd: &mut UserCmd);

    fn frame(&mut self);
}

/// The complete set of operations resolved from one module.
/// Only ever constructed whole, so a partial set cannot exist.
pub struct Bindings {
    pub video: Box<dyn VideoOps>,
    pub keyboard: Box<dyn KeyboardOps>,
    pub pointer: Box<dyn PointerOps>,
}

impl Bindings {
    pub fn new(
        video: Box<dyn VideoOps>,
        keyboard: Box<dyn KeyboardOps>,
        pointer: Box<dyn PointerOps>,
    ) -> Self {
        Self { video, keyboard, pointer }
    }
}

/// Operation groups currently bound, either all of them or none
#[derive(Default)]
pub struct BindingTable {
    slots: Option<Bindings>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every operation from `module` and install them as a unit.
    ///
    /// On failure the table is left untouched.
    pub fn bind(
        &mut self,
        module: &dyn RendererModule,
        link: &Rc<HostLink>,
    ) -> Result<&mut Bindings, LoadError> {
        debug_assert!(self.slots.is_none(), "bind over a populated table");
        let bindings = module.resolve(link)?;
        debug!("bound {}", module.name());
        Ok(self.slots.insert(bindings))
    }

    /// Drop every slot; idempotent
    pub fn clear(&mut self) {
        self.slots = None;
    }

    /// Clear the table, then run the module's own shutdown entry points
    /// through the bindings just removed.
    pub fn shutdown(&mut self) {
        if let Some(mut ops) = self.slots.take() {
            ops.keyboard.close();
            ops.pointer.shutdown();
            ops.video.shutdown();
        }
    }

    pub fn is_bound(&self) -> bool {
        self.slots.is_some()
    }

    // Optional per-frame operations: no-ops while the table is empty.

    pub fn kbd_update(&mut self) {
        if let Some(ops) = self.slots.as_mut() {
            ops.keyboard.update();
        }
    }

    pub fn in_activate(&mut self, active: bool) {
        if let Some(ops) = self.slots.as_mut() {
            ops.pointer.activate(active);
        }
    }

    pub fn in_commands(&mut self) {
        if let Some(ops) = self.slots.as_mut() {
            ops.pointer.commands();
        }
    }

    pub fn in_move(&mut self, cmd: &mut UserCmd) {
        if let Some(ops) = self.slots.as_mut() {
            ops.pointer.movement(cmd);
        }
    }

    pub fn in_frame(&mut self) {
        if let Some(ops) = self.slots.as_mut() {
            ops.pointer.frame();
        }
    }
}

/// The binding table and the module it points into.
///
/// Bindings hold raw entry points into the module, so the table is always
/// emptied before the module is closed.
#[derive(Default)]
pub struct ActiveRef {
    pub table: BindingTable,
    pub module: LoadedModule,
}

impl ActiveRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the attached module. Fails like a missing symbol when nothing
    /// is attached.
    pub fn bind(&mut self, link: &Rc<HostLink>) -> Result<&mut Bindings, LoadError> {
        let Some(module) = self.module.handle() else {
            return Err(LoadError::SymbolResolutionFailure {
                name: String::new(),
                symbol: "<no module attached>".to_string(),
            });
        };
        self.table.bind(module, link)
    }

    /// Full teardown: shutdown slots, clear, close
    pub fn teardown(&mut self) {
        if let Some(name) = self.module.name() {
            debug!("tearing down {}", name);
        }
        self.table.shutdown();
        self.module.close();
    }

    pub fn is_active(&self) -> bool {
        self.module.is_active()
    }
}

impl Drop for ActiveRef {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vid::host::LogSink;
    use crate::vid::loader::ModuleLoader;
    use crate::vid::mock::{MockBehavior, MockLoader};

    fn link() -> Rc<HostLink> {
        HostLink::new(Box::new(LogSink))
    }

    #[test]
    fn test_bind_installs_all_groups() {
        let mut loader = MockLoader::new().with("soft", MockBehavior::Ok);
        let module = loader.open("soft").unwrap();
        let mut table = BindingTable::new();
        assert!(!table.is_bound());
        table.bind(module.as_ref(), &link()).unwrap();
        assert!(table.is_bound());
    }

    #[test]
    fn test_failed_bind_leaves_table_empty() {
        let mut loader = MockLoader::new().with("gl", MockBehavior::MissingSymbol("vidref_in_move"));
        let module = loader.open("gl").unwrap();
        let mut table = BindingTable::new();
        let err = table.bind(module.as_ref(), &link()).err().unwrap();
        assert!(matches!(err, LoadError::SymbolResolutionFailure { .. }));
        assert!(!table.is_bound());
    }

    #[test]
    fn test_optional_ops_are_noops_when_empty() {
        let mut table = BindingTable::new();
        let mut cmd = UserCmd::default();
        table.kbd_update();
        table.in_activate(true);
        table.in_commands();
        table.in_move(&mut cmd);
        table.in_frame();
        assert_eq!(cmd, UserCmd::default());
    }

    #[test]
    fn test_clear_and_shutdown_are_idempotent() {
        let mut loader = MockLoader::new().with("soft", MockBehavior::Ok);
        let log = loader.log();
        let module = loader.open("soft").unwrap();
        let mut table = BindingTable::new();
        table.bind(module.as_ref(), &link()).unwrap();

        table.shutdown();
        table.shutdown();
        table.clear();
        assert!(!table.is_bound());

        let log = log.borrow();
        assert_eq!(log.count("kbd_close:soft"), 1);
        assert_eq!(log.count("in_shutdown:soft"), 1);
        assert_eq!(log.count("r_shutdown:soft"), 1);
    }

    #[test]
    fn test_teardown_order() {
        let mut loader = MockLoader::new().with("soft", MockBehavior::Ok);
        let log = loader.log();
        let mut active = ActiveRef::new();
        active.module.attach(loader.open("soft").unwrap());
        active.bind(&link()).unwrap();
        active.teardown();
        active.teardown();

        assert!(!active.table.is_bound());
        assert!(!active.module.is_loaded());
        assert_eq!(
            log.borrow().events,
            vec![
                "open:soft",
                "bind:soft",
                "kbd_close:soft",
                "in_shutdown:soft",
                "r_shutdown:soft",
                "close:soft",
            ]
        );
    }

    #[test]
    fn test_bind_without_module_fails() {
        let mut active = ActiveRef::new();
        assert!(active.bind(&link()).is_err());
        assert!(!active.table.is_bound());
    }
}
