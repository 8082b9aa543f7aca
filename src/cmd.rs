/*
 *  cmd.rs
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
 *
 *  Console command registry
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

use std::collections::BTreeMap;
use log::warn;

use crate::cvar::Cvars;

/// Zero-argument command handler
pub type CommandFn = fn(&mut Cvars);

/// Named console commands
#[derive(Debug, Default)]
pub struct Commands {
    table: BTreeMap<String, CommandFn>,
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. An existing registration is kept.
    pub fn add(&mut self, name: &str, handler: CommandFn) -> bool {
        if self.table.contains_key(name) {
            warn!("Cmd_AddCommand: {} already defined", name);
            return false;
        }
        self.table.insert(name.to_string(), handler);
        true
    }

    pub fn exists(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Run a command line; arguments after the name are ignored.
    /// Returns false for unknown commands.
    pub fn execute(&self, line: &str, cvars: &mut Cvars) -> bool {
        let Some(name) = line.split_whitespace().next() else {
            return false;
        };

        match self.table.get(name) {
            Some(handler) => {
                handler(cvars);
                true
            }
            None => {
                warn!("Unknown command \"{}\"", name);
                false
            }
        }
    }
}
