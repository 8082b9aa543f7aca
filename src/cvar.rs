/*
 *  cvar.rs
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
 *
 *  Console variable store
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
use log::debug;

bitflags::bitflags! {
    /// Variable attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CvarFlags: u8 {
        const NONE = 0;
        /// Written back to the config file on shutdown
        const ARCHIVE = 1 << 0;
        /// Value only changes through `persist`
        const NOSET = 1 << 1;
    }
}

/// A single named variable
#[derive(Debug, Clone, PartialEq)]
pub struct Cvar {
    pub name: String,
    pub value: String,
    pub default: String,
    pub flags: CvarFlags,
    /// Raised whenever the value is changed through `set`.
    /// Consumers clear it once they have reacted.
    pub modified: bool,
}

impl Cvar {
    fn new(name: &str, value: &str, default: &str, flags: CvarFlags) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            default: default.to_string(),
            flags,
            modified: true,
        }
    }

    /// Numeric view of the value, `0.0` when it does not parse
    pub fn as_f32(&self) -> f32 {
        self.value.trim().parse::<f32>().unwrap_or(0.0)
    }
}

/// String-keyed variable store
#[derive(Debug, Default)]
pub struct Cvars {
    vars: BTreeMap<String, Cvar>,
}

impl Cvars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load a value read from persisted configuration.
    ///
    /// A later `get` keeps the seeded value and only fills in the default
    /// and flags, the same way a config file executed before registration
    /// wins over the compiled-in default.
    pub fn seed(&mut self, name: &str, value: &str) {
        self.vars
            .entry(name.to_string())
            .and_modify(|v| v.value = value.to_string())
            .or_insert_with(|| Cvar::new(name, value, value, CvarFlags::NONE));
    }

    /// Fetch a variable, creating it with `default` when it does not exist
    pub fn get(&mut self, name: &str, default: &str, flags: CvarFlags) -> &Cvar {
        let var = self
            .vars
            .entry(name.to_string())
            .or_insert_with(|| Cvar::new(name, default, default, flags));
        var.default = default.to_string();
        var.flags |= flags;
        var
    }

    pub fn find(&self, name: &str) -> Option<&Cvar> {
        self.vars.get(name)
    }

    /// Current string value, empty when the variable does not exist
    pub fn string(&self, name: &str) -> &str {
        self.vars.get(name).map(|v| v.value.as_str()).unwrap_or("")
    }

    pub fn value_f32(&self, name: &str) -> f32 {
        self.vars.get(name).map(Cvar::as_f32).unwrap_or(0.0)
    }

    pub fn value_i32(&self, name: &str) -> i32 {
        self.value_f32(name) as i32
    }

    /// Set from user input; ignored for `NOSET` variables.
    /// Returns true when the value changed.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        match self.vars.get_mut(name) {
            Some(var) if var.flags.contains(CvarFlags::NOSET) => {
                debug!("{} is write protected", name);
                false
            }
            Some(var) => {
                if var.value == value {
                    return false;
                }
                var.value = value.to_string();
                var.modified = true;
                true
            }
            None => {
                self.vars
                    .insert(name.to_string(), Cvar::new(name, value, value, CvarFlags::NONE));
                true
            }
        }
    }

    /// Record a value without raising `modified`.
    ///
    /// Used for bookkeeping writes (the module that ended up loaded) that
    /// must not feed back into change detection.
    pub fn persist(&mut self, name: &str, value: String) {
        match self.vars.get_mut(name) {
            Some(var) => var.value = value,
            None => {
                let mut var = Cvar::new(name, &value, &value, CvarFlags::NONE);
                var.modified = false;
                self.vars.insert(name.to_string(), var);
            }
        }
    }

    pub fn is_modified(&self, name: &str) -> bool {
        self.vars.get(name).is_some_and(|v| v.modified)
    }

    pub fn set_modified(&mut self, name: &str, modified: bool) {
        if let Some(var) = self.vars.get_mut(name) {
            var.modified = modified;
        }
    }

    /// Variables flagged `ARCHIVE`, in name order
    pub fn archived(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars
            .values()
            .filter(|v| v.flags.contains(CvarFlags::ARCHIVE))
            .map(|v| (v.name.as_str(), v.value.as_str()))
    }
}
