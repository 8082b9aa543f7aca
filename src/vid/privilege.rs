/*
 *  vid/privilege.rs
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
 *
 *  One-way drop of elevated process identity
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

use std::io;
use log::{debug, info};

use super::error::VidError;

/// Process identity calls, split out so the dropper can be tested
/// without touching the real process.
pub trait Identity {
    /// (uid, gid)
    fn real_ids(&self) -> (u32, u32);

    /// (euid, egid)
    fn effective_ids(&self) -> (u32, u32);

    /// Set real and effective gid
    fn set_gid(&mut self, gid: u32) -> io::Result<()>;

    /// Set real and effective uid
    fn set_uid(&mut self, uid: u32) -> io::Result<()>;
}

/// The running process, via libc
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessIdentity;

impl Identity for ProcessIdentity {
    fn real_ids(&self) -> (u32, u32) {
        // SAFETY: getuid/getgid cannot fail
        unsafe { (libc::getuid(), libc::getgid()) }
    }

    fn effective_ids(&self) -> (u32, u32) {
        // SAFETY: geteuid/getegid cannot fail
        unsafe { (libc::geteuid(), libc::getegid()) }
    }

    fn set_gid(&mut self, gid: u32) -> io::Result<()> {
        // SAFETY: plain syscall, result checked
        if unsafe { libc::setregid(gid, gid) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn set_uid(&mut self, uid: u32) -> io::Result<()> {
        // SAFETY: plain syscall, result checked
        if unsafe { libc::setreuid(uid, uid) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeState {
    Elevated,
    Dropped,
}

/// Gives up elevated uid/gid exactly once per process.
///
/// Run after the first module's render init, which may need privileged
/// device access, and before the module is handed to anything else.
pub struct PrivilegeDropper {
    identity: Box<dyn Identity>,
    state: PrivilegeState,
}

impl PrivilegeDropper {
    pub fn new(identity: Box<dyn Identity>) -> Self {
        Self { identity, state: PrivilegeState::Elevated }
    }

    pub fn state(&self) -> PrivilegeState {
        self.state
    }

    /// Returns `Ok(true)` when this call performed the drop and `Ok(false)`
    /// when it had already happened. An error is fatal: the identity may be
    /// half changed and the process must not carry on.
    pub fn drop_once(&mut self) -> Result<bool, VidError> {
        if self.state == PrivilegeState::Dropped {
            return Ok(false);
        }

        let (uid, gid) = self.identity.real_ids();
        let (euid, egid) = self.identity.effective_ids();
        debug!("dropping privileges: euid {} -> {}, egid {} -> {}", euid, uid, egid, gid);

        // group first; once the uid is gone the gid can no longer change
        self.identity
            .set_gid(gid)
            .map_err(|e| VidError::PrivilegeDropFailure(format!("setregid({gid}): {e}")))?;
        self.identity
            .set_uid(uid)
            .map_err(|e| VidError::PrivilegeDropFailure(format!("setreuid({uid}): {e}")))?;

        let now = self.identity.effective_ids();
        if now != (uid, gid) {
            return Err(VidError::PrivilegeDropFailure(format!(
                "effective ids still {}:{} after drop to {}:{}",
                now.0, now.1, uid, gid
            )));
        }

        if (euid, egid) != (uid, gid) {
            info!("Relinquished elevated privileges");
        }
        self.state = PrivilegeState::Dropped;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vid::mock::MockIdentity;

    #[test]
    fn test_drop_once_then_noop() {
        let identity = MockIdentity::setuid_root(1000, 100);
        let observer = identity.clone();
        let mut dropper = PrivilegeDropper::new(Box::new(identity));

        assert_eq!(dropper.state(), PrivilegeState::Elevated);
        assert!(dropper.drop_once().unwrap());
        assert_eq!(dropper.state(), PrivilegeState::Dropped);
        assert_eq!(observer.effective_ids(), (1000, 100));

        assert!(!dropper.drop_once().unwrap());
        assert_eq!(observer.calls(), 2);
    }

    #[test]
    fn test_failed_syscall_is_fatal_and_not_recorded() {
        let identity = MockIdentity::setuid_root(1000, 100).refusing();
        let mut dropper = PrivilegeDropper::new(Box::new(identity));

        let err = dropper.drop_once().unwrap_err();
        assert!(matches!(err, VidError::PrivilegeDropFailure(_)));
        assert_eq!(dropper.state(), PrivilegeState::Elevated);
    }

    #[test]
    fn test_ineffective_drop_is_fatal() {
        let identity = MockIdentity::setuid_root(1000, 100).ignoring();
        let mut dropper = PrivilegeDropper::new(Box::new(identity));
        assert!(matches!(dropper.drop_once(), Err(VidError::PrivilegeDropFailure(_))));
    }

    #[test]
    fn test_unprivileged_process_drop_is_harmless() {
        // setreuid/setregid to the current real ids is always permitted
        let mut dropper = PrivilegeDropper::new(Box::new(ProcessIdentity));
        let before = ProcessIdentity.real_ids();
        if ProcessIdentity.effective_ids() == before {
            assert!(dropper.drop_once().unwrap());
            assert_eq!(ProcessIdentity.effective_ids(), before);
        }
    }
}
