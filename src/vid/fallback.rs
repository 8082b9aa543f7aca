/*
 *  vid/fallback.rs
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
 *
 *  Candidate ordering and the fallback search over renderer modules
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

use std::fmt;
use std::rc::Rc;
use log::{error, info, warn};

use crate::cvar::Cvars;
use super::binding::ActiveRef;
use super::error::{LoadError, VidError};
use super::host::HostLink;
use super::loader::ModuleLoader;
use super::privilege::PrivilegeDropper;
use super::VID_REF;

/// Built-in modules tried after the configured one, in this order
pub const FALLBACK_DRIVERS: [&str; 3] = ["gl", "softx", "soft"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrigin {
    Configured,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCandidate {
    pub name: String,
    pub origin: CandidateOrigin,
}

impl fmt::Display for DriverCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            CandidateOrigin::Configured => write!(f, "{} (configured)", self.name),
            CandidateOrigin::Fallback => write!(f, "{} (fallback)", self.name),
        }
    }
}

/// Attempt order: the configured name, then every fallback.
/// Duplicates are kept, so a configured fallback name is tried twice.
pub fn candidate_sequence(configured: &str, fallbacks: &[&str]) -> Vec<DriverCandidate> {
    std::iter::once(DriverCandidate {
        name: configured.to_string(),
        origin: CandidateOrigin::Configured,
    })
    .chain(fallbacks.iter().map(|name| DriverCandidate {
        name: (*name).to_string(),
        origin: CandidateOrigin::Fallback,
    }))
    .collect()
}

/// Drives loader, binding table and privilege dropper through the
/// candidates until one completes the full init chain.
pub struct DriverFallbackController {
    loader: Box<dyn ModuleLoader>,
    privileges: PrivilegeDropper,
}

impl DriverFallbackController {
    pub fn new(loader: Box<dyn ModuleLoader>, privileges: PrivilegeDropper) -> Self {
        Self { loader, privileges }
    }

    pub fn privileges(&self) -> &PrivilegeDropper {
        &self.privileges
    }

    /// Try each candidate in order. On success the winner is recorded in
    /// `vid_ref`, privileges are dropped and the module is marked active.
    ///
    /// Per-candidate failures are logged and skipped; the returned error
    /// is always fatal.
    pub fn select(
        &mut self,
        active: &mut ActiveRef,
        link: &Rc<HostLink>,
        candidates: &[DriverCandidate],
        cvars: &mut Cvars,
    ) -> Result<String, VidError> {
        for candidate in candidates {
            info!("Attempted driver load: {}", candidate);

            if let Err(e) = self.attempt(active, link, &candidate.name) {
                warn!("{}: {}", candidate, e);
                continue;
            }

            let name = match record_name(&candidate.name) {
                Ok(name) => name,
                Err(e) => {
                    active.teardown();
                    return Err(e);
                }
            };
            cvars.persist(VID_REF, name.clone());

            if let Err(e) = self.privileges.drop_once() {
                active.teardown();
                return Err(e);
            }

            active.module.mark_active();
            info!("Loading driver: {}", name);
            return Ok(name);
        }

        let tried: Vec<String> = candidates.iter().map(|c| c.name.clone()).collect();
        error!("No suitable renderer module after {} attempts", tried.len());
        Err(VidError::AllCandidatesExhausted { tried })
    }

    /// One pass of the init chain. Nothing survives a failed attempt.
    fn attempt(
        &mut self,
        active: &mut ActiveRef,
        link: &Rc<HostLink>,
        name: &str,
    ) -> Result<(), LoadError> {
        // at most one module is ever live
        if active.module.is_loaded() {
            info!("REFLIB ACTIVE, shutting down {}", active.module.name().unwrap_or("?"));
            active.teardown();
        }

        active.module.attach(self.loader.open(name)?);

        let ops = match active.bind(link) {
            Ok(ops) => ops,
            Err(e) => {
                active.module.close();
                return Err(e);
            }
        };

        ops.pointer.init();

        if let Err(message) = ops.video.init(0, 0) {
            ops.pointer.shutdown();
            active.table.clear();
            active.module.close();
            return Err(LoadError::InitFailure { name: name.to_string(), message });
        }

        ops.keyboard.init();
        Ok(())
    }
}

/// Copy the winning name into fresh storage without aborting on OOM
fn record_name(name: &str) -> Result<String, VidError> {
    let mut owned = String::new();
    owned.try_reserve_exact(name.len())?;
    owned.push_str(name);
    Ok(owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cvar::CvarFlags;
    use crate::vid::ffi::VIDREF_ABI_VERSION_MAJOR;
    use crate::vid::host::LogSink;
    use crate::vid::mock::{MockBehavior, MockIdentity, MockLoader};
    use crate::vid::privilege::PrivilegeState;

    fn setup(loader: MockLoader) -> (DriverFallbackController, MockIdentity, ActiveRef, Rc<HostLink>, Cvars) {
        let identity = MockIdentity::setuid_root(1000, 1000);
        let controller = DriverFallbackController::new(
            Box::new(loader),
            PrivilegeDropper::new(Box::new(identity.clone())),
        );
        let mut cvars = Cvars::new();
        cvars.get(VID_REF, "soft", CvarFlags::ARCHIVE);
        (controller, identity, ActiveRef::new(), HostLink::new(Box::new(LogSink)), cvars)
    }

    #[test]
    fn test_candidate_sequence_order() {
        let seq = candidate_sequence("driverA", &FALLBACK_DRIVERS);
        let names: Vec<&str> = seq.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["driverA", "gl", "softx", "soft"]);
        assert_eq!(seq[0].origin, CandidateOrigin::Configured);
        assert!(seq[1..].iter().all(|c| c.origin == CandidateOrigin::Fallback));
    }

    #[test]
    fn test_candidate_sequence_keeps_duplicates() {
        let seq = candidate_sequence("softx", &FALLBACK_DRIVERS);
        assert_eq!(seq.len(), 4);
        assert_eq!(seq.iter().filter(|c| c.name == "softx").count(), 2);
    }

    #[test]
    fn test_first_success_wins() {
        let loader = MockLoader::new()
            .with("gl", MockBehavior::Ok)
            .with("softx", MockBehavior::Ok);
        let log = loader.log();
        let (mut controller, identity, mut active, link, mut cvars) = setup(loader);

        let seq = candidate_sequence("driverA", &FALLBACK_DRIVERS);
        let name = controller.select(&mut active, &link, &seq, &mut cvars).unwrap();

        assert_eq!(name, "gl");
        assert_eq!(cvars.string(VID_REF), "gl");
        assert!(active.is_active());
        assert_eq!(active.module.name(), Some("gl"));
        assert_eq!(log.borrow().opened, vec!["driverA", "gl"]);
        assert_eq!(identity.calls(), 2);
        assert_eq!(controller.privileges().state(), PrivilegeState::Dropped);
    }

    #[test]
    fn test_init_chain_order() {
        let loader = MockLoader::new().with("soft", MockBehavior::Ok);
        let log = loader.log();
        let (mut controller, _, mut active, link, mut cvars) = setup(loader);

        controller
            .select(&mut active, &link, &candidate_sequence("soft", &[]), &mut cvars)
            .unwrap();

        assert_eq!(
            log.borrow().events,
            vec!["open:soft", "bind:soft", "in_init:soft", "r_init:soft", "kbd_init:soft"]
        );
    }

    #[test]
    fn test_failed_attempts_leave_nothing_behind() {
        let loader = MockLoader::new()
            .with("gl", MockBehavior::MissingSymbol("vidref_kbd_init"))
            .with("softx", MockBehavior::InitFails("no display".into()))
            .with("soft", MockBehavior::Ok);
        let log = loader.log();
        let (mut controller, _, mut active, link, mut cvars) = setup(loader);

        let seq = candidate_sequence("driverA", &FALLBACK_DRIVERS);
        assert_eq!(controller.select(&mut active, &link, &seq, &mut cvars).unwrap(), "soft");

        let log = log.borrow();
        assert_eq!(log.count("close:gl"), 1);
        assert_eq!(log.count("close:softx"), 1);
        assert_eq!(log.count("in_shutdown:softx"), 1);
        assert_eq!(log.count("kbd_init:softx"), 0);
        assert_eq!(log.max_live, 1);
    }

    #[test]
    fn test_abi_mismatch_moves_to_next_candidate() {
        let loader = MockLoader::new()
            .with("driverA", MockBehavior::AbiMismatch(VIDREF_ABI_VERSION_MAJOR + 1))
            .with("gl", MockBehavior::Ok);
        let log = loader.log();
        let (mut controller, _, mut active, link, mut cvars) = setup(loader);

        let seq = candidate_sequence("driverA", &FALLBACK_DRIVERS);
        assert_eq!(controller.select(&mut active, &link, &seq, &mut cvars).unwrap(), "gl");

        let log = log.borrow();
        assert_eq!(log.opened, vec!["driverA", "gl"]);
        assert_eq!(log.count("bind:driverA"), 0);
        assert_eq!(log.count("close:driverA"), 1);
        assert_eq!(log.max_live, 1);
    }

    #[test]
    fn test_exhausted_list_is_fatal() {
        let (mut controller, identity, mut active, link, mut cvars) = setup(MockLoader::new());

        let seq = candidate_sequence("driverA", &FALLBACK_DRIVERS);
        let err = controller.select(&mut active, &link, &seq, &mut cvars).unwrap_err();

        match err {
            VidError::AllCandidatesExhausted { tried } => assert_eq!(tried.len(), 4),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!active.is_active());
        assert!(!active.module.is_loaded());
        assert_eq!(cvars.string(VID_REF), "soft");
        assert_eq!(identity.calls(), 0);
    }

    #[test]
    fn test_previous_module_torn_down_before_next_load() {
        let loader = MockLoader::new()
            .with("gl", MockBehavior::Ok)
            .with("soft", MockBehavior::Ok);
        let log = loader.log();
        let (mut controller, identity, mut active, link, mut cvars) = setup(loader);

        controller.select(&mut active, &link, &candidate_sequence("gl", &[]), &mut cvars).unwrap();
        controller.select(&mut active, &link, &candidate_sequence("soft", &[]), &mut cvars).unwrap();

        let log = log.borrow();
        let close_gl = log.position("close:gl").unwrap();
        let open_soft = log.position("open:soft").unwrap();
        assert!(close_gl < open_soft);
        assert_eq!(log.max_live, 1);
        // the second success does not drop again
        assert_eq!(identity.calls(), 2);
    }

    #[test]
    fn test_privilege_failure_is_fatal_and_unloads() {
        let loader = MockLoader::new().with("soft", MockBehavior::Ok);
        let identity = MockIdentity::setuid_root(1000, 1000).refusing();
        let mut controller = DriverFallbackController::new(
            Box::new(loader),
            PrivilegeDropper::new(Box::new(identity)),
        );
        let mut active = ActiveRef::new();
        let link = HostLink::new(Box::new(LogSink));
        let mut cvars = Cvars::new();

        let err = controller
            .select(&mut active, &link, &candidate_sequence("soft", &[]), &mut cvars)
            .unwrap_err();
        assert!(matches!(err, VidError::PrivilegeDropFailure(_)));
        assert!(!active.module.is_loaded());
    }
}
