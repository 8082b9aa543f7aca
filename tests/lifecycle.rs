/*
 *  tests/lifecycle.rs
 *
 *  Integration tests for renderer selection and hot swap
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
 */

use vidref::vid::mock::{MockBehavior, MockHost, MockIdentity, MockLoader, SharedLog};
use vidref::vid::{
    get_mode_info, vid_restart_f, LogSink, PrivilegeState, VidError, VidState, VidSystem,
    R_CUSTOMHEIGHT, R_CUSTOMWIDTH, VID_FULLSCREEN, VID_REF,
};
use vidref::{Commands, CvarFlags, Cvars};

struct Harness {
    vid: VidSystem,
    log: SharedLog,
    identity: MockIdentity,
    cvars: Cvars,
    cmds: Commands,
    host: MockHost,
}

impl Harness {
    fn new(configured: &str, loader: MockLoader) -> Self {
        let log = loader.log();
        let identity = MockIdentity::setuid_root(1000, 1000);
        let vid = VidSystem::new(Box::new(loader), Box::new(identity.clone()), Box::new(LogSink));

        let mut cvars = Cvars::new();
        cvars.seed(VID_REF, configured);

        Self { vid, log, identity, cvars, cmds: Commands::new(), host: MockHost::default() }
    }

    fn init(&mut self) -> Result<(), VidError> {
        self.vid.init_with_display(&mut self.cvars, &mut self.cmds, &mut self.host, false)
    }

    fn check(&mut self) -> Result<(), VidError> {
        self.vid.check_changes(&mut self.cvars, &mut self.host)
    }
}

#[test]
fn test_configured_fails_first_fallback_wins() {
    let mut h = Harness::new("driverA", MockLoader::new().with("gl", MockBehavior::Ok));

    h.init().unwrap();

    assert_eq!(h.vid.state(), VidState::Active);
    assert_eq!(h.vid.active_module(), Some("gl"));
    assert_eq!(h.cvars.string(VID_REF), "gl");
    assert!(!h.cvars.is_modified(VID_REF));
    assert_eq!(h.log.borrow().opened, vec!["driverA", "gl"]);

    // gid and uid, once
    assert_eq!(h.identity.calls(), 2);
    assert_eq!(h.vid.privilege_state(), PrivilegeState::Dropped);
}

#[test]
fn test_candidates_tried_in_order_until_one_completes() {
    let loader = MockLoader::new()
        .with("gl", MockBehavior::MissingSymbol("vidref_in_frame"))
        .with("softx", MockBehavior::InitFails("cannot open display".into()))
        .with("soft", MockBehavior::Ok);
    let mut h = Harness::new("driverA", loader);

    h.init().unwrap();

    assert_eq!(h.vid.active_module(), Some("soft"));
    assert_eq!(h.cvars.string(VID_REF), "soft");
    let log = h.log.borrow();
    assert_eq!(log.opened, vec!["driverA", "gl", "softx", "soft"]);
    assert_eq!(log.max_live, 1);
    assert_eq!(log.count("close:gl"), 1);
    assert_eq!(log.count("close:softx"), 1);
}

#[test]
fn test_all_candidates_fail_is_fatal_once() {
    let mut h = Harness::new("driverA", MockLoader::new());

    let err = h.init().unwrap_err();
    assert!(matches!(err, VidError::AllCandidatesExhausted { ref tried } if tried.len() == 4));
    assert_eq!(h.vid.state(), VidState::Fatal);
    assert_eq!(h.vid.active_module(), None);
    assert_eq!(h.identity.calls(), 0);

    // halted: no further attempts, whatever the flag says
    h.cvars.set_modified(VID_REF, true);
    assert!(matches!(h.check(), Err(VidError::Halted)));
    assert!(matches!(h.check(), Err(VidError::Halted)));
    assert_eq!(h.log.borrow().opened.len(), 4);
}

#[test]
fn test_retrigger_during_settling_reruns_whole_selection() {
    let loader = MockLoader::new().with("soft", MockBehavior::restart_on_init(1));
    let mut h = Harness::new("soft", loader);

    h.init().unwrap();

    assert_eq!(h.vid.state(), VidState::Active);
    assert_eq!(h.vid.active_module(), Some("soft"));

    let log = h.log.borrow();
    assert_eq!(log.count("open:soft"), 2);
    assert_eq!(log.count("r_init:soft"), 2);
    assert_eq!(log.count("close:soft"), 1);
    assert_eq!(log.max_live, 1);

    // one stop, screen held disabled across both passes, cleared once
    assert_eq!(h.host.sounds_stopped, 1);
    assert_eq!(h.host.screen_history, vec![true, true, false]);
    assert_eq!(h.identity.calls(), 2);
}

#[test]
fn test_vid_restart_swaps_module() {
    let loader = MockLoader::new()
        .with("gl", MockBehavior::Ok)
        .with("soft", MockBehavior::Ok);
    let mut h = Harness::new("gl", loader);
    h.init().unwrap();
    assert_eq!(h.vid.active_module(), Some("gl"));

    h.cvars.set(VID_REF, "soft");
    assert!(h.cmds.execute("vid_restart", &mut h.cvars));
    h.cvars.set_modified(VID_FULLSCREEN, false);
    h.check().unwrap();

    assert_eq!(h.vid.active_module(), Some("soft"));
    assert!(h.cvars.is_modified(VID_FULLSCREEN));
    assert!(!h.host.refresh_prepped);

    let log = h.log.borrow();
    let teardown = ["kbd_close:gl", "in_shutdown:gl", "r_shutdown:gl", "close:gl", "open:soft"];
    let positions: Vec<usize> = teardown.iter().map(|e| log.position(e).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_restart_without_name_change_reloads_same_module() {
    let mut h = Harness::new("soft", MockLoader::new().with("soft", MockBehavior::Ok));
    h.init().unwrap();

    vid_restart_f(&mut h.cvars);
    h.check().unwrap();

    assert_eq!(h.log.borrow().count("open:soft"), 2);
    assert_eq!(h.vid.active_module(), Some("soft"));
    assert_eq!(h.identity.calls(), 2);
}

#[test]
fn test_new_window_reaches_vid_def() {
    let mut h = Harness::new("soft", MockLoader::new().with("soft", MockBehavior::Ok));
    h.init().unwrap();
    let def = h.vid.vid_def();
    assert_eq!((def.width, def.height), (640, 480));
}

#[test]
fn test_shutdown_then_close_again_is_harmless() {
    let mut h = Harness::new("soft", MockLoader::new().with("soft", MockBehavior::Ok));
    h.init().unwrap();

    h.vid.shutdown();
    h.vid.shutdown();
    drop(h.vid);

    let log = h.log.borrow();
    assert_eq!(log.count("close:soft"), 1);
    assert_eq!(log.count("r_shutdown:soft"), 1);
    assert_eq!(log.live, 0);
}

#[test]
fn test_get_mode_info() {
    let mut cvars = Cvars::new();
    cvars.get(R_CUSTOMWIDTH, "1600", CvarFlags::ARCHIVE);
    cvars.get(R_CUSTOMHEIGHT, "1024", CvarFlags::ARCHIVE);

    assert_eq!(get_mode_info(-1, &cvars), Some((1600, 1024)));
    assert_eq!(get_mode_info(5, &cvars), Some((960, 720)));
    assert_eq!(get_mode_info(999, &cvars), None);
}
