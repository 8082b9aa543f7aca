/*
 *  main.rs
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

#[cfg(not(feature = "plugin-system"))]
compile_error!("vidref loads renderer modules at runtime and needs the 'plugin-system' feature");

use std::time::Duration;
use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{debug, error, info};

use vidref::config::{self, Cli};
use vidref::vid::{
    self, InputFocus, LogSink, NativeLoader, ProcessIdentity, VidHost, VidSystem,
};
use vidref::vid::ffi::UserCmd;
use vidref::{Commands, Cvars};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

const FRAME_TIME: Duration = Duration::from_millis(16);

/// Minimal host: no sound, no real screen, media is "registered" as soon
/// as the module settles.
#[derive(Debug, Default)]
struct ConsoleHost {
    disable_screen: bool,
    refresh_prepped: bool,
}

impl ConsoleHost {
    fn register_media(&mut self) {
        if !self.disable_screen && !self.refresh_prepped {
            debug!("registering media");
            self.refresh_prepped = true;
        }
    }
}

impl VidHost for ConsoleHost {
    fn stop_all_sounds(&mut self) {
        debug!("stop all sounds");
    }

    fn set_disable_screen(&mut self, disabled: bool) {
        self.disable_screen = disabled;
    }

    fn set_refresh_prepped(&mut self, prepped: bool) {
        self.refresh_prepped = prepped;
    }
}

fn main() {
    let cli = Cli::parse();

    let settings = match config::load(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("config: {e}");
            std::process::exit(2);
        }
    };

    if cli.dump_config {
        match serde_yaml::to_string(&settings.config) {
            Ok(yaml) => print!("{yaml}"),
            Err(e) => eprintln!("config: {e}"),
        }
        return;
    }

    let level = settings.config.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} - renderer module loader", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    if let Err(e) = run(&cli, settings) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli, mut settings: config::Settings) -> anyhow::Result<()> {
    vid::disable_vendor_splash();

    let mut cvars = Cvars::new();
    let mut cmds = Commands::new();
    settings.config.seed(&mut cvars);
    vid::input_init(&mut cvars);

    let loader = NativeLoader::new(settings.config.driver_path.clone());
    let mut system = VidSystem::new(
        Box::new(loader),
        Box::new(ProcessIdentity),
        Box::new(LogSink),
    );
    let mut host = ConsoleHost::default();

    system
        .init(&mut cvars, &mut cmds, &mut host)
        .context("video startup failed")?;
    host.register_media();

    let vid_def = system.vid_def();
    info!("{} active at {}x{}",
        system.active_module().unwrap_or("?"), vid_def.width, vid_def.height);

    for command in &cli.exec {
        cmds.execute(command, &mut cvars);
    }

    for frame in 0..cli.frames {
        system
            .check_changes(&mut cvars, &mut host)
            .with_context(|| format!("video change failed on frame {frame}"))?;
        host.register_media();

        system.in_commands();
        let mut cmd = UserCmd::default();
        system.in_move(&mut cmd);
        system.in_frame(InputFocus {
            refresh_prepped: host.refresh_prepped,
            console: false,
            menu: false,
        });
        system.kbd_update();

        std::thread::sleep(FRAME_TIME);
    }

    system.shutdown();

    settings.config.capture(&cvars);
    settings
        .config
        .save(&settings.path)
        .with_context(|| format!("saving {}", settings.path.display()))?;
    debug!("saved {}", settings.path.display());

    Ok(())
}
