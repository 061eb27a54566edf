// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! # Jukebox menu controller.
//!
//! Connects the rotary encoder, the menus and the display daemon, then runs
//! until the process is asked to stop.
//!
//! The program follows a strict setup-run-teardown pattern:
//!
//! * **Setup** loads the configuration, installs logging and signal handlers,
//!   connects the display and starts the encoder.
//! * **Run** builds the menus and gestures, starts the background screens and
//!   the player status watcher, and waits for the shutdown flag.
//! * **Teardown** stops the background threads and closes the menu manager,
//!   which releases the encoder.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{info, warn};

use jukeui::{
    commands::{self, detached_command_action},
    config::{self, AppConfig, EncoderKind},
    display::{DisplaySurface, LineWriter},
    encoder::{EncoderSource, KeyboardEncoder, ProcessEncoder},
    logging,
    menu::{Direction, Entry, MenuManager, action},
    player::{self, PlayerToggles},
    screens,
};

const MAIN_MENU: &str = "menu-main";
const POWER_MENU: &str = "menu-power";

/// The now-playing screen, drawn by the playback status service.
const MPD_SCREEN: &str = "mpd";

const KEYBOARD_LOG_FILE: &str = "jukeui.log";

const STARTUP_DELAY: Duration = Duration::from_secs(1);
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// The entry point of the application.
///
/// Sets up logging, signal handling, the display connection and the encoder,
/// hands over to [`run`], and closes the menu manager whatever the outcome.
fn main() -> Result<()> {
    let config = config::load_config();

    let log_file = match (config.encoder.kind, config.log_file.as_deref()) {
        (_, Some(path)) => Some(path),
        // The keyboard encoder owns the terminal
        (EncoderKind::Keyboard, None) => Some(KEYBOARD_LOG_FILE),
        (EncoderKind::Process, None) => None,
    };
    logging::init(log_file)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))
            .context("Failed to register signal handler")?;
    }

    info!("connecting to display");
    let display: Arc<dyn DisplaySurface> = Arc::new(
        LineWriter::connect(&config.display.host, config.display.port)
            .context("Failed to connect to display")?,
    );

    screens::draw_static_screens(&*display, config.width)
        .context("Failed to draw static screens")?;

    let encoder = create_encoder(&config, &shutdown)?;
    let mgr = MenuManager::new(Arc::clone(&display), encoder)
        .context("Failed to start menu manager")?;

    let res = run(&config, &mgr, &display, &shutdown);

    mgr.close().context("Failed to close encoder")?;

    res.context("Application error occurred")
}

/// Creates the encoder source named in the configuration.
fn create_encoder(config: &AppConfig, shutdown: &Arc<AtomicBool>) -> Result<Box<dyn EncoderSource>> {
    let encoder: Box<dyn EncoderSource> = match config.encoder.kind {
        EncoderKind::Process => Box::new(
            ProcessEncoder::spawn(&config.encoder.command)
                .context("Failed to start encoder helper")?,
        ),
        EncoderKind::Keyboard => Box::new(
            KeyboardEncoder::new(Arc::clone(shutdown))
                .context("Failed to start keyboard encoder")?,
        ),
    };

    Ok(encoder)
}

/// Builds the menus and gestures, starts the background threads and blocks
/// until shutdown is requested.
///
/// # Errors
///
/// Returns an error if the menus cannot be registered.
fn run(
    config: &AppConfig,
    mgr: &MenuManager,
    display: &Arc<dyn DisplaySurface>,
    shutdown: &Arc<AtomicBool>,
) -> Result<()> {
    info!("creating menus");
    let toggles = PlayerToggles {
        playback: player::playback_entry(&config.commands),
        random: player::random_entry(&config.commands),
        output: match player::output_entry(&config.commands) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("audio output entry unavailable: {:#}", e);
                None
            }
        },
    };

    mgr.add_menu(MAIN_MENU, main_menu(config, mgr, &toggles))
        .context("Failed to add main menu")?;
    mgr.add_menu(POWER_MENU, power_menu(config, mgr, display))
        .context("Failed to add power menu")?;

    register_gestures(config, mgr);

    info!("starting background threads");
    let background = [
        screens::spawn_clock(Arc::clone(display), config.width, Arc::clone(shutdown)),
        screens::spawn_sysinfo(Arc::clone(display), config.width, Arc::clone(shutdown)),
        player::spawn_status_watcher(
            mgr.clone(),
            toggles,
            config.commands.clone(),
            config.status_poll(),
            Arc::clone(shutdown),
        ),
    ];

    if let Err(e) = mgr.switch_to(screens::STARTUP) {
        warn!("failed to show startup screen: {:#}", anyhow::Error::from(e));
    }

    // Give the startup screen a moment before showing the playback status
    let startup_mgr = mgr.clone();
    thread::spawn(move || {
        thread::sleep(STARTUP_DELAY);
        if let Err(e) = startup_mgr.switch_to(MPD_SCREEN) {
            warn!("failed to switch to playback status: {:#}", anyhow::Error::from(e));
        }
    });

    info!("running, waiting for shutdown");
    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(SHUTDOWN_POLL);
    }

    info!("shutting down");
    for handle in background {
        handle.join().ok();
    }

    Ok(())
}

fn main_menu(config: &AppConfig, mgr: &MenuManager, toggles: &PlayerToggles) -> Vec<Entry> {
    let mut entries = vec![
        Entry::separator("MODES"),
        Entry::click("Music info", mgr.switch_action(MPD_SCREEN)),
        Entry::click(
            "Playlists",
            player::playlists_action(mgr, &config.commands, MAIN_MENU),
        ),
        Entry::click("Clock", mgr.switch_action(screens::CLOCK)),
        Entry::click("System info", mgr.switch_action(screens::SYSINFO)),
        Entry::separator("OPTIONS"),
    ];

    if let Some(output) = &toggles.output {
        entries.push(Entry::toggle(output));
    }

    entries.extend([
        Entry::toggle(&toggles.playback),
        Entry::toggle(&toggles.random),
        Entry::separator("SYSTEM"),
        Entry::click("Powermenu", mgr.switch_action(POWER_MENU)),
        Entry::click("About", mgr.switch_action(screens::ABOUT)),
    ]);

    entries
}

fn power_menu(config: &AppConfig, mgr: &MenuManager, display: &Arc<dyn DisplaySurface>) -> Vec<Entry> {
    let power_action = |cmdline: &str| {
        let display = Arc::clone(display);
        let cmdline = cmdline.to_string();

        action(move || {
            screens::show_shutdown(&*display);
            commands::run(&cmdline)
        })
    };

    vec![
        Entry::click("Poweroff", power_action(&config.commands.poweroff)),
        Entry::click("Reboot", power_action(&config.commands.reboot)),
        Entry::click("Exit", mgr.switch_action(MAIN_MENU)),
    ]
}

/// Registers the long-press tiers and the release and rotate actions.
fn register_gestures(config: &AppConfig, mgr: &MenuManager) {
    // Short clicks resolve to this tier and do nothing
    mgr.add_timed_action(Duration::from_millis(10), action(|| Ok(())));

    mgr.add_timed_action(config.holds.menu(), mgr.hold_switch_action(MAIN_MENU));
    mgr.add_timed_action(config.holds.power(), mgr.hold_switch_action(POWER_MENU));

    let hoot_mgr = mgr.clone();
    let hoot = detached_command_action(&config.commands.hoot);
    mgr.add_timed_action(
        config.holds.hoot(),
        action(move || {
            hoot_mgr.ignore_next_release();
            hoot()
        }),
    );

    // Clicking on the playback status toggles playback, clicking on any
    // other screen that is not a menu returns to the main menu
    let release_mgr = mgr.clone();
    let toggle_playback = config.commands.toggle_playback.clone();
    mgr.set_release_action(action(move || {
        match release_mgr.active_window().as_deref() {
            Some(MPD_SCREEN) => commands::run(&toggle_playback)?,
            Some(window) if !window.contains("menu") => release_mgr.switch_to(MAIN_MENU)?,
            _ => {}
        }

        Ok(())
    }));

    // Turning the knob on the playback status skips tracks
    let rotate_mgr = mgr.clone();
    let next = config.commands.next.clone();
    let previous = config.commands.previous.clone();
    mgr.add_rotate_action(action(move || {
        if rotate_mgr.active_window().as_deref() != Some(MPD_SCREEN) {
            return Ok(());
        }

        match rotate_mgr.direction() {
            Direction::Right => commands::run(&next),
            Direction::Left => commands::run(&previous),
            Direction::None => Ok(()),
        }
    }));
}
