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

//! Music player integration.
//!
//! The player daemon is controlled through `mpc`. This module builds the
//! menu entries that reflect player state (playback, random mode, audio
//! output), the playlists menu, and a watcher thread that keeps the toggle
//! entries in sync with changes made elsewhere, e.g. from a phone.

use std::{
    sync::{Arc, atomic::AtomicBool},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::{
    commands::{self, command_action},
    config::CommandConfig,
    menu::{Action, Entry, MenuManager, ToggleEntry, action},
    screens,
};

pub const PLAYLISTS_MENU: &str = "menu-playlists";

const PLAYING: &str = "▶";
const PAUSED: &str = "⏸";
const STOPPED: &str = "⏹";

const ENABLED: &str = "✓";
const DISABLED: &str = "×";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

impl PlaybackState {
    /// The toggle label for this state.
    pub fn glyph(self) -> &'static str {
        match self {
            PlaybackState::Playing => PLAYING,
            PlaybackState::Paused => PAUSED,
            PlaybackState::Stopped => STOPPED,
        }
    }
}

fn bool_glyph(enabled: bool) -> &'static str {
    if enabled { ENABLED } else { DISABLED }
}

/// The parts of `mpc status` the menus care about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status {
    pub state: PlaybackState,
    pub random: bool,
}

/// Parses the output of `mpc status`.
///
/// A stopped player prints only the options line, a playing or paused one
/// prints the current song and a `[playing]`/`[paused]` line before it.
pub fn parse_status(text: &str) -> Option<Status> {
    let state = text
        .lines()
        .find_map(|line| {
            if line.starts_with("[playing]") {
                Some(PlaybackState::Playing)
            } else if line.starts_with("[paused]") {
                Some(PlaybackState::Paused)
            } else {
                None
            }
        })
        .unwrap_or(PlaybackState::Stopped);

    let mut words = text.split_whitespace().skip_while(|word| *word != "random:");
    let random = match (words.next(), words.next()) {
        (Some(_), Some("on")) => true,
        (Some(_), Some("off")) => false,
        _ => return None,
    };

    Some(Status { state, random })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Output {
    pub id: u32,
    pub name: String,
    pub enabled: bool,
}

/// Parses the output of `mpc outputs`, one `Output <id> (<name>) is
/// enabled|disabled` line per audio output. Other lines are skipped.
pub fn parse_outputs(text: &str) -> Vec<Output> {
    text.lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("Output ")?;
            let (id, rest) = rest.split_once(" (")?;
            let (name, state) = rest.rsplit_once(") is ")?;

            Some(Output {
                id: id.parse().ok()?,
                name: name.to_string(),
                enabled: state == "enabled",
            })
        })
        .collect()
}

/// Parses the output of `mpc lsplaylists`, one name per line.
pub fn parse_playlists(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn playback_entry(cmds: &CommandConfig) -> Arc<ToggleEntry> {
    Arc::new(
        ToggleEntry::new("Playback")
            .with_state(PLAYING, command_action(&cmds.play))
            .with_state(PAUSED, command_action(&cmds.pause))
            .with_state(STOPPED, command_action(&cmds.stop)),
    )
}

pub fn random_entry(cmds: &CommandConfig) -> Arc<ToggleEntry> {
    Arc::new(
        ToggleEntry::new("Random")
            .with_state(ENABLED, command_action(&cmds.random_on))
            .with_state(DISABLED, command_action(&cmds.random_off)),
    )
}

/// Builds a toggle cycling through the audio outputs the player knows.
///
/// # Errors
///
/// Returns an error if the outputs cannot be listed.
pub fn output_entry(cmds: &CommandConfig) -> Result<Arc<ToggleEntry>> {
    let listing = commands::output(&cmds.outputs).context("Failed to list audio outputs")?;
    let outputs = parse_outputs(&listing);

    let entry = outputs.iter().fold(ToggleEntry::new("Output"), |entry, output| {
        let enable = cmds.enable_output.clone();
        let id = output.id.to_string();
        let enable_output = action(move || commands::run_with(&enable, &[id.as_str()]));
        entry.with_state(output.name.clone(), enable_output)
    });

    let entry = Arc::new(entry);
    if let Some(active) = outputs.iter().find(|output| output.enabled) {
        entry.set_state(&active.name)?;
    }

    Ok(entry)
}

/// An action listing the stored playlists as a fresh menu and switching to
/// it. Picking a playlist replaces the queue with it and starts playback.
pub fn playlists_action(mgr: &MenuManager, cmds: &CommandConfig, back_to: &str) -> Action {
    let mgr = mgr.clone();
    let cmds = cmds.clone();
    let back_to = back_to.to_string();

    action(move || {
        let listing = commands::output(&cmds.playlists).context("Failed to list playlists")?;

        let mut entries: Vec<Entry> = parse_playlists(&listing)
            .into_iter()
            .map(|name| {
                let load = load_playlist_action(&cmds, &name);
                Entry::click(name, load)
            })
            .collect();
        entries.push(Entry::click("Exit", mgr.switch_action(&back_to)));

        mgr.add_menu(PLAYLISTS_MENU, entries)?;
        mgr.switch_to(PLAYLISTS_MENU)?;

        Ok(())
    })
}

fn load_playlist_action(cmds: &CommandConfig, name: &str) -> Action {
    let clear = cmds.clear_queue.clone();
    let load = cmds.load_playlist.clone();
    let play = cmds.play.clone();
    let name = name.to_string();

    action(move || {
        commands::run(&clear)?;
        commands::run_with(&load, &[name.as_str()])?;
        commands::run(&play)
    })
}

/// Toggle entries mirroring player state.
pub struct PlayerToggles {
    pub playback: Arc<ToggleEntry>,
    pub random: Arc<ToggleEntry>,
    pub output: Option<Arc<ToggleEntry>>,
}

impl PlayerToggles {
    /// Updates playback and random mode. An unknown status marks both as
    /// unknown. Returns whether anything visible changed.
    pub fn apply_status(&self, status: Option<Status>) -> bool {
        let before = self.snapshot();

        match status {
            Some(status) => {
                set_known(&self.playback, status.state.glyph());
                set_known(&self.random, bool_glyph(status.random));
            }
            None => {
                self.playback.clear_state();
                self.random.clear_state();
            }
        }

        before != self.snapshot()
    }

    /// Marks the first enabled output as the active one. Returns whether the
    /// output entry changed.
    pub fn apply_outputs(&self, outputs: &[Output]) -> bool {
        let Some(entry) = &self.output else {
            return false;
        };

        let before = entry.state();
        match outputs.iter().find(|output| output.enabled) {
            Some(active) if entry.order().contains(&active.name) => set_known(entry, &active.name),
            // Outputs added after startup are not part of the toggle
            Some(_) | None => entry.clear_state(),
        }

        before != entry.state()
    }

    fn snapshot(&self) -> (Option<String>, Option<String>) {
        (self.playback.state(), self.random.state())
    }
}

fn set_known(entry: &ToggleEntry, label: &str) {
    if let Err(e) = entry.set_state(label) {
        warn!("{}", e);
    }
}

/// Polls the player every `interval` until `stop` is raised, rendering the
/// active menu whenever a toggle changed.
pub fn spawn_status_watcher(
    mgr: MenuManager,
    toggles: PlayerToggles,
    cmds: CommandConfig,
    interval: Duration,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            let status = match commands::output(&cmds.status) {
                Ok(text) => parse_status(&text),
                Err(e) => {
                    warn!("failed to query player status: {:#}", e);
                    None
                }
            };
            let mut changed = toggles.apply_status(status);

            if toggles.output.is_some() {
                match commands::output(&cmds.outputs) {
                    Ok(text) => changed |= toggles.apply_outputs(&parse_outputs(&text)),
                    Err(e) => warn!("failed to query audio outputs: {:#}", e),
                }
            }

            if changed {
                debug!("player state changed");
                mgr.display();
            }

            if !screens::sleep_unless_stopped(&stop, interval) {
                break;
            }
        }

        debug!("status watcher stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::testing::counter;

    const PLAYING_STATUS: &str = "\
Daft Punk - Around the World
[playing] #3/12   1:23/7:09 (19%)
volume: 80%   repeat: off   random: on    single: off   consume: off
";

    const STOPPED_STATUS: &str =
        "volume: n/a   repeat: off   random: off   single: off   consume: off\n";

    const OUTPUTS: &str = "\
Output 1 (USB DAC) is enabled
Output 2 (Living room (HDMI)) is disabled
";

    fn toggles(with_output: bool) -> PlayerToggles {
        let cmds = CommandConfig::default();
        let output = with_output.then(|| {
            let (speakers, _) = counter();
            let (hdmi, _) = counter();
            Arc::new(
                ToggleEntry::new("Output")
                    .with_state("USB DAC", speakers)
                    .with_state("Living room (HDMI)", hdmi),
            )
        });

        PlayerToggles {
            playback: playback_entry(&cmds),
            random: random_entry(&cmds),
            output,
        }
    }

    #[test]
    fn status_while_playing() {
        assert_eq!(
            parse_status(PLAYING_STATUS),
            Some(Status {
                state: PlaybackState::Playing,
                random: true,
            })
        );
    }

    #[test]
    fn status_while_stopped() {
        assert_eq!(
            parse_status(STOPPED_STATUS),
            Some(Status {
                state: PlaybackState::Stopped,
                random: false,
            })
        );
        assert_eq!(
            parse_status("x\n[paused] #1/1 0:01/3:00 (0%)\nrandom: off\n").map(|s| s.state),
            Some(PlaybackState::Paused)
        );
    }

    #[test]
    fn status_without_options_is_unknown() {
        assert_eq!(parse_status(""), None);
        assert_eq!(parse_status("random: maybe"), None);
    }

    #[test]
    fn outputs_with_parenthesised_names() {
        assert_eq!(
            parse_outputs(OUTPUTS),
            vec![
                Output {
                    id: 1,
                    name: "USB DAC".to_string(),
                    enabled: true,
                },
                Output {
                    id: 2,
                    name: "Living room (HDMI)".to_string(),
                    enabled: false,
                },
            ]
        );
        assert!(parse_outputs("error: Connection refused").is_empty());
    }

    #[test]
    fn playlists_skip_blank_lines() {
        assert_eq!(
            parse_playlists("Road trip\n\n  Sunday morning \n"),
            vec!["Road trip", "Sunday morning"]
        );
    }

    #[test]
    fn status_updates_toggles_once() {
        let toggles = toggles(false);

        assert!(toggles.apply_status(parse_status(PLAYING_STATUS)));
        assert_eq!(toggles.playback.state().as_deref(), Some(PLAYING));
        assert_eq!(toggles.random.state().as_deref(), Some(ENABLED));

        assert!(!toggles.apply_status(parse_status(PLAYING_STATUS)));

        assert!(toggles.apply_status(None));
        assert_eq!(toggles.playback.state(), None);
        assert_eq!(toggles.random.state(), None);
    }

    #[test]
    fn outputs_select_enabled_entry() {
        let toggles = toggles(true);
        let output = toggles.output.clone().unwrap();

        assert!(toggles.apply_outputs(&parse_outputs(OUTPUTS)));
        assert_eq!(output.state().as_deref(), Some("USB DAC"));
        assert!(!toggles.apply_outputs(&parse_outputs(OUTPUTS)));

        let unknown = [Output {
            id: 9,
            name: "Bluetooth".to_string(),
            enabled: true,
        }];
        assert!(toggles.apply_outputs(&unknown));
        assert_eq!(output.state(), None);

        assert!(!self::toggles(false).apply_outputs(&unknown));
    }
}
