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

//! Application configuration.
//!
//! This module manages the application configuration file. Every section
//! falls back to its defaults, so a partial file only needs to name the
//! settings that differ.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const CONFIG_NAME: &str = "jukeui";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub version: u32,
    /// Display width in characters.
    pub width: usize,
    /// Write logs here instead of standard error.
    pub log_file: Option<String>,
    /// How often the player status is polled, in milliseconds.
    pub status_poll_ms: u64,
    pub display: DisplayConfig,
    pub encoder: EncoderConfig,
    pub holds: HoldConfig,
    pub commands: CommandConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            width: 20,
            log_file: None,
            status_poll_ms: 2000,
            display: DisplayConfig::default(),
            encoder: EncoderConfig::default(),
            holds: HoldConfig::default(),
            commands: CommandConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn status_poll(&self) -> Duration {
        Duration::from_millis(self.status_poll_ms)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 7778,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    /// Events are read from a helper program.
    Process,
    /// The terminal keyboard stands in for the encoder.
    Keyboard,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct EncoderConfig {
    pub kind: EncoderKind,
    /// Helper program and arguments, used by [`EncoderKind::Process`].
    pub command: Vec<String>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            kind: EncoderKind::Process,
            command: vec!["jukeui-rotary".to_string()],
        }
    }
}

/// Long-press thresholds, in milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct HoldConfig {
    pub menu_ms: u64,
    pub power_ms: u64,
    pub hoot_ms: u64,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            menu_ms: 600,
            power_ms: 3000,
            hoot_ms: 8000,
        }
    }
}

impl HoldConfig {
    pub fn menu(&self) -> Duration {
        Duration::from_millis(self.menu_ms)
    }

    pub fn power(&self) -> Duration {
        Duration::from_millis(self.power_ms)
    }

    pub fn hoot(&self) -> Duration {
        Duration::from_millis(self.hoot_ms)
    }
}

/// External commands bound to menu entries and gestures.
///
/// Each command is a whitespace separated program and argument list. The
/// `enable_output` and `load_playlist` commands get the output id or the
/// playlist name appended as a final argument.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CommandConfig {
    pub toggle_playback: String,
    pub play: String,
    pub pause: String,
    pub stop: String,
    pub next: String,
    pub previous: String,
    pub random_on: String,
    pub random_off: String,
    pub poweroff: String,
    pub reboot: String,
    pub hoot: String,
    pub status: String,
    pub outputs: String,
    pub enable_output: String,
    pub playlists: String,
    pub clear_queue: String,
    pub load_playlist: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            toggle_playback: "mpc -q toggle".to_string(),
            play: "mpc -q play".to_string(),
            pause: "mpc -q pause".to_string(),
            stop: "mpc -q stop".to_string(),
            next: "mpc -q next".to_string(),
            previous: "mpc -q prev".to_string(),
            random_on: "mpc -q random on".to_string(),
            random_off: "mpc -q random off".to_string(),
            poweroff: "systemctl poweroff".to_string(),
            reboot: "systemctl reboot".to_string(),
            hoot: "aplay -q /usr/share/jukeui/hoot.wav".to_string(),
            status: "mpc status".to_string(),
            outputs: "mpc outputs".to_string(),
            enable_output: "mpc -q enable only".to_string(),
            playlists: "mpc lsplaylists".to_string(),
            clear_queue: "mpc -q clear".to_string(),
            load_playlist: "mpc -q load".to_string(),
        }
    }
}

pub fn load_config() -> AppConfig {
    confy::load(CONFIG_NAME, None).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_holds_are_ordered() {
        let holds = HoldConfig::default();
        assert!(holds.menu() < holds.power());
        assert!(holds.power() < holds.hoot());
        assert_eq!(holds.menu(), Duration::from_millis(600));
    }

    #[test]
    fn defaults_fit_a_character_display() {
        let config = AppConfig::default();
        assert_eq!(config.width, 20);
        assert_eq!(config.display.port, 7778);
        assert_eq!(config.encoder.kind, EncoderKind::Process);
        assert!(!config.encoder.command.is_empty());
    }
}
