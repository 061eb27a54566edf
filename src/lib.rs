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
//! On-device control logic for a jukebox-style player: a push-button rotary
//! encoder drives a hierarchy of menus rendered on a remote character
//! display.
//!
//! ## Architecture
//!
//! * [`encoder`] produces three independent event streams: button edges,
//!   hold durations and rotation readings.
//! * [`menu`] holds the menus and the [`menu::MenuManager`], which consumes
//!   each stream on its own worker thread and serializes every state change
//!   behind a single lock.
//! * [`display`] carries render and navigation commands to the display
//!   daemon.
//! * [`screens`] draws the surfaces that are not menus (clock, system
//!   information, static screens).
//! * [`player`] mirrors the music player's state into the menus.
//!
//! Everything the menus actually do is supplied from outside as
//! [`menu::Action`]s; [`commands`] builds them from external programs.

pub mod commands;
pub mod config;
pub mod display;
pub mod encoder;
pub mod logging;
pub mod menu;
pub mod player;
pub mod screens;
