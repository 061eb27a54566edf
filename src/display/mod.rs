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

//! Remote character display.
//!
//! The display daemon hosts a number of named surfaces (menus, the clock, the
//! system information screen and so on) and is driven by a simple line
//! oriented protocol. This module provides the [`DisplaySurface`] abstraction
//! used by the menu coordinator and the background screens, together with the
//! TCP client in [`line_writer`].
//!
//! Every command is a discrete message; nothing is batched or coalesced.

mod line_writer;

pub use line_writer::LineWriter;

use std::{fmt, io};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("failed to connect to display at {addr}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to send display command")]
    Io(#[from] io::Error),
}

/// A single command understood by the display daemon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayCommand {
    /// Render `text` on `row` of the named surface.
    Line {
        surface: String,
        row: usize,
        text: String,
    },

    /// Make the named surface the visible one.
    Switch(String),

    /// Move the viewport of the named surface by `delta` rows.
    Move { surface: String, delta: i32 },
}

impl fmt::Display for DisplayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayCommand::Line { surface, row, text } => {
                // One command is always exactly one line on the wire
                let text = text.replace(['\n', '\r'], " ");
                write!(f, "line {} {} {}", surface, row, text)
            }
            DisplayCommand::Switch(surface) => write!(f, "switch {}", surface),
            DisplayCommand::Move { surface, delta } => write!(f, "move {} {}", surface, delta),
        }
    }
}

/// A sink for display commands.
///
/// Implementations must serialize concurrent senders: the coordinator, the
/// clock and the system information screen all share one surface.
pub trait DisplaySurface: Send + Sync {
    fn send(&self, command: &DisplayCommand) -> Result<(), DisplayError>;

    fn line(&self, surface: &str, row: usize, text: &str) -> Result<(), DisplayError> {
        self.send(&DisplayCommand::Line {
            surface: surface.to_string(),
            row,
            text: text.to_string(),
        })
    }

    fn switch(&self, surface: &str) -> Result<(), DisplayError> {
        self.send(&DisplayCommand::Switch(surface.to_string()))
    }

    fn navigate(&self, surface: &str, delta: i32) -> Result<(), DisplayError> {
        self.send(&DisplayCommand::Move {
            surface: surface.to_string(),
            delta,
        })
    }
}

/// Checks that `name` can be used as a surface name on the wire.
pub fn is_valid_surface_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}
