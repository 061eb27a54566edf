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

//! Rotary encoder input.
//!
//! A rotary encoder with an integrated push button produces three independent
//! notification streams:
//!
//! * **Button** edges, `true` when pressed and `false` when released.
//! * **Pressed** durations, delivered once per physical release and ahead of
//!   the release edge, even for short clicks.
//! * **Value** readings from the rotation.
//!
//! The streams are unordered relative to one another. Consumers receive them
//! as plain [`std::sync::mpsc`] receivers from an [`EncoderSource`].
//!
//! # Sources
//!
//! * [`ChannelEncoder`]: in-process source driven through an [`EncoderHandle`].
//! * [`ProcessEncoder`]: reads events printed by a hardware helper program.
//! * [`KeyboardEncoder`]: simulates the encoder with the terminal keyboard.

mod channel;
mod keyboard;
mod process;

pub use channel::{ChannelEncoder, EncoderHandle};
pub use keyboard::KeyboardEncoder;
pub use process::{ProcessEncoder, parse_event};

use std::{io, sync::mpsc::Receiver, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("encoder streams have already been taken")]
    StreamsTaken,

    #[error("encoder has been closed")]
    Closed,

    #[error("invalid encoder event `{0}`")]
    Parse(String),

    #[error("failed to start encoder helper `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A single notification from the encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncoderEvent {
    Button(bool),
    Pressed(Duration),
    Value(i32),
}

/// The three notification streams of an encoder.
pub struct EncoderStreams {
    pub button: Receiver<bool>,
    pub pressed: Receiver<Duration>,
    pub value: Receiver<i32>,
}

/// Hardware abstraction for a push-button rotary encoder.
pub trait EncoderSource: Send {
    /// Hands out the notification streams. May only be called once.
    fn streams(&mut self) -> Result<EncoderStreams, EncoderError>;

    /// Releases the device. Streams disconnect once this returns.
    fn close(&mut self) -> Result<(), EncoderError>;
}
