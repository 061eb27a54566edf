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

//! In-process encoder source.
//!
//! The [`ChannelEncoder`] owns the receiving ends of the three streams, the
//! cloneable [`EncoderHandle`] injects events into them. The other encoder
//! sources are built on top of this pair.

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        mpsc::{self, Sender},
    },
    time::Duration,
};

use crate::encoder::{EncoderError, EncoderEvent, EncoderSource, EncoderStreams};

struct Senders {
    button: Sender<bool>,
    pressed: Sender<Duration>,
    value: Sender<i32>,
}

pub struct ChannelEncoder {
    senders: Arc<Mutex<Option<Senders>>>,
    streams: Option<EncoderStreams>,
}

/// Injects events into a [`ChannelEncoder`].
#[derive(Clone)]
pub struct EncoderHandle {
    senders: Arc<Mutex<Option<Senders>>>,
}

impl ChannelEncoder {
    pub fn new() -> (Self, EncoderHandle) {
        let (button_tx, button_rx) = mpsc::channel();
        let (pressed_tx, pressed_rx) = mpsc::channel();
        let (value_tx, value_rx) = mpsc::channel();

        let senders = Arc::new(Mutex::new(Some(Senders {
            button: button_tx,
            pressed: pressed_tx,
            value: value_tx,
        })));

        let encoder = Self {
            senders: Arc::clone(&senders),
            streams: Some(EncoderStreams {
                button: button_rx,
                pressed: pressed_rx,
                value: value_rx,
            }),
        };

        (encoder, EncoderHandle { senders })
    }
}

impl EncoderSource for ChannelEncoder {
    fn streams(&mut self) -> Result<EncoderStreams, EncoderError> {
        self.streams.take().ok_or(EncoderError::StreamsTaken)
    }

    fn close(&mut self) -> Result<(), EncoderError> {
        // Dropping the senders disconnects every stream
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        Ok(())
    }
}

impl EncoderHandle {
    pub fn dispatch(&self, event: EncoderEvent) -> Result<(), EncoderError> {
        let senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        let senders = senders.as_ref().ok_or(EncoderError::Closed)?;

        let sent = match event {
            EncoderEvent::Button(state) => senders.button.send(state).is_ok(),
            EncoderEvent::Pressed(duration) => senders.pressed.send(duration).is_ok(),
            EncoderEvent::Value(value) => senders.value.send(value).is_ok(),
        };

        if sent { Ok(()) } else { Err(EncoderError::Closed) }
    }

    pub fn press(&self) -> Result<(), EncoderError> {
        self.dispatch(EncoderEvent::Button(true))
    }

    pub fn release(&self) -> Result<(), EncoderError> {
        self.dispatch(EncoderEvent::Button(false))
    }

    pub fn hold(&self, duration: Duration) -> Result<(), EncoderError> {
        self.dispatch(EncoderEvent::Pressed(duration))
    }

    pub fn rotate(&self, value: i32) -> Result<(), EncoderError> {
        self.dispatch(EncoderEvent::Value(value))
    }

    /// A short press and release.
    pub fn click(&self) -> Result<(), EncoderError> {
        self.long_press(Duration::ZERO)
    }

    /// A press held for `duration`. Like the hardware, the hold duration is
    /// delivered ahead of the release edge.
    pub fn long_press(&self, duration: Duration) -> Result<(), EncoderError> {
        self.press()?;
        self.hold(duration)?;
        self.release()
    }

    pub fn is_closed(&self) -> bool {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
