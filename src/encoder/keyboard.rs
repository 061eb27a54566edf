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

//! Keyboard stand-in for the rotary encoder.
//!
//! Useful when running on a development machine without the hardware. The
//! terminal is put into raw mode for the lifetime of the encoder, so log
//! output should go to a file.
//!
//! | Key            | Encoder event                          |
//! |----------------|----------------------------------------|
//! | Left / Up      | rotate by -1                           |
//! | Right / Down   | rotate by +1                           |
//! | Enter / Space  | click                                  |
//! | `1`..`9`       | hold the button for that many seconds  |
//! | `q` / Ctrl-C   | request shutdown                       |

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tracing::{debug, warn};

use crate::encoder::{
    ChannelEncoder, EncoderError, EncoderEvent, EncoderHandle, EncoderSource, EncoderStreams,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct KeyboardEncoder {
    channel: ChannelEncoder,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl KeyboardEncoder {
    /// Starts reading the keyboard.
    ///
    /// `shutdown` is raised when the user asks to quit, since raw mode keeps
    /// Ctrl-C from reaching the process as a signal.
    pub fn new(shutdown: Arc<AtomicBool>) -> Result<Self, EncoderError> {
        enable_raw_mode()?;

        let (channel, handle) = ChannelEncoder::new();
        let stop = Arc::new(AtomicBool::new(false));

        let reader_stop = Arc::clone(&stop);
        let reader = thread::spawn(move || read_keys(&handle, &reader_stop, &shutdown));

        Ok(Self {
            channel,
            stop,
            reader: Some(reader),
        })
    }
}

impl EncoderSource for KeyboardEncoder {
    fn streams(&mut self) -> Result<EncoderStreams, EncoderError> {
        self.channel.streams()
    }

    fn close(&mut self) -> Result<(), EncoderError> {
        self.stop.store(true, Ordering::SeqCst);

        if let Some(reader) = self.reader.take() {
            reader.join().ok();
        }

        self.channel.close()?;
        disable_raw_mode()?;

        Ok(())
    }
}

fn read_keys(handle: &EncoderHandle, stop: &AtomicBool, shutdown: &AtomicBool) {
    while !stop.load(Ordering::SeqCst) {
        match event::poll(POLL_INTERVAL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!("failed to poll keyboard: {}", e);
                break;
            }
        }

        let key = match event::read() {
            Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => key,
            Ok(_) => continue,
            Err(e) => {
                warn!("failed to read keyboard: {}", e);
                break;
            }
        };

        if is_quit(&key) {
            debug!("quit requested from keyboard");
            shutdown.store(true, Ordering::SeqCst);
            continue;
        }

        for event in key_events(&key) {
            if handle.dispatch(event).is_err() {
                return;
            }
        }
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Translates a key into the encoder events it simulates.
fn key_events(key: &KeyEvent) -> Vec<EncoderEvent> {
    match key.code {
        KeyCode::Left | KeyCode::Up => vec![EncoderEvent::Value(-1)],
        KeyCode::Right | KeyCode::Down => vec![EncoderEvent::Value(1)],
        KeyCode::Enter | KeyCode::Char(' ') => vec![
            EncoderEvent::Button(true),
            EncoderEvent::Pressed(Duration::ZERO),
            EncoderEvent::Button(false),
        ],
        KeyCode::Char(c @ '1'..='9') => {
            let seconds = u64::from(c.to_digit(10).unwrap_or(1));
            vec![
                EncoderEvent::Button(true),
                EncoderEvent::Pressed(Duration::from_secs(seconds)),
                EncoderEvent::Button(false),
            ]
        }
        _ => vec![],
    }
}
