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

//! Encoder events from a hardware helper program.
//!
//! GPIO access lives in a small helper program which prints one event per
//! line on its standard output:
//!
//! ```text
//! b 1      button pressed
//! b 0      button released
//! p 1250   button was held for 1250ms
//! v -1     rotation reading
//! ```
//!
//! The helper prints a `p` line for every release, short clicks included,
//! before the matching `b 0`.
//!
//! Blank lines and lines starting with `#` are ignored. Malformed lines are
//! logged and skipped; they never stop the reader.

use std::{
    io::{BufRead, BufReader},
    process::{Child, Command, Stdio},
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::encoder::{
    ChannelEncoder, EncoderError, EncoderEvent, EncoderHandle, EncoderSource, EncoderStreams,
};

pub struct ProcessEncoder {
    program: String,
    child: Child,
    channel: ChannelEncoder,
    reader: Option<JoinHandle<()>>,
}

impl ProcessEncoder {
    /// Starts the helper program described by `argv`.
    ///
    /// # Errors
    ///
    /// Returns an error if `argv` is empty or the program cannot be started.
    pub fn spawn(argv: &[String]) -> Result<Self, EncoderError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| EncoderError::Parse("empty encoder command".to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| EncoderError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| EncoderError::Spawn {
            program: program.clone(),
            source: std::io::Error::other("helper has no stdout"),
        })?;

        let (channel, handle) = ChannelEncoder::new();
        let reader = thread::spawn(move || read_events(BufReader::new(stdout), &handle));

        info!(%program, pid = child.id(), "started encoder helper");

        Ok(Self {
            program: program.clone(),
            child,
            channel,
            reader: Some(reader),
        })
    }
}

impl EncoderSource for ProcessEncoder {
    fn streams(&mut self) -> Result<EncoderStreams, EncoderError> {
        self.channel.streams()
    }

    fn close(&mut self) -> Result<(), EncoderError> {
        // The helper may already have exited on its own
        if let Err(e) = self.child.kill() {
            debug!(program = %self.program, "failed to kill encoder helper: {}", e);
        }

        // Streams disconnect even if the helper cannot be reaped
        self.channel.close()?;
        let reaped = self.child.wait();

        if let Some(reader) = self.reader.take() {
            reader.join().ok();
        }

        info!(program = %self.program, "encoder helper stopped");

        reaped.map(|_| ()).map_err(EncoderError::from)
    }
}

/// Forwards every event read from `input` until it ends or the encoder closes.
fn read_events<R: BufRead>(input: R, handle: &EncoderHandle) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("failed to read encoder helper output: {}", e);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_event(line) {
            Ok(event) => {
                if handle.dispatch(event).is_err() {
                    break;
                }
            }
            Err(e) => warn!("skipping encoder event: {}", e),
        }
    }
}

/// Parses one line of helper output.
pub fn parse_event(line: &str) -> Result<EncoderEvent, EncoderError> {
    let invalid = || EncoderError::Parse(line.to_string());

    let mut parts = line.split_whitespace();
    let (Some(kind), Some(arg), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };

    match kind {
        "b" => match arg {
            "1" => Ok(EncoderEvent::Button(true)),
            "0" => Ok(EncoderEvent::Button(false)),
            _ => Err(invalid()),
        },
        "p" => arg
            .parse::<u64>()
            .map(|millis| EncoderEvent::Pressed(Duration::from_millis(millis)))
            .map_err(|_| invalid()),
        "v" => arg
            .parse::<i32>()
            .map(EncoderEvent::Value)
            .map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_event_kinds() {
        assert_eq!(parse_event("b 1").unwrap(), EncoderEvent::Button(true));
        assert_eq!(parse_event("b 0").unwrap(), EncoderEvent::Button(false));
        assert_eq!(
            parse_event("p 1250").unwrap(),
            EncoderEvent::Pressed(Duration::from_millis(1250))
        );
        assert_eq!(parse_event("v -3").unwrap(), EncoderEvent::Value(-3));
        assert_eq!(parse_event("  v   7 ").unwrap(), EncoderEvent::Value(7));
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in ["", "b", "b 2", "p -5", "p soon", "v", "v 1 2", "x 1"] {
            assert!(
                matches!(parse_event(line), Err(EncoderError::Parse(_))),
                "accepted {line:?}"
            );
        }
    }

    #[test]
    fn close_stops_helper_and_disconnects_streams() {
        let argv: Vec<String> = ["sh", "-c", "echo 'v 3'; exec sleep 30"]
            .iter()
            .map(|arg| arg.to_string())
            .collect();

        let mut encoder = ProcessEncoder::spawn(&argv).unwrap();
        let streams = encoder.streams().unwrap();
        assert_eq!(streams.value.recv().unwrap(), 3);

        encoder.close().unwrap();

        assert!(streams.value.recv().is_err());
        assert!(streams.button.recv().is_err());
        assert!(streams.pressed.recv().is_err());
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(ProcessEncoder::spawn(&[]), Err(EncoderError::Parse(_))));
    }

    #[test]
    fn reader_skips_noise_and_forwards_events() {
        let (mut encoder, handle) = ChannelEncoder::new();
        let streams = encoder.streams().unwrap();

        let input = "# helper v1\n\nb 1\nbogus\np 40\nb 0\nv 2\n";
        read_events(input.as_bytes(), &handle);

        assert!(streams.button.recv().unwrap());
        assert!(!streams.button.recv().unwrap());
        assert_eq!(streams.pressed.recv().unwrap(), Duration::from_millis(40));
        assert_eq!(streams.value.recv().unwrap(), 2);
        assert!(streams.button.try_recv().is_err());
    }
}
