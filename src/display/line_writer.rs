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

//! TCP client for the display daemon.
//!
//! Commands are written one per line. A failed write drops the connection so
//! that the next command transparently reconnects; in-memory state on the
//! caller's side stays authoritative and is simply rendered again.

use std::{
    io::{BufWriter, Write},
    net::TcpStream,
    sync::{Mutex, PoisonError},
};

use tracing::{debug, info};

use crate::display::{DisplayCommand, DisplayError, DisplaySurface};

pub struct LineWriter {
    addr: String,
    conn: Mutex<Option<BufWriter<TcpStream>>>,
}

impl LineWriter {
    /// Connects to the display daemon at `host:port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial connection cannot be established.
    pub fn connect(host: &str, port: u16) -> Result<Self, DisplayError> {
        let addr = format!("{}:{}", host, port);
        let stream = Self::open(&addr)?;

        info!(%addr, "connected to display");

        Ok(Self {
            addr,
            conn: Mutex::new(Some(stream)),
        })
    }

    fn open(addr: &str) -> Result<BufWriter<TcpStream>, DisplayError> {
        let stream = TcpStream::connect(addr).map_err(|source| DisplayError::Connect {
            addr: addr.to_string(),
            source,
        })?;
        stream.set_nodelay(true).ok();

        Ok(BufWriter::new(stream))
    }
}

impl DisplaySurface for LineWriter {
    fn send(&self, command: &DisplayCommand) -> Result<(), DisplayError> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);

        if conn.is_none() {
            debug!(addr = %self.addr, "reconnecting to display");
            *conn = Some(Self::open(&self.addr)?);
        }

        let result = match conn.as_mut() {
            Some(writer) => writeln!(writer, "{}", command).and_then(|_| writer.flush()),
            None => return Ok(()),
        };

        if let Err(e) = result {
            *conn = None;
            return Err(DisplayError::Io(e));
        }

        Ok(())
    }
}
