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

//! External commands as menu actions.
//!
//! Playback control and power management are delegated to ordinary programs
//! (`mpc`, `systemctl`) configured as whitespace separated command lines.

use std::{
    process::{Command, Stdio},
    thread,
};

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use crate::menu::{Action, action};

/// Runs `cmdline` to completion, failing on a non-zero exit status.
pub fn run(cmdline: &str) -> Result<()> {
    run_with(cmdline, &[])
}

/// Runs `cmdline` with `extra` appended verbatim, so that arguments may
/// contain whitespace.
pub fn run_with(cmdline: &str, extra: &[&str]) -> Result<()> {
    debug!(%cmdline, ?extra, "running command");

    let status = command(cmdline, extra)?
        .stdin(Stdio::null())
        .status()
        .with_context(|| format!("Failed to run `{}`", cmdline))?;

    if !status.success() {
        bail!("`{}` exited with {}", cmdline, status);
    }

    Ok(())
}

/// Runs `cmdline` and returns what it printed on standard output.
pub fn output(cmdline: &str) -> Result<String> {
    let output = command(cmdline, &[])?
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .with_context(|| format!("Failed to run `{}`", cmdline))?;

    if !output.status.success() {
        bail!("`{}` exited with {}", cmdline, output.status);
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn command(cmdline: &str, extra: &[&str]) -> Result<Command> {
    let parts: Vec<&str> = cmdline.split_whitespace().collect();

    let [program, args @ ..] = parts.as_slice() else {
        bail!("Empty command");
    };

    let mut command = Command::new(program);
    command.args(args).args(extra);

    Ok(command)
}

/// An action running `cmdline` and waiting for it.
pub fn command_action(cmdline: &str) -> Action {
    let cmdline = cmdline.to_string();
    action(move || run(&cmdline))
}

/// An action starting `cmdline` in the background without waiting for it.
pub fn detached_command_action(cmdline: &str) -> Action {
    let cmdline = cmdline.to_string();
    action(move || {
        let cmdline = cmdline.clone();
        thread::spawn(move || {
            if let Err(e) = run(&cmdline) {
                warn!("background command failed: {:#}", e);
            }
        });

        Ok(())
    })
}
