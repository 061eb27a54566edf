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

//! Tracing subscriber initialization.
//!
//! Log directives are taken from, in order of priority:
//!
//! 1. The `JUKEUI_LOG` environment variable.
//! 2. The `RUST_LOG` environment variable.
//! 3. The default level, `info`.
//!
//! Output goes to standard error unless a log file is configured. A file is
//! required whenever the keyboard encoder owns the terminal.

use std::{fs::OpenOptions, sync::Mutex};

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_ENV: &str = "JUKEUI_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Installs the global subscriber. Must be called once, before anything logs.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed.
pub fn init(log_file: Option<&str>) -> Result<()> {
    let filter = build_env_filter();

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .try_init()
                .context("Failed to install log subscriber")?;
        }
        None => {
            let use_ansi = std::io::IsTerminal::is_terminal(&std::io::stderr());

            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(use_ansi)
                        .with_target(false),
                )
                .try_init()
                .context("Failed to install log subscriber")?;
        }
    }

    Ok(())
}

fn build_env_filter() -> EnvFilter {
    // An unparseable project variable falls through to RUST_LOG
    if let Ok(directives) = std::env::var(LOG_ENV)
        && let Ok(filter) = EnvFilter::try_new(&directives)
    {
        return filter;
    }

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    EnvFilter::new(DEFAULT_DIRECTIVE)
}
