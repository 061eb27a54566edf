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

//! Non-menu display surfaces.
//!
//! Besides menus the display shows a few plain screens: static ones drawn
//! once at startup, and the clock and system information screens which are
//! refreshed by background threads until shutdown is requested.

use std::{
    fs,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::display::{DisplayError, DisplaySurface};

pub const STARTUP: &str = "startup";
pub const SHUTDOWN: &str = "shutdown";
pub const ABOUT: &str = "about";
pub const CLOCK: &str = "clock";
pub const SYSINFO: &str = "sysinfo";

const CLOCK_INTERVAL: Duration = Duration::from_secs(1);
const SYSINFO_INTERVAL: Duration = Duration::from_secs(5);
const STOP_POLL: Duration = Duration::from_millis(100);

/// Truncates or pads `text` to exactly `width` characters.
pub fn fit(text: &str, width: usize) -> String {
    let mut line: String = text.chars().take(width).collect();
    let len = line.chars().count();
    line.extend(std::iter::repeat_n(' ', width - len));
    line
}

/// Centres `text` within `width` characters.
pub fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let indent = width.saturating_sub(len) / 2;
    fit(&format!("{}{}", " ".repeat(indent), text), width)
}

fn draw(
    surface: &dyn DisplaySurface,
    name: &str,
    lines: &[String],
    width: usize,
) -> Result<(), DisplayError> {
    for (row, line) in lines.iter().enumerate() {
        surface.line(name, row, &fit(line, width))?;
    }

    Ok(())
}

/// Draws the screens that never change.
pub fn draw_static_screens(surface: &dyn DisplaySurface, width: usize) -> Result<(), DisplayError> {
    let startup = [
        String::new(),
        center("jukeui", width),
        center("starting up", width),
    ];
    draw(surface, STARTUP, &startup, width)?;

    let shutdown = [
        String::new(),
        center("shutting down", width),
        center("bye!", width),
    ];
    draw(surface, SHUTDOWN, &shutdown, width)?;

    let about = [
        center("jukeui", width),
        center(concat!("v", env!("CARGO_PKG_VERSION")), width),
        center("rotary jukebox", width),
        center(env!("CARGO_PKG_LICENSE"), width),
    ];
    draw(surface, ABOUT, &about, width)
}

/// Shows the shutdown screen, ignoring failures since we are going down.
pub fn show_shutdown(surface: &dyn DisplaySurface) {
    if let Err(e) = surface.switch(SHUTDOWN) {
        warn!("failed to show shutdown screen: {:#}", anyhow::Error::from(e));
    }
}

fn clock_lines(now: DateTime<Local>, width: usize) -> Vec<String> {
    vec![
        String::new(),
        center(&now.format("%H:%M:%S").to_string(), width),
        center(&now.format("%a %d.%m.%Y").to_string(), width),
    ]
}

/// Keeps the clock screen up to date until `stop` is raised.
pub fn spawn_clock(
    surface: Arc<dyn DisplaySurface>,
    width: usize,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    spawn_screen(CLOCK, CLOCK_INTERVAL, surface, width, stop, move || {
        clock_lines(Local::now(), width)
    })
}

/// Keeps the system information screen up to date until `stop` is raised.
pub fn spawn_sysinfo(
    surface: Arc<dyn DisplaySurface>,
    width: usize,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    spawn_screen(SYSINFO, SYSINFO_INTERVAL, surface, width, stop, || {
        SysInfo::read().lines()
    })
}

fn spawn_screen<F>(
    name: &'static str,
    interval: Duration,
    surface: Arc<dyn DisplaySurface>,
    width: usize,
    stop: Arc<AtomicBool>,
    render: F,
) -> JoinHandle<()>
where
    F: Fn() -> Vec<String> + Send + 'static,
{
    thread::spawn(move || {
        loop {
            if let Err(e) = draw(&*surface, name, &render(), width) {
                warn!(screen = name, "failed to draw screen: {:#}", anyhow::Error::from(e));
            }

            if !sleep_unless_stopped(&stop, interval) {
                break;
            }
        }

        debug!(screen = name, "screen renderer stopped");
    })
}

/// Sleeps for `duration`, returning `false` early once `stop` is raised.
pub(crate) fn sleep_unless_stopped(stop: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;

    loop {
        if stop.load(Ordering::SeqCst) {
            return false;
        }

        let now = Instant::now();
        if now >= deadline {
            return true;
        }

        thread::sleep(STOP_POLL.min(deadline - now));
    }
}

/// A snapshot of host statistics read from `/proc`.
#[derive(Debug, Default, PartialEq)]
struct SysInfo {
    hostname: Option<String>,
    uptime: Option<Duration>,
    load: Option<String>,
    memory_used: Option<u64>,
}

impl SysInfo {
    fn read() -> Self {
        let read = |path: &str| fs::read_to_string(path).ok();

        Self {
            hostname: read("/proc/sys/kernel/hostname").map(|s| s.trim().to_string()),
            uptime: read("/proc/uptime").as_deref().and_then(parse_uptime),
            load: read("/proc/loadavg").as_deref().and_then(parse_loadavg),
            memory_used: read("/proc/meminfo").as_deref().and_then(parse_meminfo),
        }
    }

    fn lines(&self) -> Vec<String> {
        let unknown = || "?".to_string();

        vec![
            format!("Host {}", self.hostname.clone().unwrap_or_else(unknown)),
            format!("Up   {}", self.uptime.map(format_uptime).unwrap_or_else(unknown)),
            format!("Load {}", self.load.clone().unwrap_or_else(unknown)),
            format!(
                "Mem  {}",
                self.memory_used.map(|pct| format!("{}%", pct)).unwrap_or_else(unknown)
            ),
        ]
    }
}

fn parse_uptime(contents: &str) -> Option<Duration> {
    let seconds: f64 = contents.split_whitespace().next()?.parse().ok()?;
    (seconds >= 0.0).then(|| Duration::from_secs(seconds as u64))
}

fn parse_loadavg(contents: &str) -> Option<String> {
    let loads: Vec<&str> = contents.split_whitespace().take(3).collect();
    (loads.len() == 3).then(|| loads.join(" "))
}

/// Percentage of memory in use, from `MemTotal` and `MemAvailable`.
fn parse_meminfo(contents: &str) -> Option<u64> {
    let field = |name: &str| {
        contents
            .lines()
            .find_map(|line| line.strip_prefix(name))
            .and_then(|rest| rest.trim_start_matches(':').split_whitespace().next())
            .and_then(|kb| kb.parse::<u64>().ok())
    };

    let total = field("MemTotal")?;
    let available = field("MemAvailable")?;
    if total == 0 {
        return None;
    }

    Some(total.saturating_sub(available) * 100 / total)
}

fn format_uptime(uptime: Duration) -> String {
    let minutes = uptime.as_secs() / 60;
    let (days, hours, minutes) = (minutes / 1440, minutes / 60 % 24, minutes % 60);

    if days > 0 {
        format!("{}d {:02}:{:02}", days, hours, minutes)
    } else {
        format!("{:02}:{:02}", hours, minutes)
    }
}
