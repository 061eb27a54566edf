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

//! Rotary encoder driven menus.
//!
//! A [`Menu`] is an ordered list of [`Entry`] values with a cursor, rendered
//! line by line onto a named surface of the remote display. The
//! [`MenuManager`] owns every menu and turns the three encoder streams into
//! cursor movement, entry activation and long-press actions.
//!
//! # Actions
//!
//! An [`Action`] is an opaque, fallible unit of work supplied by the rest of
//! the application (playback control, power commands, surface switches). The
//! menu code never looks inside an action, it only reports failures.

mod entry;
mod handlers;
mod manager;

pub use entry::{Entry, ToggleEntry};
pub use manager::{Direction, MenuManager};

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::display::{DisplayError, DisplaySurface};

/// A zero-argument, fallible operation bound to a menu entry or input gesture.
pub type Action = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Wraps a closure as an [`Action`].
pub fn action<F>(f: F) -> Action
where
    F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("invalid menu name `{0}`")]
    InvalidName(String),

    #[error("`{state}` is not a state of `{entry}`")]
    UnknownState { entry: String, state: String },
}

const CURSOR_MARKER: &str = "> ";
const NO_MARKER: &str = "  ";

pub struct Menu {
    name: String,
    entries: Vec<Entry>,
    cursor: usize,
}

impl Menu {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            cursor: 0,
        }
    }

    pub fn add_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The plain label of the entry under the cursor.
    pub fn active_name(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(Entry::text)
    }

    /// Moves the cursor by `delta`, clamped to the first and last entry.
    pub fn scroll(&mut self, delta: i32) {
        if self.entries.is_empty() {
            return;
        }

        let last = self.entries.len() as i64 - 1;
        let cursor = (self.cursor as i64).saturating_add(i64::from(delta));
        self.cursor = cursor.clamp(0, last) as usize;
    }

    /// Every row as it should appear on the display, cursor marker included.
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .enumerate()
            .map(|(row, entry)| {
                let marker = if row == self.cursor { CURSOR_MARKER } else { NO_MARKER };
                format!("{}{}", marker, entry.render())
            })
            .collect()
    }

    /// Renders every row onto the surface named after this menu.
    ///
    /// Rendering is never diffed, each call sends one command per row.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first failed command.
    pub fn display(&self, surface: &dyn DisplaySurface) -> Result<(), DisplayError> {
        for (row, line) in self.lines().iter().enumerate() {
            surface.line(&self.name, row, line)?;
        }

        Ok(())
    }

    /// Resolves the action bound to the entry under the cursor.
    pub fn selected_action(&self) -> Option<Action> {
        self.entries.get(self.cursor).and_then(Entry::action)
    }

    /// Runs the action of the entry under the cursor.
    ///
    /// Empty menus and entries without an action do nothing.
    pub fn activate(&self) -> anyhow::Result<()> {
        match self.selected_action() {
            Some(action) => action(),
            None => Ok(()),
        }
    }
}

/// Renders `menu`, logging rather than returning a failure.
pub(crate) fn render(menu: &Menu, surface: &dyn DisplaySurface) {
    if let Err(e) = menu.display(surface) {
        warn!(menu = %menu.name(), "failed to render menu: {:#}", anyhow::Error::from(e));
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Test doubles shared by the menu tests.

    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use crate::{
        display::{DisplayCommand, DisplayError, DisplaySurface},
        menu::{Action, action},
    };

    /// Records every command, optionally failing all of them.
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        commands: Mutex<Vec<DisplayCommand>>,
        failing: AtomicBool,
    }

    impl RecordingSurface {
        pub(crate) fn commands(&self) -> Vec<DisplayCommand> {
            self.commands.lock().unwrap().clone()
        }

        pub(crate) fn clear(&self) {
            self.commands.lock().unwrap().clear();
        }

        pub(crate) fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub(crate) fn lines_for(&self, surface: &str) -> Vec<(usize, String)> {
            self.commands()
                .into_iter()
                .filter_map(|cmd| match cmd {
                    DisplayCommand::Line { surface: s, row, text } if s == surface => {
                        Some((row, text))
                    }
                    _ => None,
                })
                .collect()
        }
    }

    impl DisplaySurface for RecordingSurface {
        fn send(&self, command: &DisplayCommand) -> Result<(), DisplayError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(DisplayError::Io(std::io::Error::other("display gone")));
            }

            self.commands.lock().unwrap().push(command.clone());
            Ok(())
        }
    }

    pub(crate) fn counter() -> (Action, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&hits);

        let action = action(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        (action, hits)
    }

    pub(crate) fn failing() -> Action {
        action(|| anyhow::bail!("action failed"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::{
        testing::{RecordingSurface, counter, failing},
        *,
    };

    fn menu_with(entries: Vec<Entry>) -> Menu {
        let mut menu = Menu::new("menu-main");
        for entry in entries {
            menu.add_entry(entry);
        }
        menu
    }

    fn labels(n: usize) -> Vec<Entry> {
        (0..n).map(|i| Entry::separator(format!("row {i}"))).collect()
    }

    #[test]
    fn scroll_clamps_to_entries() {
        let mut menu = menu_with(labels(3));

        menu.scroll(1);
        assert_eq!(menu.cursor(), 1);

        menu.scroll(100);
        assert_eq!(menu.cursor(), 2);

        menu.scroll(-1);
        assert_eq!(menu.cursor(), 1);

        menu.scroll(i32::MIN);
        assert_eq!(menu.cursor(), 0);

        menu.scroll(i32::MAX);
        assert_eq!(menu.cursor(), 2);
    }

    #[test]
    fn scroll_sequences_stay_in_range() {
        let mut menu = menu_with(labels(5));

        for delta in [3, -7, 12, 0, -1, 4, -2, 9, -9, 1] {
            menu.scroll(delta);
            assert!(menu.cursor() < 5, "cursor {} after {}", menu.cursor(), delta);
        }
    }

    #[test]
    fn empty_menu_is_inert() {
        let mut menu = Menu::new("menu-empty");
        let surface = RecordingSurface::default();

        menu.scroll(3);
        assert_eq!(menu.cursor(), 0);
        assert!(menu.active_name().is_none());
        assert!(menu.activate().is_ok());

        menu.display(&surface).unwrap();
        assert!(surface.commands().is_empty());
    }

    #[test]
    fn display_marks_cursor_row() {
        let (action, _) = counter();
        let mut menu = menu_with(vec![
            Entry::separator("MODES"),
            Entry::click("Clock", action),
        ]);
        menu.scroll(1);

        let surface = RecordingSurface::default();
        menu.display(&surface).unwrap();

        assert_eq!(
            surface.lines_for("menu-main"),
            vec![(0, "  MODES".to_string()), (1, "> Clock".to_string())]
        );
    }

    #[test]
    fn display_is_not_diffed() {
        let menu = menu_with(labels(2));
        let surface = RecordingSurface::default();

        menu.display(&surface).unwrap();
        menu.display(&surface).unwrap();

        assert_eq!(surface.commands().len(), 4);
    }

    #[test]
    fn display_reports_failure() {
        let menu = menu_with(labels(2));
        let surface = RecordingSurface::default();
        surface.set_failing(true);

        assert!(menu.display(&surface).is_err());
    }

    #[test]
    fn activate_runs_entry_under_cursor() {
        let (first, first_hits) = counter();
        let (second, second_hits) = counter();
        let mut menu = menu_with(vec![Entry::click("One", first), Entry::click("Two", second)]);

        menu.scroll(1);
        menu.activate().unwrap();

        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
        assert_eq!(menu.active_name(), Some("Two"));
    }

    #[test]
    fn activate_on_separator_does_nothing() {
        let (action, hits) = counter();
        let menu = menu_with(vec![Entry::separator("SYSTEM"), Entry::click("Reboot", action)]);

        assert!(menu.activate().is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn activate_returns_action_error() {
        let menu = menu_with(vec![Entry::click("Poweroff", failing())]);
        assert!(menu.activate().is_err());
    }
}
