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

//! Menu entries.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use crate::menu::{self, Action, MenuError};

const NO_STATE: &str = "?";

/// A single row of a [`Menu`](crate::menu::Menu).
#[derive(Clone)]
pub enum Entry {
    /// A heading, activating it does nothing.
    Separator(String),

    /// A label with one bound action.
    Click { text: String, action: Option<Action> },

    /// A label cycling through a fixed set of states.
    Toggle(Arc<ToggleEntry>),
}

impl Entry {
    pub fn separator(text: impl Into<String>) -> Self {
        Entry::Separator(text.into())
    }

    pub fn click(text: impl Into<String>, action: Action) -> Self {
        Entry::Click {
            text: text.into(),
            action: Some(action),
        }
    }

    pub fn toggle(toggle: &Arc<ToggleEntry>) -> Self {
        Entry::Toggle(Arc::clone(toggle))
    }

    /// The label as shown on the display, without the cursor marker.
    pub fn render(&self) -> String {
        match self {
            Entry::Separator(text) | Entry::Click { text, .. } => text.clone(),
            Entry::Toggle(toggle) => toggle.render(),
        }
    }

    /// The plain label, used to identify the entry in logs.
    pub fn text(&self) -> &str {
        match self {
            Entry::Separator(text) | Entry::Click { text, .. } => text,
            Entry::Toggle(toggle) => &toggle.text,
        }
    }

    /// Resolves what activating this entry would run, if anything.
    pub fn action(&self) -> Option<Action> {
        match self {
            Entry::Separator(_) => None,
            Entry::Click { action, .. } => action.clone(),
            Entry::Toggle(toggle) => toggle.next_action(),
        }
    }
}

/// An entry cycling through an ordered set of state labels, each bound to
/// its own action.
///
/// The current state is shared: watchers on other threads update it through
/// [`ToggleEntry::set_state`] and ask the menu manager to render again.
pub struct ToggleEntry {
    text: String,
    order: Vec<String>,
    actions: HashMap<String, Action>,
    state: Mutex<Option<String>>,
}

impl ToggleEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            order: Vec::new(),
            actions: HashMap::new(),
            state: Mutex::new(None),
        }
    }

    /// Appends a state label and the action switching to it.
    pub fn with_state(mut self, label: impl Into<String>, action: Action) -> Self {
        let label = label.into();
        if !self.order.contains(&label) {
            self.order.push(label.clone());
        }
        self.actions.insert(label, action);
        self
    }

    /// Appends a state label without an action.
    pub fn with_inert_state(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if !self.order.contains(&label) {
            self.order.push(label);
        }
        self
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn state(&self) -> Option<String> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Sets the current state, which must be one of the known labels.
    pub fn set_state(&self, label: &str) -> Result<(), MenuError> {
        if !self.order.iter().any(|known| known == label) {
            return Err(MenuError::UnknownState {
                entry: self.text.clone(),
                state: label.to_string(),
            });
        }

        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(label.to_string());

        Ok(())
    }

    pub fn clear_state(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn render(&self) -> String {
        let state = self.state();
        format!("{}: {}", self.text, state.as_deref().unwrap_or(NO_STATE))
    }

    /// The label following the current state, wrapping around.
    fn next_state(&self) -> Option<&String> {
        let current = self.state();
        let next = current
            .and_then(|state| self.order.iter().position(|label| *label == state))
            .map_or(0, |pos| (pos + 1) % self.order.len());

        self.order.get(next)
    }

    /// Runs the action of the next state and, on success, moves to it.
    fn next_action(self: &Arc<Self>) -> Option<Action> {
        let next = self.next_state()?.clone();
        let action = Arc::clone(self.actions.get(&next)?);
        let toggle = Arc::clone(self);

        Some(menu::action(move || {
            action()?;
            toggle.set_state(&next)?;
            Ok(())
        }))
    }
}
