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

//! The menu coordinator.
//!
//! [`MenuManager`] is a cheap, cloneable handle to state shared between the
//! encoder stream workers and the rest of the application. All state lives
//! behind a single lock which is only ever held for bookkeeping and
//! rendering, never while an [`Action`] runs. Actions are therefore free to
//! call back into the manager, for example to switch to another menu.
//!
//! The lock is not reentrant. Nothing inside this module calls an action or
//! a public manager method while holding it.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tracing::{debug, info};

use crate::{
    display::{self, DisplayError, DisplaySurface},
    encoder::{EncoderError, EncoderSource},
    menu::{self, Action, Entry, Menu, MenuError, handlers},
};

/// The sign of the most recent rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    None,
    Right,
    Left,
}

impl Direction {
    /// Compares two consecutive rotation readings.
    pub fn between(last: i32, curr: i32) -> Self {
        match curr.cmp(&last) {
            std::cmp::Ordering::Greater => Direction::Right,
            std::cmp::Ordering::Less => Direction::Left,
            std::cmp::Ordering::Equal => Direction::None,
        }
    }
}

pub(super) struct State {
    pub(super) menus: HashMap<String, Menu>,
    pub(super) active: Option<String>,
    /// The surface last switched to, which need not be a menu.
    pub(super) window: Option<String>,
    pub(super) timed_actions: BTreeMap<Duration, Action>,
    pub(super) rotate_actions: Vec<Action>,
    pub(super) release_action: Option<Action>,
    pub(super) last_value: i32,
    pub(super) curr_value: i32,
    pub(super) ignore_release: bool,
    /// Press edges seen so far, one per gesture.
    pub(super) presses: u64,
    /// Hold durations resolved so far, including any timed action they ran.
    pub(super) holds: u64,
}

impl State {
    fn new() -> Self {
        Self {
            menus: HashMap::new(),
            active: None,
            window: None,
            timed_actions: BTreeMap::new(),
            rotate_actions: Vec::new(),
            release_action: None,
            last_value: 0,
            curr_value: 0,
            ignore_release: false,
            presses: 0,
            holds: 0,
        }
    }

    pub(super) fn active_menu(&self) -> Option<&Menu> {
        let name = self.active.as_ref()?;
        self.menus.get(name)
    }

    pub(super) fn active_menu_mut(&mut self) -> Option<&mut Menu> {
        let name = self.active.as_ref()?;
        self.menus.get_mut(name)
    }

    /// The active menu, but only while it is the visible surface.
    pub(super) fn shown_menu(&self) -> Option<&Menu> {
        let menu = self.active_menu()?;
        match &self.window {
            Some(window) if window != menu.name() => None,
            _ => Some(menu),
        }
    }

    /// Whether the most recent press still waits for its hold duration.
    pub(super) fn hold_pending(&self) -> bool {
        self.holds < self.presses
    }

    fn active_window(&self) -> Option<String> {
        self.window.clone().or_else(|| self.active.clone())
    }
}

pub(super) struct Shared {
    state: Mutex<State>,
    /// Signalled whenever a hold duration has been resolved.
    pub(super) hold_resolved: Condvar,
    pub(super) surface: Arc<dyn DisplaySurface>,
    encoder: Mutex<Option<Box<dyn EncoderSource>>>,
    closed: AtomicBool,
}

impl Shared {
    pub(super) fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Coordinates encoder input, menu state and display output.
#[derive(Clone)]
pub struct MenuManager {
    pub(super) shared: Arc<Shared>,
}

impl MenuManager {
    /// Creates a manager and subscribes it to the three streams of `encoder`,
    /// each handled on its own worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder streams cannot be obtained.
    pub fn new(
        surface: Arc<dyn DisplaySurface>,
        mut encoder: Box<dyn EncoderSource>,
    ) -> Result<Self, EncoderError> {
        let streams = encoder.streams()?;

        let mgr = Self::detached(surface);
        *mgr.shared.encoder.lock().unwrap_or_else(PoisonError::into_inner) = Some(encoder);

        handlers::spawn_workers(&mgr, streams);

        Ok(mgr)
    }

    /// Creates a manager without an encoder. Events can still be fed in
    /// through [`MenuManager::handle_button`] and friends.
    pub fn detached(surface: Arc<dyn DisplaySurface>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::new()),
                hold_resolved: Condvar::new(),
                surface,
                encoder: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Registers a menu, replacing any menu of the same name.
    ///
    /// The first menu ever added becomes the active one and is rendered
    /// straight away.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` cannot be used as a display surface name.
    pub fn add_menu(&self, name: &str, entries: Vec<Entry>) -> Result<(), MenuError> {
        if !display::is_valid_surface_name(name) {
            return Err(MenuError::InvalidName(name.to_string()));
        }

        let mut menu = Menu::new(name);
        for entry in entries {
            menu.add_entry(entry);
        }

        let mut state = self.shared.lock();
        state.menus.insert(name.to_string(), menu);

        if state.active.is_none() {
            state.active = Some(name.to_string());
            if let Some(menu) = state.active_menu() {
                menu::render(menu, &*self.shared.surface);
            }
        }

        debug!(menu = %name, "added menu");

        Ok(())
    }

    /// Switches the display to the surface `name`.
    ///
    /// The switch command is always sent. If `name` is a known menu it also
    /// becomes the active menu and is rendered; other names refer to screens
    /// this manager knows nothing about and leave the active menu alone.
    ///
    /// # Errors
    ///
    /// Returns the failure of the switch command. Local state is updated
    /// regardless.
    pub fn switch_to(&self, name: &str) -> Result<(), DisplayError> {
        let sent = self.shared.surface.switch(name);

        let mut state = self.shared.lock();
        state.window = Some(name.to_string());

        if state.menus.contains_key(name) {
            state.active = Some(name.to_string());
            if let Some(menu) = state.active_menu() {
                menu::render(menu, &*self.shared.surface);
            }
        }

        debug!(window = %name, "switched window");

        sent
    }

    /// Renders the active menu again, e.g. after a toggle changed state.
    pub fn display(&self) {
        let state = self.shared.lock();
        if let Some(menu) = state.active_menu() {
            menu::render(menu, &*self.shared.surface);
        }
    }

    /// Binds `action` to holds of at least `after`. Only the longest reached
    /// threshold fires. Registering the same threshold again replaces it.
    pub fn add_timed_action(&self, after: Duration, action: Action) {
        self.shared.lock().timed_actions.insert(after, action);
    }

    /// Appends an action run after every rotation, in registration order.
    pub fn add_rotate_action(&self, action: Action) {
        self.shared.lock().rotate_actions.push(action);
    }

    /// Sets the action run when the button is released while a surface other
    /// than the active menu is shown.
    pub fn set_release_action(&self, action: Action) {
        self.shared.lock().release_action = Some(action);
    }

    /// Swallows the next button release.
    ///
    /// Long-press actions set this so that the release ending the hold does
    /// not also click whatever is under the cursor.
    pub fn ignore_next_release(&self) {
        self.shared.lock().ignore_release = true;
    }

    /// The direction of the most recent rotation.
    pub fn direction(&self) -> Direction {
        let state = self.shared.lock();
        Direction::between(state.last_value, state.curr_value)
    }

    /// The most recent rotation reading.
    pub fn value(&self) -> i32 {
        self.shared.lock().curr_value
    }

    /// The name of the active menu.
    pub fn active_menu(&self) -> Option<String> {
        self.shared.lock().active.clone()
    }

    /// The cursor position of the active menu.
    pub fn cursor(&self) -> Option<usize> {
        self.shared.lock().active_menu().map(Menu::cursor)
    }

    /// The surface currently shown: the last switch target, or the active
    /// menu if nothing was switched to yet.
    pub fn active_window(&self) -> Option<String> {
        self.shared.lock().active_window()
    }

    /// An action switching to `name`.
    pub fn switch_action(&self, name: &str) -> Action {
        self.switcher(name, false)
    }

    /// An action switching to `name` that also swallows the next release,
    /// meant for long-press thresholds.
    pub fn hold_switch_action(&self, name: &str) -> Action {
        self.switcher(name, true)
    }

    fn switcher(&self, name: &str, ignore_release: bool) -> Action {
        let shared = Arc::downgrade(&self.shared);
        let name = name.to_string();

        menu::action(move || {
            let Some(mgr) = MenuManager::upgrade(&shared) else {
                return Ok(());
            };

            if ignore_release {
                mgr.ignore_next_release();
            }
            mgr.switch_to(&name)?;

            Ok(())
        })
    }

    fn upgrade(shared: &Weak<Shared>) -> Option<Self> {
        shared.upgrade().map(|shared| Self { shared })
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Releases the encoder and drops every registered action and menu.
    ///
    /// Events still in flight are not dispatched. An action that is already
    /// running is not interrupted.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails to close.
    pub fn close(&self) -> Result<(), EncoderError> {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let encoder = self
            .shared
            .encoder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let result = match encoder {
            Some(mut encoder) => encoder.close(),
            None => Ok(()),
        };

        // Actions commonly hold a manager handle themselves
        let mut state = self.shared.lock();
        state.timed_actions.clear();
        state.rotate_actions.clear();
        state.release_action = None;
        state.menus.clear();
        drop(state);

        // Wake a release still waiting for its hold
        self.shared.hold_resolved.notify_all();

        info!("menu manager closed");

        result
    }
}
