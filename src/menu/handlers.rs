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

//! Encoder stream handlers.
//!
//! Each of the three encoder streams is consumed by its own worker thread.
//! The streams are unordered relative to each other; every handler takes the
//! manager lock for its bookkeeping, releases it, and only then runs any
//! action. A slow action therefore delays only its own stream.
//!
//! # Gestures
//!
//! Every press edge starts a gesture, and the encoder reports one hold
//! duration per gesture ahead of its release edge. Because the two arrive on
//! different streams, the release handler waits until the hold of its own
//! gesture has been resolved, timed action included, before deciding whether
//! to click. A long press thus never clicks the entry under the cursor, and
//! a suppression it requests is consumed by its own release only.

use std::{
    collections::BTreeMap,
    sync::{MutexGuard, PoisonError, mpsc::Receiver},
    thread,
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::{
    encoder::EncoderStreams,
    menu::{self, MenuManager, manager::State},
};

/// How long a release waits for the hold duration of its gesture.
const HOLD_RESOLVE_TIMEOUT: Duration = Duration::from_secs(1);

/// Starts one worker thread per encoder stream.
///
/// Workers stop when their stream disconnects, which happens when the
/// encoder is closed.
pub(super) fn spawn_workers(mgr: &MenuManager, streams: EncoderStreams) {
    let EncoderStreams {
        button,
        pressed,
        value,
    } = streams;

    spawn_worker("button", mgr.clone(), button, MenuManager::handle_button);
    spawn_worker("pressed", mgr.clone(), pressed, MenuManager::handle_pressed);
    spawn_worker("value", mgr.clone(), value, MenuManager::handle_value);
}

fn spawn_worker<T: Send + 'static>(
    stream: &'static str,
    mgr: MenuManager,
    rx: Receiver<T>,
    handler: fn(&MenuManager, T),
) {
    thread::spawn(move || {
        while let Ok(event) = rx.recv() {
            if mgr.is_closed() {
                break;
            }
            handler(&mgr, event);
        }

        debug!(stream, "encoder stream finished");
    });
}

/// Picks the longest threshold the hold actually reached.
///
/// Thresholds above `held` never qualify; with no qualifying threshold there
/// is nothing to run.
pub(crate) fn resolve_tier<T>(
    tiers: &BTreeMap<Duration, T>,
    held: Duration,
) -> Option<(&Duration, &T)> {
    tiers.range(..=held).next_back()
}

impl MenuManager {
    /// Handles a button edge, `true` for press and `false` for release.
    ///
    /// A press opens a gesture. A release first waits for the hold of that
    /// gesture to be resolved, then clicks the entry under the cursor when
    /// the active menu is on screen and runs the release action otherwise. A
    /// pending suppression swallows the release instead.
    pub fn handle_button(&self, pressed: bool) {
        if self.is_closed() {
            return;
        }

        if pressed {
            self.shared.lock().presses += 1;
            debug!("button pressed");
            return;
        }

        debug!("button released");

        let (action, menu, entry) = {
            let mut state = self.await_hold();
            if self.is_closed() {
                return;
            }

            if state.ignore_release {
                state.ignore_release = false;
                debug!("release swallowed");
                return;
            }

            match state.shown_menu() {
                Some(shown) => (
                    shown.selected_action(),
                    Some(shown.name().to_string()),
                    shown.active_name().map(str::to_string),
                ),
                None => (state.release_action.clone(), None, None),
            }
        };

        let Some(action) = action else {
            return;
        };

        match (action(), menu) {
            // Toggles change what the entry shows
            (Ok(()), Some(_)) => self.display(),
            (Ok(()), None) => {}
            (Err(e), Some(menu)) => {
                let entry = entry.unwrap_or_default();
                warn!(%menu, %entry, "action for menu entry failed: {:#}", e);
            }
            (Err(e), None) => {
                let window = self.active_window().unwrap_or_default();
                warn!(%window, "release action failed: {:#}", e);
            }
        }
    }

    /// Locks the state once the current gesture's hold has been resolved.
    ///
    /// Gives up after [`HOLD_RESOLVE_TIMEOUT`] for encoders that failed to
    /// report a duration, and counts the gesture as resolved.
    fn await_hold(&self) -> MutexGuard<'_, State> {
        let state = self.shared.lock();
        if !state.hold_pending() {
            return state;
        }

        let (mut state, wait) = self
            .shared
            .hold_resolved
            .wait_timeout_while(state, HOLD_RESOLVE_TIMEOUT, |state| {
                state.hold_pending() && !self.is_closed()
            })
            .unwrap_or_else(PoisonError::into_inner);

        if wait.timed_out() {
            warn!("no hold duration reported for release");
            state.holds = state.presses;
        }

        state
    }

    /// Handles the duration of a completed hold.
    ///
    /// At most one timed action runs per hold: the one with the longest
    /// threshold not exceeding `held`. The gesture counts as resolved once
    /// that action has returned.
    pub fn handle_pressed(&self, held: Duration) {
        if self.is_closed() {
            return;
        }

        self.run_timed_action(held);

        self.shared.lock().holds += 1;
        self.shared.hold_resolved.notify_all();
    }

    fn run_timed_action(&self, held: Duration) {
        let tier = {
            let state = self.shared.lock();
            resolve_tier(&state.timed_actions, held)
                .map(|(threshold, action)| (*threshold, action.clone()))
        };

        let Some((threshold, action)) = tier else {
            debug!(?held, "hold too short for any timed action");
            return;
        };

        info!(?held, ?threshold, "running timed action");

        if let Err(e) = action() {
            warn!(?threshold, "timed action failed: {:#}", e);
        }
    }

    /// Handles a rotation reading.
    ///
    /// Scrolls the active menu by `value`, records the reading for
    /// [`MenuManager::direction`], hints the display, runs every rotate
    /// action in order and renders the active menu again.
    pub fn handle_value(&self, value: i32) {
        if self.is_closed() {
            return;
        }

        debug!(value, "rotated");

        let (active, rotate_actions) = {
            let mut state = self.shared.lock();

            if let Some(menu) = state.active_menu_mut() {
                menu.scroll(value);
            }
            state.last_value = state.curr_value;
            state.curr_value = value;

            (state.active.clone(), state.rotate_actions.clone())
        };

        if let Some(active) = &active
            && let Err(e) = self.shared.surface.navigate(active, value)
        {
            warn!(menu = %active, "failed to move menu: {:#}", anyhow::Error::from(e));
        }

        for (index, action) in rotate_actions.iter().enumerate() {
            if let Err(e) = action() {
                warn!(index, "rotate action failed: {:#}", e);
            }
        }

        let state = self.shared.lock();
        if let Some(menu) = state.active_menu() {
            menu::render(menu, &*self.shared.surface);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{
        display::{DisplayCommand, DisplaySurface},
        menu::{
            Direction, Entry, ToggleEntry, action,
            testing::{RecordingSurface, counter, failing},
        },
    };

    fn manager() -> (MenuManager, Arc<RecordingSurface>) {
        let surface = Arc::new(RecordingSurface::default());
        let mgr = MenuManager::detached(Arc::clone(&surface) as Arc<dyn DisplaySurface>);
        (mgr, surface)
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn tier_resolution_picks_longest_reached_threshold() {
        let tiers = BTreeMap::from([(ms(100), "A"), (ms(500), "B"), (ms(2000), "C")]);

        assert_eq!(resolve_tier(&tiers, ms(1500)).map(|(_, v)| *v), Some("B"));
        assert_eq!(resolve_tier(&tiers, ms(50)).map(|(_, v)| *v), None);
        assert_eq!(resolve_tier(&tiers, ms(2000)).map(|(_, v)| *v), Some("C"));
        assert_eq!(resolve_tier(&tiers, ms(2500)).map(|(_, v)| *v), Some("C"));
        assert_eq!(resolve_tier(&tiers, ms(100)).map(|(_, v)| *v), Some("A"));
        assert!(resolve_tier(&BTreeMap::<Duration, ()>::new(), ms(100)).is_none());
    }

    #[test]
    fn exactly_one_timed_action_fires() {
        let (mgr, _) = manager();
        let (short, short_hits) = counter();
        let (medium, medium_hits) = counter();
        let (long, long_hits) = counter();

        mgr.add_timed_action(ms(100), short);
        mgr.add_timed_action(ms(500), medium);
        mgr.add_timed_action(ms(2000), long);

        mgr.handle_pressed(ms(1500));
        assert_eq!(short_hits.load(Ordering::SeqCst), 0);
        assert_eq!(medium_hits.load(Ordering::SeqCst), 1);
        assert_eq!(long_hits.load(Ordering::SeqCst), 0);

        mgr.handle_pressed(ms(50));
        mgr.handle_pressed(ms(2500));
        assert_eq!(short_hits.load(Ordering::SeqCst), 0);
        assert_eq!(medium_hits.load(Ordering::SeqCst), 1);
        assert_eq!(long_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_timed_action_is_contained() {
        let (mgr, _) = manager();
        mgr.add_timed_action(ms(10), failing());

        mgr.handle_pressed(ms(20));
        mgr.handle_pressed(ms(20));
    }

    #[test]
    fn release_clicks_entry_under_cursor() {
        let (mgr, _) = manager();
        let (first, first_hits) = counter();
        let (second, second_hits) = counter();
        mgr.add_menu(
            "menu-main",
            vec![Entry::click("One", first), Entry::click("Two", second)],
        )
        .unwrap();

        mgr.handle_value(1);
        mgr.handle_button(true);
        mgr.handle_pressed(ms(20));
        assert_eq!(second_hits.load(Ordering::SeqCst), 0);

        mgr.handle_button(false);
        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_suppression_is_single_shot() {
        let (mgr, _) = manager();
        let (click, hits) = counter();
        mgr.add_menu("menu-main", vec![Entry::click("Play", click)]).unwrap();

        let suppressor = mgr.clone();
        mgr.add_timed_action(
            ms(600),
            action(move || {
                suppressor.ignore_next_release();
                Ok(())
            }),
        );

        mgr.handle_pressed(ms(700));
        mgr.handle_button(false);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        mgr.handle_button(false);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        mgr.close().unwrap();
    }

    #[test]
    fn release_waits_for_hold_of_its_gesture() {
        let (mgr, _) = manager();
        let (play, play_hits) = counter();
        let (back, back_hits) = counter();
        mgr.add_menu("menu-main", vec![Entry::click("Play", play)]).unwrap();
        mgr.add_menu("menu-power", vec![Entry::click("Back", back)]).unwrap();
        mgr.add_timed_action(ms(600), mgr.hold_switch_action("menu-power"));

        // The release overtakes the hold duration of the same gesture
        mgr.handle_button(true);
        let releaser = mgr.clone();
        let release = thread::spawn(move || releaser.handle_button(false));
        thread::sleep(ms(50));
        mgr.handle_pressed(ms(900));
        release.join().unwrap();

        assert_eq!(play_hits.load(Ordering::SeqCst), 0);
        assert_eq!(mgr.active_menu().as_deref(), Some("menu-power"));

        // The suppression went to the long press, the next click is genuine
        mgr.handle_button(true);
        mgr.handle_pressed(ms(30));
        mgr.handle_button(false);

        assert_eq!(back_hits.load(Ordering::SeqCst), 1);
        assert_eq!(play_hits.load(Ordering::SeqCst), 0);

        mgr.close().unwrap();
    }

    #[test]
    fn release_gives_up_on_missing_hold() {
        let (mgr, _) = manager();
        let (click, hits) = counter();
        mgr.add_menu("menu-main", vec![Entry::click("Play", click)]).unwrap();

        mgr.handle_button(true);
        mgr.handle_button(false);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // A late duration does not hold up the next gesture
        mgr.handle_pressed(ms(30));
        mgr.handle_button(true);
        mgr.handle_pressed(ms(30));
        mgr.handle_button(false);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn close_wakes_waiting_release() {
        let (mgr, _) = manager();
        let (click, hits) = counter();
        mgr.add_menu("menu-main", vec![Entry::click("Play", click)]).unwrap();

        mgr.handle_button(true);
        let releaser = mgr.clone();
        let release = thread::spawn(move || releaser.handle_button(false));
        thread::sleep(ms(50));
        mgr.close().unwrap();
        release.join().unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn toggle_click_redraws_menu() {
        let (mgr, surface) = manager();
        let (on, _) = counter();
        let (off, _) = counter();
        let random = Arc::new(
            ToggleEntry::new("Random")
                .with_state("on", on)
                .with_state("off", off),
        );
        mgr.add_menu("menu-main", vec![Entry::toggle(&random)]).unwrap();
        surface.clear();

        mgr.handle_button(false);

        assert_eq!(random.state().as_deref(), Some("on"));
        assert_eq!(
            surface.lines_for("menu-main").last(),
            Some(&(0, "> Random: on".to_string()))
        );
    }

    #[test]
    fn release_on_separator_does_nothing() {
        let (mgr, _) = manager();
        let (release, release_hits) = counter();
        let (click, click_hits) = counter();
        mgr.add_menu(
            "menu-main",
            vec![Entry::separator("MODES"), Entry::click("Clock", click)],
        )
        .unwrap();
        mgr.set_release_action(release);

        mgr.handle_button(false);

        assert_eq!(click_hits.load(Ordering::SeqCst), 0);
        assert_eq!(release_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn release_outside_menus_runs_release_action() {
        let (mgr, _) = manager();
        let (release, release_hits) = counter();
        let (click, click_hits) = counter();
        mgr.add_menu("menu-main", vec![Entry::click("Clock", click)]).unwrap();
        mgr.set_release_action(release);

        mgr.switch_to("clock").unwrap();
        mgr.handle_button(false);

        assert_eq!(click_hits.load(Ordering::SeqCst), 0);
        assert_eq!(release_hits.load(Ordering::SeqCst), 1);

        mgr.switch_to("menu-main").unwrap();
        mgr.handle_button(false);

        assert_eq!(click_hits.load(Ordering::SeqCst), 1);
        assert_eq!(release_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_click_changes_nothing() {
        let (mgr, _) = manager();
        mgr.add_menu(
            "menu-main",
            vec![Entry::click("Poweroff", failing()), Entry::separator("x")],
        )
        .unwrap();

        mgr.handle_button(false);

        assert_eq!(mgr.active_menu().as_deref(), Some("menu-main"));
        assert_eq!(mgr.cursor(), Some(0));
    }

    #[test]
    fn actions_may_call_back_into_the_manager() {
        let (mgr, _) = manager();
        mgr.add_menu("menu-main", vec![Entry::click("Power", mgr.switch_action("menu-power"))])
            .unwrap();
        mgr.add_menu("menu-power", vec![Entry::separator("Reboot")]).unwrap();

        mgr.handle_button(false);

        assert_eq!(mgr.active_menu().as_deref(), Some("menu-power"));
        mgr.close().unwrap();
    }

    #[test]
    fn rotation_scrolls_hints_and_redraws() {
        let (mgr, surface) = manager();
        mgr.add_menu(
            "menu-main",
            vec![Entry::separator("a"), Entry::separator("b"), Entry::separator("c")],
        )
        .unwrap();
        surface.clear();

        mgr.handle_value(5);

        assert_eq!(mgr.cursor(), Some(2));
        assert_eq!(
            surface.commands()[0],
            DisplayCommand::Move {
                surface: "menu-main".to_string(),
                delta: 5,
            }
        );
        assert_eq!(
            surface.lines_for("menu-main"),
            vec![
                (0, "  a".to_string()),
                (1, "  b".to_string()),
                (2, "> c".to_string()),
            ]
        );
    }

    #[test]
    fn rotate_actions_run_in_order_despite_failures() {
        let (mgr, _) = manager();
        let order = Arc::new(Mutex::new(Vec::new()));

        for index in 0..3 {
            let order = Arc::clone(&order);
            mgr.add_rotate_action(action(move || {
                order.lock().unwrap().push(index);
                if index == 0 {
                    anyhow::bail!("first rotate action fails");
                }
                Ok(())
            }));
        }

        mgr.handle_value(1);

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn direction_follows_readings() {
        let (mgr, _) = manager();
        assert_eq!(mgr.direction(), Direction::None);

        mgr.handle_value(3);
        assert_eq!(mgr.direction(), Direction::Right);
        assert_eq!(mgr.value(), 3);

        mgr.handle_value(1);
        assert_eq!(mgr.direction(), Direction::Left);

        mgr.handle_value(1);
        assert_eq!(mgr.direction(), Direction::None);
    }

    #[test]
    fn rotate_action_sees_its_own_reading() {
        let (mgr, _) = manager();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let observer = mgr.clone();
        let record = Arc::clone(&seen);
        mgr.add_rotate_action(action(move || {
            record.lock().unwrap().push(observer.direction());
            Ok(())
        }));

        mgr.handle_value(-1);
        mgr.handle_value(1);

        assert_eq!(*seen.lock().unwrap(), vec![Direction::Left, Direction::Right]);
        mgr.close().unwrap();
    }

    #[test]
    fn rotation_without_menus_only_runs_actions() {
        let (mgr, surface) = manager();
        let hits = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&hits);
        mgr.add_rotate_action(action(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        mgr.handle_value(2);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(surface.commands().is_empty());
    }
}
