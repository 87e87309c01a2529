/// Keyboard edge tracker.
///
/// The movement latch wants press edges only: auto-repeat while a key is
/// held must not re-queue the same direction every frame. A key counts as
/// held from its first Press until a Release (when the terminal reports
/// them) or until no Press/Repeat has arrived for `HOLD_TIMEOUT`.
///
/// Key bindings:
///   W / ↑   up        S / ↓   down
///   A / ←   left      D / →   right

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::Direction;
use crate::domain::latch::DirectionPresses;

/// After this long without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the most recent
    /// drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events. Call once per frame, before the
    /// simulation step.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn record(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            _ => {
                let was_held = self
                    .last_active
                    .get(&key.code)
                    .map_or(false, |t| now.duration_since(*t) < HOLD_TIMEOUT);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Was this key freshly pressed this frame?
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Any fresh key at all (used by "press any key" screens).
    pub fn any_fresh(&self) -> bool {
        !self.fresh_presses.is_empty()
    }

    /// Direction press edges seen this frame.
    pub fn direction_presses(&self) -> DirectionPresses {
        let mut presses = DirectionPresses::default();
        for &code in &self.fresh_presses {
            if let Some(dir) = direction_for(code) {
                presses.set(dir);
            }
        }
        presses
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

fn direction_for(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Direction::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Direction::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Direction::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Direction::Right),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    #[test]
    fn repeat_does_not_refire_edge() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        input.record(key(KeyCode::Up, KeyEventKind::Press), t0);
        assert!(input.direction_presses().up);

        input.fresh_presses.clear();
        input.record(key(KeyCode::Up, KeyEventKind::Repeat), t0 + Duration::from_millis(30));
        assert!(!input.direction_presses().any());
    }

    #[test]
    fn release_rearms_key_when_honored() {
        let mut input = InputState::new();
        input.honor_release = true;
        let t0 = Instant::now();
        input.record(key(KeyCode::Char('a'), KeyEventKind::Press), t0);
        input.record(key(KeyCode::Char('a'), KeyEventKind::Release), t0);
        input.fresh_presses.clear();
        input.record(key(KeyCode::Char('a'), KeyEventKind::Press), t0);
        assert!(input.direction_presses().left);
    }

    #[test]
    fn wasd_and_arrows_map_alike() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        input.record(key(KeyCode::Char('D'), KeyEventKind::Press), t0);
        input.record(key(KeyCode::Down, KeyEventKind::Press), t0);
        input.record(key(KeyCode::Char('x'), KeyEventKind::Press), t0);
        let p = input.direction_presses();
        assert!(p.right && p.down && !p.up && !p.left);
        assert!(input.any_fresh());
    }
}
