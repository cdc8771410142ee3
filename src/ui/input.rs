/// Input state tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous movement while a key is held
///   - Edge-triggered slot cycling / item use (only fires on initial press)
///   - Movement and actions in the same tick
///
/// Release events are honored when the terminal reports them.
/// Otherwise a key counts as released after `HOLD_TIMEOUT` without a
/// Press/Repeat event.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::FrameInput;

/// After this duration without a Press/Repeat event, consider the key released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ── Bindings ──

pub const KEYS_UP: [KeyCode; 3] = [KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
pub const KEYS_DOWN: [KeyCode; 3] = [KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
pub const KEYS_LEFT: [KeyCode; 3] = [KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
pub const KEYS_RIGHT: [KeyCode; 3] = [KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
pub const KEYS_CYCLE: [KeyCode; 2] = [KeyCode::Char('c'), KeyCode::Char('C')];
pub const KEYS_USE: [KeyCode; 3] = [KeyCode::Char('v'), KeyCode::Char('V'), KeyCode::Char(' ')];
pub const KEYS_QUIT: [KeyCode; 2] = [KeyCode::Esc, KeyCode::Char('q')];
pub const KEY_SAVE: KeyCode = KeyCode::F(5);
pub const KEY_LOAD: KeyCode = KeyCode::F(9);

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the most recent drain.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for Ctrl-C detection.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events.
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

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before running simulation ticks.
    pub fn drain_events(&mut self) {
        self.begin_frame();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        self.expire(Instant::now());
    }

    fn begin_frame(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
    }

    /// Apply one key event observed at `now`.
    fn record(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.held_at(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Forget keys that timed out (terminals without Release events).
    fn expire(&mut self, now: Instant) {
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        let now = Instant::now();
        codes.iter().any(|c| self.held_at(*c, now))
    }

    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    /// Held movement keys plus this frame's fresh action presses.
    pub fn frame_input(&self) -> FrameInput {
        FrameInput {
            up: self.any_held(&KEYS_UP),
            down: self.any_held(&KEYS_DOWN),
            left: self.any_held(&KEYS_LEFT),
            right: self.any_held(&KEYS_RIGHT),
            cycle_slot: self.any_pressed(&KEYS_CYCLE),
            use_item: self.any_pressed(&KEYS_USE),
        }
    }

    // ── Internal ──

    fn held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active.get(&code)
            .map(|t| now.duration_since(*t) < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}
