/// Gamepad support: D-pad and left stick feed the same direction edges as
/// the keyboard, face buttons drive the menu actions.
///
/// Action buttons come from `[gamepad]` in config.toml (defaults: Start/A
/// confirm, Start pauses while playing, Y restarts, Select quits).
/// Built without the `gamepad` feature, this is an inert stub.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::entity::Direction;
use crate::domain::latch::DirectionPresses;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Buttons the action map can name. Face buttons use Xbox letters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,
    B,
    X,
    Y,
    L1,
    R1,
    Start,
    Select,
}

const BTN_COUNT: usize = 8;

/// Accepted config spellings per button (compared upper-cased).
const BTN_NAMES: [(Btn, &[&str]); BTN_COUNT] = [
    (Btn::A, &["A", "SOUTH", "CROSS"]),
    (Btn::B, &["B", "EAST", "CIRCLE"]),
    (Btn::X, &["X", "WEST", "SQUARE"]),
    (Btn::Y, &["Y", "NORTH", "TRIANGLE"]),
    (Btn::L1, &["L1", "LB"]),
    (Btn::R1, &["R1", "RB"]),
    (Btn::Start, &["START", "MENU", "OPTIONS"]),
    (Btn::Select, &["SELECT", "BACK", "VIEW"]),
];

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        let wanted = s.trim().to_uppercase();
        BTN_NAMES
            .iter()
            .find(|(_, names)| names.contains(&wanted.as_str()))
            .map(|(btn, _)| *btn)
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        let mapped = match btn {
            Button::South => Btn::A,
            Button::East => Btn::B,
            Button::West => Btn::X,
            Button::North => Btn::Y,
            Button::LeftTrigger => Btn::L1,
            Button::RightTrigger => Btn::R1,
            Button::Start | Button::Mode => Btn::Start,
            Button::Select => Btn::Select,
            _ => return None,
        };
        Some(mapped)
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    fn set_held(&mut self, held: bool) {
        if held && !self.held {
            self.just_pressed = true;
        }
        self.held = held;
    }
}

/// Action-to-button mapping (loaded from config).
#[derive(Debug, PartialEq)]
struct ActionMap {
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
    restart: Vec<Btn>,
    pause: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            confirm: vec![Btn::Start, Btn::A],
            cancel:  vec![Btn::Select],
            restart: vec![Btn::Y],
            pause:   vec![Btn::Start],
        }
    }
}

impl ActionMap {
    /// Unknown names are ignored; an action whose list parses empty keeps
    /// its default buttons.
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse_list(names: &[String], fallback: Vec<Btn>) -> Vec<Btn> {
            let parsed: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if parsed.is_empty() { fallback } else { parsed }
        }
        let d = ActionMap::default();
        ActionMap {
            confirm: parse_list(&cfg.confirm, d.confirm),
            cancel: parse_list(&cfg.cancel, d.cancel),
            restart: parse_list(&cfg.restart, d.restart),
            pause: parse_list(&cfg.pause, d.pause),
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],

    // Indexed in Direction::PRIORITY order (up, down, left, right).
    dpad: [BtnState; 4],
    stick: [BtnState; 4],
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,
}

fn dir_index(dir: Direction) -> usize {
    match dir {
        Direction::Up => 0,
        Direction::Down => 1,
        Direction::Left => 2,
        Direction::Right => 3,
    }
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                let pads = g.gamepads().count();
                tracing::debug!(pads, "gamepad backend ready");
                Some(g)
            }
            Err(e) => {
                tracing::warn!(error = %e, "gamepad support unavailable");
                None
            }
        };

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad: [BtnState::default(); 4],
            stick: [BtnState::default(); 4],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
        }
    }

    /// Load button mapping from config.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        self.action_map = ActionMap::from_config(cfg);
    }

    pub fn update(&mut self) {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => self.set_button(btn, true),
                EventType::ButtonReleased(btn, _) => self.set_button(btn, false),
                EventType::AxisChanged(Axis::LeftStickX, value, _) => self.stick_x = value,
                EventType::AxisChanged(Axis::LeftStickY, value, _) => self.stick_y = value,
                EventType::Connected => tracing::info!(id = ?event.id, "gamepad connected"),
                EventType::Disconnected => {
                    tracing::info!(id = ?event.id, "gamepad disconnected");
                    self.release_all();
                }
                _ => {}
            }
        }

        // Stick Y grows upward.
        self.stick[dir_index(Direction::Up)].set_held(self.stick_y > STICK_DEADZONE);
        self.stick[dir_index(Direction::Down)].set_held(self.stick_y < -STICK_DEADZONE);
        self.stick[dir_index(Direction::Left)].set_held(self.stick_x < -STICK_DEADZONE);
        self.stick[dir_index(Direction::Right)].set_held(self.stick_x > STICK_DEADZONE);
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        let dpad = match gilrs_btn {
            Button::DPadUp => Some(Direction::Up),
            Button::DPadDown => Some(Direction::Down),
            Button::DPadLeft => Some(Direction::Left),
            Button::DPadRight => Some(Direction::Right),
            _ => None,
        };
        if let Some(dir) = dpad {
            self.dpad[dir_index(dir)].set_held(held);
            return;
        }

        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.buttons[btn as usize].set_held(held);
        }
    }

    // ── Action queries (config-driven) ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].just_pressed)
    }

    pub fn confirm_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.confirm)
    }
    pub fn cancel_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.cancel)
    }
    pub fn restart_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.restart)
    }
    pub fn pause_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.pause)
    }

    /// D-pad and stick press edges seen this frame.
    pub fn direction_presses(&self) -> DirectionPresses {
        let mut presses = DirectionPresses::default();
        for dir in Direction::PRIORITY {
            let i = dir_index(dir);
            if self.dpad[i].just_pressed || self.stick[i].just_pressed {
                presses.set(dir);
            }
        }
        presses
    }

    // ── Internal ──

    fn clear_just_pressed(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            b.just_pressed = false;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); BTN_COUNT];
        self.dpad = [BtnState::default(); 4];
        self.stick = [BtnState::default(); 4];
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}
