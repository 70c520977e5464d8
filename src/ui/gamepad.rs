/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Direction (press, then auto-repeat while held)
///   Start / A             →  Start
///   Select                →  Quit

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::sim::event::{Direction, InputEvent};

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Held directions repeat like a keyboard: first after the delay, then
/// at the interval.
const REPEAT_DELAY: f64 = 0.25;
const REPEAT_INTERVAL: f64 = 0.08;

const DIRECTIONS: [Direction; 4] = [Direction::Left, Direction::Up, Direction::Right, Direction::Down];

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    Start,
    Select,
}

const BTN_COUNT: usize = 8;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER" => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    fn set(&mut self, held: bool) {
        if held && !self.held {
            self.just_pressed = true;
        }
        self.held = held;
    }
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            confirm: vec![Btn::Start, Btn::A],
            cancel: vec![Btn::Select],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],

    // Indexed like DIRECTIONS
    dpad: [BtnState; 4],
    stick: [BtnState; 4],
    stick_x: f32,
    stick_y: f32,

    /// Next auto-repeat time per held direction.
    next_repeat: [Option<f64>; 4],

    action_map: ActionMap,

    pub connected: bool,
}

fn dir_index(dir: Direction) -> usize {
    match dir {
        Direction::Left => 0,
        Direction::Up => 1,
        Direction::Right => 2,
        Direction::Down => 3,
    }
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(_) => (None, false),
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad: [BtnState::default(); 4],
            stick: [BtnState::default(); 4],
            stick_x: 0.0,
            stick_y: 0.0,
            next_repeat: [None; 4],
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config. Empty or unknown lists keep the
    /// defaults.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let cf = parse_list(&cfg.confirm);
        if !cf.is_empty() {
            self.action_map.confirm = cf;
        }
        let ca = parse_list(&cfg.cancel);
        if !ca.is_empty() {
            self.action_map.cancel = ca;
        }
    }

    /// Poll the pad and return this frame's events. `now` is wall-clock
    /// seconds.
    pub fn events(&mut self, now: f64) -> Vec<InputEvent> {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();

        self.collect(now)
    }

    fn collect(&mut self, now: f64) -> Vec<InputEvent> {
        let mut out = Vec::new();
        for dir in DIRECTIONS {
            let i = dir_index(dir);
            let (pad, stick) = (self.dpad[i], self.stick[i]);
            if pad.just_pressed || stick.just_pressed {
                out.push(InputEvent::Direction(dir));
                self.next_repeat[i] = Some(now + REPEAT_DELAY);
            } else if pad.held || stick.held {
                if let Some(t) = self.next_repeat[i] {
                    if now >= t {
                        out.push(InputEvent::Direction(dir));
                        self.next_repeat[i] = Some(now + REPEAT_INTERVAL);
                    }
                }
            } else {
                self.next_repeat[i] = None;
            }
        }
        if self.any_just_pressed(&self.action_map.confirm) {
            out.push(InputEvent::Start);
        }
        if self.any_just_pressed(&self.action_map.cancel) {
            out.push(InputEvent::Quit);
        }
        out
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
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    self.update_axis(axis, value);
                }
                EventType::Connected => {
                    self.connected = true;
                }
                EventType::Disconnected => {
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }

        self.derive_stick();
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        // D-pad handled separately (not in Btn enum)
        let dpad = match gilrs_btn {
            Button::DPadLeft => Some(Direction::Left),
            Button::DPadUp => Some(Direction::Up),
            Button::DPadRight => Some(Direction::Right),
            Button::DPadDown => Some(Direction::Down),
            _ => None,
        };
        if let Some(dir) = dpad {
            self.dpad[dir_index(dir)].set(held);
            return;
        }
        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.buttons[btn as usize].set(held);
        }
    }

    #[cfg(feature = "gamepad")]
    fn update_axis(&mut self, axis: Axis, value: f32) {
        match axis {
            Axis::LeftStickX => self.stick_x = value,
            Axis::LeftStickY => self.stick_y = value,
            _ => {}
        }
    }

    /// Digital stick directions from the analog position. Stick up is
    /// positive Y.
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn derive_stick(&mut self) {
        let (x, y) = (self.stick_x, self.stick_y);
        self.stick[dir_index(Direction::Left)].set(x < -STICK_DEADZONE);
        self.stick[dir_index(Direction::Right)].set(x > STICK_DEADZONE);
        self.stick[dir_index(Direction::Up)].set(y > STICK_DEADZONE);
        self.stick[dir_index(Direction::Down)].set(y < -STICK_DEADZONE);
    }

    // ── Internal ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].just_pressed)
    }

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
        self.next_repeat = [None; 4];
    }
}
