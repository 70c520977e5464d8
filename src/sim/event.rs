/// Events flowing in and out of the simulation.
///
/// `InputEvent`s are produced by the keyboard, pointer and gamepad
/// front-ends. `GameEvent`s are emitted by a tick; the presentation layer
/// consumes them for sound.

use crate::domain::entity::EntityId;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Left,
    Up,
    Right,
    Down,
}

impl Direction {
    /// Unit step in map space.
    pub fn unit(self) -> (f64, f64) {
        match self {
            Direction::Left => (-1.0, 0.0),
            Direction::Up => (0.0, -1.0),
            Direction::Right => (1.0, 0.0),
            Direction::Down => (0.0, 1.0),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum InputEvent {
    Direction(Direction),
    /// Pointer press in canvas pixels.
    Pointer { x: f64, y: f64 },
    Start,
    Quit,
    ToggleDebug,
    /// New canvas size in pixels.
    Resize { width: f64, height: f64 },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Timeout,
    Defeat,
    Victory,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    GemCollected { code: char, gems: u32 },
    PlayerHit { by: EntityId, life: u32 },
    SessionStarted,
    /// Remaining time dropped under the tense threshold.
    TimeRunningOut,
    SessionFinished(Outcome),
    /// Session left early via quit.
    SessionAborted,
}
