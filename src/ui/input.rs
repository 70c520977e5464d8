/// Keyboard, mouse and resize input, translated into `InputEvent`s.
///
/// Every key press (and auto-repeat) of a direction key is one impulse,
/// so holding a key keeps pushing at the terminal's repeat rate. Release
/// events are ignored.
///
/// Key map:
///   Arrows / WASD   →  Direction
///   Enter / Space   →  Start
///   Esc / Q / Ctrl+C →  Quit
///   F3              →  ToggleDebug
///   Left click/drag →  Pointer (canvas pixels at the cell centre)

use std::time::Duration;

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

use crate::sim::event::{Direction, InputEvent};

pub struct InputState {
    /// Canvas pixels per terminal cell.
    cell_w: f64,
    cell_h: f64,
    /// Raw key events collected during the last drain.
    pub raw_events: Vec<KeyEvent>,
}

impl InputState {
    pub fn new(cell_w: f64, cell_h: f64) -> Self {
        InputState {
            cell_w: cell_w.max(1.0),
            cell_h: cell_h.max(1.0),
            raw_events: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame, before the tick.
    pub fn drain_events(&mut self) -> Vec<InputEvent> {
        self.raw_events.clear();
        let mut out = Vec::new();
        while poll(Duration::ZERO).unwrap_or(false) {
            let Ok(ev) = event::read() else { break };
            if let Event::Key(key) = ev {
                self.raw_events.push(key);
            }
            out.extend(self.translate(&ev));
        }
        out
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(is_ctrl_c)
    }

    pub fn translate(&self, ev: &Event) -> Option<InputEvent> {
        match ev {
            Event::Key(key) => translate_key(key),
            Event::Mouse(m) => match m.kind {
                MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => {
                    Some(InputEvent::Pointer {
                        x: (m.column as f64 + 0.5) * self.cell_w,
                        y: (m.row as f64 + 0.5) * self.cell_h,
                    })
                }
                _ => None,
            },
            Event::Resize(cols, rows) => Some(InputEvent::Resize {
                width: *cols as f64 * self.cell_w,
                height: *rows as f64 * self.cell_h,
            }),
            _ => None,
        }
    }
}

fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL)
        && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
}

fn translate_key(key: &KeyEvent) -> Option<InputEvent> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if is_ctrl_c(key) {
        return Some(InputEvent::Quit);
    }
    let ev = match key.code {
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => InputEvent::Direction(Direction::Left),
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => InputEvent::Direction(Direction::Up),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => InputEvent::Direction(Direction::Right),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => InputEvent::Direction(Direction::Down),
        KeyCode::Enter | KeyCode::Char(' ') => InputEvent::Start,
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => InputEvent::Quit,
        KeyCode::F(3) => InputEvent::ToggleDebug,
        _ => return None,
    };
    Some(ev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::MouseEvent;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent { kind, column, row, modifiers: KeyModifiers::NONE })
    }

    #[test]
    fn arrows_and_wasd_are_directions() {
        let input = InputState::new(17.0, 21.0);
        assert_eq!(input.translate(&key(KeyCode::Left)), Some(InputEvent::Direction(Direction::Left)));
        assert_eq!(input.translate(&key(KeyCode::Char('w'))), Some(InputEvent::Direction(Direction::Up)));
        assert_eq!(input.translate(&key(KeyCode::Char('D'))), Some(InputEvent::Direction(Direction::Right)));
        assert_eq!(input.translate(&key(KeyCode::Down)), Some(InputEvent::Direction(Direction::Down)));
    }

    #[test]
    fn releases_are_ignored() {
        let input = InputState::new(17.0, 21.0);
        let up = Event::Key(KeyEvent::new_with_kind(KeyCode::Up, KeyModifiers::NONE, KeyEventKind::Release));
        assert_eq!(input.translate(&up), None);
    }

    #[test]
    fn control_keys() {
        let input = InputState::new(17.0, 21.0);
        assert_eq!(input.translate(&key(KeyCode::Enter)), Some(InputEvent::Start));
        assert_eq!(input.translate(&key(KeyCode::Esc)), Some(InputEvent::Quit));
        assert_eq!(input.translate(&key(KeyCode::F(3))), Some(InputEvent::ToggleDebug));
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(input.translate(&ctrl_c), Some(InputEvent::Quit));
        assert_eq!(input.translate(&key(KeyCode::Char('c'))), None);
    }

    #[test]
    fn clicks_map_to_cell_centres() {
        let input = InputState::new(10.0, 20.0);
        let click = mouse(MouseEventKind::Down(MouseButton::Left), 3, 2);
        assert_eq!(input.translate(&click), Some(InputEvent::Pointer { x: 35.0, y: 50.0 }));
        let right = mouse(MouseEventKind::Down(MouseButton::Right), 3, 2);
        assert_eq!(input.translate(&right), None);
        assert_eq!(input.translate(&mouse(MouseEventKind::Moved, 1, 1)), None);
    }

    #[test]
    fn resize_reports_canvas_pixels() {
        let input = InputState::new(10.0, 20.0);
        assert_eq!(
            input.translate(&Event::Resize(80, 24)),
            Some(InputEvent::Resize { width: 800.0, height: 480.0 })
        );
    }
}
