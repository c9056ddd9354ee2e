use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use pong::MoveDirection;

/// Without release events a key counts as held this long after its last
/// press or auto-repeat.
pub const HOLD_WINDOW: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Restart,
}

/// Turns terminal key events into a paddle direction. Most terminals only
/// report presses and auto-repeats, so holds are inferred from recency unless
/// the terminal also reports releases.
#[derive(Debug, Default)]
pub struct PaddleInput {
    up: Option<Instant>,
    down: Option<Instant>,
    release_events: bool,
}

impl PaddleInput {
    pub fn new(release_events: bool) -> Self {
        Self {
            release_events,
            ..Default::default()
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Action {
        let pressed = match key.kind {
            KeyEventKind::Press | KeyEventKind::Repeat => true,
            KeyEventKind::Release => false,
        };

        match key.code {
            KeyCode::Char('w') | KeyCode::Char('W') | KeyCode::Up => {
                if pressed {
                    self.up = Some(now);
                    self.down = None;
                } else {
                    self.up = None;
                }
                Action::None
            }
            KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Down => {
                if pressed {
                    self.down = Some(now);
                    self.up = None;
                } else {
                    self.down = None;
                }
                Action::None
            }
            _ if key.kind != KeyEventKind::Press => Action::None,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('r') | KeyCode::Char(' ') => Action::Restart,
            _ => Action::None,
        }
    }

    pub fn direction(&self, now: Instant) -> MoveDirection {
        match (self.is_held(self.up, now), self.is_held(self.down, now)) {
            (true, false) => MoveDirection::Up,
            (false, true) => MoveDirection::Down,
            _ => MoveDirection::None,
        }
    }

    fn is_held(&self, since: Option<Instant>, now: Instant) -> bool {
        match since {
            Some(at) => self.release_events || now.saturating_duration_since(at) < HOLD_WINDOW,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    #[test]
    fn press_holds_for_window() {
        let mut input = PaddleInput::new(false);
        let t0 = Instant::now();

        input.handle_key(key(KeyCode::Char('w'), KeyEventKind::Press), t0);
        assert_eq!(input.direction(t0), MoveDirection::Up);
        assert_eq!(input.direction(t0 + Duration::from_millis(100)), MoveDirection::Up);
        assert_eq!(input.direction(t0 + HOLD_WINDOW), MoveDirection::None);
    }

    #[test]
    fn opposite_press_takes_over() {
        let mut input = PaddleInput::new(false);
        let t0 = Instant::now();

        input.handle_key(key(KeyCode::Up, KeyEventKind::Press), t0);
        input.handle_key(key(KeyCode::Down, KeyEventKind::Press), t0);
        assert_eq!(input.direction(t0), MoveDirection::Down);
    }

    #[test]
    fn release_events_end_hold() {
        let mut input = PaddleInput::new(true);
        let t0 = Instant::now();

        input.handle_key(key(KeyCode::Char('s'), KeyEventKind::Press), t0);
        assert_eq!(input.direction(t0 + Duration::from_secs(5)), MoveDirection::Down);

        input.handle_key(key(KeyCode::Char('s'), KeyEventKind::Release), t0);
        assert_eq!(input.direction(t0), MoveDirection::None);
    }

    #[test]
    fn commands() {
        let mut input = PaddleInput::new(false);
        let t0 = Instant::now();

        assert_eq!(input.handle_key(key(KeyCode::Char('q'), KeyEventKind::Press), t0), Action::Quit);
        assert_eq!(input.handle_key(key(KeyCode::Esc, KeyEventKind::Press), t0), Action::Quit);
        assert_eq!(input.handle_key(key(KeyCode::Char('r'), KeyEventKind::Press), t0), Action::Restart);
        assert_eq!(input.handle_key(key(KeyCode::Char('r'), KeyEventKind::Release), t0), Action::None);

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(input.handle_key(ctrl_c, t0), Action::Quit);
    }
}
