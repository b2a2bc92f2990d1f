//! Keyboard mapping

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Discrete player commands, queued between frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TurnLeft,
    TurnRight,
    Forward,
    Back,
    Fire,
    Ready,
    Quit,
}

impl Command {
    /// Map a terminal key event. Releases are ignored.
    pub fn from_key(event: &KeyEvent) -> Option<Self> {
        if event.kind == KeyEventKind::Release {
            return None;
        }

        if event.modifiers.contains(KeyModifiers::CONTROL) {
            return match event.code {
                KeyCode::Char('c') | KeyCode::Char('C') => Some(Self::Quit),
                _ => None,
            };
        }

        match event.code {
            KeyCode::Left => Some(Self::TurnLeft),
            KeyCode::Right => Some(Self::TurnRight),
            KeyCode::Up => Some(Self::Forward),
            KeyCode::Down => Some(Self::Back),
            KeyCode::Char(' ') => Some(Self::Fire),
            KeyCode::Enter => Some(Self::Ready),
            _ => None,
        }
    }
}
