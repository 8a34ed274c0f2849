use std::time::Duration;
use tracing::trace;

use crate::domain::{DeskConfig, Message, TDError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &DeskConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TDError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                handle_key(key, model.raw_keyevents())
            }
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }
}

/// Maps a key press to a message. While the command line is active every key
/// except Ctrl-C goes to the line editor untouched.
fn handle_key(key: KeyEvent, raw: bool) -> Option<Message> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Message::Quit);
    }
    if raw {
        return Some(Message::RawKey(key));
    }

    let message = match key.code {
        KeyCode::Char('q') => Some(Message::Quit),
        KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
        KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
        KeyCode::Char('h') | KeyCode::Left => Some(Message::MoveLeft),
        KeyCode::Char('l') | KeyCode::Right => Some(Message::MoveRight),
        KeyCode::PageDown => Some(Message::MovePageDown),
        KeyCode::PageUp => Some(Message::MovePageUp),
        KeyCode::Char('g') | KeyCode::Home => Some(Message::MoveBeginning),
        KeyCode::Char('G') | KeyCode::End => Some(Message::MoveEnd),
        KeyCode::Tab => Some(Message::NextSection),
        KeyCode::BackTab => Some(Message::PrevSection),
        KeyCode::Char('/') => Some(Message::Search),
        KeyCode::Char('s') => Some(Message::StatusFilter),
        KeyCode::Char('1') => Some(Message::ToggleActive),
        KeyCode::Char('2') => Some(Message::TogglePending),
        KeyCode::Char('3') => Some(Message::ToggleInactive),
        KeyCode::Char('c') => Some(Message::ClearFilters),
        KeyCode::Char('a') => Some(Message::ToggleCountScope),
        KeyCode::Enter => Some(Message::Enter),
        KeyCode::Esc => Some(Message::Exit),
        KeyCode::Char('y') => Some(Message::CopyCell),
        KeyCode::Char('Y') => Some(Message::CopyRow),
        KeyCode::Char('?') => Some(Message::Help),
        KeyCode::Char('r') => Some(Message::Reload),
        KeyCode::Char('L') => Some(Message::Logout),
        KeyCode::Char('i') => Some(Message::Login),
        _ => None,
    };
    trace!("Mapped: {key:?} => {message:?}");
    message
}
