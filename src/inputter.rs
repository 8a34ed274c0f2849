use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

const MASK_CHAR: char = '•';

/// Single line editor used by the command line (search, status, login).
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    curser_pos: usize, // In chars, not bytes
    masked: bool,
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub curser_pos: usize,
    pub masked: bool,
}

impl InputResult {
    /// Text safe to render, masked input is replaced char by char.
    pub fn display(&self) -> String {
        if self.masked {
            MASK_CHAR.to_string().repeat(self.input.chars().count())
        } else {
            self.input.clone()
        }
    }
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.enter(),
            (KeyCode::Esc, _) => self.escape(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.left(),
            (KeyCode::Right, _) => self.right(),
            (KeyCode::Home, _) => self.home(),
            (KeyCode::End, _) => self.end(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => self.kill_line(),
            (kc, km) => self.key(kc, km),
        }
    }

    /// Starts a new edit, optionally pre-filled.
    pub fn start(&mut self, prefill: &str, masked: bool) {
        self.clear();
        self.masked = masked;
        self.current_input = prefill.to_string();
        self.curser_pos = prefill.chars().count();
        trace!("Input started, masked: {masked}");
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            curser_pos: self.curser_pos,
            masked: self.masked,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.masked = false;
        self.current_input.clear();
        self.curser_pos = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        let masked = self.masked;
        self.clear();
        self.masked = masked;
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.curser_pos > 0 {
            self.curser_pos -= 1;
            let idx = self.getbytepos();
            self.current_input.remove(idx);
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        if self.curser_pos < self.current_input.chars().count() {
            let idx = self.getbytepos();
            self.current_input.remove(idx);
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.curser_pos = self.curser_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.curser_pos < self.current_input.chars().count() {
            self.curser_pos += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.curser_pos = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.curser_pos = self.current_input.chars().count();
        self.get()
    }

    fn kill_line(&mut self) -> InputResult {
        self.current_input.clear();
        self.curser_pos = 0;
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifier: KeyModifiers) -> InputResult {
        if modifier.contains(KeyModifiers::CONTROL) || modifier.contains(KeyModifiers::ALT) {
            return self.get();
        }
        if let Some(chr) = code.as_char() {
            self.current_input.insert(self.getbytepos(), chr);
            self.curser_pos += 1;
        }
        self.get()
    }

    fn getbytepos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.curser_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn press(inputter: &mut Inputter, code: KeyCode) -> InputResult {
        inputter.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(inputter: &mut Inputter, text: &str) {
        for c in text.chars() {
            press(inputter, KeyCode::Char(c));
        }
    }

    #[test]
    fn edits_in_the_middle_of_multibyte_text() {
        let mut inputter = Inputter::default();
        inputter.start("Señor", false);
        press(&mut inputter, KeyCode::Left);
        press(&mut inputter, KeyCode::Left);
        press(&mut inputter, KeyCode::Backspace);
        type_text(&mut inputter, "ñ");
        let result = press(&mut inputter, KeyCode::Enter);
        assert_eq!(result.input, "Señor");
        assert!(result.finished);
        assert!(!result.canceled);
    }

    #[test]
    fn escape_cancels_and_clears() {
        let mut inputter = Inputter::default();
        inputter.start("", false);
        type_text(&mut inputter, "acme");
        let result = press(&mut inputter, KeyCode::Esc);
        assert!(result.canceled);
        assert!(result.finished);
        assert_eq!(result.input, "");
    }

    #[test]
    fn home_delete_and_kill_line() {
        let mut inputter = Inputter::default();
        inputter.start("xacme", false);
        press(&mut inputter, KeyCode::Home);
        let result = press(&mut inputter, KeyCode::Delete);
        assert_eq!(result.input, "acme");
        assert_eq!(result.curser_pos, 0);

        let result = inputter.read(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert_eq!(result.input, "");
    }

    #[test]
    fn masked_input_never_displays_text() {
        let mut inputter = Inputter::default();
        inputter.start("", true);
        type_text(&mut inputter, "pässword");
        let result = inputter.get();
        assert_eq!(result.input, "pässword");
        assert_eq!(result.display(), "••••••••");
    }
}
