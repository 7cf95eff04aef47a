use super::text_metrics::floor_char_boundary;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    None,
    Submit(String),
    Clear,
    ScrollUp,
    ScrollDown,
    Quit,
}

/// Single-buffer line editor for the prompt pane.
#[derive(Debug, Default)]
pub struct InputLine {
    buffer: String,
    cursor: usize,
}

impl InputLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn insert_str(&mut self, value: &str) {
        let cursor = floor_char_boundary(&self.buffer, self.cursor);
        self.buffer.insert_str(cursor, value);
        self.cursor = cursor + value.len();
    }

    pub fn backspace(&mut self) {
        let end = floor_char_boundary(&self.buffer, self.cursor);
        let start = self.prev_boundary(end);
        if start < end {
            self.buffer.replace_range(start..end, "");
            self.cursor = start;
        }
    }

    pub fn delete(&mut self) {
        let start = floor_char_boundary(&self.buffer, self.cursor);
        let end = self.next_boundary(start);
        if start < end {
            self.buffer.replace_range(start..end, "");
        }
    }

    /// Takes the buffer for submission; returns `None` for blank input.
    pub fn take(&mut self) -> Option<String> {
        if self.buffer.trim().is_empty() {
            return None;
        }
        self.cursor = 0;
        Some(std::mem::take(&mut self.buffer))
    }

    pub fn apply_key(&mut self, key: KeyEvent) -> InputAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => return InputAction::Quit,
            KeyCode::Char('l') if ctrl => return InputAction::Clear,
            KeyCode::Char('j') if ctrl => self.insert_str("\n"),
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => self.insert_str("\n"),
            KeyCode::Enter => {
                if let Some(value) = self.take() {
                    return InputAction::Submit(value);
                }
            }
            KeyCode::Esc => return InputAction::Quit,
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.cursor = self.prev_boundary(self.cursor),
            KeyCode::Right => self.cursor = self.next_boundary(self.cursor),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.buffer.len(),
            KeyCode::PageUp => return InputAction::ScrollUp,
            KeyCode::PageDown => return InputAction::ScrollDown,
            KeyCode::Char(ch) => {
                let mut encoded = [0u8; 4];
                self.insert_str(ch.encode_utf8(&mut encoded));
            }
            _ => {}
        }
        InputAction::None
    }

    fn prev_boundary(&self, index: usize) -> usize {
        let index = floor_char_boundary(&self.buffer, index);
        self.buffer[..index]
            .char_indices()
            .next_back()
            .map_or(0, |(start, _)| start)
    }

    fn next_boundary(&self, index: usize) -> usize {
        let index = floor_char_boundary(&self.buffer, index);
        self.buffer[index..]
            .chars()
            .next()
            .map_or(self.buffer.len(), |ch| index + ch.len_utf8())
    }
}
