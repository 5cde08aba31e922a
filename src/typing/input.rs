//! Key sinks: where emitted key strings end up
//!
//! - [`KeyboardSink`] synthesises the keys with enigo (`typing` feature)
//! - [`PrintSink`] writes the key strings to a writer, for dry runs
//! - [`ScreenSink`] keeps every emission and the text it would leave behind

use super::commands::CommandTreeError;
use super::keys::{Key, KeyToken, NamedKey, tokenize};
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypingError {
    #[error("keyboard error: {0}")]
    Keyboard(String),
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Commands(#[from] CommandTreeError),
}

/// Receives key strings in the bracket token grammar
pub trait KeySink {
    fn emit(&mut self, keys: &str) -> Result<(), TypingError>;

    fn flush(&mut self) -> Result<(), TypingError> {
        Ok(())
    }
}

/// Writes key strings verbatim
pub struct PrintSink<W: Write> {
    out: W,
}

impl<W: Write> PrintSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> KeySink for PrintSink<W> {
    fn emit(&mut self, keys: &str) -> Result<(), TypingError> {
        self.out.write_all(keys.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TypingError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Records emissions and simulates an editor buffer
#[derive(Debug, Default)]
pub struct ScreenSink {
    emissions: Vec<String>,
    text: String,
}

impl ScreenSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emissions(&self) -> &[String] {
        &self.emissions
    }

    /// Everything emitted, joined
    pub fn keys(&self) -> String {
        self.emissions.concat()
    }

    /// Text left on screen after backspaces
    pub fn text(&self) -> &str {
        &self.text
    }

    fn apply(&mut self, token: KeyToken) {
        if !token.modifiers.is_empty() {
            return;
        }
        match token.key {
            Key::Char(c) => self.text.push(c),
            Key::Named(NamedKey::Backspace) => {
                self.text.pop();
            }
            Key::Named(NamedKey::Return) => self.text.push('\n'),
            Key::Named(NamedKey::Tab) => self.text.push('\t'),
            Key::Named(_) => {}
        }
    }
}

impl KeySink for ScreenSink {
    fn emit(&mut self, keys: &str) -> Result<(), TypingError> {
        for token in tokenize(keys) {
            self.apply(token);
        }
        self.emissions.push(keys.to_string());
        Ok(())
    }
}

impl<S: KeySink + ?Sized> KeySink for &mut S {
    fn emit(&mut self, keys: &str) -> Result<(), TypingError> {
        (**self).emit(keys)
    }

    fn flush(&mut self) -> Result<(), TypingError> {
        (**self).flush()
    }
}

#[cfg(feature = "typing")]
pub use keyboard::KeyboardSink;

#[cfg(feature = "typing")]
mod keyboard {
    use super::{KeySink, TypingError};
    use crate::typing::keys::{Key, KeyToken, Modifiers, NamedKey, tokenize};
    use enigo::{Direction, Enigo, Keyboard, Settings};
    use std::thread;
    use std::time::Duration;
    use tracing::warn;

    /// Types into the focused application
    pub struct KeyboardSink {
        enigo: Enigo,
        key_delay: Duration,
    }

    fn enigo_key(key: NamedKey) -> Option<enigo::Key> {
        let key = match key {
            NamedKey::Escape => enigo::Key::Escape,
            NamedKey::Backspace => enigo::Key::Backspace,
            NamedKey::Tab => enigo::Key::Tab,
            NamedKey::Return => enigo::Key::Return,
            NamedKey::Up => enigo::Key::UpArrow,
            NamedKey::Down => enigo::Key::DownArrow,
            NamedKey::Left => enigo::Key::LeftArrow,
            NamedKey::Right => enigo::Key::RightArrow,
            NamedKey::Home => enigo::Key::Home,
            NamedKey::End => enigo::Key::End,
            NamedKey::PageUp => enigo::Key::PageUp,
            NamedKey::PageDown => enigo::Key::PageDown,
            NamedKey::Delete => enigo::Key::Delete,
            NamedKey::F(1) => enigo::Key::F1,
            NamedKey::F(2) => enigo::Key::F2,
            NamedKey::F(3) => enigo::Key::F3,
            NamedKey::F(4) => enigo::Key::F4,
            NamedKey::F(5) => enigo::Key::F5,
            NamedKey::F(6) => enigo::Key::F6,
            NamedKey::F(7) => enigo::Key::F7,
            NamedKey::F(8) => enigo::Key::F8,
            NamedKey::F(9) => enigo::Key::F9,
            NamedKey::F(10) => enigo::Key::F10,
            NamedKey::F(11) => enigo::Key::F11,
            NamedKey::F(12) => enigo::Key::F12,
            // Not available on every platform
            NamedKey::Insert | NamedKey::F(_) => return None,
        };
        Some(key)
    }

    fn modifier_keys(modifiers: Modifiers) -> Vec<enigo::Key> {
        let mut keys = Vec::new();
        if modifiers.contains(Modifiers::CONTROL) {
            keys.push(enigo::Key::Control);
        }
        if modifiers.contains(Modifiers::ALT) {
            keys.push(enigo::Key::Alt);
        }
        if modifiers.contains(Modifiers::SUPER) {
            keys.push(enigo::Key::Meta);
        }
        if modifiers.contains(Modifiers::SHIFT) {
            keys.push(enigo::Key::Shift);
        }
        keys
    }

    impl KeyboardSink {
        pub fn new(key_delay: Duration) -> Result<Self, TypingError> {
            let enigo = Enigo::new(&Settings::default()).map_err(|e| {
                TypingError::Keyboard(format!("failed to initialize enigo: {}", e))
            })?;
            Ok(Self { enigo, key_delay })
        }

        fn text(&mut self, text: &str) -> Result<(), TypingError> {
            self.enigo
                .text(text)
                .map_err(|e| TypingError::Keyboard(format!("failed to type text: {}", e)))
        }

        fn send_key(&mut self, key: enigo::Key) -> Result<(), TypingError> {
            self.enigo
                .key(key, Direction::Click)
                .map_err(|e| TypingError::Keyboard(format!("failed to send key: {}", e)))
        }

        /// Press modifiers, click the key, release in reverse order
        fn send_key_combo(
            &mut self,
            modifiers: &[enigo::Key],
            key: enigo::Key,
        ) -> Result<(), TypingError> {
            for modifier in modifiers {
                self.enigo.key(*modifier, Direction::Press).map_err(|e| {
                    TypingError::Keyboard(format!("failed to press modifier: {}", e))
                })?;
            }

            // Give the modifier time to register
            thread::sleep(Duration::from_millis(10));
            let clicked = self.send_key(key);
            thread::sleep(Duration::from_millis(20));

            for modifier in modifiers.iter().rev() {
                self.enigo.key(*modifier, Direction::Release).map_err(|e| {
                    TypingError::Keyboard(format!("failed to release modifier: {}", e))
                })?;
            }
            clicked
        }

        fn send_token(&mut self, token: KeyToken) -> Result<(), TypingError> {
            let key = match token.key {
                Key::Char(c) => enigo::Key::Unicode(c),
                Key::Named(named) => match enigo_key(named) {
                    Some(key) => key,
                    None => {
                        warn!(key = %named, "key not supported on this platform");
                        return Ok(());
                    }
                },
            };
            if token.modifiers.is_empty() {
                self.send_key(key)
            } else {
                self.send_key_combo(&modifier_keys(token.modifiers), key)
            }
        }
    }

    impl KeySink for KeyboardSink {
        fn emit(&mut self, keys: &str) -> Result<(), TypingError> {
            let mut text = String::new();
            for token in tokenize(keys) {
                match token.key {
                    Key::Char(c) if token.is_plain() && self.key_delay.is_zero() => text.push(c),
                    _ => {
                        if !text.is_empty() {
                            self.text(&std::mem::take(&mut text))?;
                        }
                        self.send_token(token)?;
                        if !self.key_delay.is_zero() {
                            thread::sleep(self.key_delay);
                        }
                    }
                }
            }
            if !text.is_empty() {
                self.text(&text)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_sink_applies_backspace_and_return() {
        let mut screen = ScreenSink::new();
        screen.emit("foo_bar").unwrap();
        screen.emit("<BS><BS><BS><BS>").unwrap();
        screen.emit("<Return>x<Tab>").unwrap();
        assert_eq!(screen.text(), "foo\nx\t");
        assert_eq!(screen.emissions().len(), 3);
        assert_eq!(screen.keys(), "foo_bar<BS><BS><BS><BS><Return>x<Tab>");
    }

    #[test]
    fn test_screen_sink_chords_leave_no_text() {
        let mut screen = ScreenSink::new();
        screen.emit("a<C-s><Up><lt>").unwrap();
        assert_eq!(screen.text(), "a<");
    }

    #[test]
    fn test_print_sink_writes_keys() {
        let mut sink = PrintSink::new(Vec::new());
        sink.emit("x + y").unwrap();
        sink.emit("<Return>").unwrap();
        assert_eq!(sink.into_inner(), b"x + y<Return>".to_vec());
    }

    #[test]
    fn test_sink_by_reference() {
        fn type_into(mut sink: impl KeySink) {
            sink.emit("hi").unwrap();
        }
        let mut screen = ScreenSink::new();
        type_into(&mut screen);
        assert_eq!(screen.text(), "hi");
    }
}
