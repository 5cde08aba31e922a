//! Raw-mode terminal input for the live fragment source
//!
//! The speech engine types into this terminal. Key events are turned back
//! into the characters (and escape sequences) a cooked terminal would have
//! delivered, then fed to the segmenter over a channel.

use crate::segmenter::StreamSource;
use crate::typing::NamedKey;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use flume::Sender;
use std::io;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Raw mode for as long as this is alive
pub struct RawTerminal;

impl RawTerminal {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[derive(Debug, PartialEq)]
enum TerminalInput {
    Text(String),
    Quit,
    Ignored,
}

fn translate_key(key: KeyEvent) -> TerminalInput {
    if key.kind != KeyEventKind::Press {
        return TerminalInput::Ignored;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return TerminalInput::Quit;
    }

    let named = match key.code {
        KeyCode::Char(c) => return TerminalInput::Text(c.to_string()),
        KeyCode::Enter => return TerminalInput::Text("\n".to_string()),
        KeyCode::Tab => return TerminalInput::Text("\t".to_string()),
        KeyCode::Esc => NamedKey::Escape,
        KeyCode::Up => NamedKey::Up,
        KeyCode::Down => NamedKey::Down,
        KeyCode::Left => NamedKey::Left,
        KeyCode::Right => NamedKey::Right,
        KeyCode::Home => NamedKey::Home,
        KeyCode::End => NamedKey::End,
        KeyCode::PageUp => NamedKey::PageUp,
        KeyCode::PageDown => NamedKey::PageDown,
        KeyCode::Insert => NamedKey::Insert,
        KeyCode::Delete => NamedKey::Delete,
        KeyCode::F(n) => NamedKey::F(n),
        _ => return TerminalInput::Ignored,
    };
    match named.escape_sequence() {
        Some(seq) => TerminalInput::Text(seq.to_string()),
        None => TerminalInput::Ignored,
    }
}

/// Read terminal key events on a background thread until Ctrl+C
pub fn spawn_terminal_reader(tx: Sender<char>) {
    thread::spawn(move || {
        loop {
            let event = match event::read() {
                Ok(event) => event,
                Err(e) => {
                    warn!("terminal read failed: {}", e);
                    break;
                }
            };
            let Event::Key(key) = event else {
                continue;
            };
            match translate_key(key) {
                TerminalInput::Text(text) => {
                    for ch in text.chars() {
                        if tx.send(ch).is_err() {
                            return;
                        }
                    }
                }
                TerminalInput::Quit => {
                    debug!("ctrl+c, closing input");
                    break;
                }
                TerminalInput::Ignored => {}
            }
        }
    });
}

/// Live source over the terminal. Keep the returned guard alive while reading.
pub fn terminal_source(word_timeout: Duration) -> io::Result<(StreamSource, RawTerminal)> {
    let guard = RawTerminal::enable()?;
    let (tx, rx) = flume::unbounded();
    spawn_terminal_reader(tx);
    Ok((StreamSource::new(rx, word_timeout), guard))
}
