//! Word segmentation of a live character stream
//!
//! The speech engine types recognised words into our terminal one character
//! at a time. [`Segmenter`] turns those characters into fragments: a word
//! ends at whitespace (which becomes its own fragment), at a newline, or when
//! the word timeout in [`StreamSource`] runs out. Escape sequences from
//! special keys come through as a single fragment.

use crate::typing::Fragment;
use flume::{Receiver, RecvTimeoutError, Sender};
use std::collections::VecDeque;
use std::io::Read;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const ESC: char = '\x1b';

/// Longest escape sequence we wait for before giving up on it
const MAX_ESCAPE_LEN: usize = 8;

#[derive(Debug, PartialEq)]
enum EscapeState {
    Partial,
    Complete,
    Invalid,
}

/// Classify a sequence that starts with ESC
fn classify_escape(seq: &str) -> EscapeState {
    let body: Vec<char> = seq.chars().skip(1).collect();
    match body.as_slice() {
        [] => EscapeState::Partial,
        ['O'] | ['['] => EscapeState::Partial,
        ['O', 'P' | 'Q' | 'R' | 'S' | 'H' | 'F'] => EscapeState::Complete,
        ['O', ..] => EscapeState::Invalid,
        ['[', 'A' | 'B' | 'C' | 'D' | 'H' | 'F'] => EscapeState::Complete,
        ['[', params @ ..] => {
            let (last, digits) = match params.split_last() {
                Some(split) => split,
                None => return EscapeState::Partial,
            };
            if !digits.iter().all(|c| c.is_ascii_digit() || *c == ';') {
                return EscapeState::Invalid;
            }
            if *last == '~' && !digits.is_empty() {
                EscapeState::Complete
            } else if (last.is_ascii_digit() || *last == ';') && seq.len() < MAX_ESCAPE_LEN {
                EscapeState::Partial
            } else {
                EscapeState::Invalid
            }
        }
        _ => EscapeState::Invalid,
    }
}

/// Character to fragment state machine, no timing
#[derive(Debug, Default)]
pub struct Segmenter {
    word: String,
    escape: Option<String>,
}

impl Segmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nothing buffered
    pub fn is_idle(&self) -> bool {
        self.word.is_empty() && self.escape.is_none()
    }

    /// Feed one character, returning the fragments it completes
    pub fn push(&mut self, ch: char) -> Vec<Fragment> {
        let mut out = Vec::new();

        if let Some(mut seq) = self.escape.take() {
            seq.push(ch);
            match classify_escape(&seq) {
                EscapeState::Partial => {
                    self.escape = Some(seq);
                    return out;
                }
                EscapeState::Complete => {
                    out.push(Fragment::new(seq));
                    return out;
                }
                EscapeState::Invalid => {
                    // A bare Escape, the rest is ordinary input
                    out.push(Fragment::new(ESC.to_string()));
                    for c in seq[ESC.len_utf8()..].chars() {
                        out.extend(self.push(c));
                    }
                    return out;
                }
            }
        }

        match ch {
            ESC => {
                self.take_word(&mut out);
                self.escape = Some(ESC.to_string());
            }
            '\r' | '\n' => {
                self.take_word(&mut out);
                out.push(Fragment::newline());
            }
            ' ' | '\t' => {
                self.take_word(&mut out);
                out.push(Fragment::space());
            }
            c => self.word.push(c),
        }
        out
    }

    /// Emit whatever is buffered, used when the word timeout expires.
    /// An unfinished escape sequence is a bare Escape followed by text.
    pub fn flush(&mut self) -> Vec<Fragment> {
        let mut out = Vec::new();
        if let Some(seq) = self.escape.take() {
            out.push(Fragment::new(ESC.to_string()));
            self.word.push_str(&seq[ESC.len_utf8()..]);
        }
        self.take_word(&mut out);
        out
    }

    fn take_word(&mut self, out: &mut Vec<Fragment>) {
        if !self.word.is_empty() {
            out.push(Fragment::new(std::mem::take(&mut self.word)));
        }
    }

    /// Segment a whole string at once, ignoring timing
    pub fn segment_str(text: &str) -> Vec<Fragment> {
        let mut segmenter = Self::new();
        let mut out: Vec<Fragment> = text.chars().flat_map(|c| segmenter.push(c)).collect();
        out.extend(segmenter.flush());
        out
    }
}

/// Fragment source over a channel of characters with a per-word timeout
///
/// The timeout is measured from the first character of the word: a speech
/// engine types a whole word in one burst, so a word still open after the
/// timeout is complete even if no separator followed it.
pub struct StreamSource {
    rx: Receiver<char>,
    segmenter: Segmenter,
    ready: VecDeque<Fragment>,
    word_timeout: Duration,
    word_started: Option<Instant>,
    finished: bool,
}

impl StreamSource {
    pub fn new(rx: Receiver<char>, word_timeout: Duration) -> Self {
        Self {
            rx,
            segmenter: Segmenter::new(),
            ready: VecDeque::new(),
            word_timeout,
            word_started: None,
            finished: false,
        }
    }

    /// Source fed by a reader thread over any byte stream
    pub fn from_reader<R: Read + Send + 'static>(reader: R, word_timeout: Duration) -> Self {
        let (tx, rx) = flume::unbounded();
        spawn_reader(reader, tx);
        Self::new(rx, word_timeout)
    }

    fn receive(&mut self) -> Result<char, RecvTimeoutError> {
        match self.word_started {
            None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(started) => {
                let deadline = started + self.word_timeout;
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(RecvTimeoutError::Timeout);
                }
                self.rx.recv_timeout(remaining)
            }
        }
    }
}

impl Iterator for StreamSource {
    type Item = Fragment;

    fn next(&mut self) -> Option<Fragment> {
        loop {
            if let Some(fragment) = self.ready.pop_front() {
                return Some(fragment);
            }
            if self.finished {
                return None;
            }

            match self.receive() {
                Ok(ch) => {
                    let done = self.segmenter.push(ch);
                    self.ready.extend(done);
                }
                Err(RecvTimeoutError::Timeout) => {
                    let flushed = self.segmenter.flush();
                    if !flushed.is_empty() {
                        debug!(?flushed, "word timeout");
                        self.ready.extend(flushed);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.ready.extend(self.segmenter.flush());
                    self.finished = true;
                }
            }

            if self.segmenter.is_idle() {
                self.word_started = None;
            } else if self.word_started.is_none() {
                self.word_started = Some(Instant::now());
            }
        }
    }
}

/// Decode UTF-8 from `reader` on a background thread and send characters.
/// The channel closes at end of input.
pub fn spawn_reader<R: Read + Send + 'static>(mut reader: R, tx: Sender<char>) {
    thread::spawn(move || {
        let mut buf = [0u8; 1024];
        let mut carry: Vec<u8> = Vec::new();
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("input read failed: {}", e);
                    break;
                }
            };
            carry.extend_from_slice(&buf[..n]);

            let checked = std::str::from_utf8(&carry)
                .map(|_| ())
                .map_err(|e| (e.valid_up_to(), e.error_len()));
            let valid = match checked {
                Ok(()) => carry.len(),
                // Incomplete character at the end, wait for the rest
                Err((valid_up_to, None)) => valid_up_to,
                Err((_, Some(_))) => {
                    warn!("replacing invalid UTF-8 input");
                    carry.len()
                }
            };
            let text = String::from_utf8_lossy(&carry[..valid]).into_owned();
            carry.drain(..valid);
            for ch in text.chars() {
                if tx.send(ch).is_err() {
                    return;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(fragments: &[Fragment]) -> Vec<&str> {
        fragments.iter().map(|f| f.as_str()).collect()
    }

    #[test]
    fn test_words_and_separators() {
        let fragments = Segmenter::segment_str("foo bar\nbaz");
        assert_eq!(texts(&fragments), vec!["foo", " ", "bar", "\n", "baz"]);
    }

    #[test]
    fn test_repeated_spaces_each_become_fragments() {
        let fragments = Segmenter::segment_str("a  b");
        assert_eq!(texts(&fragments), vec!["a", " ", " ", "b"]);
    }

    #[test]
    fn test_carriage_return_is_newline() {
        let fragments = Segmenter::segment_str("ok\r");
        assert_eq!(texts(&fragments), vec!["ok", "\n"]);
    }

    #[test]
    fn test_escape_sequences_are_atomic() {
        let fragments = Segmenter::segment_str("ab\x1b[Acd\x1b[15~");
        assert_eq!(texts(&fragments), vec!["ab", "\x1b[A", "cd", "\x1b[15~"]);

        let fragments = Segmenter::segment_str("\x1bOP");
        assert_eq!(texts(&fragments), vec!["\x1bOP"]);
    }

    #[test]
    fn test_bare_escape_followed_by_text() {
        let fragments = Segmenter::segment_str("\x1bx");
        assert_eq!(texts(&fragments), vec!["\x1b", "x"]);
    }

    #[test]
    fn test_flush_partial_word_and_escape() {
        let mut segmenter = Segmenter::new();
        assert!(segmenter.push('h').is_empty());
        assert!(segmenter.push('i').is_empty());
        assert!(!segmenter.is_idle());
        assert_eq!(segmenter.flush(), vec![Fragment::from("hi")]);
        assert!(segmenter.is_idle());
        assert!(segmenter.flush().is_empty());

        assert!(segmenter.push(ESC).is_empty());
        assert_eq!(segmenter.flush(), vec![Fragment::from("\x1b")]);

        assert!(segmenter.push(ESC).is_empty());
        assert!(segmenter.push('[').is_empty());
        assert!(segmenter.push('1').is_empty());
        assert_eq!(
            segmenter.flush(),
            vec![Fragment::from("\x1b"), Fragment::from("[1")]
        );
        assert!(segmenter.is_idle());
    }

    #[test]
    fn test_invalid_escape_prefix_keeps_following_text() {
        assert_eq!(texts(&Segmenter::segment_str("\x1bOK")), vec!["\x1b", "OK"]);
        assert_eq!(texts(&Segmenter::segment_str("\x1b[x")), vec!["\x1b", "[x"]);
        assert_eq!(
            texts(&Segmenter::segment_str("\x1b[12x ok")),
            vec!["\x1b", "[12x", " ", "ok"]
        );
        assert_eq!(
            texts(&Segmenter::segment_str("\x1b\x1b[A")),
            vec!["\x1b", "\x1b[A"]
        );
    }

    #[test]
    fn test_classify_escape() {
        assert_eq!(classify_escape("\x1b"), EscapeState::Partial);
        assert_eq!(classify_escape("\x1b["), EscapeState::Partial);
        assert_eq!(classify_escape("\x1b[2"), EscapeState::Partial);
        assert_eq!(classify_escape("\x1b[24~"), EscapeState::Complete);
        assert_eq!(classify_escape("\x1b[~"), EscapeState::Invalid);
        assert_eq!(classify_escape("\x1bz"), EscapeState::Invalid);
        assert_eq!(classify_escape("\x1b[1;5"), EscapeState::Partial);
    }

    #[test]
    fn test_stream_source_flushes_at_end_of_input() {
        let source = StreamSource::from_reader("camel foo".as_bytes(), Duration::from_secs(5));
        let fragments: Vec<Fragment> = source.collect();
        assert_eq!(texts(&fragments), vec!["camel", " ", "foo"]);
    }

    #[test]
    fn test_stream_source_word_timeout() {
        let (tx, rx) = flume::unbounded();
        let mut source = StreamSource::new(rx, Duration::from_millis(20));
        tx.send('h').unwrap();
        tx.send('i').unwrap();
        // No separator follows, the timeout ends the word
        assert_eq!(source.next(), Some(Fragment::from("hi")));
        tx.send(' ').unwrap();
        assert_eq!(source.next(), Some(Fragment::space()));
        drop(tx);
        assert_eq!(source.next(), None);
    }
}
