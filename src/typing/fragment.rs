//! Fragments and the pushback queue in front of the fragment source
//!
//! A fragment is one unit of dictated input: a word, a single space, a
//! newline or a terminal escape sequence. The kind is read from the content.
//! Parsers peek ahead through [`FragmentQueue`] and push back whatever they
//! did not consume, so the next reader sees the original order.

use std::fmt;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Space,
    Newline,
    /// Starts with ESC
    Escape,
    Word,
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fragment(String);

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn space() -> Self {
        Self(" ".to_string())
    }

    pub fn newline() -> Self {
        Self("\n".to_string())
    }

    pub fn kind(&self) -> FragmentKind {
        match self.0.as_str() {
            " " => FragmentKind::Space,
            "\n" => FragmentKind::Newline,
            s if s.starts_with('\x1b') => FragmentKind::Escape,
            _ => FragmentKind::Word,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fragment {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Fragment {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Producer of fragments. Blocks until one is available; `None` means the
/// source is exhausted and will never produce again.
pub trait FragmentSource {
    fn next_fragment(&mut self) -> Option<Fragment>;
}

impl<I> FragmentSource for I
where
    I: Iterator<Item = Fragment>,
{
    fn next_fragment(&mut self) -> Option<Fragment> {
        self.next()
    }
}

/// Pushback buffer in front of a [`FragmentSource`]
pub struct FragmentQueue {
    source: Box<dyn FragmentSource>,
    /// Most recently pushed back is read first
    pushed_back: Vec<Fragment>,
}

impl FragmentQueue {
    pub fn new(source: impl FragmentSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            pushed_back: Vec::new(),
        }
    }

    /// Queue over a fixed list of fragments
    pub fn from_fragments(fragments: Vec<Fragment>) -> Self {
        Self::new(fragments.into_iter())
    }

    pub fn next_fragment(&mut self) -> Option<Fragment> {
        if let Some(fragment) = self.pushed_back.pop() {
            return Some(fragment);
        }
        self.source.next_fragment()
    }

    pub fn push_back(&mut self, fragment: Fragment) {
        trace!(?fragment, depth = self.pushed_back.len() + 1, "push back");
        self.pushed_back.push(fragment);
    }

    /// Fragments waiting in the pushback buffer
    pub fn pending(&self) -> usize {
        self.pushed_back.len()
    }
}
