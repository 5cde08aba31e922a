//! Key-token grammar shared by the core and every key sink
//!
//! The core never talks to the keyboard directly. It emits strings made of
//! literal characters interleaved with bracketed tokens:
//!
//! - Named keys: `<Esc>`, `<BS>`, `<Tab>`, `<Return>`, `<Up>`, `<Down>`,
//!   `<Left>`, `<Right>`, `<Home>`, `<End>`, `<PageUp>`, `<PageDown>`,
//!   `<Insert>`, `<Del>`, `<F1>` .. `<F12>`
//! - Chords: `<C-x>`, `<A-x>`, `<Mod4-x>`, `<S-Tab>` and combinations written
//!   in the order `C-`, `A-`, `Mod4-`, `S-` (`<C-A-x>`, `<C-Tab>`)
//! - `<lt>`: a literal `<`, only written where a plain `<` would otherwise
//!   be read as the start of a token
//!
//! Decoding is left to right, taking the longest bracket token at each
//! position and falling back to a single literal character.

use bitflags::bitflags;
use std::fmt;
use std::sync::OnceLock;

bitflags! {
    /// Modifier keys held while a key is tapped
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2;
        /// The "windows" / super / command key
        const SUPER = 1 << 3;
    }
}

/// Written order of modifier prefixes inside a token
const MODIFIER_PREFIXES: [(&str, Modifiers); 4] = [
    ("C-", Modifiers::CONTROL),
    ("A-", Modifiers::ALT),
    ("Mod4-", Modifiers::SUPER),
    ("S-", Modifiers::SHIFT),
];

const LITERAL_LT: &str = "lt";

/// Longest possible bracket token, `<C-A-Mod4-S-PageDown>`
const MAX_TOKEN_LEN: usize = 22;

/// Keys that have a bracket name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Escape,
    Backspace,
    Tab,
    Return,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    /// Function keys 1..=12
    F(u8),
}

/// Terminal escape sequences and the key each one stands for.
/// The first entry for a key is the one we send when re-encoding.
const ESCAPE_SEQUENCES: &[(&str, NamedKey)] = &[
    ("\x1b", NamedKey::Escape),
    ("\x1b[A", NamedKey::Up),
    ("\x1b[B", NamedKey::Down),
    ("\x1b[C", NamedKey::Right),
    ("\x1b[D", NamedKey::Left),
    ("\x1b[H", NamedKey::Home),
    ("\x1b[F", NamedKey::End),
    ("\x1bOH", NamedKey::Home),
    ("\x1bOF", NamedKey::End),
    ("\x1b[1~", NamedKey::Home),
    ("\x1b[4~", NamedKey::End),
    ("\x1b[2~", NamedKey::Insert),
    ("\x1b[3~", NamedKey::Delete),
    ("\x1b[5~", NamedKey::PageUp),
    ("\x1b[6~", NamedKey::PageDown),
    ("\x1bOP", NamedKey::F(1)),
    ("\x1bOQ", NamedKey::F(2)),
    ("\x1bOR", NamedKey::F(3)),
    ("\x1bOS", NamedKey::F(4)),
    ("\x1b[11~", NamedKey::F(1)),
    ("\x1b[12~", NamedKey::F(2)),
    ("\x1b[13~", NamedKey::F(3)),
    ("\x1b[14~", NamedKey::F(4)),
    ("\x1b[15~", NamedKey::F(5)),
    ("\x1b[17~", NamedKey::F(6)),
    ("\x1b[18~", NamedKey::F(7)),
    ("\x1b[19~", NamedKey::F(8)),
    ("\x1b[20~", NamedKey::F(9)),
    ("\x1b[21~", NamedKey::F(10)),
    ("\x1b[23~", NamedKey::F(11)),
    ("\x1b[24~", NamedKey::F(12)),
];

impl NamedKey {
    /// Every named key, function keys included
    pub fn all() -> impl Iterator<Item = NamedKey> {
        [
            NamedKey::Escape,
            NamedKey::Backspace,
            NamedKey::Tab,
            NamedKey::Return,
            NamedKey::Up,
            NamedKey::Down,
            NamedKey::Left,
            NamedKey::Right,
            NamedKey::Home,
            NamedKey::End,
            NamedKey::PageUp,
            NamedKey::PageDown,
            NamedKey::Insert,
            NamedKey::Delete,
        ]
        .into_iter()
        .chain((1..=12).map(NamedKey::F))
    }

    /// Key for a complete terminal escape sequence
    pub fn from_escape(sequence: &str) -> Option<NamedKey> {
        ESCAPE_SEQUENCES
            .iter()
            .find(|(seq, _)| *seq == sequence)
            .map(|(_, key)| *key)
    }

    /// Escape sequence a terminal would send for this key, if any
    pub fn escape_sequence(self) -> Option<&'static str> {
        ESCAPE_SEQUENCES
            .iter()
            .find(|(_, key)| *key == self)
            .map(|(seq, _)| *seq)
    }
}

impl fmt::Display for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamedKey::Escape => write!(f, "Esc"),
            NamedKey::Backspace => write!(f, "BS"),
            NamedKey::Tab => write!(f, "Tab"),
            NamedKey::Return => write!(f, "Return"),
            NamedKey::Up => write!(f, "Up"),
            NamedKey::Down => write!(f, "Down"),
            NamedKey::Left => write!(f, "Left"),
            NamedKey::Right => write!(f, "Right"),
            NamedKey::Home => write!(f, "Home"),
            NamedKey::End => write!(f, "End"),
            NamedKey::PageUp => write!(f, "PageUp"),
            NamedKey::PageDown => write!(f, "PageDown"),
            NamedKey::Insert => write!(f, "Insert"),
            NamedKey::Delete => write!(f, "Del"),
            NamedKey::F(n) => write!(f, "F{}", n),
        }
    }
}

/// Key names sorted longest first, so `F12` wins over `F1`
fn names_longest_first() -> &'static [(String, NamedKey)] {
    static NAMES: OnceLock<Vec<(String, NamedKey)>> = OnceLock::new();
    NAMES.get_or_init(|| {
        let mut names: Vec<(String, NamedKey)> =
            NamedKey::all().map(|key| (key.to_string(), key)).collect();
        names.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        names
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Named(NamedKey),
}

/// One tap of a key, possibly with modifiers held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyToken {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl KeyToken {
    pub fn plain(c: char) -> Self {
        Self {
            modifiers: Modifiers::empty(),
            key: Key::Char(c),
        }
    }

    pub fn named(key: NamedKey) -> Self {
        Self {
            modifiers: Modifiers::empty(),
            key: Key::Named(key),
        }
    }

    /// A character typed without modifiers
    pub fn is_plain(&self) -> bool {
        self.modifiers.is_empty() && matches!(self.key, Key::Char(_))
    }

    pub fn is_space(&self) -> bool {
        self.modifiers.is_empty() && self.key == Key::Char(' ')
    }

    /// Add modifiers. Shift on a character becomes the uppercase character.
    pub fn with_modifiers(self, extra: Modifiers) -> Self {
        let mut modifiers = self.modifiers | extra;
        let key = match self.key {
            Key::Char(c) if modifiers.contains(Modifiers::SHIFT) => {
                modifiers.remove(Modifiers::SHIFT);
                Key::Char(c.to_uppercase().next().unwrap_or(c))
            }
            key => key,
        };
        Self { modifiers, key }
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            return match self.key {
                Key::Char(c) => write!(f, "{}", c),
                Key::Named(key) => write!(f, "<{}>", key),
            };
        }
        write!(f, "<")?;
        for (prefix, flag) in MODIFIER_PREFIXES {
            if self.modifiers.contains(flag) {
                write!(f, "{}", prefix)?;
            }
        }
        match self.key {
            Key::Char(c) => write!(f, "{}>", c),
            Key::Named(key) => write!(f, "{}>", key),
        }
    }
}

/// Tokens for literal text, one plain key per character
pub fn plain_text(text: &str) -> Vec<KeyToken> {
    text.chars().map(KeyToken::plain).collect()
}

/// Try to read one bracket token at the start of `s` (which starts with `<`).
/// Returns the token and the number of bytes it spans.
fn parse_bracket(s: &str) -> Option<(KeyToken, usize)> {
    let mut rest = s.strip_prefix('<')?;
    let mut modifiers = Modifiers::empty();
    for (prefix, flag) in MODIFIER_PREFIXES {
        if let Some(after) = rest.strip_prefix(prefix) {
            modifiers |= flag;
            rest = after;
        }
    }
    let prefix_len = s.len() - rest.len();

    if modifiers.is_empty() {
        if let Some(after) = rest.strip_prefix(LITERAL_LT) {
            if after.starts_with('>') {
                return Some((KeyToken::plain('<'), prefix_len + LITERAL_LT.len() + 1));
            }
        }
    }

    for (name, key) in names_longest_first() {
        if let Some(after) = rest.strip_prefix(name.as_str()) {
            if after.starts_with('>') {
                let token = KeyToken {
                    modifiers,
                    key: Key::Named(*key),
                };
                return Some((token, prefix_len + name.len() + 1));
            }
        }
    }

    if modifiers.is_empty() {
        return None;
    }
    let c = rest.chars().next()?;
    if !rest[c.len_utf8()..].starts_with('>') {
        return None;
    }
    let token = KeyToken::plain(c).with_modifiers(modifiers);
    Some((token, prefix_len + c.len_utf8() + 1))
}

/// Decode a key string into taps
pub fn tokenize(keys: &str) -> Vec<KeyToken> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < keys.len() {
        let rest = &keys[pos..];
        if rest.starts_with('<') {
            if let Some((token, len)) = parse_bracket(rest) {
                tokens.push(token);
                pos += len;
                continue;
            }
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        tokens.push(KeyToken::plain(c));
        pos += c.len_utf8();
    }
    tokens
}

/// Encode taps so that [`tokenize`] gives them back
pub fn encode(tokens: &[KeyToken]) -> String {
    let pieces: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    let mut out = String::new();
    for (i, piece) in pieces.iter().enumerate() {
        if tokens[i] == KeyToken::plain('<') {
            let mut ahead = String::from("<");
            for next in &pieces[i + 1..] {
                if ahead.len() > MAX_TOKEN_LEN {
                    break;
                }
                ahead.push_str(next);
            }
            if parse_bracket(&ahead).is_some() {
                out.push('<');
                out.push_str(LITERAL_LT);
                out.push('>');
                continue;
            }
        }
        out.push_str(piece);
    }
    out
}

/// Number of key taps a key string produces
pub fn key_count(keys: &str) -> usize {
    tokenize(keys).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        let tokens = tokenize(" + ");
        assert_eq!(tokens, plain_text(" + "));
        assert_eq!(key_count(" += "), 4);
    }

    #[test]
    fn test_every_named_key_decodes() {
        for key in NamedKey::all() {
            let text = format!("<{}>", key);
            assert_eq!(tokenize(&text), vec![KeyToken::named(key)], "{}", text);
        }
    }

    #[test]
    fn test_longest_function_key_wins() {
        assert_eq!(tokenize("<F12>"), vec![KeyToken::named(NamedKey::F(12))]);
        assert_eq!(tokenize("<F1>2"), vec![
            KeyToken::named(NamedKey::F(1)),
            KeyToken::plain('2')
        ]);
    }

    #[test]
    fn test_chords() {
        let ctrl_x = tokenize("<C-x>");
        assert_eq!(ctrl_x.len(), 1);
        assert_eq!(ctrl_x[0].modifiers, Modifiers::CONTROL);
        assert_eq!(ctrl_x[0].key, Key::Char('x'));

        let alt_one = tokenize("<A-1>");
        assert_eq!(alt_one[0].modifiers, Modifiers::ALT);
        assert_eq!(alt_one[0].key, Key::Char('1'));

        let win = tokenize("<Mod4-e>");
        assert_eq!(win[0].modifiers, Modifiers::SUPER);

        let combo = tokenize("<C-A-Del>");
        assert_eq!(combo[0].modifiers, Modifiers::CONTROL | Modifiers::ALT);
        assert_eq!(combo[0].key, Key::Named(NamedKey::Delete));
    }

    #[test]
    fn test_unrecognised_brackets_are_literal() {
        assert_eq!(tokenize("<Foo>"), plain_text("<Foo>"));
        assert_eq!(tokenize(" < "), plain_text(" < "));
        assert_eq!(tokenize("<C-"), plain_text("<C-"));
        assert_eq!(tokenize("<x>"), plain_text("<x>"));
    }

    #[test]
    fn test_mixed_stream() {
        let tokens = tokenize("ab<Esc>:w<Return>");
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[2], KeyToken::named(NamedKey::Escape));
        assert_eq!(tokens[5], KeyToken::named(NamedKey::Return));
    }

    #[test]
    fn test_shift_uppercases_characters() {
        let token = KeyToken::plain('f').with_modifiers(Modifiers::SHIFT);
        assert_eq!(token, KeyToken::plain('F'));
        assert!(token.is_plain());

        let tab = KeyToken::named(NamedKey::Tab).with_modifiers(Modifiers::SHIFT);
        assert_eq!(tab.to_string(), "<S-Tab>");
    }

    #[test]
    fn test_encode_writes_chords_in_fixed_order() {
        let token = KeyToken::plain('x').with_modifiers(Modifiers::ALT | Modifiers::CONTROL);
        assert_eq!(encode(&[token]), "<C-A-x>");
        let token = KeyToken::named(NamedKey::Tab).with_modifiers(Modifiers::CONTROL);
        assert_eq!(encode(&[token]), "<C-Tab>");
    }

    #[test]
    fn test_literal_lt_escaped_only_when_ambiguous() {
        assert_eq!(encode(&plain_text(" < ")), " < ");
        assert_eq!(encode(&plain_text("a<=b")), "a<=b");

        let ambiguous = plain_text("<Tab>");
        let encoded = encode(&ambiguous);
        assert_eq!(encoded, "<lt>Tab>");
        assert_eq!(tokenize(&encoded), ambiguous);
    }

    #[test]
    fn test_escape_sequences() {
        assert_eq!(NamedKey::from_escape("\x1b[A"), Some(NamedKey::Up));
        assert_eq!(NamedKey::from_escape("\x1b[15~"), Some(NamedKey::F(5)));
        assert_eq!(NamedKey::from_escape("\x1b"), Some(NamedKey::Escape));
        assert_eq!(NamedKey::from_escape("\x1b[200~"), None);
        assert_eq!(NamedKey::Home.escape_sequence(), Some("\x1b[H"));
        assert_eq!(NamedKey::Tab.escape_sequence(), None);
    }
}
