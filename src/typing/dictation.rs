//! Dictation: words go through nearly as spoken

use super::fragment::{Fragment, FragmentKind};
use super::keys::{KeyToken, NamedKey, encode, plain_text};
use tracing::warn;

#[derive(Debug, Default)]
pub struct DictationMode {
    capitalize_next: bool,
}

impl DictationMode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entering dictation capitalises the first word
    pub fn switch_to(&mut self) {
        self.capitalize_next = true;
    }

    /// Key string for one fragment, if it types anything
    pub fn handle(&mut self, fragment: &Fragment) -> Option<String> {
        match fragment.kind() {
            // Nothing typed yet since the switch
            FragmentKind::Space if self.capitalize_next => None,
            FragmentKind::Space => Some(" ".to_string()),
            FragmentKind::Newline => Some(KeyToken::named(NamedKey::Return).to_string()),
            FragmentKind::Escape => match NamedKey::from_escape(fragment.as_str()) {
                Some(key) => Some(KeyToken::named(key).to_string()),
                None => {
                    warn!(?fragment, "unknown escape sequence dropped");
                    None
                }
            },
            FragmentKind::Word if fragment.is_empty() => None,
            FragmentKind::Word => {
                let word = fragment.as_str();
                let text = if std::mem::take(&mut self.capitalize_next) {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(c) => c.to_uppercase().chain(chars).collect(),
                        None => String::new(),
                    }
                } else {
                    word.to_string()
                };
                Some(encode(&plain_text(&text)))
            }
        }
    }
}
