//! Spoken command phrases and the lookahead matcher
//!
//! Commands live in a tree keyed by lowercase words. A leaf is either keys
//! to type or an action for the entry engine; a branch means the word is the
//! start of a longer phrase ("divided" → "by"). Matching a branch peeks the
//! following space and word from the fragment queue and pushes them back if
//! the phrase does not complete, so ordinary word handling sees the input
//! exactly as it arrived.

use super::fragment::{FragmentKind, FragmentQueue};
use super::keys::Modifiers;
use super::modes::EntryMode;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// NATO alphabet, each word types its initial letter
pub const ALPHABET: [&str; 26] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
    "kilo", "lima", "mike", "november", "oscar", "papa", "quebec", "romeo", "sierra", "tango",
    "uniform", "victor", "whiskey", "x-ray", "yankee", "zebra",
];

/// Number words usable as the target of a key chord
pub const NUMBER_WORDS: [(&str, char); 11] = [
    ("zero", '0'),
    ("one", '1'),
    ("two", '2'),
    ("three", '3'),
    ("four", '4'),
    ("five", '5'),
    ("six", '6'),
    ("seven", '7'),
    ("eight", '8'),
    ("nine", '9'),
    ("ten", '0'),
];

/// Operators and punctuation: phrase, keys
const SYMBOLS: &[(&str, &str)] = &[
    ("escape", "<Esc>"),
    ("backspace", "<BS>"),
    ("tab", "<Tab>"),
    ("quote", "\""),
    ("apostrophe", "'"),
    ("backtick", "`"),
    ("dot", "."),
    ("tick", ","),
    ("colon", ":"),
    ("clause", ";"),
    ("bracket", "("),
    ("unbracket", ")"),
    ("index", "["),
    ("unindex", "]"),
    ("brace", "{"),
    ("unbrace", "}"),
    ("hashtag", "#"),
    ("dollar", "$"),
    ("percent", "%"),
    ("ampersand", "&"),
    ("star", "*"),
    ("slash", "/"),
    ("backslash", "\\"),
    ("pipe", "|"),
    ("question", "?"),
    ("exclamation", "!"),
    ("underscore", "_"),
    ("curly at", "@"),
    ("curly thing", "~"),
    ("plus", " + "),
    ("minus", " - "),
    ("times", " * "),
    ("divided by", " / "),
    ("equals", " = "),
    ("plus equals", " += "),
    ("minus equals", " -= "),
    ("not equals", " != "),
    ("double equals", " == "),
    ("triple equals", " === "),
    ("triple not equals", " !== "),
    ("greater than", " > "),
    ("greater equals", " >= "),
    ("less than", " < "),
    ("less equals", " <= "),
    // Dragon turns "logical and" / "logical or" into these
    ("&&", " && "),
    ("||", " || "),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandTreeError {
    #[error("empty command phrase")]
    Empty,
    #[error("command phrase {0:?} is defined twice")]
    Duplicate(String),
}

/// What a matched phrase does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<A> {
    Keys(String),
    Action(A),
}

impl<A> Command<A> {
    fn into_node(self) -> CommandNode<A> {
        match self {
            Command::Keys(keys) => CommandNode::Literal(keys),
            Command::Action(action) => CommandNode::Action(action),
        }
    }

    fn as_matched(&self) -> Matched<'_, A> {
        match self {
            Command::Keys(keys) => Matched::Keys(keys),
            Command::Action(action) => Matched::Action(action),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CommandNode<A> {
    Literal(String),
    Action(A),
    /// Needs one more word after a space
    Branch(CommandTree<A>),
}

/// Result of a successful match, borrowed from the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matched<'a, A> {
    Keys(&'a str),
    Action(&'a A),
}

#[derive(Debug, Clone)]
pub struct CommandTree<A> {
    children: HashMap<String, CommandNode<A>>,
    /// Meaning of the prefix word alone when no continuation matches
    standalone: Option<Command<A>>,
}

impl<A> Default for CommandTree<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> CommandTree<A> {
    pub fn new() -> Self {
        Self {
            children: HashMap::new(),
            standalone: None,
        }
    }

    fn with_standalone(command: Command<A>) -> Self {
        Self {
            children: HashMap::new(),
            standalone: Some(command),
        }
    }

    /// Add a phrase of one or more words. A phrase may extend a shorter one
    /// ("plus" and "plus equals"); defining the same phrase twice is an error.
    pub fn insert(&mut self, phrase: &str, command: Command<A>) -> Result<(), CommandTreeError> {
        let words: Vec<String> = phrase.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() {
            return Err(CommandTreeError::Empty);
        }
        self.insert_path(&words, command, phrase)
    }

    fn insert_path(
        &mut self,
        words: &[String],
        command: Command<A>,
        phrase: &str,
    ) -> Result<(), CommandTreeError> {
        let Some((word, rest)) = words.split_first() else {
            return Err(CommandTreeError::Empty);
        };

        if rest.is_empty() {
            return match self.children.remove(word) {
                None => {
                    self.children.insert(word.clone(), command.into_node());
                    Ok(())
                }
                Some(CommandNode::Branch(mut next)) => {
                    let result = if next.standalone.is_some() {
                        Err(CommandTreeError::Duplicate(phrase.to_string()))
                    } else {
                        next.standalone = Some(command);
                        Ok(())
                    };
                    self.children.insert(word.clone(), CommandNode::Branch(next));
                    result
                }
                Some(leaf) => {
                    self.children.insert(word.clone(), leaf);
                    Err(CommandTreeError::Duplicate(phrase.to_string()))
                }
            };
        }

        let mut next = match self.children.remove(word) {
            None => CommandTree::new(),
            Some(CommandNode::Branch(next)) => next,
            Some(CommandNode::Literal(keys)) => CommandTree::with_standalone(Command::Keys(keys)),
            Some(CommandNode::Action(action)) => {
                CommandTree::with_standalone(Command::Action(action))
            }
        };
        let result = next.insert_path(rest, command, phrase);
        self.children.insert(word.clone(), CommandNode::Branch(next));
        result
    }

    /// Match `word` (already lower case), peeking further fragments for
    /// multi-word phrases. On failure every peeked fragment is back in the
    /// queue in its original order.
    pub fn match_phrase(&self, word: &str, queue: &mut FragmentQueue) -> Option<Matched<'_, A>> {
        match self.children.get(word)? {
            CommandNode::Literal(keys) => Some(Matched::Keys(keys)),
            CommandNode::Action(action) => Some(Matched::Action(action)),
            CommandNode::Branch(next) => next
                .match_continuation(queue)
                .or_else(|| next.standalone.as_ref().map(Command::as_matched)),
        }
    }

    fn match_continuation(&self, queue: &mut FragmentQueue) -> Option<Matched<'_, A>> {
        let space = queue.next_fragment()?;
        if space.kind() != FragmentKind::Space {
            queue.push_back(space);
            return None;
        }
        let Some(word) = queue.next_fragment() else {
            queue.push_back(space);
            return None;
        };

        let lowered = word.as_str().to_lowercase();
        if let Some(found) = self.match_phrase(&lowered, queue) {
            return Some(found);
        }
        queue.push_back(word);
        queue.push_back(space);
        None
    }

    /// Every phrase with what it does, sorted by phrase
    pub fn phrases(&self) -> Vec<(String, Matched<'_, A>)> {
        let mut out = Vec::new();
        self.collect_phrases("", &mut out);
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn collect_phrases<'a>(&'a self, prefix: &str, out: &mut Vec<(String, Matched<'a, A>)>) {
        if let Some(command) = &self.standalone {
            out.push((prefix.to_string(), command.as_matched()));
        }
        for (word, node) in &self.children {
            let phrase = if prefix.is_empty() {
                word.clone()
            } else {
                format!("{} {}", prefix, word)
            };
            match node {
                CommandNode::Branch(next) => next.collect_phrases(&phrase, out),
                CommandNode::Literal(keys) => out.push((phrase, Matched::Keys(keys))),
                CommandNode::Action(action) => out.push((phrase, Matched::Action(action))),
            }
        }
    }
}

impl<A: fmt::Display> fmt::Display for Matched<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matched::Keys(keys) => write!(f, "types {:?}", keys),
            Matched::Action(action) => write!(f, "{}", action),
        }
    }
}

/// Actions the entry engine performs for a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    /// Switch entry mode
    SetMode(EntryMode),
    /// Hold a modifier for the next key
    Modifier(Modifiers),
    /// Remove the last emitted word
    Undo,
    /// Remove the identifier being typed
    Junk,
    /// Type the next word even if it is a command
    EscapeNext,
    /// Change the default entry mode for a programming language
    Language(EntryMode),
}

impl fmt::Display for EditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditAction::SetMode(mode) => write!(f, "{} mode", mode),
            EditAction::Modifier(m) if *m == Modifiers::SHIFT => write!(f, "shift next key"),
            EditAction::Modifier(m) if *m == Modifiers::CONTROL => write!(f, "control next key"),
            EditAction::Modifier(m) if *m == Modifiers::ALT => write!(f, "alt next key"),
            EditAction::Modifier(_) => write!(f, "windows key next key"),
            EditAction::Undo => write!(f, "delete last word"),
            EditAction::Junk => write!(f, "delete current identifier"),
            EditAction::EscapeNext => write!(f, "type next word literally"),
            EditAction::Language(mode) => write!(f, "default to {} mode", mode),
        }
    }
}

impl CommandTree<EditAction> {
    /// The built-in code-entry vocabulary
    pub fn code_commands() -> Result<Self, CommandTreeError> {
        let mut tree = Self::new();

        for word in ALPHABET {
            let letter: String = word.chars().take(1).collect();
            tree.insert(word, Command::Keys(letter))?;
        }
        for (phrase, keys) in SYMBOLS {
            tree.insert(phrase, Command::Keys(keys.to_string()))?;
        }

        let modifiers = [
            ("big", Modifiers::SHIFT),
            ("control", Modifiers::CONTROL),
            ("alternate", Modifiers::ALT),
            ("windows key", Modifiers::SUPER),
        ];
        for (phrase, modifier) in modifiers {
            tree.insert(phrase, Command::Action(EditAction::Modifier(modifier)))?;
        }

        for mode in EntryMode::ALL {
            tree.insert(
                mode.command_word(),
                Command::Action(EditAction::SetMode(mode)),
            )?;
        }

        tree.insert("delete", Command::Action(EditAction::Undo))?;
        tree.insert("junk", Command::Action(EditAction::Junk))?;
        tree.insert("literal", Command::Action(EditAction::EscapeNext))?;

        let languages = [
            ("python", EntryMode::Underscore),
            ("pie", EntryMode::Underscore),
            ("javascript", EntryMode::Camel),
            ("plain", EntryMode::Spell),
        ];
        for (name, mode) in languages {
            tree.insert(
                &format!("language {}", name),
                Command::Action(EditAction::Language(mode)),
            )?;
        }

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typing::Fragment;

    fn queue(items: &[&str]) -> FragmentQueue {
        FragmentQueue::from_fragments(items.iter().map(|s| Fragment::from(*s)).collect())
    }

    fn drain(queue: &mut FragmentQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.next_fragment())
            .map(Fragment::into_string)
            .collect()
    }

    fn operators() -> CommandTree<EditAction> {
        let mut tree = CommandTree::new();
        tree.insert("divided by", Command::Keys(" / ".into())).unwrap();
        tree.insert("plus", Command::Keys(" + ".into())).unwrap();
        tree.insert("plus equals", Command::Keys(" += ".into())).unwrap();
        tree.insert("triple not equals", Command::Keys(" !== ".into()))
            .unwrap();
        tree.insert("junk", Command::Action(EditAction::Junk)).unwrap();
        tree
    }

    #[test]
    fn test_single_word_literal_and_action() {
        let tree = operators();
        let mut q = queue(&[]);
        assert_eq!(tree.match_phrase("plus", &mut q), Some(Matched::Keys(" + ")));
        assert_eq!(
            tree.match_phrase("junk", &mut q),
            Some(Matched::Action(&EditAction::Junk))
        );
        assert_eq!(tree.match_phrase("minus", &mut q), None);
    }

    #[test]
    fn test_multi_word_phrase_consumes_fragments() {
        let tree = operators();
        let mut q = queue(&[" ", "By", " ", "next"]);
        assert_eq!(tree.match_phrase("divided", &mut q), Some(Matched::Keys(" / ")));
        assert_eq!(drain(&mut q), vec![" ", "next"]);
    }

    #[test]
    fn test_failed_phrase_pushes_everything_back() {
        let tree = operators();
        let mut q = queue(&[" ", "eight", " ", "more"]);
        assert_eq!(tree.match_phrase("divided", &mut q), None);
        assert_eq!(drain(&mut q), vec![" ", "eight", " ", "more"]);
    }

    #[test]
    fn test_failure_deep_in_phrase_restores_order() {
        let tree = operators();
        let mut q = queue(&[" ", "not", " ", "sure", "\n"]);
        assert_eq!(tree.match_phrase("triple", &mut q), None);
        assert_eq!(drain(&mut q), vec![" ", "not", " ", "sure", "\n"]);
    }

    #[test]
    fn test_prefix_falls_back_to_standalone() {
        let tree = operators();
        let mut q = queue(&[" ", "bar"]);
        assert_eq!(tree.match_phrase("plus", &mut q), Some(Matched::Keys(" + ")));
        assert_eq!(drain(&mut q), vec![" ", "bar"]);

        let mut q = queue(&[" ", "equals"]);
        assert_eq!(tree.match_phrase("plus", &mut q), Some(Matched::Keys(" += ")));
        assert!(drain(&mut q).is_empty());
    }

    #[test]
    fn test_continuation_requires_a_space() {
        let tree = operators();
        let mut q = queue(&["by"]);
        assert_eq!(tree.match_phrase("divided", &mut q), None);
        assert_eq!(drain(&mut q), vec!["by"]);

        let mut q = queue(&[" "]);
        assert_eq!(tree.match_phrase("divided", &mut q), None);
        assert_eq!(drain(&mut q), vec![" "]);
    }

    #[test]
    fn test_duplicate_phrase_rejected() {
        let mut tree = operators();
        assert_eq!(
            tree.insert("divided  BY", Command::Keys("/".into())),
            Err(CommandTreeError::Duplicate("divided  BY".into()))
        );
        assert_eq!(
            tree.insert("plus", Command::Keys("+".into())),
            Err(CommandTreeError::Duplicate("plus".into()))
        );
        assert_eq!(
            tree.insert("   ", Command::Keys("+".into())),
            Err(CommandTreeError::Empty)
        );
    }

    #[test]
    fn test_leaf_extended_into_phrase() {
        let mut tree = operators();
        tree.insert("junk food", Command::Keys("🍔".into())).unwrap();
        let mut q = queue(&[" ", "food"]);
        assert_eq!(tree.match_phrase("junk", &mut q), Some(Matched::Keys("🍔")));
        let mut q = queue(&[]);
        assert_eq!(
            tree.match_phrase("junk", &mut q),
            Some(Matched::Action(&EditAction::Junk))
        );
    }

    #[test]
    fn test_code_commands_build() {
        let tree = CommandTree::code_commands().unwrap();
        let mut q = queue(&[]);
        assert_eq!(tree.match_phrase("x-ray", &mut q), Some(Matched::Keys("x")));
        assert_eq!(tree.match_phrase("equals", &mut q), Some(Matched::Keys(" = ")));
        assert_eq!(
            tree.match_phrase("camel", &mut q),
            Some(Matched::Action(&EditAction::SetMode(EntryMode::Camel)))
        );
        assert_eq!(
            tree.match_phrase("big", &mut q),
            Some(Matched::Action(&EditAction::Modifier(Modifiers::SHIFT)))
        );

        let mut q = queue(&[" ", "key"]);
        assert_eq!(
            tree.match_phrase("windows", &mut q),
            Some(Matched::Action(&EditAction::Modifier(Modifiers::SUPER)))
        );
    }

    #[test]
    fn test_phrases_listing() {
        let tree = operators();
        let phrases: Vec<String> = tree.phrases().into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            phrases,
            vec!["divided by", "junk", "plus", "plus equals", "triple not equals"]
        );
    }
}
