//! Entry modes and their word transform rules
//!
//! An entry mode decides how a run of spoken words becomes one token:
//! `camel` turns "foo bar" into `fooBar`, `constant` into `FOO_BAR`, and so
//! on. Each mode is described by a [`ModeRule`] held in a [`ModeTable`], so
//! behaviour is data rather than scattered conditionals.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    /// No identifier mode: each word contributes its first letter
    #[default]
    Spell,
    Capital,
    Camel,
    Underscore,
    Hyphen,
    Spacey,
    Squeeze,
    /// Upper case, joined by spaces
    AllCaps,
    Keyword,
    Single,
    Constant,
    Dictate,
}

impl EntryMode {
    pub const ALL: [EntryMode; 12] = [
        EntryMode::Spell,
        EntryMode::Capital,
        EntryMode::Camel,
        EntryMode::Underscore,
        EntryMode::Hyphen,
        EntryMode::Spacey,
        EntryMode::Squeeze,
        EntryMode::AllCaps,
        EntryMode::Keyword,
        EntryMode::Single,
        EntryMode::Constant,
        EntryMode::Dictate,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// The spoken word that switches to this mode
    pub fn command_word(self) -> &'static str {
        match self {
            EntryMode::Spell => "spell",
            EntryMode::Capital => "capital",
            EntryMode::Camel => "camel",
            EntryMode::Underscore => "snake",
            EntryMode::Hyphen => "kebab",
            EntryMode::Spacey => "spacey",
            EntryMode::Squeeze => "squeeze",
            EntryMode::AllCaps => "yell",
            EntryMode::Keyword => "keyword",
            EntryMode::Single => "single",
            EntryMode::Constant => "constant",
            EntryMode::Dictate => "dictate",
        }
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryMode::Spell => "spell",
            EntryMode::Capital => "capital",
            EntryMode::Camel => "camel",
            EntryMode::Underscore => "underscore",
            EntryMode::Hyphen => "hyphen",
            EntryMode::Spacey => "spacey",
            EntryMode::Squeeze => "squeeze",
            EntryMode::AllCaps => "allcaps",
            EntryMode::Keyword => "keyword",
            EntryMode::Single => "single",
            EntryMode::Constant => "constant",
            EntryMode::Dictate => "dictate",
        };
        write!(f, "{}", name)
    }
}

/// Case transform applied to one word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Lower,
    Upper,
    /// Lower case with the first letter raised, or the override spelling
    Capitalize,
    /// Only the first letter, lower case
    Initial,
    /// As spoken, first letter raised
    Sentence,
    /// As spoken
    Verbatim,
}

impl Case {
    pub fn apply(self, word: &str, overrides: &BTreeMap<String, String>) -> String {
        match self {
            Case::Lower => word.to_lowercase(),
            Case::Upper => word.to_uppercase(),
            Case::Capitalize => {
                let lower = word.to_lowercase();
                match overrides.get(&lower) {
                    Some(spelling) => spelling.clone(),
                    None => capitalize_first(&lower),
                }
            }
            Case::Initial => word
                .chars()
                .next()
                .map(|c| c.to_lowercase().collect())
                .unwrap_or_default(),
            Case::Sentence => capitalize_first(word),
            Case::Verbatim => word.to_string(),
        }
    }
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => {
            let mut s: String = c.to_uppercase().collect();
            s.push_str(chars.as_str());
            s
        }
        None => String::new(),
    }
}

/// How one entry mode assembles words
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeRule {
    /// Case of the first word of a run
    pub first: Case,
    /// Case of every later word in the run
    pub rest: Case,
    /// Inserted between words of a run when a space was heard
    pub separator: Option<char>,
    /// Words build up an identifier run
    pub tracks_run: bool,
    /// Back to the default mode after a single word
    pub one_shot: bool,
    /// Appended after each word
    pub trailing: Option<char>,
    /// Command literals lose their surrounding whitespace
    pub strips_literals: bool,
    /// Space fragments are typed as spaces
    pub passes_spaces: bool,
    /// Symbols end the identifier run
    pub symbols_break_run: bool,
}

impl ModeRule {
    fn joined(first: Case, rest: Case, separator: Option<char>) -> Self {
        Self {
            first,
            rest,
            separator,
            tracks_run: true,
            one_shot: false,
            trailing: None,
            strips_literals: false,
            passes_spaces: false,
            symbols_break_run: true,
        }
    }

    fn one_word(trailing: Option<char>) -> Self {
        Self {
            tracks_run: false,
            one_shot: true,
            trailing,
            ..Self::joined(Case::Lower, Case::Lower, None)
        }
    }

    /// Built-in rule for `mode`
    pub fn standard(mode: EntryMode) -> Self {
        match mode {
            EntryMode::Spell => Self {
                tracks_run: false,
                ..Self::joined(Case::Initial, Case::Initial, None)
            },
            EntryMode::Capital => Self::joined(Case::Capitalize, Case::Capitalize, None),
            EntryMode::Camel => Self::joined(Case::Lower, Case::Capitalize, None),
            EntryMode::Underscore => Self::joined(Case::Lower, Case::Lower, Some('_')),
            EntryMode::Hyphen => Self::joined(Case::Lower, Case::Lower, Some('-')),
            EntryMode::Spacey => Self::joined(Case::Lower, Case::Lower, Some(' ')),
            EntryMode::Squeeze => Self {
                strips_literals: true,
                ..Self::joined(Case::Lower, Case::Lower, None)
            },
            EntryMode::AllCaps => Self::joined(Case::Upper, Case::Upper, Some(' ')),
            EntryMode::Keyword => Self::one_word(Some(' ')),
            EntryMode::Single => Self::one_word(None),
            EntryMode::Constant => Self::joined(Case::Upper, Case::Upper, Some('_')),
            EntryMode::Dictate => Self {
                passes_spaces: true,
                symbols_break_run: false,
                ..Self::joined(Case::Sentence, Case::Verbatim, None)
            },
        }
    }
}

/// Rules for every entry mode, plus capitalisation overrides
#[derive(Debug, Clone)]
pub struct ModeTable {
    rules: Vec<ModeRule>,
    capital_overrides: BTreeMap<String, String>,
}

impl Default for ModeTable {
    fn default() -> Self {
        let mut overrides = BTreeMap::new();
        overrides.insert("id".to_string(), "ID".to_string());
        Self::new(overrides)
    }
}

impl ModeTable {
    pub fn new(capital_overrides: BTreeMap<String, String>) -> Self {
        Self {
            rules: EntryMode::ALL.iter().map(|m| ModeRule::standard(*m)).collect(),
            capital_overrides: capital_overrides
                .into_iter()
                .map(|(word, spelling)| (word.to_lowercase(), spelling))
                .collect(),
        }
    }

    pub fn rule(&self, mode: EntryMode) -> &ModeRule {
        &self.rules[mode.index()]
    }

    pub fn with_rule(mut self, mode: EntryMode, rule: ModeRule) -> Self {
        self.rules[mode.index()] = rule;
        self
    }

    /// Transform `word` as the first (or a later) word of a run in `mode`
    pub fn transform(&self, mode: EntryMode, word: &str, continuing: bool) -> String {
        let rule = self.rule(mode);
        let case = if continuing { rule.rest } else { rule.first };
        case.apply(word, &self.capital_overrides)
    }
}
