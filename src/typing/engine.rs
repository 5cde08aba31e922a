//! Code entry: commands, identifier runs and undo
//!
//! [`EntryEngine`] consumes one fragment at a time. Words that match the
//! command tree are executed; everything else is formatted by the current
//! entry mode and typed. The engine never talks to a keyboard itself, key
//! strings collect in an output buffer that the caller drains after every
//! fragment.

use super::commands::{Command, CommandTree, EditAction, Matched, NUMBER_WORDS};
use super::fragment::{Fragment, FragmentKind, FragmentQueue};
use super::keys::{Key, KeyToken, Modifiers, NamedKey, encode, plain_text, tokenize};
use super::modes::{EntryMode, ModeTable};
use super::undo::{DEFAULT_UNDO_DEPTH, UndoStack};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Settings for a new [`EntryEngine`]
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub default_mode: EntryMode,
    pub undo_depth: usize,
    /// Symbols that end the current mode
    pub mode_terminators: Vec<String>,
    pub capital_overrides: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut capital_overrides = BTreeMap::new();
        capital_overrides.insert("id".to_string(), "ID".to_string());
        Self {
            default_mode: EntryMode::Spell,
            undo_depth: DEFAULT_UNDO_DEPTH,
            mode_terminators: vec![";".to_string()],
            capital_overrides,
        }
    }
}

/// The identifier being typed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// Keys typed since the run began
    pub running_length: usize,
    pub last_word_was_identifier: bool,
    /// A space was heard after the last identifier word
    pub pending_separator: bool,
    /// Set by a dot: the next word joins without a separator
    pub separator_suppressed: bool,
    /// Undo entries recorded during this run
    pub entries: usize,
}

impl RunState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn separators(&self) -> Separators {
        Separators {
            pending: self.pending_separator,
            suppressed: self.separator_suppressed,
        }
    }
}

/// Separator flags in force when a word began, restored when it is undone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Separators {
    pending: bool,
    suppressed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Emission {
    count: usize,
    /// Only plain characters, so backspacing removes it
    undoable: bool,
}

impl Emission {
    const NONE: Emission = Emission {
        count: 0,
        undoable: true,
    };

    fn join(self, other: Emission) -> Emission {
        Emission {
            count: self.count + other.count,
            undoable: self.undoable && other.undoable,
        }
    }
}

/// Split a word into maximal alphabetic and non-alphabetic pieces
fn split_runs(word: &str) -> Vec<(bool, &str)> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut current: Option<bool> = None;
    for (i, c) in word.char_indices() {
        let alpha = c.is_alphabetic();
        if let Some(kind) = current {
            if kind != alpha {
                runs.push((kind, &word[start..i]));
                start = i;
            }
        }
        current = Some(alpha);
    }
    if let Some(kind) = current {
        runs.push((kind, &word[start..]));
    }
    runs
}

fn backspaces(count: usize) -> String {
    KeyToken::named(NamedKey::Backspace).to_string().repeat(count)
}

pub struct EntryEngine {
    commands: CommandTree<EditAction>,
    table: ModeTable,
    mode: EntryMode,
    default_mode: EntryMode,
    run: RunState,
    undo: UndoStack<Separators>,
    /// Separator flags before the word being handled
    word_start: Separators,
    modifiers: Modifiers,
    escape_next: bool,
    terminators: Vec<String>,
    output: Vec<String>,
}

impl EntryEngine {
    pub fn new(commands: CommandTree<EditAction>, config: EngineConfig) -> Self {
        Self {
            commands,
            table: ModeTable::new(config.capital_overrides),
            mode: config.default_mode,
            default_mode: config.default_mode,
            run: RunState::default(),
            undo: UndoStack::new(config.undo_depth),
            word_start: Separators::default(),
            modifiers: Modifiers::empty(),
            escape_next: false,
            terminators: config.mode_terminators,
            output: Vec::new(),
        }
    }

    /// Replace the mode rules
    pub fn with_table(mut self, table: ModeTable) -> Self {
        self.table = table;
        self
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    pub fn default_mode(&self) -> EntryMode {
        self.default_mode
    }

    pub fn run(&self) -> &RunState {
        &self.run
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// The next word is typed as-is
    pub fn escape_pending(&self) -> bool {
        self.escape_next
    }

    /// Key strings produced since the last call
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// Back to the default mode with nothing pending
    pub fn reset(&mut self) {
        self.return_to_default();
        self.modifiers = Modifiers::empty();
        self.escape_next = false;
    }

    pub fn handle(&mut self, fragment: Fragment, queue: &mut FragmentQueue) {
        debug!(?fragment, mode = %self.mode, "fragment");
        match fragment.kind() {
            FragmentKind::Space => self.space(),
            FragmentKind::Newline => self.newline(),
            FragmentKind::Escape => self.escape_sequence(fragment.as_str()),
            FragmentKind::Word => self.word(fragment.as_str(), queue),
        }
    }

    fn word(&mut self, text: &str, queue: &mut FragmentQueue) {
        if text.is_empty() {
            return;
        }
        self.word_start = self.run.separators();
        if std::mem::take(&mut self.escape_next) {
            let emission = self.typed_word(text);
            self.record(emission);
            return;
        }

        let lowered = text.to_lowercase();
        if self.chord_pending() {
            if let Some((_, digit)) = NUMBER_WORDS.iter().find(|(word, _)| *word == lowered) {
                let emission = self.symbol(&digit.to_string());
                self.record(emission);
                return;
            }
        }

        let command = self
            .commands
            .match_phrase(&lowered, queue)
            .map(|matched| match matched {
                Matched::Keys(keys) => Command::Keys(keys.to_string()),
                Matched::Action(action) => Command::Action(*action),
            });
        match command {
            Some(Command::Keys(keys)) => self.literal(&keys),
            Some(Command::Action(action)) => self.apply(action),
            None => {
                let emission = self.typed_word(text);
                self.record(emission);
            }
        }
    }

    /// A word that is not a command: alphabetic pieces join the identifier,
    /// the rest are typed as symbols
    fn typed_word(&mut self, text: &str) -> Emission {
        let mut emission = Emission::NONE;
        for (alpha, piece) in split_runs(text) {
            let part = if alpha {
                self.identifier(piece, true)
            } else {
                self.symbol(piece)
            };
            emission = emission.join(part);
        }
        emission
    }

    fn identifier(&mut self, word: &str, transform: bool) -> Emission {
        let rule = self.table.rule(self.mode);
        let (tracks_run, one_shot) = (rule.tracks_run, rule.one_shot);
        let (separator, trailing) = (rule.separator, rule.trailing);
        let continuing = tracks_run && self.run.last_word_was_identifier;

        let mut text = String::new();
        if continuing && self.run.pending_separator && !self.run.separator_suppressed {
            text.extend(separator);
        }
        let lead = text.chars().count();
        if transform {
            text.push_str(&self.table.transform(self.mode, word, continuing));
        } else {
            text.push_str(word);
        }
        text.extend(trailing);

        let chord = self.chord_pending();
        let emission = self.emit(plain_text(&text), lead);
        if chord {
            return emission;
        }
        if tracks_run {
            self.run.running_length += emission.count;
            self.run.last_word_was_identifier = true;
            self.run.pending_separator = false;
            self.run.separator_suppressed = false;
        } else {
            self.run.reset();
        }
        if one_shot {
            self.return_to_default();
        }
        emission
    }

    fn symbol(&mut self, text: &str) -> Emission {
        let emission = self.emit(plain_text(text), 0);
        self.after_symbol(text, emission.count);
        emission
    }

    fn after_symbol(&mut self, text: &str, count: usize) {
        let breaks_run = self.table.rule(self.mode).symbols_break_run;
        if text == "." {
            if self.run.last_word_was_identifier {
                self.run.running_length += count;
                self.run.separator_suppressed = true;
            }
            self.run.pending_separator = false;
        } else if breaks_run {
            self.run.reset();
        } else if self.run.last_word_was_identifier {
            self.run.running_length += count;
            self.run.pending_separator = false;
        }

        if self.terminators.iter().any(|t| t == text) {
            debug!(terminator = text, "mode terminated");
            self.return_to_default();
        }
    }

    /// Keys from a matched command
    fn literal(&mut self, keys: &str) {
        let keys = if self.table.rule(self.mode).strips_literals {
            keys.trim()
        } else {
            keys
        };
        let tokens = tokenize(keys);
        let letters = !tokens.is_empty()
            && tokens.iter().all(|t| match t.key {
                Key::Char(c) => t.is_plain() && c.is_alphabetic(),
                Key::Named(_) => false,
            });

        let emission = if letters {
            self.identifier(keys, false)
        } else {
            let emission = self.emit(tokens, 0);
            self.after_symbol(keys.trim(), emission.count);
            emission
        };
        self.record(emission);
    }

    fn apply(&mut self, action: EditAction) {
        debug!(%action, "action");
        match action {
            EditAction::SetMode(mode) => self.set_mode(mode),
            EditAction::Modifier(modifier) => self.add_modifier(modifier),
            EditAction::Undo => self.undo_last(),
            EditAction::Junk => self.junk(),
            EditAction::EscapeNext => self.escape_next = true,
            EditAction::Language(mode) => {
                info!(%mode, "default entry mode");
                self.default_mode = mode;
                self.set_mode(mode);
            }
        }
    }

    fn set_mode(&mut self, mode: EntryMode) {
        self.mode = mode;
        self.run.reset();
        self.modifiers &= Modifiers::SHIFT;
    }

    fn return_to_default(&mut self) {
        self.mode = self.default_mode;
        self.run.reset();
    }

    fn add_modifier(&mut self, modifier: Modifiers) {
        self.modifiers |= modifier;
        if modifier != Modifiers::SHIFT {
            // The chord target is spelled: one letter per word
            self.run.reset();
            self.mode = EntryMode::Spell;
        }
    }

    /// A modifier other than shift is held
    fn chord_pending(&self) -> bool {
        !self.modifiers.difference(Modifiers::SHIFT).is_empty()
    }

    /// Send keys, applying held modifiers to the first non-space key at or
    /// after `skip`
    fn emit(&mut self, mut tokens: Vec<KeyToken>, skip: usize) -> Emission {
        if tokens.is_empty() {
            return Emission::NONE;
        }
        let mut chord = false;
        if !self.modifiers.is_empty() {
            if let Some(first) = tokens.iter_mut().skip(skip).find(|t| !t.is_space()) {
                chord = self.chord_pending();
                *first = first.with_modifiers(std::mem::take(&mut self.modifiers));
            }
        }

        let emission = Emission {
            count: tokens.len(),
            undoable: tokens.iter().all(KeyToken::is_plain),
        };
        self.send(encode(&tokens));
        if chord {
            self.return_to_default();
        }
        emission
    }

    fn send(&mut self, keys: String) {
        debug!(%keys, "emit");
        self.output.push(keys);
    }

    fn record(&mut self, emission: Emission) {
        if emission.count == 0 {
            return;
        }
        if emission.undoable {
            self.undo.push(emission.count, self.word_start);
            if self.run.last_word_was_identifier {
                self.run.entries += 1;
            }
        } else {
            self.undo.clear();
        }
    }

    fn space(&mut self) {
        if !self.run.last_word_was_identifier {
            return;
        }
        self.run.pending_separator = true;
        if self.table.rule(self.mode).passes_spaces {
            self.send(" ".to_string());
            self.undo.add_untracked(1);
            self.run.running_length += 1;
        }
    }

    fn newline(&mut self) {
        self.emit(vec![KeyToken::named(NamedKey::Return)], 0);
        self.return_to_default();
        self.undo.clear();
    }

    fn escape_sequence(&mut self, sequence: &str) {
        match NamedKey::from_escape(sequence) {
            Some(key) => {
                self.emit(vec![KeyToken::named(key)], 0);
            }
            None => warn!(?sequence, "unknown escape sequence dropped"),
        }
        self.run.reset();
        self.undo.clear();
    }

    /// Remove the most recent word
    fn undo_last(&mut self) {
        let Some(undone) = self.undo.pop() else {
            debug!("nothing to undo");
            return;
        };
        self.send(backspaces(undone.count));
        self.run.running_length = self.run.running_length.saturating_sub(undone.count);
        self.run.entries = self.run.entries.saturating_sub(1);
        if self.run.running_length == 0 {
            self.run.reset();
            return;
        }
        // The run continues from where the removed word began
        let before = undone.before.unwrap_or_default();
        self.run.pending_separator = before.pending;
        self.run.separator_suppressed = before.suppressed;
    }

    /// Remove the identifier being typed
    fn junk(&mut self) {
        if self.run.running_length == 0 {
            return;
        }
        self.send(backspaces(self.run.running_length));
        self.undo.discard_recent(self.run.entries);
        self.run.reset();
    }
}
