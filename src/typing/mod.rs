//! Voice-driven code entry
//!
//! A speech engine types recognised words into our terminal. This module
//! reads them back as fragments, interprets spoken commands and identifier
//! formatting, and emits the keys the user meant.
//!
//! # Pieces
//!
//! - **Fragments**: words, spaces, newlines and escape sequences, behind a
//!   pushback queue so phrase matching can look ahead and give input back
//! - **Commands**: "plus equals", "camel", "delete" and friends, matched
//!   against a tree of phrases
//! - **Entry modes**: camel, snake, constant and the rest, with word-level
//!   undo
//! - **Key tokens**: the `<Esc>`, `<C-x>` micro-grammar every sink decodes

mod commands;
mod dictation;
mod engine;
mod fragment;
mod input;
mod keys;
mod modes;
mod processor;
mod undo;

pub use commands::{
    ALPHABET, Command, CommandNode, CommandTree, CommandTreeError, EditAction, Matched,
    NUMBER_WORDS,
};
pub use dictation::DictationMode;
pub use engine::{EngineConfig, EntryEngine, RunState};
pub use fragment::{Fragment, FragmentKind, FragmentQueue, FragmentSource};
#[cfg(feature = "typing")]
pub use input::KeyboardSink;
pub use input::{KeySink, PrintSink, ScreenSink, TypingError};
pub use keys::{Key, KeyToken, Modifiers, NamedKey, encode, key_count, plain_text, tokenize};
pub use modes::{Case, EntryMode, ModeRule, ModeTable};
pub use processor::{ProcessResult, SpeechModeKind, TypingProcessor, speech_mode_switches};
pub use undo::{DEFAULT_UNDO_DEPTH, UndoStack, Undone};
