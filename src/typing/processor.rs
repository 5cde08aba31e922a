//! Main typing loop
//!
//! Pulls fragments from the queue, handles the "mode code" and
//! "mode dictation" switches, and hands everything else to the active speech
//! mode. Key strings go straight to the sink.

use super::commands::{Command, CommandTree, CommandTreeError, Matched};
use super::dictation::DictationMode;
use super::engine::EntryEngine;
use super::fragment::{FragmentKind, FragmentQueue};
use super::input::{KeySink, TypingError};
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info};

/// Which interpreter receives fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeechModeKind {
    #[default]
    Dictation,
    Code,
}

impl fmt::Display for SpeechModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechModeKind::Dictation => write!(f, "dictation"),
            SpeechModeKind::Code => write!(f, "code"),
        }
    }
}

/// Result of processing one fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    Continue,
    ModeChanged(SpeechModeKind),
    /// The source is exhausted
    Finished,
}

/// "mode code" and "mode dictation", available in every speech mode
pub fn speech_mode_switches() -> Result<CommandTree<SpeechModeKind>, CommandTreeError> {
    let mut tree = CommandTree::new();
    for kind in [SpeechModeKind::Code, SpeechModeKind::Dictation] {
        tree.insert(&format!("mode {}", kind), Command::Action(kind))?;
    }
    Ok(tree)
}

pub struct TypingProcessor<K: KeySink> {
    queue: FragmentQueue,
    switches: CommandTree<SpeechModeKind>,
    engine: EntryEngine,
    dictation: DictationMode,
    active: SpeechModeKind,
    sink: K,
}

impl<K: KeySink> TypingProcessor<K> {
    pub fn new(
        queue: FragmentQueue,
        engine: EntryEngine,
        start_in: SpeechModeKind,
        sink: K,
    ) -> Result<Self, TypingError> {
        let mut processor = Self {
            queue,
            switches: speech_mode_switches()?,
            engine,
            dictation: DictationMode::new(),
            active: start_in,
            sink,
        };
        processor.switch_to(start_in);
        Ok(processor)
    }

    pub fn active_mode(&self) -> SpeechModeKind {
        self.active
    }

    pub fn engine(&self) -> &EntryEngine {
        &self.engine
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    fn switch_to(&mut self, kind: SpeechModeKind) {
        info!(mode = %kind, "speech mode");
        self.active = kind;
        match kind {
            SpeechModeKind::Dictation => self.dictation.switch_to(),
            SpeechModeKind::Code => self.engine.reset(),
        }
    }

    /// Process one fragment
    pub fn step(&mut self) -> Result<ProcessResult, TypingError> {
        let Some(fragment) = self.queue.next_fragment() else {
            debug!("input finished");
            self.sink.flush()?;
            return Ok(ProcessResult::Finished);
        };

        // "literal mode" types the word instead of switching
        let escaped = self.active == SpeechModeKind::Code && self.engine.escape_pending();
        if fragment.kind() == FragmentKind::Word && !escaped {
            let lowered = fragment.as_str().to_lowercase();
            let switch = self
                .switches
                .match_phrase(&lowered, &mut self.queue)
                .and_then(|matched| match matched {
                    Matched::Action(kind) => Some(*kind),
                    Matched::Keys(_) => None,
                });
            if let Some(kind) = switch {
                self.switch_to(kind);
                return Ok(ProcessResult::ModeChanged(kind));
            }
        }

        match self.active {
            SpeechModeKind::Code => {
                self.engine.handle(fragment, &mut self.queue);
                for keys in self.engine.take_output() {
                    self.sink.emit(&keys)?;
                }
            }
            SpeechModeKind::Dictation => {
                if let Some(keys) = self.dictation.handle(&fragment) {
                    self.sink.emit(&keys)?;
                }
            }
        }
        Ok(ProcessResult::Continue)
    }

    /// Process until the source is exhausted
    pub fn run(&mut self) -> Result<(), TypingError> {
        loop {
            if self.step()? == ProcessResult::Finished {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typing::engine::EngineConfig;
    use crate::typing::{Fragment, ScreenSink};

    fn processor(items: &[&str], start_in: SpeechModeKind) -> TypingProcessor<ScreenSink> {
        let fragments = items.iter().map(|s| Fragment::from(*s)).collect();
        let engine = EntryEngine::new(
            CommandTree::code_commands().unwrap(),
            EngineConfig::default(),
        );
        TypingProcessor::new(
            FragmentQueue::from_fragments(fragments),
            engine,
            start_in,
            ScreenSink::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_switch_between_speech_modes() {
        let mut p = processor(
            &[
                "hello", " ", "mode", " ", "code", " ", "camel", " ", "foo", " ", "bar", " ",
                "mode", " ", "dictation", " ", "done",
            ],
            SpeechModeKind::Dictation,
        );
        p.run().unwrap();
        assert_eq!(p.sink().text(), "Hello fooBarDone");
        assert_eq!(p.active_mode(), SpeechModeKind::Dictation);
    }

    #[test]
    fn test_step_reports_mode_change() {
        let mut p = processor(&["mode", " ", "Code", " "], SpeechModeKind::Dictation);
        assert_eq!(
            p.step().unwrap(),
            ProcessResult::ModeChanged(SpeechModeKind::Code)
        );
        assert_eq!(p.step().unwrap(), ProcessResult::Continue);
        assert_eq!(p.step().unwrap(), ProcessResult::Finished);
    }

    #[test]
    fn test_mode_without_valid_target_is_typed() {
        let mut p = processor(&["mode", " ", "parrot"], SpeechModeKind::Dictation);
        p.run().unwrap();
        assert_eq!(p.sink().text(), "Mode parrot");

        let mut p = processor(
            &["snake", " ", "mode", " ", "parrot"],
            SpeechModeKind::Code,
        );
        p.run().unwrap();
        assert_eq!(p.sink().text(), "mode_parrot");
    }

    #[test]
    fn test_literal_bypasses_mode_switch() {
        let mut p = processor(
            &["snake", " ", "literal", " ", "mode", " ", "code"],
            SpeechModeKind::Code,
        );
        p.run().unwrap();
        assert_eq!(p.sink().text(), "mode_code");
        assert_eq!(p.active_mode(), SpeechModeKind::Code);
    }

    #[test]
    fn test_entering_code_resets_engine() {
        let mut p = processor(
            &[
                "camel", " ", "foo", " ", "mode", " ", "dictation", " ", "x", " ", "mode", " ",
                "code", " ", "bar",
            ],
            SpeechModeKind::Code,
        );
        p.run().unwrap();
        assert_eq!(p.sink().text(), "fooX b");
    }
}
