use crate::typing::{
    Command, CommandTree, CommandTreeError, DEFAULT_UNDO_DEPTH, EditAction, EngineConfig,
    EntryMode, SpeechModeKind,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "voxglue.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub typing: TypingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
}

// ============================================================================
// Input Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    /// A word with no separator after this long is complete
    #[serde(default = "default_word_timeout_ms")]
    pub word_timeout_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            word_timeout_ms: default_word_timeout_ms(),
        }
    }
}

impl InputConfig {
    pub fn word_timeout(&self) -> Duration {
        Duration::from_millis(self.word_timeout_ms)
    }
}

fn default_word_timeout_ms() -> u64 {
    100
}

// ============================================================================
// Typing Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TypingConfig {
    /// Speech mode at startup: "dictation" or "code"
    #[serde(default)]
    pub start_in: SpeechModeKind,

    /// Entry mode that code entry falls back to
    #[serde(default)]
    pub default_entry_mode: EntryMode,

    /// Words remembered for "delete"
    #[serde(default = "default_undo_depth")]
    pub undo_depth: usize,

    /// Symbols that end the current entry mode
    #[serde(default = "default_mode_terminators")]
    pub mode_terminators: Vec<String>,

    /// Spellings used when a word is capitalised
    #[serde(default = "default_capital_overrides")]
    pub capital_overrides: BTreeMap<String, String>,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            start_in: SpeechModeKind::default(),
            default_entry_mode: EntryMode::default(),
            undo_depth: default_undo_depth(),
            mode_terminators: default_mode_terminators(),
            capital_overrides: default_capital_overrides(),
        }
    }
}

fn default_undo_depth() -> usize {
    DEFAULT_UNDO_DEPTH
}

fn default_mode_terminators() -> Vec<String> {
    vec![";".to_string()]
}

fn default_capital_overrides() -> BTreeMap<String, String> {
    let mut overrides = BTreeMap::new();
    overrides.insert("id".to_string(), "ID".to_string());
    overrides
}

// ============================================================================
// Output Config
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct OutputConfig {
    /// Pause between synthesised keys
    #[serde(default)]
    pub key_delay_ms: u64,
}

impl OutputConfig {
    pub fn key_delay(&self) -> Duration {
        Duration::from_millis(self.key_delay_ms)
    }
}

// ============================================================================
// Commands Config
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct CommandsConfig {
    /// Extra phrases for code entry
    #[serde(default)]
    pub custom: Vec<CustomCommand>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CustomCommand {
    pub phrase: String,
    /// Key string, `<Tab>` style tokens allowed
    pub keys: String,
}

impl Config {
    /// Read `path`. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            default_mode: self.typing.default_entry_mode,
            undo_depth: self.typing.undo_depth,
            mode_terminators: self.typing.mode_terminators.clone(),
            capital_overrides: self.typing.capital_overrides.clone(),
        }
    }

    /// Built-in code commands plus the custom phrases
    pub fn code_commands(&self) -> Result<CommandTree<EditAction>, CommandTreeError> {
        let mut tree = CommandTree::code_commands()?;
        for custom in &self.commands.custom {
            tree.insert(&custom.phrase, Command::Keys(custom.keys.clone()))?;
        }
        Ok(tree)
    }
}
