use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::tty::IsTty;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use voxglue::config::{Config, DEFAULT_CONFIG_PATH};
use voxglue::segmenter::{Segmenter, StreamSource};
use voxglue::terminal;
use voxglue::typing::{
    EntryEngine, FragmentQueue, KeySink, NUMBER_WORDS, PrintSink, ScreenSink, TypingProcessor,
    speech_mode_switches,
};

#[derive(Parser)]
#[command(name = "voxglue", version, about)]
struct Cli {
    /// Config file, defaults apply when it does not exist
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Log to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Read dictation from the terminal (or piped stdin) and type it
    Listen {
        /// Print the key strings instead of typing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Interpret a recorded transcript and print the result
    Replay {
        path: PathBuf,
        /// Print the resulting text rather than the key strings
        #[arg(long)]
        text: bool,
    },
    /// List every spoken command
    Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    let config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command.unwrap_or(Command::Listen { dry_run: false }) {
        Command::Listen { dry_run } => listen(&config, dry_run),
        Command::Replay { path, text } => replay(&config, &path, text),
        Command::Commands => print_commands(&config),
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_filter = if verbose { "voxglue=debug" } else { "voxglue=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(filter)
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("log file {} has no file name", path.display()))?;
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();
    Ok(Some(guard))
}

/// Run fragments from `queue` through the processor into `sink`
fn drive<K: KeySink>(queue: FragmentQueue, config: &Config, sink: K) -> Result<K> {
    let commands = config.code_commands().context("building command tree")?;
    let engine = EntryEngine::new(commands, config.engine_config());
    let mut processor = TypingProcessor::new(queue, engine, config.typing.start_in, sink)?;
    processor.run()?;
    Ok(processor.into_sink())
}

fn listen(config: &Config, dry_run: bool) -> Result<()> {
    let word_timeout = config.input.word_timeout();

    // Raw mode is restored when the guard drops
    let (queue, _raw) = if io::stdin().is_tty() {
        let (source, raw) = terminal::terminal_source(word_timeout)
            .context("switching the terminal to raw mode")?;
        info!("listening on the terminal, ctrl+c to quit");
        (FragmentQueue::new(source), Some(raw))
    } else {
        let source = StreamSource::from_reader(io::stdin(), word_timeout);
        (FragmentQueue::new(source), None)
    };

    if dry_run {
        drive(queue, config, PrintSink::new(io::stdout()))?;
        return Ok(());
    }
    type_keys(queue, config)
}

#[cfg(feature = "typing")]
fn type_keys(queue: FragmentQueue, config: &Config) -> Result<()> {
    let sink = voxglue::typing::KeyboardSink::new(config.output.key_delay())?;
    drive(queue, config, sink)?;
    Ok(())
}

#[cfg(not(feature = "typing"))]
fn type_keys(queue: FragmentQueue, config: &Config) -> Result<()> {
    tracing::warn!("built without the `typing` feature, printing keys instead");
    drive(queue, config, PrintSink::new(io::stdout()))?;
    Ok(())
}

fn replay(config: &Config, path: &Path, text: bool) -> Result<()> {
    let transcript =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let queue = FragmentQueue::from_fragments(Segmenter::segment_str(&transcript));
    let screen = drive(queue, config, ScreenSink::new())?;
    if text {
        println!("{}", screen.text());
    } else {
        for keys in screen.emissions() {
            println!("{}", keys);
        }
    }
    Ok(())
}

fn print_commands(config: &Config) -> Result<()> {
    let commands = config.code_commands().context("building command tree")?;

    println!("Speech modes (always available):");
    for (phrase, kind) in speech_mode_switches()?.phrases() {
        println!("  {:<24} {}", phrase, kind);
    }

    println!();
    println!("Code entry:");
    for (phrase, command) in commands.phrases() {
        println!("  {:<24} {}", phrase, command);
    }

    println!();
    let numbers: Vec<&str> = NUMBER_WORDS.iter().map(|(word, _)| *word).collect();
    println!("After control, alternate or windows key: {}", numbers.join(", "));
    Ok(())
}
