//! End-to-end dictation scenarios: transcript text in, screen text out

use voxglue::config::Config;
use voxglue::segmenter::Segmenter;
use voxglue::typing::{EntryEngine, FragmentQueue, ScreenSink, SpeechModeKind, TypingProcessor};

fn replay_with(config: &Config, transcript: &str) -> ScreenSink {
    let queue = FragmentQueue::from_fragments(Segmenter::segment_str(transcript));
    let engine = EntryEngine::new(config.code_commands().unwrap(), config.engine_config());
    let mut processor =
        TypingProcessor::new(queue, engine, config.typing.start_in, ScreenSink::new()).unwrap();
    processor.run().unwrap();
    processor.into_sink()
}

fn replay(transcript: &str) -> ScreenSink {
    replay_with(&Config::default(), transcript)
}

#[test]
fn camel_identifier() {
    assert_eq!(replay("mode code camel foo bar baz").text(), "fooBarBaz");
}

#[test]
fn constant_identifier() {
    assert_eq!(
        replay("mode code constant max retry count").text(),
        "MAX_RETRY_COUNT"
    );
}

#[test]
fn capital_run_with_override() {
    assert_eq!(replay("mode code capital id card").text(), "IDCard");
}

#[test]
fn unfinished_phrase_falls_back_to_words() {
    assert_eq!(replay("mode code snake divided eight").text(), "divided_eight");
    assert_eq!(replay("mode code snake a divided by b").text(), "a / b");
}

#[test]
fn squeeze_strips_operator_spaces() {
    assert_eq!(replay("mode code squeeze foo plus bar").text(), "foo+bar");
}

#[test]
fn assignment_statement() {
    let screen = replay("mode code snake user dot name equals quote bob quote clause");
    assert_eq!(screen.text(), "user.name = \"bob\";");
}

#[test]
fn newline_commits_the_line() {
    let screen = replay("mode code snake foo bar\ndelete");
    assert_eq!(screen.text(), "foo_bar\n");
    assert_eq!(screen.keys(), "foo_bar<Return>");
}

#[test]
fn delete_and_junk() {
    let screen = replay("mode code snake max retry delete count");
    assert_eq!(screen.text(), "max_count");

    let screen = replay("mode code x tick snake max retry junk");
    assert_eq!(screen.text(), "x,");
}

#[test]
fn chords_reach_the_sink() {
    let screen = replay("mode code control sierra alternate four big alpha");
    assert_eq!(screen.keys(), "<C-s><A-4>A");
    assert_eq!(screen.text(), "A");
}

#[test]
fn terminal_escape_sequences() {
    let screen = replay("mode code \x1b[A\x1b[3~");
    assert_eq!(screen.keys(), "<Up><Del>");
}

#[test]
fn language_changes_default_mode() {
    let screen = replay("mode code language javascript get element by id\nset value");
    assert_eq!(screen.text(), "getElementByID\nsetValue");
}

#[test]
fn dictation_and_code_interleave() {
    let screen = replay("note mode code snake max value mode dictation is fine");
    assert_eq!(screen.text(), "Note max_valueIs fine");
}

#[test]
fn literal_types_command_words() {
    let screen = replay("mode code camel literal delete row");
    assert_eq!(screen.text(), "deleteRow");
}

#[test]
fn config_drives_the_processor() {
    let config = Config::parse(
        r#"
[typing]
start_in = "code"
default_entry_mode = "underscore"
mode_terminators = [";", "{"]

[[commands.custom]]
phrase = "fat arrow"
keys = " => "

[[commands.custom]]
phrase = "open block"
keys = " {"
"#,
    )
    .unwrap();
    assert_eq!(config.typing.start_in, SpeechModeKind::Code);

    let screen = replay_with(&config, "item count fat arrow camel total open block big x");
    assert_eq!(screen.text(), "item_count => total {X");
}

#[test]
fn plain_dictation_by_default() {
    let screen = replay("hello there\ngeneral kenobi");
    assert_eq!(screen.text(), "Hello there\ngeneral kenobi");
}

#[test]
fn bare_escape_keeps_following_words() {
    let screen = replay("mode code snake foo\x1bOK");
    assert_eq!(screen.keys(), "foo<Esc>ok");
}

#[test]
fn delete_after_dot() {
    assert_eq!(replay("mode code snake foo dot bar delete baz").text(), "foo.baz");
    assert_eq!(replay("mode code snake foo dot delete bar").text(), "foo_bar");
}
