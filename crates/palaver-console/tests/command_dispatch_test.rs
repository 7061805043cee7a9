//! Integration tests for command parsing and routing.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - The handler that ran is the one the precedence rules pick
//! - Handlers receive exactly the parsed slots
//! - Failures surface as one error and run nothing

use palaver_console::{
    ArgGrammar, ArgumentError, Args, CommandDispatcher, CommandError, CommandSpec, TabKind,
    command::Handler,
};

/// Records which handler ran and with what.
#[derive(Debug, Default)]
struct Recorder {
    calls: Vec<(&'static str, Vec<Option<String>>)>,
}

fn slots(args: &Args) -> Vec<Option<String>> {
    (0..args.len()).map(|i| args.get(i).map(str::to_string)).collect()
}

fn global_foo(rec: &mut Recorder, args: &Args) -> Result<(), CommandError> {
    rec.calls.push(("global", slots(args)));
    Ok(())
}

fn room_foo(rec: &mut Recorder, args: &Args) -> Result<(), CommandError> {
    rec.calls.push(("room", slots(args)));
    Ok(())
}

fn failing(_: &mut Recorder, _: &Args) -> Result<(), CommandError> {
    Err(CommandError::Invalid("nope".into()))
}

fn spec(
    name: &'static str,
    grammar: ArgGrammar,
    handler: Handler<Recorder>,
) -> CommandSpec<Recorder> {
    CommandSpec { name, usage: "", short: "", desc: "", grammar, handler }
}

/// Dispatcher with `foo` global and a room-only `foo` shadowing it.
fn dispatcher() -> CommandDispatcher<Recorder> {
    let mut dispatcher = CommandDispatcher::new();
    let grammar = ArgGrammar::Quoted { min: 1, max: 2, defaults: &[None] };
    dispatcher.register_global(spec("foo", grammar, global_foo));
    dispatcher.register_tab(TabKind::MultiPartyRoom, spec("foo", ArgGrammar::Raw, room_foo));
    dispatcher.register_global(spec("fail", ArgGrammar::Ignored, failing));
    dispatcher
}

fn run(
    dispatcher: &CommandDispatcher<Recorder>,
    kind: TabKind,
    line: &str,
) -> Result<Recorder, CommandError> {
    let mut rec = Recorder::default();
    dispatcher.prepare(kind, line, "/")?.run(&mut rec)?;
    Ok(rec)
}

#[test]
fn quoted_groups_and_keeps_slots() {
    let rec = run(&dispatcher(), TabKind::Direct, r#"foo "a b" c"#).unwrap();
    assert_eq!(rec.calls, [("global", vec![Some("a b".to_string()), Some("c".to_string())])]);
}

#[test]
fn missing_optional_slot_is_none() {
    let rec = run(&dispatcher(), TabKind::Direct, "foo a").unwrap();
    assert_eq!(rec.calls, [("global", vec![Some("a".to_string()), None])]);
}

#[test]
fn too_few_arguments_run_nothing() {
    let err = run(&dispatcher(), TabKind::Direct, "foo").unwrap_err();
    assert_eq!(err, CommandError::Argument {
        prefix: "/".into(),
        command: "foo".into(),
        source: ArgumentError { min: 1, got: 0 },
    });
}

#[test]
fn tab_table_wins_over_global() {
    let dispatcher = dispatcher();
    let rec = run(&dispatcher, TabKind::MultiPartyRoom, r#"foo "a b" c"#).unwrap();
    assert_eq!(rec.calls, [("room", vec![Some(r#""a b" c"#.to_string())])]);

    // Other tab kinds still reach the global command
    let rec = run(&dispatcher, TabKind::SidePanel, "foo x").unwrap();
    assert_eq!(rec.calls[0].0, "global");
}

#[test]
fn unknown_command_mentions_help() {
    let err = run(&dispatcher(), TabKind::Direct, "bar baz").unwrap_err();
    assert_eq!(err, CommandError::UnknownCommand { prefix: "/".into(), name: "bar".into() });
    assert!(err.to_string().contains("/help"));
}

#[test]
fn handler_errors_are_returned() {
    let err = run(&dispatcher(), TabKind::Direct, "fail with junk").unwrap_err();
    assert_eq!(err.to_string(), "nope");
}

#[test]
fn names_merge_tables_without_duplicates() {
    let dispatcher = dispatcher();
    assert_eq!(dispatcher.names(TabKind::MultiPartyRoom), ["fail", "foo"]);
    assert_eq!(dispatcher.names(TabKind::Direct), ["fail", "foo"]);
}
