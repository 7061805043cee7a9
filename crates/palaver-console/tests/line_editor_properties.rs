//! Property-based tests for the line editor.
//!
//! Arbitrary key sequences must keep the cursor inside the text, and the
//! documented completion walks must produce exactly the documented lines.

use palaver_console::{CompletionMode, LineEditor};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Edit {
    Insert(char),
    Paste(String),
    DeleteForward,
    DeleteBackward,
    DeleteWord,
    Kill,
    Left,
    Right,
    Home,
    End,
    Up,
    Down,
    Submit,
    Complete,
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        4 => prop::char::range('a', 'e').prop_map(Edit::Insert),
        1 => Just(Edit::Insert(' ')),
        1 => Just(Edit::Insert('é')),
        1 => "[a-c ]{0,6}".prop_map(Edit::Paste),
        1 => Just(Edit::DeleteForward),
        2 => Just(Edit::DeleteBackward),
        1 => Just(Edit::DeleteWord),
        1 => Just(Edit::Kill),
        2 => Just(Edit::Left),
        2 => Just(Edit::Right),
        1 => Just(Edit::Home),
        1 => Just(Edit::End),
        1 => Just(Edit::Up),
        1 => Just(Edit::Down),
        1 => Just(Edit::Submit),
        2 => Just(Edit::Complete),
    ]
}

fn mode_strategy() -> impl Strategy<Value = CompletionMode> {
    prop_oneof![Just(CompletionMode::Normal), Just(CompletionMode::Shell)]
}

fn apply(editor: &mut LineEditor, edit: &Edit, source: &[String]) {
    match edit {
        Edit::Insert(ch) => editor.insert_char(*ch),
        Edit::Paste(text) => editor.insert_str(text),
        Edit::DeleteForward => editor.delete_forward(),
        Edit::DeleteBackward => editor.delete_backward(),
        Edit::DeleteWord => editor.delete_word_backward(),
        Edit::Kill => editor.kill_to_start(),
        Edit::Left => editor.move_left(),
        Edit::Right => editor.move_right(),
        Edit::Home => editor.move_home(),
        Edit::End => editor.move_end(),
        Edit::Up => editor.history_up(),
        Edit::Down => editor.history_down(),
        Edit::Submit => {
            editor.submit();
        },
        Edit::Complete => {
            editor.complete(source);
        },
    }
}

fn nicks(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

/// Editor in `mode` holding `text` with the cursor at the end.
fn typed(mode: CompletionMode, text: &str) -> LineEditor {
    let mut editor = LineEditor::new();
    editor.set_completion_style(mode, ",");
    editor.insert_str(text);
    editor
}

proptest! {
    #[test]
    fn prop_cursor_stays_in_bounds(
        mode in mode_strategy(),
        edits in prop::collection::vec(edit_strategy(), 0..80),
    ) {
        let source = nicks(&["abe", "Abel", "bob", "cecile"]);
        let mut editor = LineEditor::new();
        editor.set_completion_style(mode, ",");

        for edit in &edits {
            apply(&mut editor, edit, &source);
            prop_assert!(editor.cursor() <= editor.len());
            prop_assert_eq!(editor.len(), editor.chars().len());
        }
    }

    #[test]
    fn prop_insert_then_delete_backward_restores(
        text in "[a-z é]{0,20}",
        cursor in 0usize..=20,
        ch in any::<char>().prop_filter("no carriage return", |c| *c != '\r'),
    ) {
        let mut editor = LineEditor::new();
        editor.insert_str(&text);
        for _ in 0..text.chars().count().saturating_sub(cursor) {
            editor.move_left();
        }
        let (before_text, before_cursor) = (editor.text(), editor.cursor());

        editor.insert_char(ch);
        prop_assert_eq!(editor.cursor(), before_cursor + 1);
        editor.delete_backward();

        prop_assert_eq!(editor.text(), before_text);
        prop_assert_eq!(editor.cursor(), before_cursor);
    }

    #[test]
    fn prop_submit_records_non_empty_lines(lines in prop::collection::vec("[a-z ]{0,8}", 0..10)) {
        let mut editor = LineEditor::new();
        for line in &lines {
            editor.insert_str(line);
            prop_assert_eq!(&editor.submit(), line);
            prop_assert!(editor.is_empty());
            prop_assert_eq!(editor.cursor(), 0);
        }
        let expected: Vec<&String> = lines.iter().filter(|l| !l.is_empty()).collect();
        let actual: Vec<&String> = editor.history().iter().collect();
        prop_assert_eq!(actual, expected);
    }
}

#[test]
fn normal_completion_cycles_through_matches() {
    let source = nicks(&["Alice", "Aline", "Bob"]);
    let mut editor = typed(CompletionMode::Normal, "al");

    assert!(editor.complete(&source));
    assert_eq!(editor.text(), "Alice, ");
    assert!(editor.complete(&source));
    assert_eq!(editor.text(), "Aline, ");
    assert!(editor.complete(&source));
    assert_eq!(editor.text(), "Alice, ");
    assert_eq!(editor.cursor(), editor.len());
}

#[test]
fn shell_completion_inserts_common_prefix_then_accepts_finished_nick() {
    let source = nicks(&["Alice", "Aline", "Bob"]);
    let mut editor = typed(CompletionMode::Shell, "al");

    assert!(editor.complete(&source));
    assert_eq!(editor.text(), "Ali");
    assert!(editor.is_completing());

    editor.insert_str("ce");
    assert!(editor.complete(&source));
    assert_eq!(editor.text(), "Alice, ");
}

#[test]
fn shell_completion_of_unique_match_adds_separator() {
    let mut editor = typed(CompletionMode::Shell, "hello b");
    assert!(editor.complete(&nicks(&["Alice", "Bob"])));
    assert_eq!(editor.text(), "hello Bob, ");
    assert!(!editor.is_completing());
}

#[test]
fn no_match_leaves_text_alone() {
    for mode in [CompletionMode::Normal, CompletionMode::Shell] {
        let mut editor = typed(mode, "zed");
        assert!(!editor.complete(&nicks(&["Alice"])));
        assert_eq!(editor.text(), "zed");
    }
}

#[test]
fn history_walk_round_trips_to_draft() {
    let mut editor = LineEditor::new();
    for line in ["first", "second"] {
        editor.insert_str(line);
        editor.submit();
    }
    editor.insert_str("draft");

    editor.history_up();
    assert_eq!(editor.text(), "second");
    editor.history_up();
    assert_eq!(editor.text(), "first");
    editor.history_up();
    assert_eq!(editor.text(), "first");
    editor.history_down();
    editor.history_down();
    assert_eq!(editor.text(), "draft");
    assert_eq!(editor.cursor(), 5);
}
