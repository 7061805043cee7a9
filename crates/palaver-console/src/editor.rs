//! Line editor.
//!
//! Pure state machine over the input line: text, cursor, history and nick
//! completion. Every operation moves it to exactly one new state.
//!
//! # Completion
//!
//! Two modes, picked by configuration:
//!
//! - [`CompletionMode::Normal`] replaces the last word with the first matching
//!   nick plus the separator, and each further trigger cycles to the next
//!   match.
//! - [`CompletionMode::Shell`] completes a unique match directly. With several
//!   matches it first inserts their longest common prefix, then waits for the
//!   user to disambiguate; a second trigger only accepts a candidate that
//!   equals what has been typed.
//!
//! Any edit other than a completion trigger ends cycling.

use std::{fmt, str::FromStr};

/// Nick completion algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Cycle through every match.
    #[default]
    Normal,
    /// Longest common prefix first, like a shell.
    Shell,
}

impl FromStr for CompletionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "shell" => Ok(Self::Shell),
            other => Err(format!("unknown completion mode: {other}")),
        }
    }
}

impl fmt::Display for CompletionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Shell => f.write_str("shell"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Completion {
    /// Cycling through `candidates`; the head is currently inserted.
    Cycling { start: usize, candidates: Vec<String> },
    /// Common prefix inserted, waiting for disambiguation.
    Ambiguous { start: usize },
}

/// Input line state.
#[derive(Debug, Clone, Default)]
pub struct LineEditor {
    text: Vec<char>,
    cursor: usize,
    history: Vec<String>,
    /// `None` is the live edit buffer, past the newest history entry.
    history_cursor: Option<usize>,
    /// Live text saved while browsing history.
    draft: Vec<char>,
    completion: Option<Completion>,
    mode: CompletionMode,
    separator: String,
}

impl LineEditor {
    /// Empty editor in normal completion mode with `", "` as separator.
    pub fn new() -> Self {
        Self { separator: ", ".to_string(), ..Self::default() }
    }

    /// Select the completion algorithm and the text inserted after a
    /// completed nick. The separator is `after_completion` plus one space.
    pub fn set_completion_style(&mut self, mode: CompletionMode, after_completion: &str) {
        self.mode = mode;
        self.separator = format!("{after_completion} ");
        self.completion = None;
    }

    /// Current completion mode.
    pub fn completion_mode(&self) -> CompletionMode {
        self.mode
    }

    /// Current text.
    pub fn text(&self) -> String {
        self.text.iter().collect()
    }

    /// Current text as characters.
    pub fn chars(&self) -> &[char] {
        &self.text
    }

    /// Cursor position, in `0..=len`.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of characters.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// True when the line is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Submitted lines, newest last.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// True while completion is cycling.
    pub fn is_completing(&self) -> bool {
        self.completion.is_some()
    }

    /// Replace the whole line and put the cursor at the end.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.chars().collect();
        self.cursor = self.text.len();
        self.completion = None;
    }

    /// Insert a character at the cursor.
    pub fn insert_char(&mut self, ch: char) {
        self.completion = None;
        self.text.insert(self.cursor, ch);
        self.cursor += 1;
    }

    /// Insert pasted text at the cursor.
    pub fn insert_str(&mut self, text: &str) {
        self.completion = None;
        let chars: Vec<char> = text.chars().filter(|&c| c != '\r').collect();
        let count = chars.len();
        self.text.splice(self.cursor..self.cursor, chars);
        self.cursor += count;
    }

    /// Delete the character under the cursor.
    pub fn delete_forward(&mut self) {
        self.completion = None;
        if self.cursor < self.text.len() {
            self.text.remove(self.cursor);
        }
    }

    /// Delete the character before the cursor.
    pub fn delete_backward(&mut self) {
        self.completion = None;
        if self.cursor > 0 {
            self.cursor -= 1;
            self.text.remove(self.cursor);
        }
    }

    /// Delete the word before the cursor, along with the blanks after it.
    pub fn delete_word_backward(&mut self) {
        self.completion = None;
        let mut start = self.cursor;
        while start > 0 && self.text[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !self.text[start - 1].is_whitespace() {
            start -= 1;
        }
        self.text.drain(start..self.cursor);
        self.cursor = start;
    }

    /// Delete everything before the cursor.
    pub fn kill_to_start(&mut self) {
        self.completion = None;
        self.text.drain(..self.cursor);
        self.cursor = 0;
    }

    /// Move the cursor one character left.
    pub fn move_left(&mut self) {
        self.completion = None;
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move the cursor one character right.
    pub fn move_right(&mut self) {
        self.completion = None;
        if self.cursor < self.text.len() {
            self.cursor += 1;
        }
    }

    /// Move the cursor to the start of the line.
    pub fn move_home(&mut self) {
        self.completion = None;
        self.cursor = 0;
    }

    /// Move the cursor to the end of the line.
    pub fn move_end(&mut self) {
        self.completion = None;
        self.cursor = self.text.len();
    }

    /// Show the previous history entry.
    ///
    /// Leaving the live buffer saves it; [`history_down`](Self::history_down)
    /// past the newest entry restores it.
    pub fn history_up(&mut self) {
        self.completion = None;
        let index = match self.history_cursor {
            _ if self.history.is_empty() => return,
            None => {
                self.draft = std::mem::take(&mut self.text);
                self.history.len() - 1
            },
            Some(0) => return,
            Some(i) => i - 1,
        };
        self.load_history(index);
    }

    /// Show the next history entry, or the live buffer past the newest.
    pub fn history_down(&mut self) {
        self.completion = None;
        match self.history_cursor {
            None => {},
            Some(i) if i + 1 < self.history.len() => self.load_history(i + 1),
            Some(_) => {
                self.history_cursor = None;
                self.text = std::mem::take(&mut self.draft);
                self.cursor = self.text.len();
            },
        }
    }

    /// Take the line, recording it in history when non-empty.
    pub fn submit(&mut self) -> String {
        let line: String = std::mem::take(&mut self.text).into_iter().collect();
        if !line.is_empty() {
            self.history.push(line.clone());
        }
        self.cursor = 0;
        self.history_cursor = None;
        self.draft.clear();
        self.completion = None;
        line
    }

    /// Complete the nick before the cursor from `source`, in source order.
    ///
    /// Only acts when the cursor is at the end of a non-empty line. Returns
    /// true when the text changed.
    pub fn complete(&mut self, source: &[String]) -> bool {
        if self.text.is_empty() || self.cursor != self.text.len() {
            return false;
        }
        match self.mode {
            CompletionMode::Normal => self.complete_normal(source),
            CompletionMode::Shell => self.complete_shell(source),
        }
    }

    fn complete_normal(&mut self, source: &[String]) -> bool {
        if let Some(Completion::Cycling { start, candidates }) = &mut self.completion {
            candidates.rotate_left(1);
            let start = *start;
            let head = candidates[0].clone();
            self.replace_from(start, &head, true);
            return true;
        }

        let start = self.token_start();
        if start == self.text.len() {
            return false;
        }
        let candidates = matching(source, &self.text[start..]);
        let Some(head) = candidates.first().cloned() else {
            return false;
        };
        self.replace_from(start, &head, true);
        self.completion = Some(Completion::Cycling { start, candidates });
        true
    }

    fn complete_shell(&mut self, source: &[String]) -> bool {
        if let Some(Completion::Ambiguous { start }) = self.completion {
            let typed: String = self.text[start..].iter().collect::<String>().to_lowercase();
            let exact = matching(source, &self.text[start..])
                .into_iter()
                .find(|candidate| candidate.to_lowercase() == typed);
            return match exact {
                Some(nick) => {
                    self.replace_from(start, &nick, true);
                    self.completion = None;
                    true
                },
                None => false,
            };
        }

        let start = self.token_start();
        if start == self.text.len() {
            return false;
        }
        let candidates = matching(source, &self.text[start..]);
        match candidates.as_slice() {
            [] => false,
            [only] => {
                let only = only.clone();
                self.replace_from(start, &only, true);
                self.completion = None;
                true
            },
            several => {
                let prefix = common_prefix(several);
                let before = self.text.clone();
                self.replace_from(start, &prefix, false);
                self.completion = Some(Completion::Ambiguous { start });
                self.text != before
            },
        }
    }

    /// Start of the trailing run of non-whitespace characters.
    fn token_start(&self) -> usize {
        self.text.iter().rposition(|c| c.is_whitespace()).map_or(0, |i| i + 1)
    }

    fn replace_from(&mut self, start: usize, word: &str, separator: bool) {
        self.text.truncate(start);
        self.text.extend(word.chars());
        if separator {
            self.text.extend(self.separator.chars());
        }
        self.cursor = self.text.len();
    }

    fn load_history(&mut self, index: usize) {
        self.history_cursor = Some(index);
        self.text = self.history[index].chars().collect();
        self.cursor = self.text.len();
    }
}

/// Nicks whose lowercase form starts with the lowercase `prefix`.
fn matching(source: &[String], prefix: &[char]) -> Vec<String> {
    let prefix: String = prefix.iter().collect::<String>().to_lowercase();
    source.iter().filter(|nick| nick.to_lowercase().starts_with(&prefix)).cloned().collect()
}

/// Longest case-insensitive common prefix, spelled as in the first candidate.
fn common_prefix(candidates: &[String]) -> String {
    let Some((first, rest)) = candidates.split_first() else {
        return String::new();
    };
    let mut len = first.chars().count();
    for other in rest {
        len = first
            .chars()
            .zip(other.chars())
            .take(len)
            .take_while(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
            .count();
    }
    first.chars().take(len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nicks(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    fn typed(text: &str) -> LineEditor {
        let mut editor = LineEditor::new();
        editor.insert_str(text);
        editor
    }

    #[test]
    fn common_prefix_keeps_first_spelling() {
        assert_eq!(common_prefix(&nicks(&["Alice", "aline"])), "Ali");
        assert_eq!(common_prefix(&nicks(&["bob"])), "bob");
        assert_eq!(common_prefix(&nicks(&["x", "y"])), "");
    }

    #[test]
    fn normal_completion_replaces_last_word_only() {
        let mut editor = typed("hi al");
        assert!(editor.complete(&nicks(&["Alice"])));
        assert_eq!(editor.text(), "hi Alice, ");
    }

    #[test]
    fn completion_needs_cursor_at_end() {
        let mut editor = typed("al");
        editor.move_left();
        assert!(!editor.complete(&nicks(&["Alice"])));
        assert_eq!(editor.text(), "al");
    }

    #[test]
    fn empty_prefix_is_noop() {
        let mut editor = typed("hello ");
        assert!(!editor.complete(&nicks(&["Alice"])));
        assert!(!editor.is_completing());
    }

    #[test]
    fn edit_ends_cycling() {
        let source = nicks(&["Alice", "Aline"]);
        let mut editor = typed("al");
        editor.complete(&source);
        editor.insert_char('!');
        assert!(!editor.is_completing());
        assert_eq!(editor.text(), "Alice, !");
    }

    #[test]
    fn custom_separator() {
        let mut editor = typed("bo");
        editor.set_completion_style(CompletionMode::Normal, ":");
        editor.complete(&nicks(&["bob"]));
        assert_eq!(editor.text(), "bob: ");
    }

    #[test]
    fn shell_second_trigger_accepts_exact_match() {
        let source = nicks(&["Alice", "Alicent"]);
        let mut editor = typed("ALICE");
        editor.set_completion_style(CompletionMode::Shell, ",");

        // Common prefix equals the typed text; only the case changes
        assert!(editor.complete(&source));
        assert_eq!(editor.text(), "Alice");
        assert!(editor.complete(&source));
        assert_eq!(editor.text(), "Alice, ");
    }

    #[test]
    fn shell_ambiguous_second_trigger_is_noop() {
        let source = nicks(&["Alice", "Aline"]);
        let mut editor = typed("al");
        editor.set_completion_style(CompletionMode::Shell, ",");

        assert!(editor.complete(&source));
        assert_eq!(editor.text(), "Ali");
        assert!(!editor.complete(&source));
        assert_eq!(editor.text(), "Ali");
        assert!(editor.is_completing());
    }

    #[test]
    fn history_restores_draft() {
        let mut editor = LineEditor::new();
        editor.insert_str("first");
        editor.submit();
        editor.insert_str("second");
        editor.submit();
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

    #[test]
    fn empty_lines_stay_out_of_history() {
        let mut editor = LineEditor::new();
        assert_eq!(editor.submit(), "");
        assert!(editor.history().is_empty());
    }

    #[test]
    fn delete_word_eats_trailing_blanks() {
        let mut editor = typed("say hello  ");
        editor.delete_word_backward();
        assert_eq!(editor.text(), "say ");
        editor.kill_to_start();
        assert_eq!(editor.text(), "");
        assert_eq!(editor.cursor(), 0);
    }
}
