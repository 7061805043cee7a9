//! Terminal-agnostic keyboard input.

/// Keyboard input abstraction.
///
/// Decouples session logic from terminal libraries (crossterm, termion,
/// etc.) so the whole core can be driven from tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character.
    Char(char),
    /// Enter/Return key (submit line).
    Enter,
    /// Backspace key (delete character before cursor).
    Backspace,
    /// Delete key (delete character at cursor).
    Delete,
    /// Tab key (nick completion).
    Tab,
    /// Left arrow key.
    Left,
    /// Right arrow key.
    Right,
    /// Up arrow key (older history entry).
    Up,
    /// Down arrow key (newer history entry).
    Down,
    /// Home key (cursor to start).
    Home,
    /// End key (cursor to end).
    End,
    /// Ctrl-W (delete word before cursor).
    DeleteWord,
    /// Ctrl-U (delete everything before cursor).
    KillLine,
    /// Ctrl-N (focus next tab).
    NextTab,
    /// Ctrl-P (focus previous tab).
    PreviousTab,
}

/// Names of the bindable keys, as written in the `bindings` section.
const KEY_NAMES: &[(&str, KeyInput)] = &[
    ("KEY_ENTER", KeyInput::Enter),
    ("KEY_BACKSPACE", KeyInput::Backspace),
    ("KEY_DC", KeyInput::Delete),
    ("^I", KeyInput::Tab),
    ("KEY_LEFT", KeyInput::Left),
    ("KEY_RIGHT", KeyInput::Right),
    ("KEY_UP", KeyInput::Up),
    ("KEY_DOWN", KeyInput::Down),
    ("KEY_HOME", KeyInput::Home),
    ("KEY_END", KeyInput::End),
    ("^W", KeyInput::DeleteWord),
    ("^U", KeyInput::KillLine),
    ("^N", KeyInput::NextTab),
    ("^P", KeyInput::PreviousTab),
];

impl KeyInput {
    /// Name of the key in the `bindings` section. Printable characters have
    /// none and cannot be rebound.
    pub fn name(self) -> Option<&'static str> {
        KEY_NAMES.iter().find(|(_, key)| *key == self).map(|(name, _)| *name)
    }

    /// Key called `name`.
    pub fn from_name(name: &str) -> Option<Self> {
        KEY_NAMES.iter().find(|(n, _)| *n == name).map(|(_, key)| *key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_for_named_keys() {
        assert_eq!(KeyInput::NextTab.name(), Some("^N"));
        assert_eq!(KeyInput::from_name("KEY_UP"), Some(KeyInput::Up));
        assert_eq!(KeyInput::Char('x').name(), None);
        assert_eq!(KeyInput::from_name("^Z"), None);
    }
}
