//! Typed configuration over a [`Store`].
//!
//! Every known option has a default. A value missing from the store, or one
//! that fails to parse, falls back to it.

use std::{str::FromStr, time::Duration};

use crate::store::Store;

/// Section holding the global options.
pub const DEFAULT_SECTION: &str = "Options";

/// Section mapping key names to the key they act as.
pub const BINDINGS_SECTION: &str = "bindings";

/// Known options and their defaults.
pub const DEFAULTS: &[(&str, &str)] = &[
    ("command_prefix", "/"),
    ("completion", "normal"),
    ("after_completion", ","),
    ("nick", ""),
    ("muc_history_length", "50"),
    ("use_remote_bookmarks", "true"),
    ("use_bookmarks_method", "pep"),
    ("enable_user_mood", "true"),
    ("enable_user_activity", "true"),
    ("enable_user_gaming", "true"),
    ("send_chat_states", "true"),
    ("max_lines_in_memory", "2048"),
    ("plugins_autoload", ""),
    ("disconnect_timeout", "5"),
];

/// Default value of a known option.
pub fn default_value(key: &str) -> Option<&'static str> {
    DEFAULTS.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Parse a boolean option value.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Read-only typed view of the configuration.
pub struct Config<'a> {
    store: &'a dyn Store,
}

impl<'a> Config<'a> {
    /// View over `store`.
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Value of `key` in the default section, or its default, or empty.
    pub fn get(&self, key: &str) -> String {
        self.get_in(key, None).unwrap_or_default()
    }

    /// Value of `key` in `section`, falling back to the default.
    pub fn get_in(&self, key: &str, section: Option<&str>) -> Option<String> {
        self.store
            .config_get(key, section)
            .or_else(|| default_value(key).map(str::to_string))
    }

    /// Parsed value of `key`, falling back to the parsed default.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get(key);
        raw.parse().ok().or_else(|| {
            tracing::warn!(key, value = %raw, "invalid option value, using default");
            default_value(key).and_then(|d| d.parse().ok())
        })
    }

    /// Boolean option.
    pub fn get_bool(&self, key: &str) -> bool {
        parse_bool(&self.get(key))
            .or_else(|| default_value(key).and_then(parse_bool))
            .unwrap_or(false)
    }

    /// Unsigned option.
    pub fn get_u64(&self, key: &str) -> u64 {
        self.get_parsed(key).unwrap_or(0)
    }

    /// Command prefix; never empty.
    pub fn command_prefix(&self) -> String {
        let prefix = self.get("command_prefix");
        if prefix.is_empty() { "/".to_string() } else { prefix }
    }

    /// Scrollback cap. `None` is unbounded.
    pub fn scrollback_cap(&self) -> Option<usize> {
        usize::try_from(self.get_u64("max_lines_in_memory")).ok().filter(|&cap| cap > 0)
    }

    /// Grace period for a clean disconnection on quit.
    pub fn disconnect_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64("disconnect_timeout"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn defaults_apply_when_unset() {
        let store = MemoryStore::new();
        let config = Config::new(&store);
        assert_eq!(config.get("after_completion"), ",");
        assert!(config.get_bool("send_chat_states"));
        assert_eq!(config.get_u64("muc_history_length"), 50);
        assert_eq!(config.get("unknown_option"), "");
    }

    #[test]
    fn invalid_values_fall_back() {
        let store = MemoryStore::with_options([
            ("max_lines_in_memory", "lots"),
            ("send_chat_states", "maybe"),
            ("command_prefix", ""),
        ]);
        let config = Config::new(&store);
        assert_eq!(config.scrollback_cap(), Some(2048));
        assert!(config.get_bool("send_chat_states"));
        assert_eq!(config.command_prefix(), "/");
    }

    #[test]
    fn zero_cap_is_unbounded() {
        let store = MemoryStore::with_options([("max_lines_in_memory", "0")]);
        assert_eq!(Config::new(&store).scrollback_cap(), None);
    }
}
