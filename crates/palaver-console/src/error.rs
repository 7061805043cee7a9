//! Error types for the session core.
//!
//! Errors are split by layer: registry invariant violations
//! ([`RegistryError`]), argument arity failures ([`ArgumentError`]), everything
//! a command can fail with ([`CommandError`]), raw stanzas that do not parse
//! ([`StanzaError`]), plugin loading ([`PluginError`]) and persistence
//! failures ([`StoreError`]).
//!
//! None of these are fatal. The session converts every one of them into a
//! single line for the user and keeps running.

use thiserror::Error;

use crate::tabs::TabKind;

/// Tab registry invariant violations.
///
/// The registry is left unchanged when any of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No tab matches the given reference.
    #[error("tab {0} does not exist")]
    TabNotFound(String),

    /// A tab with the same name and kind is already open.
    #[error("a {kind} tab named {name} is already open")]
    DuplicateTab {
        /// Conversation identifier.
        name: String,
        /// Kind of the existing tab.
        kind: TabKind,
    },

    /// The informational tab lives for the whole session.
    #[error("the informational tab cannot be closed")]
    CannotCloseSingleton,

    /// Slot index outside the registry.
    #[error("invalid slot {slot} (there are {len} tabs)")]
    InvalidSlot {
        /// Requested slot.
        slot: usize,
        /// Number of open tabs.
        len: usize,
    },
}

/// Arity failure while parsing quoted command arguments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected at least {min} argument(s), got {got}")]
pub struct ArgumentError {
    /// Declared minimum.
    pub min: usize,
    /// Number of tokens found.
    pub got: usize,
}

/// Failures a command can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Malformed or insufficient arguments for `command`.
    #[error("{prefix}{command}: {source}")]
    Argument {
        /// Command prefix in effect.
        prefix: String,
        /// Command name without prefix.
        command: String,
        /// Underlying arity failure.
        source: ArgumentError,
    },

    /// No handler is bound to this name in the current tab or globally.
    #[error("unknown command: {prefix}{name} (type {prefix}help for the list of commands)")]
    UnknownCommand {
        /// Command prefix in effect.
        prefix: String,
        /// Name as typed.
        name: String,
    },

    /// Operation needs a live transport connection.
    #[error("not connected")]
    TransportUnavailable,

    /// The transport does not advertise a capability the command needs.
    #[error("the server does not support {0}")]
    CapabilityUnavailable(&'static str),

    /// Registry invariant violation.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Externally supplied payload could not be parsed.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] StanzaError),

    /// A value was rejected by the handler.
    #[error("{0}")]
    Invalid(String),

    /// Persistence layer failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A plugin could not be loaded.
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

/// Plugin loading failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    /// No built-in plugin has this name.
    #[error("no plugin named {0}")]
    Unknown(String),

    /// The plugin would shadow a command that is already registered.
    #[error("plugin {plugin} cannot register {command}: the name is taken")]
    CommandTaken {
        /// Plugin being loaded.
        plugin: String,
        /// Conflicting command name.
        command: String,
    },
}

/// Raw XML that is not a single well-formed document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StanzaError {
    /// Nothing but whitespace.
    #[error("empty stanza")]
    Empty,

    /// The parser rejected the text.
    #[error("{0}")]
    Malformed(String),
}

/// Persistence collaborator failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Reading or writing the backing medium failed.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Stored data could not be encoded or decoded.
    #[error("storage format error: {0}")]
    Format(String),
}
