//! Session input events.
//!
//! [`SessionEvent`] is everything that can wake the event loop: keystrokes,
//! pastes and resizes from the terminal, notifications from the transport,
//! and timer expiries.

use crate::{KeyInput, transport::TransportEvent};

/// Events processed by the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Pasted text, inserted as a whole.
    Paste(String),

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Notification from the transport.
    Transport(TransportEvent),

    /// Periodic tick.
    Tick,

    /// The transport did not confirm disconnection in time.
    DisconnectTimeout,
}

impl From<KeyInput> for SessionEvent {
    fn from(key: KeyInput) -> Self {
        Self::Key(key)
    }
}

impl From<TransportEvent> for SessionEvent {
    fn from(event: TransportEvent) -> Self {
        Self::Transport(event)
    }
}
