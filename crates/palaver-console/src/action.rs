//! Session side-effects.
//!
//! [`SessionAction`] is what the session asks the runtime to do. Repaints are
//! not actions: the session marks itself dirty and the runtime repaints once
//! per iteration.

use std::time::Duration;

use crate::transport::TransportRequest;

/// Actions produced by the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Hand a request to the transport.
    Transport(TransportRequest),

    /// A disconnection was requested; deliver
    /// [`SessionEvent::DisconnectTimeout`](crate::SessionEvent::DisconnectTimeout)
    /// if the transport has not confirmed it after `timeout`.
    AwaitDisconnect {
        /// Grace period.
        timeout: Duration,
    },

    /// End the event loop.
    Quit,
}
