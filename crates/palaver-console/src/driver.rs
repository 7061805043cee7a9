//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the event loop from the terminal and the
//! transport. Each frontend implements it; the generic [`crate::Runtime`]
//! does all the orchestration.

use std::{future::Future, ops::Sub, time::Duration};

use crate::{Session, SessionEvent, transport::TransportRequest};

/// Abstracts I/O for the session runtime.
///
/// # Implementations
///
/// - **TUI**: crossterm events and ratatui rendering, with an in-process
///   loopback transport
/// - **Tests**: a scripted driver replaying a fixed list of events
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in tests.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Wait for the next event from the terminal or the transport.
    ///
    /// Returns `None` if nothing arrived before the driver's poll interval.
    fn poll_event(
        &mut self,
    ) -> impl Future<Output = Result<Option<SessionEvent>, Self::Error>> + Send;

    /// Hand a request to the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is gone.
    fn send(
        &mut self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Paint the session.
    ///
    /// # Errors
    ///
    /// Returns an error if drawing fails.
    fn render(&mut self, session: &mut Session) -> Result<(), Self::Error>;

    /// Release the terminal and the transport.
    fn stop(&mut self);
}
