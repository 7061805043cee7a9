//! Generic event loop.
//!
//! The Runtime drives the session with a [`Driver`]:
//! 1. Wait for one event (terminal or transport)
//! 2. Let the [`Session`] handle it to completion
//! 3. Execute the actions it returned
//! 4. Repaint once if anything changed
//!
//! The only timer lives here: after the session asks for a disconnection,
//! the runtime delivers [`SessionEvent::DisconnectTimeout`] once the grace
//! period has passed without the transport confirming it.

use std::time::Duration;

use crate::{Driver, Session, SessionAction, SessionEvent};

/// Generic runtime that orchestrates a [`Session`] and a [`Driver`].
pub struct Runtime<D: Driver> {
    driver: D,
    session: Session,
    /// When the disconnection was requested, and how long to wait.
    disconnect_deadline: Option<(D::Instant, Duration)>,
}

impl<D: Driver> Runtime<D> {
    /// Create a runtime around an already configured session.
    pub fn new(driver: D, session: Session) -> Self {
        Self { driver, session, disconnect_deadline: None }
    }

    /// Run until the session quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails (terminal lost, transport gone).
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.driver.render(&mut self.session)?;
        self.session.take_dirty();

        loop {
            if self.process_cycle().await? {
                break;
            }
        }

        self.driver.stop();
        Ok(())
    }

    /// Process one iteration. Returns `true` if the session quit.
    ///
    /// The disconnect deadline is checked after every poll, whatever it
    /// returned. An expired deadline is delivered before the polled event.
    async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        let polled = self.driver.poll_event().await?;

        if self.deadline_passed() {
            self.disconnect_deadline = None;
            if self.dispatch(SessionEvent::DisconnectTimeout).await? {
                return Ok(true);
            }
        }
        let quit = match polled {
            Some(event) => self.dispatch(event).await?,
            None => false,
        };

        if !quit && self.session.take_dirty() {
            self.driver.render(&mut self.session)?;
        }
        Ok(quit)
    }

    /// Handle one event and execute its actions. Returns `true` on quit.
    async fn dispatch(&mut self, event: SessionEvent) -> Result<bool, D::Error> {
        let actions = self.session.handle(event);
        self.process_actions(actions).await
    }

    /// Execute session actions. Returns `true` on quit.
    async fn process_actions(&mut self, actions: Vec<SessionAction>) -> Result<bool, D::Error> {
        for action in actions {
            match action {
                SessionAction::Transport(request) => {
                    tracing::debug!(?request, "sending transport request");
                    self.driver.send(request).await?;
                },
                SessionAction::AwaitDisconnect { timeout } => {
                    self.disconnect_deadline = Some((self.driver.now(), timeout));
                },
                SessionAction::Quit => return Ok(true),
            }
        }
        Ok(false)
    }

    fn deadline_passed(&self) -> bool {
        self.disconnect_deadline
            .is_some_and(|(since, timeout)| self.driver.now() - since >= timeout)
    }
}
