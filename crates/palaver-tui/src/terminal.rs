//! Terminal driver for the TUI.
//!
//! Implements the [`Driver`] trait for terminal I/O using crossterm for
//! keyboard events and ratatui for rendering. The transport is the in-process
//! [`loopback`](crate::loopback).

use std::{
    collections::VecDeque,
    io::{self, Stdout, stdout},
    time::Instant,
};

use crossterm::{
    ExecutableCommand,
    event::{
        DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers,
    },
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use palaver_console::{Driver, KeyInput, Session, SessionEvent, TransportRequest};
use ratatui::{Terminal, backend::CrosstermBackend};
use thiserror::Error;

use crate::{loopback::LoopbackHandle, ui};

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Channel send error.
    #[error("channel send error")]
    ChannelSend,
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// Handles terminal I/O (crossterm), rendering (ratatui) and the channels to
/// the transport task.
pub struct TerminalDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
    transport: LoopbackHandle,
    transport_open: bool,
    /// Events produced before the first poll.
    pending: VecDeque<SessionEvent>,
}

impl TerminalDriver {
    /// Take over the terminal.
    ///
    /// The first polled event reports the current terminal size.
    pub fn new(transport: LoopbackHandle) -> Result<Self, TerminalError> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        stdout().execute(EnableBracketedPaste)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;
        let (cols, rows) = terminal::size()?;

        Ok(Self {
            terminal,
            event_stream: EventStream::new(),
            transport,
            transport_open: true,
            pending: VecDeque::from([SessionEvent::Resize(cols, rows)]),
        })
    }

    /// Convert a crossterm key press to `KeyInput`.
    fn convert_key(key: KeyEvent) -> Option<KeyInput> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('w') => Some(KeyInput::DeleteWord),
                KeyCode::Char('u') => Some(KeyInput::KillLine),
                KeyCode::Char('n') => Some(KeyInput::NextTab),
                KeyCode::Char('p') => Some(KeyInput::PreviousTab),
                KeyCode::Char('a') => Some(KeyInput::Home),
                KeyCode::Char('e') => Some(KeyInput::End),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Delete => Some(KeyInput::Delete),
            KeyCode::Tab => Some(KeyInput::Tab),
            KeyCode::Left => Some(KeyInput::Left),
            KeyCode::Right => Some(KeyInput::Right),
            KeyCode::Up => Some(KeyInput::Up),
            KeyCode::Down => Some(KeyInput::Down),
            KeyCode::Home => Some(KeyInput::Home),
            KeyCode::End => Some(KeyInput::End),
            _ => None,
        }
    }
}

impl Driver for TerminalDriver {
    type Error = TerminalError;
    type Instant = Instant;

    async fn poll_event(&mut self) -> Result<Option<SessionEvent>, Self::Error> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        let timeout = tokio::time::Duration::from_millis(100);

        tokio::select! {
            biased;

            // Transport notifications
            maybe_event = self.transport.from_transport.recv(), if self.transport_open => {
                match maybe_event {
                    Some(event) => Ok(Some(event.into())),
                    None => {
                        tracing::info!("transport task ended");
                        self.transport_open = false;
                        Ok(None)
                    },
                }
            }

            // Terminal events
            maybe_event = self.event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) if key_event.kind == KeyEventKind::Press => {
                        Ok(Self::convert_key(key_event).map(SessionEvent::Key))
                    },
                    Some(Ok(Event::Paste(text))) => Ok(Some(SessionEvent::Paste(text))),
                    Some(Ok(Event::Resize(cols, rows))) => {
                        Ok(Some(SessionEvent::Resize(cols, rows)))
                    },
                    Some(Err(e)) => Err(TerminalError::Io(e)),
                    _ => Ok(None),
                }
            }

            // Tick timeout
            () = tokio::time::sleep(timeout) => {
                Ok(Some(SessionEvent::Tick))
            }
        }
    }

    async fn send(&mut self, request: TransportRequest) -> Result<(), Self::Error> {
        if !self.transport_open {
            tracing::warn!(?request, "transport closed, request dropped");
            return Ok(());
        }
        self.transport.to_transport.send(request).await.map_err(|_| TerminalError::ChannelSend)
    }

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn render(&mut self, session: &mut Session) -> Result<(), Self::Error> {
        self.terminal.draw(|frame| {
            ui::render(frame, session);
        })?;
        Ok(())
    }

    fn stop(&mut self) {
        self.transport.stop();
    }
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        self.stop();
        let _ = stdout().execute(DisableBracketedPaste);
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}
