//! End-to-end tests over the loopback transport.
//!
//! # Oracle Pattern
//!
//! A headless driver types a fixed script into a real session while the
//! loopback task answers its requests. Transport events always win over the
//! next keystroke, so every request is answered before typing resumes. Tests
//! end with oracle checks that verify:
//! - What the last painted frame shows
//! - The requests that reached the transport
//! - That the session quit once the transport confirmed disconnection

use std::{collections::VecDeque, time::Duration};

use palaver_console::{
    Driver, KeyInput, MemoryStore, Runtime, Session, SessionEvent, SystemClock, TextGrid,
    TransportRequest,
};
use palaver_tui::{LoopbackHandle, loopback};
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error)]
enum HeadlessError {
    #[error("script exhausted before the session quit")]
    ScriptExhausted,
    #[error("transport gone")]
    TransportGone,
}

struct HeadlessDriver {
    transport: LoopbackHandle,
    script: VecDeque<SessionEvent>,
    sent: Vec<TransportRequest>,
    frame: TextGrid,
}

impl HeadlessDriver {
    fn new(transport: LoopbackHandle, lines: &[&str]) -> Self {
        let mut script = VecDeque::from([SessionEvent::Resize(100, 20)]);
        for line in lines {
            script.extend(line.chars().map(|c| SessionEvent::Key(KeyInput::Char(c))));
            script.push_back(SessionEvent::Key(KeyInput::Enter));
        }
        Self { transport, script, sent: Vec::new(), frame: TextGrid::new(100, 20) }
    }
}

impl Driver for &mut HeadlessDriver {
    type Error = HeadlessError;
    type Instant = Instant;

    async fn poll_event(&mut self) -> Result<Option<SessionEvent>, Self::Error> {
        let wait = Duration::from_millis(200);
        if let Ok(Some(event)) =
            tokio::time::timeout(wait, self.transport.from_transport.recv()).await
        {
            return Ok(Some(event.into()));
        }
        self.script.pop_front().map(Some).ok_or(HeadlessError::ScriptExhausted)
    }

    async fn send(&mut self, request: TransportRequest) -> Result<(), Self::Error> {
        self.sent.push(request.clone());
        self.transport.to_transport.send(request).await.map_err(|_| HeadlessError::TransportGone)
    }

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn render(&mut self, session: &mut Session) -> Result<(), Self::Error> {
        let mut grid = TextGrid::new(100, 20);
        session.render(&mut grid);
        self.frame = grid;
        Ok(())
    }

    fn stop(&mut self) {
        self.transport.stop();
    }
}

fn session() -> Session {
    Session::new(Box::new(MemoryStore::new()), Box::new(SystemClock))
}

#[tokio::test]
async fn room_conversation_round_trip() {
    let mut driver = HeadlessDriver::new(loopback::spawn("me@localhost/palaver"), &[
        "/join lounge@muc.localhost",
        "hello room",
        "/quit",
    ]);

    Runtime::new(&mut driver, session()).run().await.unwrap();

    let frame = driver.frame.to_string();
    assert!(frame.contains("<me> hello room"), "{frame}");
    assert!(frame.contains("lounge@muc.localhost: Welcome to the loopback room"), "{frame}");
    assert!(driver.frame.row(18).starts_with("[0|1] lounge@muc.localhost"));

    assert!(driver.sent.iter().any(|request| matches!(
        request,
        TransportRequest::JoinRoom { room, nick, .. }
            if room == "lounge@muc.localhost" && nick == "me"
    )));
    assert!(matches!(driver.sent.last(), Some(TransportRequest::Disconnect { .. })));
}

#[tokio::test]
async fn direct_conversation_gets_echoed() {
    let mut driver = HeadlessDriver::new(loopback::spawn("me@localhost/palaver"), &[
        "/message bob@localhost ping",
        "/quit",
    ]);

    Runtime::new(&mut driver, session()).run().await.unwrap();

    let frame = driver.frame.to_string();
    // Our own line, then the peer's echo
    assert!(frame.contains("<me> ping"), "{frame}");
    assert!(frame.contains("<bob> ping"), "{frame}");
}
