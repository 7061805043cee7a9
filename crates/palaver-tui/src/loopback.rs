//! In-process loopback transport.
//!
//! Stands in for a chat server so the console can be used without a network.
//! Requests flow in and events flow out through mpsc channels; a tokio task
//! runs the [`Loopback`] state machine in between.
//!
//! Behaviour:
//! - Rooms are created on join and reflect our messages back
//! - Direct conversations echo every message from the peer
//! - Queries answer with this process's details
//! - Room listings show every room created so far on the asked server
//! - Remote bookmarks are kept in memory for the lifetime of the task

use std::collections::HashMap;

use palaver_console::{
    Bookmark, TransportEvent, TransportRequest,
    transport::{MemberInfo, Reply, RoomListing, capability, domain_part},
};
use tokio::sync::mpsc;

/// Name reported in answer to version queries.
pub const SOFTWARE_NAME: &str = "palaver-loopback";

const CAPABILITIES: [&str; 7] = [
    capability::MUC,
    capability::VERSION,
    capability::LAST_ACTIVITY,
    capability::MOOD,
    capability::ACTIVITY,
    capability::GAMING,
    capability::BOOKMARKS,
];

/// Loopback server state.
#[derive(Debug)]
pub struct Loopback {
    jid: String,
    /// Joined rooms and our nick in each.
    rooms: HashMap<String, String>,
    subjects: HashMap<String, String>,
    bookmarks: Vec<Bookmark>,
    connected: bool,
}

impl Loopback {
    /// Server for an account.
    pub fn new(jid: impl Into<String>) -> Self {
        Self {
            jid: jid.into(),
            rooms: HashMap::new(),
            subjects: HashMap::new(),
            bookmarks: Vec::new(),
            connected: false,
        }
    }

    /// Whether the session is still connected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Accept the connection.
    pub fn connect(&mut self) -> TransportEvent {
        self.connected = true;
        TransportEvent::Connected {
            jid: self.jid.clone(),
            capabilities: CAPABILITIES.iter().map(ToString::to_string).collect(),
        }
    }

    /// Process one request and return the events it causes.
    pub fn handle(&mut self, request: TransportRequest) -> Vec<TransportEvent> {
        if !self.connected {
            tracing::debug!(?request, "request after disconnection dropped");
            return Vec::new();
        }

        match request {
            TransportRequest::SendMessage { to, body } => self.message(to, body),
            TransportRequest::JoinRoom { room, nick, .. } => self.join(room, nick),
            TransportRequest::LeaveRoom { room, message, .. } => {
                match self.rooms.remove(&room) {
                    Some(nick) => vec![TransportEvent::MemberLeft { room, nick, reason: message }],
                    None => Vec::new(),
                }
            },
            TransportRequest::ChangeNick { room, nick } => {
                match self.rooms.insert(room.clone(), nick.clone()) {
                    Some(old) => vec![TransportEvent::NickChanged { room, old, new: nick }],
                    None => {
                        self.rooms.remove(&room);
                        Vec::new()
                    },
                }
            },
            TransportRequest::SetSubject { room, subject } => {
                let Some(nick) = self.rooms.get(&room).cloned() else {
                    return Vec::new();
                };
                self.subjects.insert(room.clone(), subject.clone());
                vec![TransportEvent::Subject { room, nick: Some(nick), subject }]
            },
            TransportRequest::DestroyRoom { id, room } => {
                let mut events = Vec::new();
                if let Some(nick) = self.rooms.remove(&room) {
                    let reason = Some("The room has been destroyed".to_string());
                    events.push(TransportEvent::MemberLeft { room: room.clone(), nick, reason });
                }
                self.subjects.remove(&room);
                events.push(TransportEvent::Reply { id, result: Ok(Reply::Done) });
                events
            },
            TransportRequest::ListRooms { id, server } => {
                vec![TransportEvent::Reply { id, result: Ok(Reply::Rooms(self.listing(&server))) }]
            },
            TransportRequest::GetVersion { id, .. } => vec![TransportEvent::Reply {
                id,
                result: Ok(Reply::Version {
                    name: SOFTWARE_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    os: Some(std::env::consts::OS.to_string()),
                }),
            }],
            TransportRequest::GetLastActivity { id, .. } => vec![TransportEvent::Reply {
                id,
                result: Ok(Reply::LastActivity { seconds: 0, message: None }),
            }],
            TransportRequest::FetchRemoteBookmarks { id } => vec![TransportEvent::Reply {
                id,
                result: Ok(Reply::Bookmarks(self.bookmarks.clone())),
            }],
            TransportRequest::SaveRemoteBookmarks { id, bookmarks } => {
                self.bookmarks = bookmarks;
                vec![TransportEvent::Reply { id, result: Ok(Reply::Done) }]
            },
            TransportRequest::SendRaw { id: Some(id), stanza } => {
                vec![TransportEvent::Reply { id, result: Ok(Reply::Stanza(stanza)) }]
            },
            TransportRequest::Disconnect { .. } => {
                self.connected = false;
                self.rooms.clear();
                vec![TransportEvent::Disconnected]
            },
            TransportRequest::SendPresence { .. }
            | TransportRequest::SendChatState { .. }
            | TransportRequest::Invite { .. }
            | TransportRequest::Decline { .. }
            | TransportRequest::PublishMood { .. }
            | TransportRequest::StopMood
            | TransportRequest::PublishActivity { .. }
            | TransportRequest::StopActivity
            | TransportRequest::PublishGaming { .. }
            | TransportRequest::StopGaming
            | TransportRequest::SendRaw { id: None, .. } => Vec::new(),
        }
    }

    fn message(&self, to: String, body: String) -> Vec<TransportEvent> {
        if let Some(nick) = self.rooms.get(&to) {
            return vec![TransportEvent::RoomMessage { room: to, nick: nick.clone(), body }];
        }
        match to.split_once('/') {
            // Private messages to room participants go nowhere
            Some((room, _)) if self.rooms.contains_key(room) => Vec::new(),
            _ => vec![TransportEvent::ChatMessage { from: to, body }],
        }
    }

    /// Rooms created on `server`, sorted by address.
    fn listing(&self, server: &str) -> Vec<RoomListing> {
        let mut rooms: Vec<RoomListing> = self
            .subjects
            .iter()
            .filter(|(room, _)| domain_part(room) == server)
            .map(|(room, subject)| RoomListing { jid: room.clone(), name: Some(subject.clone()) })
            .collect();
        rooms.sort_by(|a, b| a.jid.cmp(&b.jid));
        rooms
    }

    fn join(&mut self, room: String, nick: String) -> Vec<TransportEvent> {
        if self.rooms.contains_key(&room) {
            return Vec::new();
        }
        self.rooms.insert(room.clone(), nick.clone());
        let subject = self
            .subjects
            .entry(room.clone())
            .or_insert_with(|| "Welcome to the loopback room".to_string())
            .clone();
        vec![
            TransportEvent::MemberJoined { room: room.clone(), member: MemberInfo::new(&nick) },
            TransportEvent::SelfJoined { room: room.clone(), nick },
            TransportEvent::Subject { room, nick: None, subject },
        ]
    }
}

/// Handle to a running loopback task.
#[derive(Debug)]
pub struct LoopbackHandle {
    /// Requests for the transport.
    pub to_transport: mpsc::Sender<TransportRequest>,
    /// Events from the transport.
    pub from_transport: mpsc::Receiver<TransportEvent>,
    abort_handle: tokio::task::AbortHandle,
}

impl LoopbackHandle {
    /// Stop the task.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Spawn a loopback transport for `jid` and connect to it.
///
/// The task ends after a [`TransportRequest::Disconnect`], when the handle's
/// sender is dropped, or when [`LoopbackHandle::stop`] is called.
pub fn spawn(jid: impl Into<String>) -> LoopbackHandle {
    let (request_tx, mut request_rx) = mpsc::channel::<TransportRequest>(32);
    let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(32);
    let mut server = Loopback::new(jid);

    let handle = tokio::spawn(async move {
        if event_tx.send(server.connect()).await.is_err() {
            return;
        }

        while let Some(request) = request_rx.recv().await {
            for event in server.handle(request) {
                if event_tx.send(event).await.is_err() {
                    tracing::debug!("console gone, stopping loopback");
                    return;
                }
            }
            if !server.is_connected() {
                break;
            }
        }
        tracing::debug!("loopback stopped");
    });

    LoopbackHandle {
        to_transport: request_tx,
        from_transport: event_rx,
        abort_handle: handle.abort_handle(),
    }
}

#[cfg(test)]
mod tests {
    use palaver_console::{RequestId, transport::Status};

    use super::*;

    const ROOM: &str = "lounge@muc.localhost";

    fn connected() -> Loopback {
        let mut server = Loopback::new("me@localhost/palaver");
        server.connect();
        server
    }

    fn join(server: &mut Loopback) -> Vec<TransportEvent> {
        server.handle(TransportRequest::JoinRoom {
            room: ROOM.into(),
            nick: "me".into(),
            password: None,
            history_length: None,
            status: Status::default(),
        })
    }

    #[test]
    fn join_announces_self_and_subject() {
        let mut server = connected();
        let events = join(&mut server);

        let joined = TransportEvent::SelfJoined { room: ROOM.into(), nick: "me".into() };
        assert!(events.contains(&joined));
        assert!(matches!(events.last(), Some(TransportEvent::Subject { nick: None, .. })));
        assert!(join(&mut server).is_empty());
    }

    #[test]
    fn room_messages_are_reflected() {
        let mut server = connected();
        join(&mut server);

        let events =
            server.handle(TransportRequest::SendMessage { to: ROOM.into(), body: "hi".into() });
        assert_eq!(events, [TransportEvent::RoomMessage {
            room: ROOM.into(),
            nick: "me".into(),
            body: "hi".into(),
        }]);
    }

    #[test]
    fn direct_messages_are_echoed_by_peer() {
        let mut server = connected();
        let request =
            TransportRequest::SendMessage { to: "bob@localhost".into(), body: "yo".into() };
        let events = server.handle(request);
        assert_eq!(events, [TransportEvent::ChatMessage {
            from: "bob@localhost".into(),
            body: "yo".into(),
        }]);
    }

    #[test]
    fn saved_bookmarks_are_fetched_back() {
        let mut server = connected();
        let saved = vec![Bookmark::new(ROOM, palaver_console::BookmarkMethod::Pep)];
        server.handle(TransportRequest::SaveRemoteBookmarks {
            id: RequestId(1),
            bookmarks: saved.clone(),
        });

        let events = server.handle(TransportRequest::FetchRemoteBookmarks { id: RequestId(2) });
        assert_eq!(events, [TransportEvent::Reply {
            id: RequestId(2),
            result: Ok(Reply::Bookmarks(saved)),
        }]);
    }

    #[test]
    fn listing_shows_rooms_of_the_server() {
        let mut server = connected();
        join(&mut server);

        let list = |id, server: &str| TransportRequest::ListRooms { id, server: server.into() };
        let events = server.handle(list(RequestId(3), "muc.localhost"));
        assert_eq!(events, [TransportEvent::Reply {
            id: RequestId(3),
            result: Ok(Reply::Rooms(vec![RoomListing {
                jid: ROOM.into(),
                name: Some("Welcome to the loopback room".into()),
            }])),
        }]);

        let events = server.handle(list(RequestId(4), "elsewhere"));
        let empty = Ok(Reply::Rooms(Vec::new()));
        assert_eq!(events, [TransportEvent::Reply { id: RequestId(4), result: empty }]);
    }

    #[test]
    fn nothing_happens_after_disconnect() {
        let mut server = connected();
        assert_eq!(server.handle(TransportRequest::Disconnect { message: None }), [
            TransportEvent::Disconnected
        ]);
        assert!(join(&mut server).is_empty());
    }

    #[tokio::test]
    async fn spawned_task_connects_and_answers() {
        let mut handle = spawn("me@localhost/palaver");

        let first = handle.from_transport.recv().await.unwrap();
        assert!(matches!(first, TransportEvent::Connected { .. }));

        handle
            .to_transport
            .send(TransportRequest::GetVersion { id: RequestId(7), jid: "localhost".into() })
            .await
            .unwrap();
        let reply = handle.from_transport.recv().await.unwrap();
        assert!(matches!(reply, TransportEvent::Reply { id: RequestId(7), result: Ok(_) }));

        handle.to_transport.send(TransportRequest::Disconnect { message: None }).await.unwrap();
        assert_eq!(handle.from_transport.recv().await, Some(TransportEvent::Disconnected));
        // The task ends and drops its sender
        assert_eq!(handle.from_transport.recv().await, None);
    }
}
