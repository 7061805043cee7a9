//! Messaging transport interface.
//!
//! The transport is an external collaborator. The session talks to it only
//! through [`TransportRequest`] values (emitted as actions) and hears back
//! through [`TransportEvent`] values (fed in as events). Requests that expect
//! an answer carry a [`RequestId`]; the transport answers each of them exactly
//! once with [`TransportEvent::Reply`].

use std::{collections::BTreeSet, fmt, str::FromStr};

use crate::{
    bookmark::Bookmark,
    participant::{Affiliation, Role},
};

/// Capability names advertised by the transport.
pub mod capability {
    /// Multi-user chat rooms.
    pub const MUC: &str = "muc";
    /// Software version queries.
    pub const VERSION: &str = "version";
    /// Last activity queries.
    pub const LAST_ACTIVITY: &str = "last_activity";
    /// User mood publication.
    pub const MOOD: &str = "mood";
    /// User activity publication.
    pub const ACTIVITY: &str = "activity";
    /// User gaming publication.
    pub const GAMING: &str = "gaming";
    /// Server-side bookmark storage.
    pub const BOOKMARKS: &str = "bookmarks";
}

/// Identifier correlating a request with its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Chat state notification sent to a conversation peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    /// Looking at the conversation.
    Active,
    /// Typing.
    Composing,
    /// Not looking at the conversation.
    Inactive,
    /// Conversation closed.
    Gone,
}

/// Availability of a contact or of ourselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresenceShow {
    /// Online.
    #[default]
    Available,
    /// Eager to chat.
    Chat,
    /// Temporarily away.
    Away,
    /// Away for a long time.
    ExtendedAway,
    /// Busy.
    DoNotDisturb,
}

impl PresenceShow {
    /// Short display name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Chat => "chat",
            Self::Away => "away",
            Self::ExtendedAway => "xa",
            Self::DoNotDisturb => "dnd",
        }
    }
}

impl fmt::Display for PresenceShow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresenceShow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" | "online" => Ok(Self::Available),
            "chat" => Ok(Self::Chat),
            "away" | "afk" => Ok(Self::Away),
            "dnd" | "busy" => Ok(Self::DoNotDisturb),
            "xa" => Ok(Self::ExtendedAway),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

/// Our own broadcast status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Status {
    /// Availability.
    pub show: PresenceShow,
    /// Free-form status message.
    pub message: Option<String>,
}

/// Outgoing request for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportRequest {
    /// Deliver a chat message.
    SendMessage {
        /// Recipient address (contact, room or `room/nick`).
        to: String,
        /// Message body.
        body: String,
    },

    /// Broadcast or direct a presence.
    SendPresence {
        /// Recipient. `None` broadcasts.
        to: Option<String>,
        /// Presence type (`subscribe`, `unavailable`, ...). `None` is available.
        kind: Option<String>,
        /// Availability.
        show: PresenceShow,
        /// Status text.
        status: Option<String>,
    },

    /// Chat state notification.
    SendChatState {
        /// Recipient.
        to: String,
        /// State to report.
        state: ChatState,
    },

    /// Join a room.
    JoinRoom {
        /// Room address.
        room: String,
        /// Nick to use in the room.
        nick: String,
        /// Room password.
        password: Option<String>,
        /// Number of history messages to request.
        history_length: Option<u32>,
        /// Status to show in the room.
        status: Status,
    },

    /// Leave a room.
    LeaveRoom {
        /// Room address.
        room: String,
        /// Our nick in the room.
        nick: String,
        /// Parting message.
        message: Option<String>,
    },

    /// Change our nick in a room.
    ChangeNick {
        /// Room address.
        room: String,
        /// New nick.
        nick: String,
    },

    /// Set a room subject.
    SetSubject {
        /// Room address.
        room: String,
        /// New subject.
        subject: String,
    },

    /// List the public rooms hosted on a server.
    ListRooms {
        /// Correlation id.
        id: RequestId,
        /// Server address.
        server: String,
    },

    /// Destroy a room we own.
    DestroyRoom {
        /// Correlation id.
        id: RequestId,
        /// Room address.
        room: String,
    },

    /// Invite a contact to a room.
    Invite {
        /// Contact address.
        to: String,
        /// Room address.
        room: String,
        /// Reason shown to the invitee.
        reason: Option<String>,
    },

    /// Decline a pending invitation.
    Decline {
        /// Inviter address.
        to: String,
        /// Room address.
        room: String,
        /// Reason shown to the inviter.
        reason: Option<String>,
    },

    /// Query the software version of an entity.
    GetVersion {
        /// Correlation id.
        id: RequestId,
        /// Target address.
        jid: String,
    },

    /// Query the last activity of an entity.
    GetLastActivity {
        /// Correlation id.
        id: RequestId,
        /// Target address.
        jid: String,
    },

    /// Publish our mood.
    PublishMood {
        /// Mood name.
        mood: String,
        /// Free text.
        text: Option<String>,
    },

    /// Retract our mood.
    StopMood,

    /// Publish our activity.
    PublishActivity {
        /// General category.
        general: String,
        /// Specific activity.
        specific: Option<String>,
        /// Free text.
        text: Option<String>,
    },

    /// Retract our activity.
    StopActivity,

    /// Publish the game we are playing.
    PublishGaming {
        /// Game name.
        name: String,
        /// Server address.
        address: Option<String>,
    },

    /// Retract our gaming status.
    StopGaming,

    /// Fetch the server-side bookmark list.
    FetchRemoteBookmarks {
        /// Correlation id.
        id: RequestId,
    },

    /// Replace the server-side bookmark list.
    SaveRemoteBookmarks {
        /// Correlation id.
        id: RequestId,
        /// Full list of remote bookmarks.
        bookmarks: Vec<Bookmark>,
    },

    /// Send a raw protocol stanza.
    SendRaw {
        /// Correlation id when the stanza expects an answer.
        id: Option<RequestId>,
        /// Serialised stanza.
        stanza: String,
    },

    /// Close the connection.
    Disconnect {
        /// Final status message.
        message: Option<String>,
    },
}

/// Member record reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    /// Nick in the room.
    pub nick: String,
    /// Room affiliation.
    pub affiliation: Affiliation,
    /// Room role.
    pub role: Role,
    /// Availability.
    pub show: PresenceShow,
    /// Status text.
    pub status: Option<String>,
}

impl MemberInfo {
    /// Plain participant with no status.
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            affiliation: Affiliation::None,
            role: Role::Participant,
            show: PresenceShow::Available,
            status: None,
        }
    }
}

/// Entry of a server's room directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomListing {
    /// Room address.
    pub jid: String,
    /// Human readable name, when the server gives one.
    pub name: Option<String>,
}

/// Successful answer to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Software version of an entity.
    Version {
        /// Software name.
        name: String,
        /// Software version.
        version: String,
        /// Operating system, if disclosed.
        os: Option<String>,
    },

    /// Seconds since the entity's last activity.
    LastActivity {
        /// Idle seconds.
        seconds: u64,
        /// Status message attached to the answer.
        message: Option<String>,
    },

    /// Server-side bookmark list.
    Bookmarks(Vec<Bookmark>),

    /// Room directory of a server.
    Rooms(Vec<RoomListing>),

    /// Answer to a raw stanza.
    Stanza(String),

    /// Request completed with nothing to report.
    Done,
}

/// Failed answer to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The peer refused.
    Forbidden,
    /// Any other failure.
    Failed(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forbidden => f.write_str("forbidden"),
            Self::Failed(reason) => f.write_str(reason),
        }
    }
}

/// Incoming notification from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established.
    Connected {
        /// Our full address.
        jid: String,
        /// Capability names supported by the server.
        capabilities: Vec<String>,
    },

    /// Connection closed.
    Disconnected,

    /// One-to-one message.
    ChatMessage {
        /// Sender address.
        from: String,
        /// Message body.
        body: String,
    },

    /// Message in a room (including our own, reflected).
    RoomMessage {
        /// Room address.
        room: String,
        /// Speaker nick.
        nick: String,
        /// Message body.
        body: String,
    },

    /// Private message from a room participant.
    PrivateMessage {
        /// Room address.
        room: String,
        /// Sender nick.
        nick: String,
        /// Message body.
        body: String,
    },

    /// We joined a room.
    SelfJoined {
        /// Room address.
        room: String,
        /// Nick assigned by the room.
        nick: String,
    },

    /// Someone joined a room.
    MemberJoined {
        /// Room address.
        room: String,
        /// New member.
        member: MemberInfo,
    },

    /// A member changed presence, role or affiliation.
    MemberUpdated {
        /// Room address.
        room: String,
        /// Updated record.
        member: MemberInfo,
    },

    /// Someone left a room.
    MemberLeft {
        /// Room address.
        room: String,
        /// Nick of the member.
        nick: String,
        /// Parting message.
        reason: Option<String>,
    },

    /// A member changed nick.
    NickChanged {
        /// Room address.
        room: String,
        /// Previous nick.
        old: String,
        /// New nick.
        new: String,
    },

    /// Room subject changed.
    Subject {
        /// Room address.
        room: String,
        /// Who set it, if known.
        nick: Option<String>,
        /// New subject.
        subject: String,
    },

    /// Invitation to a room.
    Invitation {
        /// Inviter address.
        from: String,
        /// Room address.
        room: String,
        /// Reason given by the inviter.
        reason: Option<String>,
    },

    /// Presence of a contact.
    ContactPresence {
        /// Contact address.
        from: String,
        /// Availability. `None` when the contact went offline.
        show: Option<PresenceShow>,
        /// Status text.
        status: Option<String>,
    },

    /// Answer to a request carrying a [`RequestId`].
    Reply {
        /// Correlation id.
        id: RequestId,
        /// Outcome.
        result: Result<Reply, RequestError>,
    },
}

/// What the session knows about the transport connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransportLink {
    /// Not connected.
    #[default]
    Disconnected,
    /// Connected with an established session.
    Connected {
        /// Our full address.
        jid: String,
        /// Capabilities advertised by the server.
        capabilities: BTreeSet<String>,
    },
}

impl TransportLink {
    /// True when connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// True when connected and the server advertises `name`.
    pub fn supports(&self, name: &str) -> bool {
        match self {
            Self::Connected { capabilities, .. } => capabilities.contains(name),
            Self::Disconnected => false,
        }
    }

    /// Our address, when connected.
    pub fn jid(&self) -> Option<&str> {
        match self {
            Self::Connected { jid, .. } => Some(jid),
            Self::Disconnected => None,
        }
    }
}

/// Local part of an address: `room@server/res` gives `room`.
pub fn local_part(jid: &str) -> &str {
    let bare = bare_jid(jid);
    bare.split_once('@').map_or(bare, |(local, _)| local)
}

/// Address without resource: `user@server/res` gives `user@server`.
pub fn bare_jid(jid: &str) -> &str {
    jid.split_once('/').map_or(jid, |(bare, _)| bare)
}

/// Domain part of an address.
pub fn domain_part(jid: &str) -> &str {
    let bare = bare_jid(jid);
    bare.split_once('@').map_or(bare, |(_, domain)| domain)
}

/// Resource of an address, if any.
pub fn resource(jid: &str) -> Option<&str> {
    jid.split_once('/').map(|(_, res)| res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_aliases() {
        assert_eq!("afk".parse(), Ok(PresenceShow::Away));
        assert_eq!("busy".parse(), Ok(PresenceShow::DoNotDisturb));
        assert_eq!("online".parse(), Ok(PresenceShow::Available));
        assert!("sleeping".parse::<PresenceShow>().is_err());
    }

    #[test]
    fn address_parts() {
        assert_eq!(local_part("room@muc.example.org/nick"), "room");
        assert_eq!(bare_jid("room@muc.example.org/nick"), "room@muc.example.org");
        assert_eq!(domain_part("room@muc.example.org/nick"), "muc.example.org");
        assert_eq!(resource("room@muc.example.org/nick"), Some("nick"));
        assert_eq!(local_part("example.org"), "example.org");
    }

    #[test]
    fn capabilities_need_connection() {
        let link = TransportLink::Connected {
            jid: "me@example.org/palaver".into(),
            capabilities: [capability::MUC.to_string()].into_iter().collect(),
        };
        assert!(link.supports(capability::MUC));
        assert!(!link.supports(capability::MOOD));
        assert!(!TransportLink::Disconnected.supports(capability::MUC));
    }
}
