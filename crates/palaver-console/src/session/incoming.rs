//! Transport events.

use std::fmt::Write as _;

use super::{Purpose, Session};
use crate::{
    SessionAction,
    tabs::{Tab, TabId, TabKind, TabState},
    transport::{
        MemberInfo, PresenceShow, Reply, RequestError, RequestId, TransportEvent, TransportLink,
        TransportRequest, bare_jid, capability, local_part,
    },
    viewport::StyleId,
};

pub(super) fn handle(session: &mut Session, event: TransportEvent) {
    match event {
        TransportEvent::Connected { jid, capabilities } => connected(session, jid, capabilities),
        TransportEvent::Disconnected => disconnected(session),
        TransportEvent::ChatMessage { from, body } => {
            let id = session.ensure_tab(bare_jid(&from), TabKind::Direct);
            conversation_message(session, id, local_part(&from), &body);
        },
        TransportEvent::PrivateMessage { room, nick, body } => {
            let id = session.ensure_tab(&format!("{room}/{nick}"), TabKind::SidePanel);
            conversation_message(session, id, &nick, &body);
        },
        TransportEvent::RoomMessage { room, nick, body } => {
            room_message(session, &room, &nick, &body);
        },
        TransportEvent::SelfJoined { room, nick } => {
            session.invitations.remove(&room);
            let now = session.now();
            let id = session.ensure_tab(&room, TabKind::MultiPartyRoom);
            if let Some(tab) = session.tabs.get_mut(id) {
                tab.joined = true;
                tab.own_nick = Some(nick.clone());
                tab.roster.join(MemberInfo::new(nick.as_str()));
                tab.add_info(now, format!("You joined the room as {nick}"));
            }
        },
        TransportEvent::MemberJoined { room, member } => {
            let now = session.now();
            let Some(tab) = room_tab(session, &room) else {
                return;
            };
            let nick = member.nick.clone();
            tab.roster.join(member);
            // Members listed before our own join are the initial roster
            if tab.joined && tab.own_nick.as_deref() != Some(nick.as_str()) {
                tab.add_info(now, format!("{nick} joined the room"));
            }
        },
        TransportEvent::MemberUpdated { room, member } => {
            let Some(tab) = room_tab(session, &room) else {
                return;
            };
            if tab.roster.get(&member.nick).is_some() {
                tab.roster.update(member);
            } else {
                tab.roster.join(member);
            }
        },
        TransportEvent::MemberLeft { room, nick, reason } => {
            member_left(session, &room, &nick, reason);
        },
        TransportEvent::NickChanged { room, old, new } => {
            let now = session.now();
            let Some(tab) = room_tab(session, &room) else {
                return;
            };
            tab.roster.rename(&old, &new);
            if tab.own_nick.as_deref() == Some(old.as_str()) {
                tab.own_nick = Some(new.clone());
                tab.add_info(now, format!("You are now known as {new}"));
            } else {
                tab.add_info(now, format!("{old} is now known as {new}"));
            }
        },
        TransportEvent::Subject { room, nick, subject } => {
            let now = session.now();
            let Some(tab) = room_tab(session, &room) else {
                return;
            };
            let line = match nick {
                Some(nick) => format!("{nick} has set the subject to: {subject}"),
                None => format!("The subject is: {subject}"),
            };
            tab.topic = Some(subject);
            tab.add_info(now, line);
        },
        TransportEvent::Invitation { from, room, reason } => {
            let prefix = session.config().command_prefix();
            let mut text = format!("{from} invited you to the room {room}");
            if let Some(reason) = reason {
                let _ = write!(text, " (reason: {reason})");
            }
            let _ = write!(
                text,
                "\nType {prefix}join {room} to accept or {prefix}decline {room} to refuse."
            );
            session.invitations.insert(room, from);
            session.information(text);
            let info = session.tabs.info_id();
            notify(session, info, TabState::Alert);
        },
        TransportEvent::ContactPresence { from, show, status } => {
            let Some(id) = session.tabs.by_name(bare_jid(&from), TabKind::Direct) else {
                return;
            };
            let mut text = match show {
                Some(show) => format!("{from} is {}", describe_show(show)),
                None => format!("{from} is offline"),
            };
            if let Some(status) = status {
                let _ = write!(text, " ({status})");
            }
            session.report_to(Some(id), text);
        },
        TransportEvent::Reply { id, result } => reply(session, id, result),
    }
}

fn connected(session: &mut Session, jid: String, capabilities: Vec<String>) {
    tracing::debug!(%jid, ?capabilities, "connected");
    let capabilities = capabilities.into_iter().collect();
    session.link = TransportLink::Connected { jid: jid.clone(), capabilities };
    session.information(format!("Connected as {jid}"));

    let status = session.status.clone();
    session.push(TransportRequest::SendPresence {
        to: None,
        kind: None,
        show: status.show,
        status: status.message,
    });

    let rejoin: Vec<(String, Option<String>)> = session
        .tabs
        .iter()
        .filter(|tab| tab.kind() == TabKind::MultiPartyRoom && !tab.joined)
        .map(|tab| (tab.name().to_string(), tab.own_nick.clone()))
        .collect();
    for (room, nick) in rejoin {
        let nick = nick.unwrap_or_else(|| session.default_nick());
        let password = session.bookmarks.get(&room).and_then(|b| b.password.clone());
        session.send_join(&room, &nick, password);
    }

    if session.config().get_bool("use_remote_bookmarks")
        && session.link.supports(capability::BOOKMARKS)
    {
        session.request(Purpose::FetchBookmarks { autojoin: true }, |id| {
            TransportRequest::FetchRemoteBookmarks { id }
        });
    } else {
        session.autojoin();
    }
}

fn disconnected(session: &mut Session) {
    session.link = TransportLink::Disconnected;
    let now = session.now();
    for tab in session.tabs.iter_mut().filter(|tab| tab.kind() == TabKind::MultiPartyRoom) {
        if tab.joined {
            tab.joined = false;
            tab.roster.clear();
            tab.add_info(now, "Disconnected from the room");
        }
    }
    if !session.pending.is_empty() {
        tracing::debug!(count = session.pending.len(), "dropping requests left unanswered");
        session.pending.clear();
    }

    if session.quitting {
        session.outbox.push(SessionAction::Quit);
    } else {
        session.information("Disconnected");
    }
}

fn conversation_message(session: &mut Session, id: TabId, speaker: &str, body: &str) {
    let now = session.now();
    if let Some(tab) = session.tabs.get_mut(id) {
        tab.add_message(now, speaker, body, None);
    }
    notify(session, id, TabState::Alert);
}

fn room_message(session: &mut Session, room: &str, nick: &str, body: &str) {
    let now = session.now();
    let Some(id) = session.tabs.by_name(room, TabKind::MultiPartyRoom) else {
        tracing::debug!(room, "message for a room without a tab");
        return;
    };
    let Some(tab) = session.tabs.get_mut(id) else {
        return;
    };

    let own = tab.own_nick.as_deref() == Some(nick);
    let highlight = !own && tab.own_nick.as_deref().is_some_and(|me| mentions(body, me));
    tab.roster.touch(nick, now);
    tab.add_message(now, nick, body, highlight.then_some(StyleId::Highlight));

    if !own {
        notify(session, id, if highlight { TabState::Alert } else { TabState::HasUnread });
    }
}

fn member_left(session: &mut Session, room: &str, nick: &str, reason: Option<String>) {
    let now = session.now();
    let mut line = match &reason {
        Some(reason) => format!("{nick} has left the room ({reason})"),
        None => format!("{nick} has left the room"),
    };
    if let Some(tab) = room_tab(session, room) {
        if tab.own_nick.as_deref() == Some(nick) {
            tab.joined = false;
            tab.roster.clear();
            line = "You left the room".to_string();
        } else {
            tab.roster.leave(nick);
        }
        tab.add_info(now, line.clone());
    }
    if let Some(id) = session.tabs.by_name(&format!("{room}/{nick}"), TabKind::SidePanel) {
        session.report_to(Some(id), line);
    }
}

fn reply(session: &mut Session, id: RequestId, result: Result<Reply, RequestError>) {
    let Some((target, purpose)) = session.take_pending(id) else {
        tracing::warn!(%id, "reply to an unknown request");
        return;
    };

    let text = match (purpose, result) {
        (Purpose::Version { jid }, Ok(Reply::Version { name, version, os })) => {
            let os = os.unwrap_or_else(|| "an unknown platform".to_string());
            format!("{jid} is running {name} version {version} on {os}")
        },
        (Purpose::Version { jid }, _) => format!("Could not get the software version from {jid}"),
        (Purpose::LastActivity { jid }, Ok(Reply::LastActivity { seconds, message })) => {
            let t = format_duration(seconds);
            if jid.contains('@') {
                let mut text = format!("The last activity of {jid} was {t} ago");
                if let Some(message) = message {
                    let _ = write!(text, " and their last status was {message}");
                }
                text
            } else {
                format!("The uptime of {jid} is {t}.")
            }
        },
        (Purpose::LastActivity { jid }, Err(err)) => {
            format!("Could not get the last activity of {jid}: {err}")
        },
        (Purpose::LastActivity { jid }, Ok(_)) => {
            format!("Could not get the last activity of {jid}")
        },
        (Purpose::ListRooms { server }, Ok(Reply::Rooms(rooms))) => {
            if rooms.is_empty() {
                format!("No public rooms on {server}")
            } else {
                let mut text = format!("{} rooms on {server}:", rooms.len());
                for room in rooms {
                    let _ = write!(text, "\n  {}", room.jid);
                    if let Some(name) = room.name {
                        let _ = write!(text, " ({name})");
                    }
                }
                text
            }
        },
        (Purpose::ListRooms { server }, Err(err)) => {
            format!("Could not list the rooms of {server}: {err}")
        },
        (Purpose::ListRooms { server }, Ok(_)) => format!("Could not list the rooms of {server}"),
        (Purpose::DestroyRoom { room }, Ok(_)) => format!("The room {room} has been destroyed"),
        (Purpose::DestroyRoom { room }, Err(err)) => {
            format!("Unable to destroy room {room}: {err}")
        },
        (Purpose::FetchBookmarks { autojoin }, result) => {
            match result {
                Ok(Reply::Bookmarks(remote)) => {
                    tracing::debug!(count = remote.len(), "remote bookmarks fetched");
                    session.bookmarks.merge_remote(&remote);
                },
                Ok(other) => tracing::warn!(?other, "unexpected answer to a bookmark fetch"),
                Err(err) => {
                    tracing::warn!(%err, "could not fetch remote bookmarks");
                    session
                        .information(format!("Error while fetching the remote bookmarks: {err}"));
                },
            }
            if autojoin {
                session.autojoin();
            }
            return;
        },
        (Purpose::SaveBookmarks { success, .. }, Ok(_)) => success.to_string(),
        (Purpose::SaveBookmarks { failure, .. }, Err(err)) => {
            tracing::warn!(%err, "could not save remote bookmarks");
            failure.to_string()
        },
        (Purpose::RawStanza, Ok(Reply::Stanza(stanza))) => stanza,
        (Purpose::RawStanza, Ok(_)) => return,
        (Purpose::RawStanza, Err(err)) => format!("Error: {err}"),
    };
    session.report_to(target, text);
}

fn room_tab<'a>(session: &'a mut Session, room: &str) -> Option<&'a mut Tab> {
    let id = session.tabs.by_name(room, TabKind::MultiPartyRoom);
    if id.is_none() {
        tracing::debug!(room, "event for a room without a tab");
    }
    id.and_then(|id| session.tabs.get_mut(id))
}

/// Raise a tab's notification level unless it is the one being looked at.
fn notify(session: &mut Session, id: TabId, state: TabState) {
    if session.tabs.current_id() == id {
        return;
    }
    if let Some(tab) = session.tabs.get_mut(id) {
        tab.raise(state);
    }
}

/// Whether `body` mentions `nick` as a whole word, ignoring case.
fn mentions(body: &str, nick: &str) -> bool {
    let nick = nick.to_lowercase();
    body.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .any(|word| word == nick)
}

fn describe_show(show: PresenceShow) -> &'static str {
    match show {
        PresenceShow::Available => "available",
        PresenceShow::Chat => "available to chat",
        PresenceShow::Away => "away",
        PresenceShow::ExtendedAway => "away for a long time",
        PresenceShow::DoNotDisturb => "not to be disturbed",
    }
}

/// Seconds as `1d 2h 3m 4s`, skipping zero units.
pub(crate) fn format_duration(seconds: u64) -> String {
    let units = [
        (seconds / 86_400, 'd'),
        (seconds / 3600 % 24, 'h'),
        (seconds / 60 % 60, 'm'),
        (seconds % 60, 's'),
    ];
    let parts: Vec<String> =
        units.iter().filter(|(n, _)| *n > 0).map(|(n, unit)| format!("{n}{unit}")).collect();
    if parts.is_empty() { "0s".to_string() } else { parts.join(" ") }
}
