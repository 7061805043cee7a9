//! Commands bound to one kind of tab.
//!
//! These shadow global commands of the same name while such a tab has focus.

use std::fmt::Write as _;

use super::{ArgGrammar, Args, CommandDispatcher, CommandSpec};
use crate::{
    Session,
    error::CommandError,
    participant::Role,
    tabs::{TabId, TabKind},
    transport::{ChatState, TransportRequest},
};

pub(crate) fn register(dispatcher: &mut CommandDispatcher<Session>) {
    for spec in ROOM {
        dispatcher.register_tab(TabKind::MultiPartyRoom, *spec);
    }
    for kind in [TabKind::Direct, TabKind::SidePanel] {
        dispatcher.register_tab(kind, CONVERSATION_CLOSE);
    }
}

const ROOM: &[CommandSpec<Session>] = &[
    CommandSpec {
        name: "part",
        usage: "[message]",
        short: "Leave the room",
        desc: "Leave the room with an optional message. The tab stays open.",
        grammar: ArgGrammar::Raw,
        handler: part,
    },
    CommandSpec {
        name: "close",
        usage: "[message]",
        short: "Leave the room and close the tab",
        desc: "Leave the room with an optional message, then close its tab.",
        grammar: ArgGrammar::Raw,
        handler: close_room,
    },
    CommandSpec {
        name: "nick",
        usage: "<nick>",
        short: "Change your nick",
        desc: "Change your nick in the room.",
        grammar: ArgGrammar::quoted(1, 1),
        handler: nick,
    },
    CommandSpec {
        name: "topic",
        usage: "[subject]",
        short: "Show or change the subject",
        desc: "Without argument, show the subject of the room. Otherwise set it.",
        grammar: ArgGrammar::Raw,
        handler: topic,
    },
    CommandSpec {
        name: "names",
        usage: "",
        short: "List participants",
        desc: "List the participants of the room by role.",
        grammar: ArgGrammar::Ignored,
        handler: names,
    },
];

const CONVERSATION_CLOSE: CommandSpec<Session> = CommandSpec {
    name: "close",
    usage: "",
    short: "Close the conversation",
    desc: "Tell the peer you left the conversation, then close the tab.",
    grammar: ArgGrammar::Ignored,
    handler: close_conversation,
};

fn part(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let id = session.tabs.current_id();
    session.leave_room(id, message(args));
    Ok(())
}

fn close_room(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let id = session.tabs.current_id();
    session.leave_room(id, message(args));
    session.close_tab(id)?;
    Ok(())
}

fn nick(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let (_, room) = joined_room(session)?;
    let nick = args.get(0).unwrap_or_default().to_string();
    session.push(TransportRequest::ChangeNick { room, nick });
    Ok(())
}

fn topic(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let Some(subject) = message(args) else {
        let tab = session.tabs.current();
        let text = match &tab.topic {
            Some(topic) => format!("The subject of the room is: {topic}"),
            None => "The room has no subject".to_string(),
        };
        let id = tab.id();
        session.report_to(Some(id), text);
        return Ok(());
    };
    let (_, room) = joined_room(session)?;
    session.push(TransportRequest::SetSubject { room, subject });
    Ok(())
}

fn names(session: &mut Session, _: &Args) -> Result<(), CommandError> {
    let tab = session.tabs.current();
    let mut text = format!("{} participants", tab.roster.len());
    for (role, label) in [
        (Role::Moderator, "Moderators"),
        (Role::Participant, "Participants"),
        (Role::Visitor, "Visitors"),
    ] {
        let nicks: Vec<&str> =
            tab.roster.iter().filter(|p| p.role == role).map(|p| p.nick.as_str()).collect();
        if !nicks.is_empty() {
            let _ = write!(text, "\n  {label}: {}", nicks.join(", "));
        }
    }
    let id = tab.id();
    session.report_to(Some(id), text);
    Ok(())
}

fn close_conversation(session: &mut Session, _: &Args) -> Result<(), CommandError> {
    let id = session.tabs.current_id();
    session.send_chat_state(id, ChatState::Gone);
    session.close_tab(id)?;
    Ok(())
}

fn message(args: &Args) -> Option<String> {
    Some(args.raw().trim()).filter(|m| !m.is_empty()).map(str::to_string)
}

/// The focused room, which must be joined over a live connection.
fn joined_room(session: &Session) -> Result<(TabId, String), CommandError> {
    session.require_connected()?;
    let tab = session.tabs.current();
    if !tab.joined {
        return Err(CommandError::Invalid("You are not in this room".into()));
    }
    Ok((tab.id(), tab.name().to_string()))
}
