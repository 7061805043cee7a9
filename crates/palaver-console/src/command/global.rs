//! Commands available from every tab.

use std::fmt::Write as _;

use super::{ArgGrammar, Args, CommandDispatcher, CommandSpec};
use crate::{
    KeyInput, Session,
    bookmark::{Bookmark, BookmarkMethod},
    config::{BINDINGS_SECTION, default_value, parse_bool},
    error::CommandError,
    plugin,
    session::Purpose,
    stanza,
    tabs::{TabId, TabKind},
    transport::{PresenceShow, TransportRequest, bare_jid, capability, domain_part, resource},
};

pub(crate) fn register(dispatcher: &mut CommandDispatcher<Session>) {
    for spec in COMMANDS {
        dispatcher.register_global(*spec);
    }
}

const COMMANDS: &[CommandSpec<Session>] = &[
    CommandSpec {
        name: "help",
        usage: "[command]",
        short: "Show help",
        desc: "Without argument, list the available commands. With a command name, show its \
               usage.",
        grammar: ArgGrammar::quoted(0, 1),
        handler: help,
    },
    CommandSpec {
        name: "win",
        usage: "<number|name|.>",
        short: "Go to a tab",
        desc: "Go to the tab with that number, or the first tab whose name contains the text.",
        grammar: ArgGrammar::quoted(1, 1),
        handler: win,
    },
    CommandSpec {
        name: "wins",
        usage: "",
        short: "List open tabs",
        desc: "List the open tabs with their numbers.",
        grammar: ArgGrammar::Ignored,
        handler: wins,
    },
    CommandSpec {
        name: "move_tab",
        usage: "<source> <destination>",
        short: "Move a tab",
        desc: "Move the tab at <source> to the position <destination>. Tabs in between shift by \
               one. Both may be numbers or names.",
        grammar: ArgGrammar::quoted(2, 2),
        handler: move_tab,
    },
    CommandSpec {
        name: "close",
        usage: "",
        short: "Close the tab",
        desc: "Close the current tab. The information tab cannot be closed.",
        grammar: ArgGrammar::Ignored,
        handler: close,
    },
    CommandSpec {
        name: "join",
        usage: "[room][/nick] [password]",
        short: "Join a room",
        desc: "Join a room. Without a server part the server of the current room is used. \
               Without a room, rejoin the current one. /nick alone changes nick while joining \
               the current room.",
        grammar: ArgGrammar::quoted(0, 2),
        handler: join,
    },
    CommandSpec {
        name: "leave",
        usage: "[room] [message]",
        short: "Leave a room",
        desc: "Leave a room, the current one by default. The tab stays open.",
        grammar: ArgGrammar::quoted(0, 2),
        handler: leave,
    },
    CommandSpec {
        name: "destroy_room",
        usage: "[room]",
        short: "Destroy a room",
        desc: "Ask the server to destroy a room, the current one by default.",
        grammar: ArgGrammar::quoted(0, 1),
        handler: destroy_room,
    },
    CommandSpec {
        name: "list",
        usage: "[server]",
        short: "List the rooms of a server",
        desc: "Open a tab listing the public rooms of a server, by default the server of the \
               current room.",
        grammar: ArgGrammar::quoted(0, 1),
        handler: list,
    },
    CommandSpec {
        name: "server_cycle",
        usage: "[domain] [message]",
        short: "Rejoin every room of a server",
        desc: "Leave then rejoin every open room hosted on a domain, by default the domain of \
               the current room. The message is used when leaving.",
        grammar: ArgGrammar::quoted(0, 2),
        handler: server_cycle,
    },
    CommandSpec {
        name: "message",
        usage: "<jid> [text]",
        short: "Open a conversation",
        desc: "Open a conversation with a contact, or a private conversation with a room \
               participant (room/nick), and send the text if given.",
        grammar: ArgGrammar::quoted(1, 2),
        handler: message,
    },
    CommandSpec {
        name: "bookmark",
        usage: "[room][/nick] [autojoin] [password]",
        short: "Bookmark a room on the server",
        desc: "Bookmark a room, the current one by default, in the server-side list. \
               autojoin is true or false and defaults to true.",
        grammar: ArgGrammar::quoted(0, 3),
        handler: bookmark,
    },
    CommandSpec {
        name: "bookmark_local",
        usage: "[room][/nick] [password]",
        short: "Bookmark a room locally",
        desc: "Bookmark a room, the current one by default, in the local list. It is joined \
               automatically on connection.",
        grammar: ArgGrammar::quoted(0, 2),
        handler: bookmark_local,
    },
    CommandSpec {
        name: "remove_bookmark",
        usage: "[jid]",
        short: "Remove a bookmark",
        desc: "Remove the bookmark of a room, the current one by default.",
        grammar: ArgGrammar::quoted(0, 1),
        handler: remove_bookmark,
    },
    CommandSpec {
        name: "bookmarks",
        usage: "",
        short: "List bookmarks",
        desc: "List local and remote bookmarks.",
        grammar: ArgGrammar::Ignored,
        handler: bookmarks,
    },
    CommandSpec {
        name: "status",
        usage: "<availability> [message]",
        short: "Change your status",
        desc: "Set your availability (available, chat, away, afk, dnd, busy, xa) and an \
               optional status message.",
        grammar: ArgGrammar::quoted(1, 2),
        handler: status,
    },
    CommandSpec {
        name: "presence",
        usage: "<jid> [type] [status]",
        short: "Send a directed presence",
        desc: "Send a presence to one address. type is available, unavailable, subscribe, ... \
               and . designates the current conversation.",
        grammar: ArgGrammar::quoted(1, 3),
        handler: presence,
    },
    CommandSpec {
        name: "rawxml",
        usage: "<stanza>",
        short: "Send a raw stanza",
        desc: "Send a custom stanza. It must be one well-formed element.",
        grammar: ArgGrammar::Raw,
        handler: rawxml,
    },
    CommandSpec {
        name: "set",
        usage: "[section] <option> [value]",
        short: "Set an option",
        desc: "Show an option, or set it. With three arguments the first names a section.",
        grammar: ArgGrammar::quoted(1, 3),
        handler: set,
    },
    CommandSpec {
        name: "toggle",
        usage: "<option>",
        short: "Toggle an option",
        desc: "Invert a boolean option.",
        grammar: ArgGrammar::quoted(1, 1),
        handler: toggle,
    },
    CommandSpec {
        name: "bind",
        usage: "<key> [key]",
        short: "Rebind a key",
        desc: "Make the first key act as the second one, e.g. bind ^P KEY_UP. Without a second \
               key the first one gets its own meaning back.",
        grammar: ArgGrammar::quoted(1, 2),
        handler: bind,
    },
    CommandSpec {
        name: "load",
        usage: "<plugin> [<plugin>...]",
        short: "Load plugins",
        desc: "Load built-in plugins. They are loaded again at the next start.",
        grammar: ArgGrammar::quoted(1, usize::MAX),
        handler: load,
    },
    CommandSpec {
        name: "unload",
        usage: "<plugin> [<plugin>...]",
        short: "Unload plugins",
        desc: "Unload plugins.",
        grammar: ArgGrammar::quoted(1, usize::MAX),
        handler: unload,
    },
    CommandSpec {
        name: "plugins",
        usage: "",
        short: "List plugins",
        desc: "List the loaded plugins and the ones that can be loaded.",
        grammar: ArgGrammar::Ignored,
        handler: plugins,
    },
    CommandSpec {
        name: "self",
        usage: "",
        short: "Show your address and status",
        desc: "Show your address, status and default nick.",
        grammar: ArgGrammar::Ignored,
        handler: self_info,
    },
    CommandSpec {
        name: "version",
        usage: "<jid>",
        short: "Ask for software version",
        desc: "Ask an entity for its software version. In a room, a nick designates that \
               participant.",
        grammar: ArgGrammar::quoted(1, 1),
        handler: version,
    },
    CommandSpec {
        name: "last_activity",
        usage: "<jid>",
        short: "Ask for last activity",
        desc: "Ask how long an entity has been idle. For a server, this gives its uptime.",
        grammar: ArgGrammar::quoted(1, 1),
        handler: last_activity,
    },
    CommandSpec {
        name: "mood",
        usage: "[mood [text]]",
        short: "Publish your mood",
        desc: "Publish your mood. Without argument, stop publishing it.",
        grammar: ArgGrammar::quoted(0, 2),
        handler: mood,
    },
    CommandSpec {
        name: "activity",
        usage: "[general [specific] [text]]",
        short: "Publish your activity",
        desc: "Publish your activity. Without argument, stop publishing it.",
        grammar: ArgGrammar::quoted(0, 3),
        handler: activity,
    },
    CommandSpec {
        name: "gaming",
        usage: "[name [address]]",
        short: "Publish the game you play",
        desc: "Publish the game you are playing and the server address. Without argument, \
               stop publishing it.",
        grammar: ArgGrammar::quoted(0, 2),
        handler: gaming,
    },
    CommandSpec {
        name: "invite",
        usage: "<jid> <room> [reason]",
        short: "Invite someone to a room",
        desc: "Invite a contact to a room. . designates the current room.",
        grammar: ArgGrammar::quoted(2, 3),
        handler: invite,
    },
    CommandSpec {
        name: "decline",
        usage: "<room> [reason]",
        short: "Decline an invitation",
        desc: "Decline a pending invitation to a room.",
        grammar: ArgGrammar::quoted(1, 2),
        handler: decline,
    },
    CommandSpec {
        name: "invitations",
        usage: "",
        short: "List pending invitations",
        desc: "List the invitations you have not answered.",
        grammar: ArgGrammar::Ignored,
        handler: invitations,
    },
    CommandSpec {
        name: "quit",
        usage: "[message]",
        short: "Quit",
        desc: "Disconnect and quit, with an optional message.",
        grammar: ArgGrammar::Raw,
        handler: quit,
    },
];

/// Moods a user can publish.
pub(crate) const MOODS: &[&str] = &[
    "afraid", "amazed", "amorous", "angry", "annoyed", "anxious", "aroused", "ashamed", "bored",
    "brave", "calm", "cautious", "cold", "confident", "confused", "contemplative", "contented",
    "cranky", "crazy", "creative", "curious", "dejected", "depressed", "disappointed",
    "disgusted", "dismayed", "distracted", "embarrassed", "envious", "excited", "flirtatious",
    "frustrated", "grateful", "grieving", "grumpy", "guilty", "happy", "hopeful", "hot",
    "humbled", "humiliated", "hungry", "hurt", "impressed", "in_awe", "in_love", "indignant",
    "interested", "intoxicated", "invincible", "jealous", "lonely", "lost", "lucky", "mean",
    "moody", "nervous", "neutral", "offended", "outraged", "playful", "proud", "relaxed",
    "relieved", "remorseful", "restless", "sad", "sarcastic", "satisfied", "serious", "shocked",
    "shy", "sick", "sleepy", "spontaneous", "stressed", "strong", "surprised", "thankful",
    "thirsty", "tired", "undefined", "weak", "worried",
];

/// Activities a user can publish, with their specific forms.
pub(crate) const ACTIVITIES: &[(&str, &[&str])] = &[
    ("doing_chores", &[
        "buying_groceries",
        "cleaning",
        "cooking",
        "doing_maintenance",
        "doing_the_dishes",
        "doing_the_laundry",
        "gardening",
        "running_an_errand",
        "walking_the_dog",
    ]),
    ("drinking", &["having_a_beer", "having_coffee", "having_tea"]),
    ("eating", &["having_a_snack", "having_breakfast", "having_dinner", "having_lunch"]),
    ("exercising", &[
        "cycling",
        "dancing",
        "hiking",
        "jogging",
        "playing_sports",
        "running",
        "skiing",
        "swimming",
        "working_out",
    ]),
    ("grooming", &[
        "at_the_spa",
        "brushing_teeth",
        "getting_a_haircut",
        "shaving",
        "taking_a_bath",
        "taking_a_shower",
    ]),
    ("having_appointment", &[]),
    ("inactive", &[
        "day_off",
        "hanging_out",
        "hiding",
        "on_vacation",
        "praying",
        "scheduled_holiday",
        "sleeping",
        "thinking",
    ]),
    ("relaxing", &[
        "fishing",
        "gaming",
        "going_out",
        "partying",
        "reading",
        "rehearsing",
        "shopping",
        "smoking",
        "socializing",
        "sunbathing",
        "watching_a_movie",
        "watching_tv",
    ]),
    ("talking", &["in_real_life", "on_the_phone", "on_video_phone"]),
    ("traveling", &[
        "commuting",
        "driving",
        "in_a_car",
        "on_a_bus",
        "on_a_plane",
        "on_a_train",
        "on_a_trip",
        "walking",
    ]),
    ("undefined", &[]),
    ("working", &["coding", "in_a_meeting", "studying", "writing"]),
];

fn help(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let text = match args.get(0) {
        None => session.command_overview(),
        Some(name) => {
            let prefix = session.config().command_prefix();
            let name = name.strip_prefix(prefix.as_str()).unwrap_or(name);
            session
                .command_help(name)
                .ok_or_else(|| CommandError::UnknownCommand { prefix, name: name.to_string() })?
        },
    };
    session.information(text);
    Ok(())
}

fn win(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let id = session.tabs.resolve(args.get(0).unwrap_or_default())?;
    session.focus_tab(id)
}

fn wins(session: &mut Session, _: &Args) -> Result<(), CommandError> {
    let mut text = String::from("Open tabs:");
    for (slot, tab) in session.tabs.iter().enumerate() {
        let _ = write!(text, "\n  {slot}: {} ({})", tab.name(), tab.kind());
    }
    session.information(text);
    Ok(())
}

fn move_tab(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let slot = |token: &str| -> Result<usize, CommandError> {
        if let Ok(slot) = token.parse::<usize>() {
            return Ok(slot);
        }
        let id = session.tabs.resolve(token)?;
        Ok(session.tabs.slot_of(id).unwrap_or_default())
    };
    let old = slot(args.get(0).unwrap_or_default())?;
    let new = slot(args.get(1).unwrap_or_default())?;
    session.tabs.move_tab(old, new)?;
    Ok(())
}

fn close(session: &mut Session, _: &Args) -> Result<(), CommandError> {
    let id = session.tabs.current_id();
    session.close_tab(id)?;
    Ok(())
}

fn join(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    session.require_capability(capability::MUC)?;
    let current = current_room(session);

    let (room, nick) = match args.get(0) {
        None => {
            let (_, room) = current.ok_or_else(|| {
                session.command_failure("join", "no room given and this tab is not a room")
            })?;
            (room, None)
        },
        Some(target) => match target.strip_prefix('/') {
            Some(nick) => {
                let (_, room) = current.ok_or_else(|| {
                    session.command_failure("join", "a nick alone only works in a room")
                })?;
                (room, Some(nick.to_string()))
            },
            None => {
                let (bare, nick) = match target.split_once('/') {
                    Some((bare, nick)) => (bare, Some(nick.to_string())),
                    None => (target, None),
                };
                (qualify_room(session, bare)?, nick.filter(|n| !n.is_empty()))
            },
        },
    };

    let bookmark = session.bookmarks.get(&room).cloned();
    let password = args
        .get(1)
        .map(str::to_string)
        .or_else(|| bookmark.as_ref().and_then(|b| b.password.clone()));

    if let Some(id) = session.tabs.by_name(&room, TabKind::MultiPartyRoom) {
        let joined = session.tabs.get(id).is_some_and(|tab| tab.joined);
        let own = session.tabs.get(id).and_then(|tab| tab.own_nick.clone());
        session.focus_tab(id)?;
        if joined && (nick.is_none() || nick == own) {
            let prefix = session.config().command_prefix();
            session.information(format!("{prefix}join: Nothing to do."));
            return Ok(());
        }
        if joined {
            // Already in: only the nick changes
            if let Some(nick) = nick {
                session.push(TransportRequest::ChangeNick { room, nick });
            }
            return Ok(());
        }
        let nick = nick.or(own).unwrap_or_else(|| join_nick(session, bookmark.as_ref()));
        session.send_join(&room, &nick, password);
        return Ok(());
    }

    let nick = nick.unwrap_or_else(|| join_nick(session, bookmark.as_ref()));
    let id = session.tabs.open(&room, TabKind::MultiPartyRoom)?;
    if let Some(tab) = session.tabs.get_mut(id) {
        tab.own_nick = Some(nick.clone());
    }
    session.focus_tab(id)?;
    session.send_join(&room, &nick, password);
    Ok(())
}

fn leave(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let id = match args.get(0) {
        None | Some(".") => current_room(session).map(|(id, _)| id),
        Some(name) => session.tabs.by_name(name, TabKind::MultiPartyRoom).or_else(|| {
            session.tabs.find_by_name(name, Some(TabKind::MultiPartyRoom)).first().copied()
        }),
    };
    let id = id.ok_or_else(|| session.command_failure("leave", "not a room"))?;
    session.leave_room(id, args.get(1).map(str::to_string));
    Ok(())
}

fn destroy_room(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    session.require_capability(capability::MUC)?;
    let room = match args.get(0) {
        Some(room) => room.to_string(),
        None => current_room(session)
            .map(|(_, room)| room)
            .ok_or_else(|| session.command_failure("destroy_room", "not a room"))?,
    };
    session.request(Purpose::DestroyRoom { room: room.clone() }, |id| {
        TransportRequest::DestroyRoom { id, room }
    });
    Ok(())
}

fn list(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    session.require_capability(capability::MUC)?;
    let server = match args.get(0) {
        Some(target) => domain_part(target).to_string(),
        None => current_room(session)
            .map(|(_, room)| domain_part(&room).to_string())
            .ok_or_else(|| session.command_failure("list", "Please provide a server"))?,
    };
    let id = session.ensure_tab(&server, TabKind::RoomList);
    session.focus_tab(id)?;
    session.report_to(Some(id), format!("Listing the rooms of {server}"));
    session.request(Purpose::ListRooms { server: server.clone() }, |id| {
        TransportRequest::ListRooms { id, server }
    });
    Ok(())
}

fn server_cycle(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    session.require_capability(capability::MUC)?;
    let domain = match args.get(0) {
        Some(domain) => domain.to_string(),
        None => current_room(session)
            .map(|(_, room)| domain_part(&room).to_string())
            .ok_or_else(|| session.command_failure("server_cycle", "No server specified"))?,
    };
    let message = args.get(1).map(str::to_string);

    let rooms: Vec<(TabId, String, Option<String>)> = session
        .tabs
        .iter()
        .filter(|tab| tab.kind() == TabKind::MultiPartyRoom && domain_part(tab.name()) == domain)
        .map(|tab| (tab.id(), tab.name().to_string(), tab.own_nick.clone()))
        .collect();
    if rooms.is_empty() {
        session.information(format!("No room open on {domain}"));
        return Ok(());
    }
    for (id, room, nick) in rooms {
        session.leave_room(id, message.clone());
        let nick = nick.unwrap_or_else(|| session.default_nick());
        let password = session.bookmarks.get(&room).and_then(|b| b.password.clone());
        session.send_join(&room, &nick, password);
    }
    Ok(())
}

fn message(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let target = args.get(0).unwrap_or_default();
    // A resource on an open room's address designates one of its participants
    let kind = match resource(target) {
        Some(_) if session.tabs.by_name(bare_jid(target), TabKind::MultiPartyRoom).is_some() => {
            TabKind::SidePanel
        },
        _ => TabKind::Direct,
    };
    let name = if kind == TabKind::Direct { bare_jid(target) } else { target };
    if name.is_empty() {
        return Err(session.command_failure("message", "invalid address"));
    }

    let id = session.ensure_tab(name, kind);
    session.focus_tab(id)?;
    if let Some(text) = args.get(1) {
        session.try_send_text(text)?;
    }
    Ok(())
}

fn bookmark(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    if !session.config().get_bool("use_remote_bookmarks") {
        return Err(CommandError::Invalid(
            "Remote bookmarks are disabled (use_remote_bookmarks)".into(),
        ));
    }
    session.require_capability(capability::BOOKMARKS)?;
    let autojoin = match args.get(1) {
        None => true,
        Some(value) => parse_bool(value).ok_or_else(|| {
            let message = format!("autojoin must be true or false, not {value}");
            session.command_failure("bookmark", message)
        })?,
    };
    let method = session.remote_bookmark_method();
    let entry = bookmark_entry(session, args.get(0), args.get(2), autojoin, method)?;
    session.bookmarks.upsert(entry);
    session.save_remote_bookmarks("Bookmark added.", "Could not add the bookmarks.")
}

fn bookmark_local(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let entry = bookmark_entry(session, args.get(0), args.get(1), true, BookmarkMethod::Local)?;
    session.bookmarks.upsert(entry);
    session.save_local_bookmarks()?;
    session.information("Bookmark added.");
    Ok(())
}

fn remove_bookmark(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let jid = match args.get(0) {
        Some(jid) => jid.to_string(),
        None => current_room(session)
            .map(|(_, room)| room)
            .ok_or_else(|| session.command_failure("remove_bookmark", "not a room"))?,
    };
    let removed = session
        .bookmarks
        .remove(&jid)
        .ok_or_else(|| CommandError::Invalid(format!("No bookmark to remove for {jid}")))?;

    if removed.method.is_remote() {
        session.save_remote_bookmarks("Bookmark deleted", "Error while deleting the bookmark")
    } else {
        session.save_local_bookmarks()?;
        session.information("Bookmark deleted");
        Ok(())
    }
}

fn bookmarks(session: &mut Session, _: &Args) -> Result<(), CommandError> {
    if session.bookmarks.is_empty() {
        session.information("No bookmarks");
        return Ok(());
    }
    let mut text = String::from("Bookmarks:");
    for b in session.bookmarks.iter() {
        let _ = write!(text, "\n  {} ({:?})", b.jid, b.method);
        if let Some(nick) = &b.nick {
            let _ = write!(text, " as {nick}");
        }
        if b.autojoin {
            text.push_str(", autojoin");
        }
    }
    session.information(text);
    Ok(())
}

fn status(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let show: PresenceShow =
        args.get(0).unwrap_or_default().parse().map_err(CommandError::Invalid)?;
    let message = args.get(1).map(str::to_string);
    session.status.show = show;
    session.status.message = message.clone();

    if session.link.is_connected() {
        session.push(TransportRequest::SendPresence {
            to: None,
            kind: None,
            show,
            status: message.clone(),
        });
        let rooms: Vec<String> = session
            .tabs
            .iter()
            .filter(|tab| tab.kind() == TabKind::MultiPartyRoom && tab.joined)
            .filter_map(|tab| tab.own_nick.as_ref().map(|nick| format!("{}/{nick}", tab.name())))
            .collect();
        for to in rooms {
            session.push(TransportRequest::SendPresence {
                to: Some(to),
                kind: None,
                show,
                status: message.clone(),
            });
        }
    }

    let mut text = format!("Your status is now {show}");
    if let Some(message) = message {
        let _ = write!(text, " ({message})");
    }
    session.information(text);
    Ok(())
}

fn presence(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    session.require_connected()?;
    let to = match args.get(0).unwrap_or_default() {
        "." => session.tabs.current().name().to_string(),
        jid => jid.to_string(),
    };
    let kind = args.get(1).filter(|k| *k != "available").map(str::to_string);
    let status = args.get(2).map(str::to_string).or_else(|| session.status.message.clone());

    if let Some(id) = session.tabs.by_name(bare_jid(&to), TabKind::Direct)
        && let Some(tab) = session.tabs.get_mut(id)
    {
        tab.directed_presence = kind.as_deref() != Some("unavailable");
    }
    let show = session.status.show;
    session.push(TransportRequest::SendPresence { to: Some(to.clone()), kind, show, status });
    session.information(format!("Presence sent to {to}"));
    Ok(())
}

fn rawxml(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let raw = args.raw().trim();
    if raw.is_empty() {
        return Err(session.command_failure("rawxml", "nothing to send"));
    }
    let info = stanza::check(raw)?;
    session.require_connected()?;

    let stanza = raw.to_string();
    if info.expects_reply() {
        session.request(Purpose::RawStanza, |id| TransportRequest::SendRaw {
            id: Some(id),
            stanza,
        });
    } else {
        session.push(TransportRequest::SendRaw { id: None, stanza });
    }
    Ok(())
}

fn set(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let (section, key, value) = match (args.get(0), args.get(1), args.get(2)) {
        (Some(section), Some(key), Some(value)) => (Some(section), key, Some(value)),
        (Some(key), value, None) => (None, key, value),
        _ => return Err(session.command_failure("set", "missing option")),
    };

    let Some(value) = value else {
        let config = session.config();
        let current = config.get_in(key, section).or_else(|| {
            section.is_none().then(|| default_value(key).map(str::to_string)).flatten()
        });
        let text = match current {
            Some(current) => format!("{key}={current}"),
            None => format!("{key} is not set"),
        };
        session.information(text);
        return Ok(());
    };

    if section.is_none() && is_boolean(key) && parse_bool(value).is_none() {
        return Err(CommandError::Invalid(format!("{key} must be true or false, not {value}")));
    }
    session.store_mut().config_set(key, value, section)?;
    if section.is_none() {
        session.apply_option(key);
    }
    let text = match section {
        Some(section) => format!("{key}={value} (section {section})"),
        None => format!("{key}={value}"),
    };
    session.information(text);
    Ok(())
}

fn toggle(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let key = args.get(0).unwrap_or_default();
    let current = parse_bool(&session.config().get(key))
        .ok_or_else(|| CommandError::Invalid(format!("Option {key} is not a boolean")))?;
    let value = if current { "false" } else { "true" };
    session.store_mut().config_set(key, value, None)?;
    session.apply_option(key);
    session.information(format!("{key}={value}"));
    Ok(())
}

fn bind(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let key = args.get(0).unwrap_or_default();
    let target = args.get(1).unwrap_or_default();
    for name in [key, target] {
        if !name.is_empty() && KeyInput::from_name(name).is_none() {
            return Err(session.command_failure("bind", format!("unknown key {name}")));
        }
    }
    session.store_mut().config_set(key, target, Some(BINDINGS_SECTION))?;
    if target.is_empty() {
        session.information(format!("{key} is now unbound"));
    } else {
        session.information(format!("{key} is now bound to {target}"));
    }
    Ok(())
}

fn load(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    for name in args.iter() {
        match session.load_plugin(name) {
            Ok(true) => session.information(format!("Plugin {name} loaded")),
            Ok(false) => session.information(format!("Plugin {name} is already loaded")),
            Err(err) => session.report(&err.into()),
        }
    }
    session.save_plugins()
}

fn unload(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    for name in args.iter() {
        if session.unload_plugin(name) {
            session.information(format!("Plugin {name} unloaded"));
        } else {
            session.information(format!("Plugin {name} is not loaded"));
        }
    }
    session.save_plugins()
}

fn plugins(session: &mut Session, _: &Args) -> Result<(), CommandError> {
    let loaded: Vec<&str> = session.plugins().collect();
    let mut text = if loaded.is_empty() {
        "No plugins loaded".to_string()
    } else {
        format!("Loaded plugins: {}", loaded.join(", "))
    };
    let available: Vec<&str> = plugin::available().collect();
    let _ = write!(text, "\nAvailable plugins: {}", available.join(", "));
    session.information(text);
    Ok(())
}

fn self_info(session: &mut Session, _: &Args) -> Result<(), CommandError> {
    let jid = session.link.jid().unwrap_or("(not connected)").to_string();
    let status = session.status.clone();
    let nick = session.default_nick();
    session.information(format!(
        "Your JID is {jid}\nYour current status is \"{}\" ({})\nYour default nickname is {nick}",
        status.message.unwrap_or_default(),
        status.show,
    ));
    Ok(())
}

fn version(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    session.require_capability(capability::VERSION)?;
    let jid = participant_address(session, args.get(0).unwrap_or_default());
    session.request(Purpose::Version { jid: jid.clone() }, |id| {
        TransportRequest::GetVersion { id, jid }
    });
    Ok(())
}

fn last_activity(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    session.require_capability(capability::LAST_ACTIVITY)?;
    let jid = participant_address(session, args.get(0).unwrap_or_default());
    session.query_last_activity(jid);
    Ok(())
}

fn mood(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    require_publication(session, "enable_user_mood", capability::MOOD)?;
    let Some(mood) = args.get(0) else {
        session.push(TransportRequest::StopMood);
        session.information("Mood cleared");
        return Ok(());
    };
    if !MOODS.contains(&mood) {
        return Err(CommandError::Invalid(format!("{mood} is not a correct value for a mood.")));
    }
    session.push(TransportRequest::PublishMood {
        mood: mood.to_string(),
        text: args.get(1).map(str::to_string),
    });
    session.information(format!("Mood set to {mood}"));
    Ok(())
}

fn activity(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    require_publication(session, "enable_user_activity", capability::ACTIVITY)?;
    let Some(general) = args.get(0) else {
        session.push(TransportRequest::StopActivity);
        session.information("Activity cleared");
        return Ok(());
    };
    let specifics = ACTIVITIES
        .iter()
        .find(|(name, _)| *name == general)
        .map(|(_, specifics)| *specifics)
        .ok_or_else(|| {
            CommandError::Invalid(format!("{general} is not a correct value for an activity."))
        })?;

    // A second word that is not a specific activity starts the text
    let (specific, text) = match args.get(1) {
        Some(word) if specifics.contains(&word) => (Some(word), args.get(2).map(str::to_string)),
        Some(word) => {
            let text =
                args.get(2).map_or_else(|| word.to_string(), |rest| format!("{word} {rest}"));
            (None, Some(text))
        },
        None => (None, None),
    };
    session.push(TransportRequest::PublishActivity {
        general: general.to_string(),
        specific: specific.map(str::to_string),
        text,
    });
    session.information(format!("Activity set to {general}"));
    Ok(())
}

fn gaming(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    require_publication(session, "enable_user_gaming", capability::GAMING)?;
    let Some(name) = args.get(0) else {
        session.push(TransportRequest::StopGaming);
        session.information("Gaming cleared");
        return Ok(());
    };
    session.push(TransportRequest::PublishGaming {
        name: name.to_string(),
        address: args.get(1).map(str::to_string),
    });
    session.information(format!("Now playing {name}"));
    Ok(())
}

fn invite(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    session.require_connected()?;
    let to = args.get(0).unwrap_or_default().to_string();
    let room = match args.get(1).unwrap_or_default() {
        "." => current_room(session)
            .map(|(_, room)| room)
            .ok_or_else(|| session.command_failure("invite", "this tab is not a room"))?,
        room => room.to_string(),
    };
    session.information(format!("Invited {to} to {room}"));
    session.push(TransportRequest::Invite { to, room, reason: args.get(2).map(str::to_string) });
    Ok(())
}

fn decline(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    session.require_connected()?;
    let room = args.get(0).unwrap_or_default().to_string();
    let from = session
        .invitations
        .remove(&room)
        .ok_or_else(|| CommandError::Invalid(format!("No invitation from {room}")))?;
    session.push(TransportRequest::Decline {
        to: from,
        room: room.clone(),
        reason: args.get(1).map(str::to_string),
    });
    session.information(format!("Invitation to {room} declined"));
    Ok(())
}

fn invitations(session: &mut Session, _: &Args) -> Result<(), CommandError> {
    if session.invitations.is_empty() {
        session.information("You do not have any pending invitations.");
        return Ok(());
    }
    let mut text = String::from("You are invited to the following rooms:");
    for (room, from) in session.invitations() {
        let _ = write!(text, "\n  {room} by {from}");
    }
    session.information(text);
    Ok(())
}

fn quit(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let message = Some(args.raw().trim()).filter(|m| !m.is_empty()).map(str::to_string);
    session.quit(message);
    Ok(())
}

/// The focused tab, when it is a room.
fn current_room(session: &Session) -> Option<(TabId, String)> {
    let tab = session.tabs.current();
    (tab.kind() == TabKind::MultiPartyRoom).then(|| (tab.id(), tab.name().to_string()))
}

/// Room address from user input. Without a server part, the server of the
/// focused room is used.
fn qualify_room(session: &Session, room: &str) -> Result<String, CommandError> {
    if room.contains('@') {
        return Ok(room.to_lowercase());
    }
    let server = current_room(session).map(|(_, current)| domain_part(&current).to_string());
    match server {
        Some(server) => Ok(format!("{room}@{server}").to_lowercase()),
        None => Err(session.command_failure("join", format!("{room} has no server part"))),
    }
}

fn join_nick(session: &Session, bookmark: Option<&Bookmark>) -> String {
    bookmark.and_then(|b| b.nick.clone()).unwrap_or_else(|| session.default_nick())
}

/// Bookmark for `target` (`room[/nick]`, the focused room by default).
fn bookmark_entry(
    session: &Session,
    target: Option<&str>,
    password: Option<&str>,
    autojoin: bool,
    method: BookmarkMethod,
) -> Result<Bookmark, CommandError> {
    let current = current_room(session);
    let (room, nick) = match target {
        Some(target) => match target.split_once('/') {
            Some(("", nick)) => (current.as_ref().map(|(_, room)| room.clone()), Some(nick)),
            Some((room, nick)) => (Some(room.to_string()), Some(nick)),
            None => (Some(target.to_string()), None),
        },
        None => (current.as_ref().map(|(_, room)| room.clone()), None),
    };
    let room = room.ok_or_else(|| CommandError::Invalid("No room to bookmark".into()))?;
    let room = qualify_room(session, &room)?;

    let nick = nick.filter(|n| !n.is_empty()).map(str::to_string).or_else(|| {
        session
            .tabs
            .by_name(&room, TabKind::MultiPartyRoom)
            .and_then(|id| session.tabs.get(id))
            .and_then(|tab| tab.own_nick.clone())
    });
    let mut entry = Bookmark::new(room, method);
    entry.nick = nick;
    entry.password = password.map(str::to_string);
    entry.autojoin = autojoin;
    Ok(entry)
}

/// In a room, a participant's nick stands for their full room address.
fn participant_address(session: &Session, target: &str) -> String {
    let tab = session.tabs.current();
    if tab.kind() == TabKind::MultiPartyRoom && tab.roster.get(target).is_some() {
        return format!("{}/{target}", tab.name());
    }
    target.to_string()
}

fn require_publication(
    session: &Session,
    option: &str,
    name: &'static str,
) -> Result<(), CommandError> {
    if !session.config().get_bool(option) {
        return Err(CommandError::Invalid(format!("{option} is disabled")));
    }
    session.require_capability(name)
}

fn is_boolean(key: &str) -> bool {
    default_value(key).and_then(parse_bool).is_some()
}
