//! Session state machine.
//!
//! The [`Session`] owns every piece of console state: the tab registry, the
//! line editor, the command tables, what we know about the transport link,
//! and the persistence collaborator. It is built once at startup and lives
//! until quit; nothing in the core is global.
//!
//! This is a pure state machine: it consumes [`SessionEvent`]s and produces
//! [`SessionAction`]s. Every error a command or an incoming event can cause
//! ends here as one line for the user; the session itself never fails.
//!
//! # Asynchronous replies
//!
//! Requests expecting an answer are recorded in a pending table keyed by
//! [`RequestId`], together with the stable name and kind of the tab they came
//! from. When the answer arrives the tab is looked up again by that name. If
//! it has been closed meanwhile, the result goes to the informational tab.

mod incoming;
mod render;

use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use chrono::{DateTime, Local};

use crate::{
    KeyInput, SessionAction, SessionEvent,
    bookmark::{Bookmark, BookmarkList, BookmarkMethod},
    command::{self, CommandDispatcher},
    config::{BINDINGS_SECTION, Config},
    editor::{CompletionMode, LineEditor},
    env::Clock,
    error::{CommandError, PluginError},
    plugin::{self, Plugin},
    store::Store,
    tabs::{FocusChange, Tab, TabId, TabKind, TabRegistry, TabState},
    transport::{
        ChatState, RequestId, Status, TransportEvent, TransportLink, TransportRequest, capability,
        local_part,
    },
    viewport::Layout,
};

/// What an outstanding request was for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Purpose {
    Version { jid: String },
    LastActivity { jid: String },
    DestroyRoom { room: String },
    ListRooms { server: String },
    FetchBookmarks { autojoin: bool },
    SaveBookmarks { success: &'static str, failure: &'static str },
    RawStanza,
}

/// An outstanding request and the tab it came from.
#[derive(Debug, Clone)]
struct Pending {
    origin: String,
    kind: TabKind,
    purpose: Purpose,
}

/// Console session.
pub struct Session {
    pub(crate) tabs: TabRegistry,
    pub(crate) editor: LineEditor,
    commands: CommandDispatcher<Session>,
    pub(crate) link: TransportLink,
    store: Box<dyn Store>,
    clock: Box<dyn Clock>,
    pub(crate) bookmarks: BookmarkList,
    pending: HashMap<RequestId, Pending>,
    next_request: u64,
    outbox: Vec<SessionAction>,
    pub(crate) status: Status,
    status_message: Option<String>,
    plugins: BTreeMap<&'static str, Box<dyn Plugin>>,
    /// Pending invitations, room to inviter.
    pub(crate) invitations: BTreeMap<String, String>,
    quitting: bool,
    dirty: bool,
    screen: (u16, u16),
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("tabs", &self.tabs.len())
            .field("link", &self.link)
            .field("pending", &self.pending.len())
            .field("quitting", &self.quitting)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session reading configuration and bookmarks from `store`.
    ///
    /// Plugins listed in `plugins_autoload` are loaded immediately.
    pub fn new(store: Box<dyn Store>, clock: Box<dyn Clock>) -> Self {
        let bookmarks = store.bookmarks_load().unwrap_or_else(|err| {
            tracing::warn!(%err, "could not load local bookmarks");
            Vec::new()
        });

        let mut session = Self {
            tabs: TabRegistry::new(),
            editor: LineEditor::new(),
            commands: command::standard(),
            link: TransportLink::Disconnected,
            store,
            clock,
            bookmarks: BookmarkList::new(bookmarks),
            pending: HashMap::new(),
            next_request: 1,
            outbox: Vec::new(),
            status: Status::default(),
            status_message: None,
            plugins: BTreeMap::new(),
            invitations: BTreeMap::new(),
            quitting: false,
            dirty: true,
            screen: (80, 24),
        };
        session.apply_option("completion");
        session.apply_option("max_lines_in_memory");
        session.autoload_plugins();
        session
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::Tick => self.tick_plugins(),
            SessionEvent::Key(key) => {
                self.handle_key(key);
                self.dirty = true;
            },
            SessionEvent::Paste(text) => {
                self.editor.insert_str(&text);
                self.dirty = true;
            },
            SessionEvent::Resize(cols, rows) => {
                self.screen = (cols, rows);
                self.tabs.set_layout(Layout::compute(cols, rows));
                self.dirty = true;
            },
            SessionEvent::Transport(event) => {
                self.handle_transport(event);
                self.dirty = true;
            },
            SessionEvent::DisconnectTimeout => {
                if self.quitting {
                    tracing::warn!("transport did not confirm disconnection in time");
                    self.outbox.push(SessionAction::Quit);
                }
            },
        }
        std::mem::take(&mut self.outbox)
    }

    /// Whether something changed since the last call. Clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Submit a line as if typed: a command, a doubled-prefix escape, or a
    /// message for the focused conversation.
    pub fn execute_line(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        let prefix = self.config().command_prefix();
        match line.strip_prefix(prefix.as_str()) {
            Some(rest) if rest.starts_with(prefix.as_str()) => self.send_text(rest),
            Some(rest) => self.run_command(rest),
            None => self.send_text(line),
        }
        self.dirty = true;
    }

    /// Help for a command as seen from the focused tab.
    pub fn command_help(&self, name: &str) -> Option<String> {
        let prefix = self.config().command_prefix();
        self.commands.help(self.tabs.current().kind(), name, &prefix)
    }

    /// Summary of the commands available in the focused tab.
    pub fn command_overview(&self) -> String {
        let prefix = self.config().command_prefix();
        self.commands.overview(self.tabs.current().kind(), &prefix)
    }

    /// Open tabs.
    pub fn tabs(&self) -> &TabRegistry {
        &self.tabs
    }

    /// Input line.
    pub fn editor(&self) -> &LineEditor {
        &self.editor
    }

    /// Transport connection state.
    pub fn link(&self) -> &TransportLink {
        &self.link
    }

    /// Merged bookmarks.
    pub fn bookmarks(&self) -> &BookmarkList {
        &self.bookmarks
    }

    /// Our broadcast status.
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Last line reported to the user, shown in the status bar.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Loaded plugin names, sorted.
    pub fn plugins(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().copied()
    }

    /// Pending invitations as `(room, inviter)`.
    pub fn invitations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.invitations.iter().map(|(room, from)| (room.as_str(), from.as_str()))
    }

    /// Number of requests still waiting for an answer.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// True once a quit is in progress.
    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    /// Typed configuration.
    pub fn config(&self) -> Config<'_> {
        Config::new(self.store.as_ref())
    }

    /// The key `key` acts as, after the `bindings` section.
    fn bound(&self, key: KeyInput) -> KeyInput {
        if !self.store.has_section(BINDINGS_SECTION) {
            return key;
        }
        let target =
            key.name().and_then(|name| self.store.config_get(name, Some(BINDINGS_SECTION)));
        let Some(target) = target.filter(|target| !target.is_empty()) else {
            return key;
        };
        KeyInput::from_name(&target).unwrap_or_else(|| {
            tracing::warn!(?key, %target, "binding to an unknown key ignored");
            key
        })
    }

    fn handle_key(&mut self, key: KeyInput) {
        match self.bound(key) {
            KeyInput::Char(ch) => {
                let was_empty = self.editor.is_empty();
                self.editor.insert_char(ch);
                if was_empty && !self.editor.text().starts_with(&self.config().command_prefix()) {
                    self.send_chat_state(self.tabs.current_id(), ChatState::Composing);
                }
            },
            KeyInput::Enter => {
                let line = self.editor.submit();
                self.execute_line(&line);
            },
            KeyInput::Backspace => self.editor.delete_backward(),
            KeyInput::Delete => self.editor.delete_forward(),
            KeyInput::Tab => {
                let source = self.tabs.current().completion_source();
                self.editor.complete(&source);
            },
            KeyInput::Left => self.editor.move_left(),
            KeyInput::Right => self.editor.move_right(),
            KeyInput::Up => self.editor.history_up(),
            KeyInput::Down => self.editor.history_down(),
            KeyInput::Home => self.editor.move_home(),
            KeyInput::End => self.editor.move_end(),
            KeyInput::DeleteWord => self.editor.delete_word_backward(),
            KeyInput::KillLine => self.editor.kill_to_start(),
            KeyInput::NextTab => {
                if let Some(change) = self.tabs.focus_next() {
                    self.on_focus_change(change);
                }
            },
            KeyInput::PreviousTab => {
                if let Some(change) = self.tabs.focus_previous() {
                    self.on_focus_change(change);
                }
            },
        }
    }

    fn run_command(&mut self, text: &str) {
        let kind = self.tabs.current().kind();
        let prefix = self.config().command_prefix();
        let result = match self.commands.prepare(kind, text, &prefix) {
            Ok(invocation) => invocation.run(self),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            self.report(&err);
        }
    }

    fn send_text(&mut self, body: &str) {
        if let Err(err) = self.try_send_text(body) {
            self.report(&err);
        }
    }

    /// Send `body` to the focused conversation.
    pub(crate) fn try_send_text(&mut self, body: &str) -> Result<(), CommandError> {
        let tab = self.tabs.current();
        let (id, name, kind, joined) = (tab.id(), tab.name().to_string(), tab.kind(), tab.joined);
        let prefix = self.config().command_prefix();
        match kind {
            TabKind::Informational | TabKind::RoomList => {
                return Err(CommandError::Invalid(format!(
                    "This tab does not accept messages. Type {prefix}help for the list of commands."
                )));
            },
            TabKind::MultiPartyRoom => {
                self.require_connected()?;
                if !joined {
                    return Err(CommandError::Invalid(format!(
                        "You are not in this room. Use {prefix}join to rejoin it."
                    )));
                }
                // The room reflects our message back; it is shown then
                self.push(TransportRequest::SendMessage { to: name, body: body.to_string() });
            },
            TabKind::Direct | TabKind::SidePanel => {
                self.require_connected()?;
                self.push(TransportRequest::SendMessage { to: name, body: body.to_string() });
                let own = self.own_nick_in(id);
                let now = self.now();
                if let Some(tab) = self.tabs.get_mut(id) {
                    tab.add_message(now, &own, body, None);
                }
            },
        }
        Ok(())
    }

    pub(crate) fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    pub(crate) fn store_mut(&mut self) -> &mut dyn Store {
        self.store.as_mut()
    }

    pub(crate) fn push(&mut self, request: TransportRequest) {
        self.outbox.push(SessionAction::Transport(request));
    }

    /// Report to the informational tab and the status bar.
    pub(crate) fn information(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.status_message = text.lines().next().map(str::to_string);
        let now = self.now();
        self.tabs.info_mut().add_info(now, text);
    }

    /// Report to a tab, or to the informational tab if it is gone.
    pub(crate) fn report_to(&mut self, target: Option<TabId>, text: impl Into<String>) {
        let now = self.now();
        match target.and_then(|id| self.tabs.get_mut(id)) {
            Some(tab) if tab.kind() != TabKind::Informational => tab.add_info(now, text),
            _ => self.information(text),
        }
    }

    pub(crate) fn report(&mut self, err: &CommandError) {
        tracing::debug!(%err, "reporting error");
        self.information(format!("Error: {err}"));
    }

    /// Handler failure for `command`, named with the configured prefix.
    pub(crate) fn command_failure(
        &self,
        command: &str,
        message: impl Into<String>,
    ) -> CommandError {
        let prefix = self.config().command_prefix();
        CommandError::Invalid(format!("{prefix}{command}: {}", message.into()))
    }

    pub(crate) fn require_connected(&self) -> Result<(), CommandError> {
        if self.link.is_connected() { Ok(()) } else { Err(CommandError::TransportUnavailable) }
    }

    pub(crate) fn require_capability(&self, name: &'static str) -> Result<(), CommandError> {
        self.require_connected()?;
        if self.link.supports(name) {
            Ok(())
        } else {
            Err(CommandError::CapabilityUnavailable(name))
        }
    }

    /// Send a request whose answer comes back as a [`TransportEvent::Reply`].
    pub(crate) fn request(
        &mut self,
        purpose: Purpose,
        build: impl FnOnce(RequestId) -> TransportRequest,
    ) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        let origin = self.tabs.current();
        let pending =
            Pending { origin: origin.name().to_string(), kind: origin.kind(), purpose };
        tracing::debug!(%id, ?pending, "request sent");
        self.pending.insert(id, pending);
        self.push(build(id));
        id
    }

    pub(crate) fn focus_tab(&mut self, id: TabId) -> Result<(), CommandError> {
        if let Some(change) = self.tabs.focus(id)? {
            self.on_focus_change(change);
        }
        Ok(())
    }

    pub(crate) fn close_tab(&mut self, id: TabId) -> Result<Tab, CommandError> {
        let (tab, change) = self.tabs.close(id)?;
        if let Some(change) = change {
            self.on_focus_change(change);
        }
        Ok(tab)
    }

    /// Existing tab for the conversation, or a new one at the end.
    pub(crate) fn ensure_tab(&mut self, name: &str, kind: TabKind) -> TabId {
        if let Some(id) = self.tabs.by_name(name, kind) {
            return id;
        }
        match self.tabs.open(name, kind) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(%err, name, "could not open tab");
                self.tabs.info_id()
            },
        }
    }

    fn on_focus_change(&mut self, change: FocusChange) {
        self.send_chat_state(change.lost, ChatState::Inactive);
        if let Some(tab) = self.tabs.get_mut(change.gained) {
            tab.state = TabState::Normal;
        }
        self.send_chat_state(change.gained, ChatState::Active);
    }

    /// Chat state notification for a one-to-one tab, when enabled.
    pub(crate) fn send_chat_state(&mut self, id: TabId, state: ChatState) {
        let Some(tab) = self.tabs.get(id) else {
            return;
        };
        if !matches!(tab.kind(), TabKind::Direct | TabKind::SidePanel)
            || !self.link.is_connected()
            || !self.config().get_bool("send_chat_states")
        {
            return;
        }
        let to = tab.name().to_string();
        self.push(TransportRequest::SendChatState { to, state });
    }

    /// Nick used when none is given: `nick` option, else our address.
    pub(crate) fn default_nick(&self) -> String {
        let nick = self.config().get("nick");
        if !nick.is_empty() {
            return nick;
        }
        self.link.jid().map(local_part).filter(|n| !n.is_empty()).unwrap_or("palaver").to_string()
    }

    fn own_nick_in(&self, id: TabId) -> String {
        self.tabs
            .get(id)
            .and_then(|tab| tab.own_nick.clone())
            .unwrap_or_else(|| self.default_nick())
    }

    /// Apply a changed option to live state.
    pub(crate) fn apply_option(&mut self, key: &str) {
        match key {
            "completion" | "after_completion" => {
                let config = self.config();
                let mode = config.get_parsed::<CompletionMode>("completion").unwrap_or_default();
                let after = config.get("after_completion");
                self.editor.set_completion_style(mode, &after);
            },
            "max_lines_in_memory" => {
                let cap = self.config().scrollback_cap();
                self.tabs.set_scrollback_cap(cap);
            },
            _ => {},
        }
    }

    fn autoload_plugins(&mut self) {
        let names = self.config().get("plugins_autoload");
        for name in names.split_whitespace() {
            match self.load_plugin(name) {
                Ok(true) => self.information(format!("Plugin {name} loaded")),
                Ok(false) => {},
                Err(err) => {
                    tracing::warn!(%err, plugin = name, "autoload failed");
                    self.report(&err.into());
                },
            }
        }
    }

    /// Load a built-in plugin and register its commands. Returns false when
    /// it was already loaded.
    pub(crate) fn load_plugin(&mut self, name: &str) -> Result<bool, PluginError> {
        if self.plugins.contains_key(name) {
            return Ok(false);
        }
        let plugin = plugin::instantiate(name).ok_or_else(|| PluginError::Unknown(name.into()))?;
        if let Some(taken) = plugin.commands().iter().find(|c| self.commands.is_registered(c.name))
        {
            return Err(PluginError::CommandTaken {
                plugin: name.to_string(),
                command: taken.name.to_string(),
            });
        }
        for spec in plugin.commands() {
            self.commands.register_global(*spec);
        }
        tracing::debug!(plugin = name, "plugin loaded");
        self.plugins.insert(plugin.name(), plugin);
        Ok(true)
    }

    /// Unload a plugin and drop its commands. Returns false when it was not
    /// loaded.
    pub(crate) fn unload_plugin(&mut self, name: &str) -> bool {
        let Some(plugin) = self.plugins.remove(name) else {
            return false;
        };
        for spec in plugin.commands() {
            self.commands.unregister_global(spec.name);
        }
        tracing::debug!(plugin = name, "plugin unloaded");
        true
    }

    /// Persist the loaded plugin set for the next start.
    pub(crate) fn save_plugins(&mut self) -> Result<(), CommandError> {
        let names = self.plugins().collect::<Vec<_>>().join(" ");
        self.store.config_set("plugins_autoload", &names, None)?;
        Ok(())
    }

    fn tick_plugins(&mut self) {
        if self.plugins.is_empty() {
            return;
        }
        let mut plugins = std::mem::take(&mut self.plugins);
        for plugin in plugins.values_mut() {
            plugin.on_tick(self);
        }
        self.plugins = plugins;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn query_last_activity(&mut self, jid: String) {
        self.request(Purpose::LastActivity { jid: jid.clone() }, |id| {
            TransportRequest::GetLastActivity { id, jid }
        });
    }

    pub(crate) fn send_join(&mut self, room: &str, nick: &str, password: Option<String>) {
        let history_length = u32::try_from(self.config().get_u64("muc_history_length")).ok();
        self.push(TransportRequest::JoinRoom {
            room: room.to_string(),
            nick: nick.to_string(),
            password,
            history_length,
            status: self.status.clone(),
        });
    }

    /// Join bookmarked rooms flagged for it that are not open yet.
    pub(crate) fn autojoin(&mut self) {
        let rooms: Vec<Bookmark> = self
            .bookmarks
            .iter()
            .filter(|b| b.autojoin && self.tabs.by_name(&b.jid, TabKind::MultiPartyRoom).is_none())
            .cloned()
            .collect();
        for bookmark in rooms {
            self.ensure_tab(&bookmark.jid, TabKind::MultiPartyRoom);
            let nick = bookmark.nick.clone().unwrap_or_else(|| self.default_nick());
            self.send_join(&bookmark.jid, &nick, bookmark.password.clone());
        }
    }

    pub(crate) fn save_local_bookmarks(&mut self) -> Result<(), CommandError> {
        let local: Vec<Bookmark> = self.bookmarks.local().cloned().collect();
        self.store.bookmarks_save_local(&local).inspect_err(|err| {
            tracing::warn!(%err, "could not save local bookmarks");
        })?;
        Ok(())
    }

    /// Push the remote part of the bookmark list to the server.
    pub(crate) fn save_remote_bookmarks(
        &mut self,
        success: &'static str,
        failure: &'static str,
    ) -> Result<(), CommandError> {
        self.require_capability(capability::BOOKMARKS)?;
        let bookmarks: Vec<Bookmark> = self.bookmarks.remote().cloned().collect();
        self.request(Purpose::SaveBookmarks { success, failure }, |id| {
            TransportRequest::SaveRemoteBookmarks { id, bookmarks }
        });
        Ok(())
    }

    /// Storage method for new remote bookmarks.
    pub(crate) fn remote_bookmark_method(&self) -> BookmarkMethod {
        BookmarkMethod::from_config(&self.config().get("use_bookmarks_method"))
            .filter(|m| m.is_remote())
            .unwrap_or(BookmarkMethod::Pep)
    }

    /// Leave a room, keeping its tab.
    pub(crate) fn leave_room(&mut self, id: TabId, message: Option<String>) {
        let Some(tab) = self.tabs.get_mut(id) else {
            return;
        };
        if !tab.joined {
            return;
        }
        let room = tab.name().to_string();
        let nick = tab.own_nick.clone().unwrap_or_default();
        tab.joined = false;
        tab.roster.clear();
        let now = self.clock.now();
        tab.add_info(now, "You left the room");
        if self.link.is_connected() {
            self.push(TransportRequest::LeaveRoom { room, nick, message });
        }
    }

    /// Stop publications, unload plugins and disconnect; quit right away
    /// when there is no connection.
    pub(crate) fn quit(&mut self, message: Option<String>) {
        if !self.link.is_connected() {
            self.outbox.push(SessionAction::Quit);
            return;
        }
        self.quitting = true;

        let stops = [
            ("enable_user_mood", capability::MOOD, TransportRequest::StopMood),
            ("enable_user_activity", capability::ACTIVITY, TransportRequest::StopActivity),
            ("enable_user_gaming", capability::GAMING, TransportRequest::StopGaming),
        ];
        for (option, cap, stop) in stops {
            if self.config().get_bool(option) && self.link.supports(cap) {
                self.push(stop);
            }
        }

        let loaded: Vec<&'static str> = self.plugins.keys().copied().collect();
        for name in loaded {
            self.unload_plugin(name);
        }

        self.push(TransportRequest::Disconnect { message });
        let timeout = self.config().disconnect_timeout();
        self.outbox.push(SessionAction::AwaitDisconnect { timeout });
    }

    /// Grace period the runtime waits for a disconnection.
    pub fn disconnect_timeout(&self) -> Duration {
        self.config().disconnect_timeout()
    }

    fn handle_transport(&mut self, event: TransportEvent) {
        tracing::debug!(?event, "transport event");
        incoming::handle(self, event);
    }

    pub(crate) fn take_pending(&mut self, id: RequestId) -> Option<(Option<TabId>, Purpose)> {
        let pending = self.pending.remove(&id)?;
        let target = self.tabs.by_name(&pending.origin, pending.kind);
        if target.is_none() {
            tracing::debug!(%id, origin = %pending.origin, "origin tab closed before reply");
        }
        Some((target, pending.purpose))
    }
}
