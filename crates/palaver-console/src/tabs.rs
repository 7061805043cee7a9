//! Tab registry.
//!
//! Tabs live in a dense, ordered sequence of slots. Slot numbers are what the
//! user types (`/win 3`) and change whenever a tab before them is closed or
//! moved. [`TabId`] is the stable handle: it is assigned once, never reused,
//! and is what the rest of the session holds on to.
//!
//! # Invariants
//!
//! - Slots are always `0..len` with no gaps.
//! - Exactly one [`TabKind::Informational`] tab exists; it is created with the
//!   registry and can be moved but not closed.
//! - Focus always designates an existing tab.
//! - Every failing operation leaves the registry unchanged.

use std::fmt;

use chrono::{DateTime, Local};

use crate::{
    error::RegistryError,
    participant::Roster,
    scrollback::{ScrollbackBuffer, ScrollbackLine},
    transport::{local_part, resource},
    viewport::{Layout, Rect, StyleId, Surface, Viewport},
};

/// Name of the informational tab.
pub const INFO_TAB: &str = "Info";

/// Stable tab identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a tab shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TabKind {
    /// One-to-one conversation with a contact.
    Direct,
    /// Multi-user room.
    MultiPartyRoom,
    /// Private conversation with a room participant (`room/nick`).
    SidePanel,
    /// Client messages.
    Informational,
    /// Room directory of a server, named after the server.
    RoomList,
}

impl fmt::Display for TabKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Direct => "conversation",
            Self::MultiPartyRoom => "room",
            Self::SidePanel => "private",
            Self::Informational => "information",
            Self::RoomList => "room list",
        })
    }
}

/// Notification level shown in the tab bar.
///
/// Ordered so a weaker notification never downgrades a stronger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TabState {
    /// Nothing new.
    #[default]
    Normal,
    /// Unread messages.
    HasUnread,
    /// Something needs attention (highlight, private message).
    Alert,
}

impl TabState {
    /// Tab bar style for this state.
    pub fn style(self) -> StyleId {
        match self {
            Self::Normal => StyleId::TabNormal,
            Self::HasUnread => StyleId::TabUnread,
            Self::Alert => StyleId::TabAlert,
        }
    }
}

/// One conversation surface.
#[derive(Debug, Clone)]
pub struct Tab {
    id: TabId,
    name: String,
    kind: TabKind,
    /// Notification level.
    pub state: TabState,
    /// Whether we are currently in the room.
    pub joined: bool,
    /// Our nick in the room.
    pub own_nick: Option<String>,
    /// Room subject.
    pub topic: Option<String>,
    /// Room members.
    pub roster: Roster,
    /// Line history.
    pub scrollback: ScrollbackBuffer,
    /// Window onto the scrollback.
    pub viewport: Viewport,
    /// Whether a directed presence was sent to this peer.
    pub directed_presence: bool,
}

impl Tab {
    fn new(id: TabId, name: String, kind: TabKind, area: Rect, cap: Option<usize>) -> Self {
        Self {
            id,
            name,
            kind,
            state: TabState::Normal,
            joined: false,
            own_nick: None,
            topic: None,
            roster: Roster::new(),
            scrollback: ScrollbackBuffer::with_cap(cap),
            viewport: Viewport::at(area),
            directed_presence: false,
        }
    }

    /// Stable identity.
    pub fn id(&self) -> TabId {
        self.id
    }

    /// Conversation identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tab kind.
    pub fn kind(&self) -> TabKind {
        self.kind
    }

    /// Names the tab can be found by.
    pub fn display_names(&self) -> Vec<&str> {
        let mut names = vec![self.name.as_str()];
        match self.kind {
            TabKind::Direct | TabKind::MultiPartyRoom => names.push(local_part(&self.name)),
            TabKind::SidePanel => names.extend(resource(&self.name)),
            TabKind::Informational | TabKind::RoomList => {},
        }
        names
    }

    /// Raise the notification level. Never lowers it.
    pub fn raise(&mut self, state: TabState) {
        self.state = self.state.max(state);
    }

    /// Append an informational line.
    pub fn add_info(&mut self, at: DateTime<Local>, text: impl Into<String>) {
        self.scrollback.append(ScrollbackLine::System { at, text: text.into() });
    }

    /// Append a spoken line.
    pub fn add_message(
        &mut self,
        at: DateTime<Local>,
        speaker: &str,
        body: &str,
        highlight: Option<StyleId>,
    ) {
        self.scrollback.append(ScrollbackLine::Spoken {
            at,
            speaker: speaker.to_string(),
            body: body.to_string(),
            highlight,
        });
    }

    /// Nicks offered for completion. In rooms, recent speakers come first.
    pub fn completion_source(&self) -> Vec<String> {
        match self.kind {
            TabKind::MultiPartyRoom => self
                .roster
                .by_last_spoken()
                .map(|p| p.nick.clone())
                .filter(|nick| Some(nick) != self.own_nick.as_ref())
                .collect(),
            TabKind::SidePanel => resource(&self.name).map(str::to_string).into_iter().collect(),
            TabKind::Direct => vec![local_part(&self.name).to_string()],
            TabKind::Informational | TabKind::RoomList => Vec::new(),
        }
    }

    /// Style of a speaker's nick in this tab.
    pub fn nick_style(&self, nick: &str) -> StyleId {
        nick_style(&self.roster, self.own_nick.as_deref(), nick)
    }

    /// Paint the scrollback through the tab's viewport.
    pub fn render_chat<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        let Self { viewport, scrollback, roster, own_nick, .. } = self;
        viewport.render(scrollback, |nick| nick_style(roster, own_nick.as_deref(), nick), surface);
    }

    fn chat_area(&self, layout: &Layout) -> Rect {
        match self.kind {
            TabKind::MultiPartyRoom => layout.room_chat,
            _ => layout.chat,
        }
    }
}

fn nick_style(roster: &Roster, own_nick: Option<&str>, nick: &str) -> StyleId {
    if own_nick == Some(nick) {
        return StyleId::OwnNick;
    }
    roster.get(nick).map_or(StyleId::Nick(0), |p| StyleId::Nick(p.color_index))
}

/// Focus moved from one tab to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusChange {
    /// Tab that lost focus. May already be closed.
    pub lost: TabId,
    /// Tab that gained focus.
    pub gained: TabId,
}

/// Ordered collection of tabs with one focused slot.
#[derive(Debug, Clone)]
pub struct TabRegistry {
    tabs: Vec<Tab>,
    focus: usize,
    next_id: u64,
    layout: Layout,
    scrollback_cap: Option<usize>,
}

impl Default for TabRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TabRegistry {
    /// Registry holding only the informational tab, focused.
    pub fn new() -> Self {
        let layout = Layout::compute(80, 24);
        let info =
            Tab::new(TabId(0), INFO_TAB.to_string(), TabKind::Informational, layout.chat, None);
        Self { tabs: vec![info], focus: 0, next_id: 1, layout, scrollback_cap: None }
    }

    /// Open a tab at the end of the sequence. Focus does not change.
    ///
    /// Opening the informational tab returns the existing one.
    pub fn open(&mut self, name: &str, kind: TabKind) -> Result<TabId, RegistryError> {
        if kind == TabKind::Informational {
            return Ok(self.info_id());
        }
        if self.by_name(name, kind).is_some() {
            return Err(RegistryError::DuplicateTab { name: name.to_string(), kind });
        }

        let id = TabId(self.next_id);
        self.next_id += 1;
        let mut tab = Tab::new(id, name.to_string(), kind, Rect::default(), self.scrollback_cap);
        tab.viewport.place(tab.chat_area(&self.layout));
        self.tabs.push(tab);
        Ok(id)
    }

    /// Close a tab and compact the slots.
    ///
    /// If the tab had focus, focus moves to the slot before it and the
    /// returned [`FocusChange`] names the tab that gained it.
    pub fn close(&mut self, id: TabId) -> Result<(Tab, Option<FocusChange>), RegistryError> {
        let slot = self.slot_or_err(id)?;
        if self.tabs[slot].kind == TabKind::Informational {
            return Err(RegistryError::CannotCloseSingleton);
        }

        let tab = self.tabs.remove(slot);
        let change = if slot == self.focus {
            self.focus = slot.saturating_sub(1);
            Some(FocusChange { lost: id, gained: self.tabs[self.focus].id })
        } else {
            if slot < self.focus {
                self.focus -= 1;
            }
            None
        };
        Ok((tab, change))
    }

    /// Focus a tab. `None` when it already had focus.
    pub fn focus(&mut self, id: TabId) -> Result<Option<FocusChange>, RegistryError> {
        let slot = self.slot_or_err(id)?;
        Ok(self.set_focus(slot))
    }

    /// Focus the tab at `slot`.
    pub fn focus_slot(&mut self, slot: usize) -> Result<Option<FocusChange>, RegistryError> {
        if slot >= self.tabs.len() {
            return Err(RegistryError::InvalidSlot { slot, len: self.tabs.len() });
        }
        Ok(self.set_focus(slot))
    }

    /// Focus the next tab, wrapping around.
    pub fn focus_next(&mut self) -> Option<FocusChange> {
        self.set_focus((self.focus + 1) % self.tabs.len())
    }

    /// Focus the previous tab, wrapping around.
    pub fn focus_previous(&mut self) -> Option<FocusChange> {
        let len = self.tabs.len();
        self.set_focus((self.focus + len - 1) % len)
    }

    /// Move the tab at `old` to `new`, shifting the tabs in between by one.
    ///
    /// Focus stays on the tab that had it.
    pub fn move_tab(&mut self, old: usize, new: usize) -> Result<(), RegistryError> {
        let len = self.tabs.len();
        for slot in [old, new] {
            if slot >= len {
                return Err(RegistryError::InvalidSlot { slot, len });
            }
        }
        if old == new {
            return Ok(());
        }

        let focused = self.current_id();
        let tab = self.tabs.remove(old);
        self.tabs.insert(new, tab);
        self.focus = self.slot_of(focused).unwrap_or(0);
        Ok(())
    }

    /// Tabs whose display names contain `fragment`, case-insensitively, in
    /// slot order.
    pub fn find_by_name(&self, fragment: &str, kind: Option<TabKind>) -> Vec<TabId> {
        let fragment = fragment.to_lowercase();
        self.tabs
            .iter()
            .filter(|tab| kind.is_none_or(|k| tab.kind == k))
            .filter(|tab| tab.display_names().iter().any(|n| n.to_lowercase().contains(&fragment)))
            .map(|tab| tab.id)
            .collect()
    }

    /// Resolve a user reference: `.` is the current tab, a number is a slot,
    /// anything else is the first name match.
    pub fn resolve(&self, token: &str) -> Result<TabId, RegistryError> {
        if token == "." {
            return Ok(self.current_id());
        }
        if let Ok(slot) = token.parse::<usize>() {
            return self
                .tabs
                .get(slot)
                .map(|tab| tab.id)
                .ok_or_else(|| RegistryError::TabNotFound(token.to_string()));
        }
        self.find_by_name(token, None)
            .first()
            .copied()
            .ok_or_else(|| RegistryError::TabNotFound(token.to_string()))
    }

    /// Exact lookup by conversation identifier and kind.
    pub fn by_name(&self, name: &str, kind: TabKind) -> Option<TabId> {
        self.tabs.iter().find(|tab| tab.kind == kind && tab.name == name).map(|tab| tab.id)
    }

    /// Tab by identity.
    pub fn get(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    /// Mutable tab by identity.
    pub fn get_mut(&mut self, id: TabId) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|tab| tab.id == id)
    }

    /// Focused tab.
    pub fn current(&self) -> &Tab {
        &self.tabs[self.focus]
    }

    /// Mutable focused tab.
    pub fn current_mut(&mut self) -> &mut Tab {
        &mut self.tabs[self.focus]
    }

    /// Identity of the focused tab.
    pub fn current_id(&self) -> TabId {
        self.tabs[self.focus].id
    }

    /// Slot of the focused tab.
    pub fn focus_index(&self) -> usize {
        self.focus
    }

    /// The informational tab.
    pub fn info(&self) -> &Tab {
        self.tabs.iter().find(|tab| tab.kind == TabKind::Informational).unwrap_or(&self.tabs[0])
    }

    /// Mutable informational tab.
    pub fn info_mut(&mut self) -> &mut Tab {
        let slot = self.info_slot();
        &mut self.tabs[slot]
    }

    /// Identity of the informational tab.
    pub fn info_id(&self) -> TabId {
        self.info().id
    }

    /// Tabs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tab> {
        self.tabs.iter()
    }

    /// Mutable tabs in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tab> {
        self.tabs.iter_mut()
    }

    /// Number of open tabs.
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Always false: the informational tab is always open.
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Current slot of a tab.
    pub fn slot_of(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.id == id)
    }

    /// Screen layout the viewports are placed in.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Re-place every viewport for a new screen layout.
    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
        for tab in &mut self.tabs {
            let area = tab.chat_area(&layout);
            tab.viewport.place(area);
        }
    }

    /// Cap every scrollback, present and future. `None` is unbounded.
    pub fn set_scrollback_cap(&mut self, cap: Option<usize>) {
        self.scrollback_cap = cap;
        for tab in &mut self.tabs {
            tab.scrollback.set_cap(cap);
        }
    }

    fn set_focus(&mut self, slot: usize) -> Option<FocusChange> {
        if slot == self.focus {
            return None;
        }
        let lost = self.tabs[self.focus].id;
        self.focus = slot;
        Some(FocusChange { lost, gained: self.tabs[slot].id })
    }

    fn info_slot(&self) -> usize {
        self.tabs.iter().position(|tab| tab.kind == TabKind::Informational).unwrap_or(0)
    }

    fn slot_or_err(&self, id: TabId) -> Result<usize, RegistryError> {
        self.slot_of(id).ok_or_else(|| RegistryError::TabNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(registry: &TabRegistry) -> Vec<&str> {
        registry.iter().map(Tab::name).collect()
    }

    #[test]
    fn starts_with_focused_info_tab() {
        let registry = TabRegistry::new();
        assert_eq!(names(&registry), [INFO_TAB]);
        assert_eq!(registry.current().kind(), TabKind::Informational);
    }

    #[test]
    fn duplicate_name_and_kind_rejected() {
        let mut registry = TabRegistry::new();
        registry.open("room@muc.example.org", TabKind::MultiPartyRoom).unwrap();

        let err = registry.open("room@muc.example.org", TabKind::MultiPartyRoom).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTab { kind: TabKind::MultiPartyRoom, .. }));

        // Same name, different kind is a different conversation
        assert!(registry.open("room@muc.example.org", TabKind::Direct).is_ok());
    }

    #[test]
    fn info_tab_is_singleton() {
        let mut registry = TabRegistry::new();
        let info = registry.info_id();
        assert_eq!(registry.open("whatever", TabKind::Informational), Ok(info));
        assert_eq!(registry.close(info).unwrap_err(), RegistryError::CannotCloseSingleton);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn closing_focused_tab_focuses_previous_slot() {
        let mut registry = TabRegistry::new();
        let a = registry.open("a@example.org", TabKind::Direct).unwrap();
        let b = registry.open("b@example.org", TabKind::Direct).unwrap();
        registry.focus(b).unwrap();

        let (closed, change) = registry.close(b).unwrap();
        assert_eq!(closed.id(), b);
        assert_eq!(change, Some(FocusChange { lost: b, gained: a }));
        assert_eq!(registry.current_id(), a);
    }

    #[test]
    fn closing_earlier_tab_keeps_focus_on_same_tab() {
        let mut registry = TabRegistry::new();
        let a = registry.open("a@example.org", TabKind::Direct).unwrap();
        let b = registry.open("b@example.org", TabKind::Direct).unwrap();
        registry.focus(b).unwrap();

        let (_, change) = registry.close(a).unwrap();
        assert_eq!(change, None);
        assert_eq!(registry.current_id(), b);
        assert_eq!(registry.slot_of(b), Some(1));
    }

    #[test]
    fn refocusing_is_silent() {
        let mut registry = TabRegistry::new();
        let info = registry.info_id();
        assert_eq!(registry.focus(info), Ok(None));
    }

    #[test]
    fn resolve_references() {
        let mut registry = TabRegistry::new();
        let room = registry.open("coffee@muc.example.org", TabKind::MultiPartyRoom).unwrap();
        let pm = registry.open("coffee@muc.example.org/Alice", TabKind::SidePanel).unwrap();

        assert_eq!(registry.resolve("."), Ok(registry.info_id()));
        assert_eq!(registry.resolve("1"), Ok(room));
        assert_eq!(registry.resolve("COFFEE"), Ok(room));
        assert_eq!(registry.resolve("alice"), Ok(pm));
        assert_eq!(registry.resolve("7"), Err(RegistryError::TabNotFound("7".into())));
        assert!(registry.resolve("tea").is_err());
    }

    #[test]
    fn stronger_state_is_not_downgraded() {
        let mut registry = TabRegistry::new();
        let tab = registry.current_mut();
        tab.raise(TabState::Alert);
        tab.raise(TabState::HasUnread);
        assert_eq!(tab.state, TabState::Alert);
    }

    #[test]
    fn invalid_move_leaves_registry_unchanged() {
        let mut registry = TabRegistry::new();
        registry.open("a@example.org", TabKind::Direct).unwrap();

        let err = registry.move_tab(0, 5).unwrap_err();
        assert_eq!(err, RegistryError::InvalidSlot { slot: 5, len: 2 });
        assert_eq!(names(&registry), [INFO_TAB, "a@example.org"]);
    }
}
