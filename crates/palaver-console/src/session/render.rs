//! Screen composition.
//!
//! Top to bottom: topic row, chat area (with the roster column on rooms),
//! tab bar, input line.

use super::Session;
use crate::{
    participant::{Affiliation, Participant},
    tabs::{Tab, TabKind},
    viewport::{Layout, Rect, StyleId, Surface, render_input, str_width},
};

const TOO_SMALL: &str = "Screen is too small";

impl Session {
    /// Paint the whole screen.
    pub fn render<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        let layout = *self.tabs.layout();
        if !layout.visible {
            let (cols, rows) = self.screen;
            surface.clear(Rect::new(0, 0, cols, rows));
            surface.put_str(0, 0, TOO_SMALL, StyleId::Error);
            return;
        }

        draw_topic(self.tabs.current(), layout.topic, surface);
        self.tabs.current_mut().render_chat(surface);
        if self.tabs.current().kind() == TabKind::MultiPartyRoom {
            draw_roster(self.tabs.current(), &layout, surface);
        }
        self.draw_tab_bar(layout.tab_bar, surface);
        render_input(&self.editor, layout.input, surface);
    }

    fn draw_tab_bar<S: Surface + ?Sized>(&self, area: Rect, surface: &mut S) {
        surface.clear(area);
        let mut col = area.x;
        let mut put = |surface: &mut S, text: &str, style: StyleId| {
            surface.put_str(area.y, col, text, style);
            col = col.saturating_add(str_width(text) as u16);
        };

        put(surface, "[", StyleId::TabNormal);
        let focus = self.tabs.focus_index();
        for (slot, tab) in self.tabs.iter().enumerate() {
            if slot > 0 {
                put(surface, "|", StyleId::TabNormal);
            }
            let style = if slot == focus { StyleId::TabCurrent } else { tab.state.style() };
            put(surface, &slot.to_string(), style);
        }
        put(surface, "] ", StyleId::TabNormal);
        put(surface, self.tabs.current().name(), StyleId::TabCurrent);
        if let Some(message) = &self.status_message {
            put(surface, " ", StyleId::TabNormal);
            put(surface, message, StyleId::Normal);
        }
    }
}

fn draw_topic<S: Surface + ?Sized>(tab: &Tab, area: Rect, surface: &mut S) {
    surface.clear(area);
    let text = match (&tab.topic, tab.kind()) {
        (Some(topic), TabKind::MultiPartyRoom) => format!("{}: {topic}", tab.name()),
        _ => tab.name().to_string(),
    };
    surface.put_str(area.y, area.x, &text, StyleId::Topic);
}

fn draw_roster<S: Surface + ?Sized>(tab: &Tab, layout: &Layout, surface: &mut S) {
    let area = layout.roster;
    surface.clear(area);
    // Separator column between the chat area and the roster
    let separator = area.x.saturating_sub(1);
    for row in area.y..area.y + area.height {
        surface.put_str(row, separator, "│", StyleId::Roster);
    }

    for (offset, member) in tab.roster.iter().take(usize::from(area.height)).enumerate() {
        let row = area.y + offset as u16;
        surface.put_str(row, area.x, symbol(member), StyleId::Roster);
        let style = if tab.own_nick.as_deref() == Some(member.nick.as_str()) {
            StyleId::OwnNick
        } else {
            StyleId::Nick(member.color_index)
        };
        surface.put_str(row, area.x.saturating_add(1), &member.nick, style);
    }
}

fn symbol(member: &Participant) -> &'static str {
    match member.affiliation {
        Affiliation::Owner => "~",
        Affiliation::Admin => "&",
        Affiliation::Member => "+",
        Affiliation::Outcast => "!",
        Affiliation::None => " ",
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::*;
    use crate::{ManualClock, MemoryStore, SessionEvent, TextGrid};

    fn session() -> Session {
        let start = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        Session::new(Box::new(MemoryStore::new()), Box::new(ManualClock::new(start)))
    }

    #[test]
    fn small_screen_shows_notice() {
        let mut session = session();
        session.handle(SessionEvent::Resize(40, 8));
        let mut grid = TextGrid::new(40, 8);
        session.render(&mut grid);
        assert_eq!(grid.row(0), TOO_SMALL);
        assert_eq!(grid.row(1), "");
    }

    #[test]
    fn tab_bar_lists_slots() {
        let mut session = session();
        session.handle(SessionEvent::Resize(80, 24));
        session.tabs.open("alice@example.org", TabKind::Direct).unwrap();

        let mut grid = TextGrid::new(80, 24);
        session.render(&mut grid);
        assert_eq!(grid.row(0), "Info");
        assert_eq!(grid.row(22), "[0|1] Info");
        assert_eq!(grid.style_at(22, 1), Some(StyleId::TabCurrent));
        assert_eq!(grid.style_at(22, 3), Some(StyleId::TabNormal));
    }
}
