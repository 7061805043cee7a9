//! Colours for the style identifiers picked by the session.

use palaver_console::StyleId;
use ratatui::style::{Color, Modifier, Style};

/// Participant nick colours, indexed by palette entry.
const NICK_PALETTE: [Color; 8] = [
    Color::LightRed,
    Color::LightGreen,
    Color::LightYellow,
    Color::LightBlue,
    Color::LightMagenta,
    Color::LightCyan,
    Color::Red,
    Color::Green,
];

/// Terminal style of a style identifier.
pub fn style(id: StyleId) -> Style {
    let base = Style::default();
    match id {
        StyleId::Normal | StyleId::Input => base,
        StyleId::Timestamp => base.fg(Color::DarkGray),
        StyleId::System => base.fg(Color::Cyan),
        StyleId::Error => base.fg(Color::Red).add_modifier(Modifier::BOLD),
        StyleId::Highlight => base.fg(Color::Yellow).add_modifier(Modifier::BOLD),
        StyleId::Nick(entry) => base.fg(NICK_PALETTE[usize::from(entry) % NICK_PALETTE.len()]),
        StyleId::OwnNick => base.fg(Color::Blue).add_modifier(Modifier::BOLD),
        StyleId::Topic => base.bg(Color::Blue).fg(Color::White),
        StyleId::TabNormal => base.bg(Color::Blue).fg(Color::Gray),
        StyleId::TabUnread => {
            base.bg(Color::Blue).fg(Color::LightBlue).add_modifier(Modifier::BOLD)
        },
        StyleId::TabAlert => {
            base.bg(Color::Blue).fg(Color::LightMagenta).add_modifier(Modifier::BOLD)
        },
        StyleId::TabCurrent => base.bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD),
        StyleId::Roster => base.fg(Color::Gray),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nick_palette_wraps() {
        assert_eq!(style(StyleId::Nick(1)), style(StyleId::Nick(9)));
        assert_ne!(style(StyleId::Nick(1)), style(StyleId::Nick(2)));
    }
}
