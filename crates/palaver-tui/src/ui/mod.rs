//! UI rendering
//!
//! The session lays out and paints the screen itself through
//! [`palaver_console::Surface`]. This module adapts a ratatui [`Buffer`] to
//! that trait and maps style identifiers to terminal colours.

pub mod theme;

use palaver_console::{Rect, Session, StyleId, Surface};
use ratatui::{Frame, buffer::Buffer, layout::Position};

/// Render the entire UI.
pub fn render(frame: &mut Frame, session: &mut Session) {
    let mut surface = BufferSurface::new(frame.buffer_mut());
    session.render(&mut surface);
    if let Some(cursor) = surface.cursor() {
        frame.set_cursor_position(cursor);
    }
}

/// [`Surface`] over a ratatui buffer.
///
/// Coordinates are relative to the buffer's origin. Writes outside the buffer
/// are clipped.
pub struct BufferSurface<'a> {
    buffer: &'a mut Buffer,
    cursor: Option<Position>,
}

impl<'a> BufferSurface<'a> {
    /// Wrap a buffer.
    pub fn new(buffer: &'a mut Buffer) -> Self {
        Self { buffer, cursor: None }
    }

    /// Cursor position requested by the last paint, in buffer coordinates.
    pub fn cursor(&self) -> Option<Position> {
        self.cursor
    }

    fn absolute(&self, row: u16, col: u16) -> Option<Position> {
        let area = self.buffer.area;
        let position =
            Position::new(area.x.saturating_add(col), area.y.saturating_add(row));
        area.contains(position).then_some(position)
    }
}

impl Surface for BufferSurface<'_> {
    fn clear(&mut self, area: Rect) {
        let origin = self.buffer.area;
        let target = ratatui::layout::Rect::new(
            origin.x.saturating_add(area.x),
            origin.y.saturating_add(area.y),
            area.width,
            area.height,
        )
        .intersection(origin);

        for y in target.top()..target.bottom() {
            for x in target.left()..target.right() {
                self.buffer[(x, y)].reset();
            }
        }
    }

    fn put_str(&mut self, row: u16, col: u16, text: &str, style: StyleId) {
        let Some(start) = self.absolute(row, col) else {
            return;
        };
        let room = self.buffer.area.right() - start.x;
        self.buffer.set_stringn(start.x, start.y, text, usize::from(room), theme::style(style));
    }

    fn set_cursor(&mut self, row: u16, col: u16) {
        self.cursor = self.absolute(row, col);
    }
}

#[cfg(test)]
mod tests {
    use palaver_console::{KeyInput, MemoryStore, SessionEvent, SystemClock};
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;

    fn row_text(buffer: &Buffer, y: u16) -> String {
        let area = buffer.area;
        let text: String = (area.left()..area.right()).map(|x| buffer[(x, y)].symbol()).collect();
        text.trim_end().to_string()
    }

    #[test]
    fn writes_are_clipped_to_the_buffer() {
        let mut buffer = Buffer::empty(ratatui::layout::Rect::new(0, 0, 5, 2));
        let mut surface = BufferSurface::new(&mut buffer);
        surface.put_str(0, 2, "hello", StyleId::Normal);
        surface.put_str(5, 0, "gone", StyleId::Normal);
        surface.set_cursor(9, 9);
        assert_eq!(surface.cursor(), None);

        assert_eq!(row_text(&buffer, 0), "  hel");
        assert_eq!(row_text(&buffer, 1), "");
    }

    #[test]
    fn clear_resets_only_its_area() {
        let mut buffer = Buffer::empty(ratatui::layout::Rect::new(0, 0, 6, 1));
        let mut surface = BufferSurface::new(&mut buffer);
        surface.put_str(0, 0, "abcdef", StyleId::Error);
        surface.clear(Rect::new(2, 0, 10, 1));

        assert_eq!(row_text(&buffer, 0), "ab");
        assert_eq!(buffer[(0, 0)].fg, ratatui::style::Color::Red);
        assert_eq!(buffer[(3, 0)].fg, ratatui::style::Color::Reset);
    }

    #[test]
    fn session_paints_into_terminal() {
        let mut session = Session::new(Box::new(MemoryStore::new()), Box::new(SystemClock));
        session.handle(SessionEvent::Resize(80, 24));
        for c in "hey".chars() {
            session.handle(KeyInput::Char(c).into());
        }

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(frame, &mut session)).unwrap();

        let buffer = terminal.backend().buffer();
        assert_eq!(row_text(buffer, 0), "Info");
        assert!(row_text(buffer, 22).starts_with("[0] Info"));
        assert_eq!(row_text(buffer, 23), "hey");
        terminal.backend_mut().assert_cursor_position(Position::new(3, 23));
    }
}
