//! Drawing surface, screen layout and scrollback viewports.
//!
//! Everything here paints through the [`Surface`] trait, so the session core
//! never touches a terminal. Frontends adapt their own buffer type; tests use
//! [`TextGrid`].
//!
//! A [`Viewport`] wraps scrollback lines into rows of its width and keeps the
//! most recent `height` rows. It remembers the rows it built so an ordinary
//! repaint only wraps the lines appended since. A resize throws that work
//! away: wrapping depends on the width, so the next render replays the whole
//! buffer.

use std::{collections::VecDeque, fmt};

use unicode_width::UnicodeWidthChar;

use crate::{
    editor::LineEditor,
    scrollback::{ScrollbackBuffer, ScrollbackLine},
};

/// Pre-resolved style identifier.
///
/// The core only picks identifiers; mapping them to colours is the
/// frontend's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StyleId {
    /// Plain text.
    #[default]
    Normal,
    /// Line timestamp.
    Timestamp,
    /// Informational line.
    System,
    /// Error report.
    Error,
    /// Message mentioning us.
    Highlight,
    /// Participant nick, by palette entry.
    Nick(u8),
    /// Our own nick.
    OwnNick,
    /// Room topic bar.
    Topic,
    /// Tab bar entry with nothing new.
    TabNormal,
    /// Tab bar entry with unread messages.
    TabUnread,
    /// Tab bar entry needing attention.
    TabAlert,
    /// Tab bar entry of the focused tab.
    TabCurrent,
    /// Roster entry.
    Roster,
    /// Input line.
    Input,
}

/// Rectangle in surface cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Leftmost column.
    pub x: u16,
    /// Top row.
    pub y: u16,
    /// Width in cells.
    pub width: u16,
    /// Height in cells.
    pub height: u16,
}

impl Rect {
    /// New rectangle.
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }
}

/// Rectangular character surface with styled writes.
pub trait Surface {
    /// Blank every cell of `area`.
    fn clear(&mut self, area: Rect);

    /// Write `text` starting at `(row, col)`. Cells past the right edge are
    /// dropped.
    fn put_str(&mut self, row: u16, col: u16, text: &str, style: StyleId);

    /// Place the terminal cursor.
    fn set_cursor(&mut self, row: u16, col: u16);
}

/// Screen areas, computed from the terminal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Layout {
    /// False when the terminal is too small to draw anything useful.
    pub visible: bool,
    /// Topic bar (first row).
    pub topic: Rect,
    /// Chat area of tabs without a roster.
    pub chat: Rect,
    /// Chat area of room tabs.
    pub room_chat: Rect,
    /// Roster column of room tabs.
    pub roster: Rect,
    /// Tab bar (second to last row).
    pub tab_bar: Rect,
    /// Input line (last row).
    pub input: Rect,
}

impl Layout {
    /// Smallest usable terminal width.
    pub const MIN_COLS: u16 = 60;
    /// Smallest usable terminal height.
    pub const MIN_ROWS: u16 = 10;

    /// Split a `cols` x `rows` screen.
    pub fn compute(cols: u16, rows: u16) -> Self {
        let visible = cols >= Self::MIN_COLS && rows >= Self::MIN_ROWS;
        let chat_height = rows.saturating_sub(3);
        let text_width = cols / 10 * 9;
        let roster_x = text_width + 1;

        Self {
            visible,
            topic: Rect::new(0, 0, cols, rows.min(1)),
            chat: Rect::new(0, 1, cols, chat_height),
            room_chat: Rect::new(0, 1, text_width, chat_height),
            roster: Rect::new(roster_x, 1, cols.saturating_sub(roster_x), chat_height),
            tab_bar: Rect::new(0, rows.saturating_sub(2), cols, rows.min(1)),
            input: Rect::new(0, rows.saturating_sub(1), cols, rows.min(1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    text: String,
    style: StyleId,
}

type Row = Vec<Span>;

/// Fixed-size window onto a scrollback buffer.
#[derive(Debug, Clone)]
pub struct Viewport {
    area: Rect,
    rows: VecDeque<Row>,
    /// Sequence number of the next line to wrap.
    replayed: u64,
    /// First buffer sequence number at the last render.
    first_seen: u64,
    stale: bool,
}

impl Viewport {
    /// Viewport of `height` rows and `width` columns at the surface origin.
    pub fn new(height: u16, width: u16) -> Self {
        Self::at(Rect::new(0, 0, width, height))
    }

    /// Viewport covering `area`.
    pub fn at(area: Rect) -> Self {
        Self { area, rows: VecDeque::new(), replayed: 0, first_seen: 0, stale: true }
    }

    /// Area the viewport paints into.
    pub fn area(&self) -> Rect {
        self.area
    }

    /// Change the size. The next render replays the complete buffer.
    pub fn resize(&mut self, height: u16, width: u16) {
        self.area.height = height;
        self.area.width = width;
        self.invalidate();
    }

    /// Move and resize. The next render replays the complete buffer.
    pub fn place(&mut self, area: Rect) {
        self.area = area;
        self.invalidate();
    }

    /// Drop every wrapped row.
    pub fn invalidate(&mut self) {
        self.rows.clear();
        self.stale = true;
    }

    /// Clear the area and paint the most recent rows of `buffer` that fit.
    ///
    /// `nick_style` resolves the style of a speaker's nick.
    pub fn render<S, F>(&mut self, buffer: &ScrollbackBuffer, nick_style: F, surface: &mut S)
    where
        S: Surface + ?Sized,
        F: Fn(&str) -> StyleId,
    {
        let full = self.stale
            || buffer.next_seq() < self.replayed
            || buffer.first_seq() != self.first_seen;

        if full {
            self.rows.clear();
            for line in buffer.iter() {
                self.push_line(line, &nick_style);
            }
        } else {
            for line in buffer.iter_from(self.replayed) {
                self.push_line(line, &nick_style);
            }
        }
        self.replayed = buffer.next_seq();
        self.first_seen = buffer.first_seq();
        self.stale = false;

        self.paint(surface);
    }

    /// Text of the rows currently held, oldest first.
    pub fn visible_rows(&self) -> Vec<String> {
        self.rows.iter().map(|row| row.iter().map(|s| s.text.as_str()).collect()).collect()
    }

    fn push_line<F: Fn(&str) -> StyleId>(&mut self, line: &ScrollbackLine, nick_style: &F) {
        let width = usize::from(self.area.width);
        let height = usize::from(self.area.height);
        if width == 0 || height == 0 {
            return;
        }

        let mut wrap = Wrapper::new(width);
        let stamp = line.at().format("[%H:%M:%S] ").to_string();
        wrap.push(&stamp, StyleId::Timestamp);
        match line {
            ScrollbackLine::System { text, .. } => wrap.push(text, StyleId::System),
            ScrollbackLine::Spoken { speaker, body, highlight, .. } => {
                wrap.push(&format!("<{speaker}> "), nick_style(speaker));
                wrap.push(body, highlight.unwrap_or(StyleId::Normal));
            },
        }

        for row in wrap.finish() {
            self.rows.push_back(row);
            if self.rows.len() > height {
                self.rows.pop_front();
            }
        }
    }

    fn paint<S: Surface + ?Sized>(&self, surface: &mut S) {
        surface.clear(self.area);
        for (offset, row) in self.rows.iter().enumerate() {
            let y = self.area.y + offset as u16;
            let mut x = self.area.x;
            for span in row {
                surface.put_str(y, x, &span.text, span.style);
                x += str_width(&span.text) as u16;
            }
        }
    }
}

/// Greedy character wrapper. Embedded newlines start a new row.
struct Wrapper {
    width: usize,
    rows: Vec<Row>,
    current: Row,
    used: usize,
}

impl Wrapper {
    fn new(width: usize) -> Self {
        Self { width, rows: Vec::new(), current: Vec::new(), used: 0 }
    }

    fn push(&mut self, text: &str, style: StyleId) {
        for ch in text.chars() {
            if ch == '\n' {
                self.break_row();
                continue;
            }
            let w = ch.width().unwrap_or(0);
            if self.used + w > self.width && self.used > 0 {
                self.break_row();
            }
            match self.current.last_mut() {
                Some(span) if span.style == style => span.text.push(ch),
                _ => self.current.push(Span { text: ch.to_string(), style }),
            }
            self.used += w;
        }
    }

    fn break_row(&mut self) {
        self.rows.push(std::mem::take(&mut self.current));
        self.used = 0;
    }

    fn finish(mut self) -> Vec<Row> {
        self.rows.push(self.current);
        self.rows
    }
}

/// Display width of `text` in cells.
pub fn str_width(text: &str) -> usize {
    text.chars().map(|c| c.width().unwrap_or(0)).sum()
}

/// Horizontal scroll of the input line.
///
/// Returns the index of the first visible character and the cursor column,
/// such that the cursor stays within `width` cells.
pub fn input_window(text: &[char], cursor: usize, width: usize) -> (usize, usize) {
    if width == 0 {
        return (cursor, 0);
    }
    let cursor = cursor.min(text.len());
    let mut start = 0;
    let mut col: usize = text[..cursor].iter().map(|c| c.width().unwrap_or(0)).sum();
    while col >= width && start < cursor {
        col -= text[start].width().unwrap_or(0);
        start += 1;
    }
    (start, col)
}

/// Paint the editor into `area` and place the cursor.
pub fn render_input<S: Surface + ?Sized>(editor: &LineEditor, area: Rect, surface: &mut S) {
    surface.clear(area);
    let width = usize::from(area.width);
    let text = editor.chars();
    let (start, col) = input_window(text, editor.cursor(), width);

    let mut shown = String::new();
    let mut used = 0;
    for &ch in &text[start..] {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        shown.push(ch);
        used += w;
    }
    surface.put_str(area.y, area.x, &shown, StyleId::Input);
    surface.set_cursor(area.y, area.x + col as u16);
}

/// In-memory [`Surface`].
///
/// Renders to plain text with [`fmt::Display`], trailing blanks trimmed, which
/// makes it convenient for snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextGrid {
    width: u16,
    height: u16,
    cells: Vec<Vec<(char, StyleId)>>,
    cursor: Option<(u16, u16)>,
}

/// Continuation cell of a double-width character.
const WIDE_TAIL: char = '\0';

impl TextGrid {
    /// Blank grid.
    pub fn new(width: u16, height: u16) -> Self {
        let cells = vec![vec![(' ', StyleId::Normal); usize::from(width)]; usize::from(height)];
        Self { width, height, cells, cursor: None }
    }

    /// Width in cells.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Text of one row, trailing blanks trimmed.
    pub fn row(&self, row: u16) -> String {
        self.cells
            .get(usize::from(row))
            .map(|cells| {
                let text: String =
                    cells.iter().map(|&(c, _)| c).filter(|&c| c != WIDE_TAIL).collect();
                text.trim_end().to_string()
            })
            .unwrap_or_default()
    }

    /// Style of one cell.
    pub fn style_at(&self, row: u16, col: u16) -> Option<StyleId> {
        self.cells.get(usize::from(row))?.get(usize::from(col)).map(|&(_, s)| s)
    }

    /// Last cursor position set.
    pub fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }
}

impl Surface for TextGrid {
    fn clear(&mut self, area: Rect) {
        for y in area.y..area.y.saturating_add(area.height).min(self.height) {
            for x in area.x..area.x.saturating_add(area.width).min(self.width) {
                self.cells[usize::from(y)][usize::from(x)] = (' ', StyleId::Normal);
            }
        }
    }

    fn put_str(&mut self, row: u16, col: u16, text: &str, style: StyleId) {
        let Some(cells) = self.cells.get_mut(usize::from(row)) else {
            return;
        };
        let mut x = usize::from(col);
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0);
            if w == 0 {
                continue;
            }
            if x + w > cells.len() {
                break;
            }
            cells[x] = (ch, style);
            if w == 2 {
                cells[x + 1] = (WIDE_TAIL, style);
            }
            x += w;
        }
    }

    fn set_cursor(&mut self, row: u16, col: u16) {
        self.cursor = Some((row, col));
    }
}

impl fmt::Display for TextGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<String> = (0..self.height).map(|y| self.row(y)).collect();
        f.write_str(rows.join("\n").trim_end())
    }
}
