//! Per-conversation scrollback.
//!
//! A [`ScrollbackBuffer`] is the append-only history of one tab. Lines are
//! never edited once appended; redraws always replay them from the start (or
//! from a sequence number the viewport has already seen).

use std::collections::VecDeque;

use chrono::{DateTime, Local};

use crate::viewport::StyleId;

/// One line of scrollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollbackLine {
    /// Informational line produced by the client itself.
    System {
        /// When the line was produced.
        at: DateTime<Local>,
        /// Line text. May contain newlines.
        text: String,
    },
    /// Something a participant said.
    Spoken {
        /// When the message was received.
        at: DateTime<Local>,
        /// Nick of the speaker.
        speaker: String,
        /// Message body.
        body: String,
        /// Pre-resolved style for the body, e.g. a highlight.
        highlight: Option<StyleId>,
    },
}

impl ScrollbackLine {
    /// Timestamp of the line.
    pub fn at(&self) -> DateTime<Local> {
        match self {
            Self::System { at, .. } | Self::Spoken { at, .. } => *at,
        }
    }
}

/// Append-only line history with an optional cap.
///
/// Every appended line gets a sequence number; the first retained line is
/// [`first_seq`](Self::first_seq) and the next line will be
/// [`next_seq`](Self::next_seq). When a cap is set, the oldest lines are
/// evicted once it is exceeded.
#[derive(Debug, Clone, Default)]
pub struct ScrollbackBuffer {
    lines: VecDeque<ScrollbackLine>,
    cap: Option<usize>,
    next_seq: u64,
}

impl ScrollbackBuffer {
    /// Unbounded buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer keeping at most `cap` lines. `None` or zero means unbounded.
    pub fn with_cap(cap: Option<usize>) -> Self {
        Self { cap: cap.filter(|&c| c > 0), ..Self::default() }
    }

    /// Change the cap, evicting immediately if needed.
    pub fn set_cap(&mut self, cap: Option<usize>) {
        self.cap = cap.filter(|&c| c > 0);
        self.evict();
    }

    /// Append a line.
    pub fn append(&mut self, line: ScrollbackLine) {
        self.lines.push_back(line);
        self.next_seq += 1;
        self.evict();
    }

    /// Replay every retained line, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ScrollbackLine> {
        self.lines.iter()
    }

    /// Replay retained lines whose sequence number is `>= seq`.
    pub fn iter_from(&self, seq: u64) -> impl Iterator<Item = &ScrollbackLine> {
        let skip = seq.saturating_sub(self.first_seq()) as usize;
        self.lines.iter().skip(skip)
    }

    /// Sequence number of the oldest retained line.
    pub fn first_seq(&self) -> u64 {
        self.next_seq - self.lines.len() as u64
    }

    /// Sequence number the next appended line will get.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Number of retained lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when nothing has been retained.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn evict(&mut self) {
        if let Some(cap) = self.cap {
            while self.lines.len() > cap {
                self.lines.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn line(text: &str) -> ScrollbackLine {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        ScrollbackLine::System { at, text: text.into() }
    }

    fn texts(buffer: &ScrollbackBuffer) -> Vec<String> {
        buffer
            .iter()
            .map(|l| match l {
                ScrollbackLine::System { text, .. } => text.clone(),
                ScrollbackLine::Spoken { body, .. } => body.clone(),
            })
            .collect()
    }

    #[test]
    fn cap_evicts_oldest_first() {
        let mut buffer = ScrollbackBuffer::with_cap(Some(2));
        buffer.append(line("a"));
        buffer.append(line("b"));
        buffer.append(line("c"));

        assert_eq!(texts(&buffer), ["b", "c"]);
        assert_eq!(buffer.first_seq(), 1);
        assert_eq!(buffer.next_seq(), 3);
    }

    #[test]
    fn zero_cap_is_unbounded() {
        let mut buffer = ScrollbackBuffer::with_cap(Some(0));
        for i in 0..100 {
            buffer.append(line(&i.to_string()));
        }
        assert_eq!(buffer.len(), 100);
    }

    #[test]
    fn iter_from_skips_seen_lines() {
        let mut buffer = ScrollbackBuffer::with_cap(Some(3));
        for text in ["a", "b", "c", "d"] {
            buffer.append(line(text));
        }

        let rest: Vec<_> = buffer.iter_from(2).collect();
        assert_eq!(rest.len(), 2);

        // Sequence numbers before the first retained line replay everything
        assert_eq!(buffer.iter_from(0).count(), 3);
    }

    #[test]
    fn shrinking_cap_evicts_immediately() {
        let mut buffer = ScrollbackBuffer::new();
        for text in ["a", "b", "c"] {
            buffer.append(line(text));
        }
        buffer.set_cap(Some(1));
        assert_eq!(texts(&buffer), ["c"]);
    }
}
