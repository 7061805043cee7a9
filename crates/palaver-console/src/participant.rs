//! Room membership.

use chrono::{DateTime, Local};

use crate::transport::{MemberInfo, PresenceShow};

/// Number of entries in the nick colour palette.
pub const PALETTE_SIZE: u8 = 8;

/// Room role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    /// Can moderate the room.
    Moderator,
    /// Can speak.
    Participant,
    /// Read-only in moderated rooms.
    Visitor,
    /// No role.
    None,
}

/// Room affiliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Affiliation {
    /// Room owner.
    Owner,
    /// Room administrator.
    Admin,
    /// Registered member.
    Member,
    /// Banned.
    Outcast,
    /// No affiliation.
    None,
}

/// One member of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Nick, unique within the room.
    pub nick: String,
    /// Room affiliation.
    pub affiliation: Affiliation,
    /// Room role.
    pub role: Role,
    /// Availability.
    pub show: PresenceShow,
    /// Status text.
    pub status: Option<String>,
    /// Palette entry, fixed for the participant's lifetime in the room.
    pub color_index: u8,
    /// Last time this participant said something.
    pub last_spoke_at: Option<DateTime<Local>>,
}

/// Members of one room, in join order.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: Vec<Participant>,
    next_color: u8,
}

impl Roster {
    /// Empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member. A nick already present is updated in place instead.
    pub fn join(&mut self, info: MemberInfo) -> &Participant {
        if let Some(pos) = self.position(&info.nick) {
            let member = &mut self.members[pos];
            apply(member, info);
            return &self.members[pos];
        }

        let color_index = self.next_color;
        self.next_color = (self.next_color + 1) % PALETTE_SIZE;
        self.members.push(Participant {
            nick: info.nick,
            affiliation: info.affiliation,
            role: info.role,
            show: info.show,
            status: info.status,
            color_index,
            last_spoke_at: None,
        });
        &self.members[self.members.len() - 1]
    }

    /// Update presence, role and affiliation. Returns false for unknown nicks.
    pub fn update(&mut self, info: MemberInfo) -> bool {
        match self.position(&info.nick) {
            Some(pos) => {
                apply(&mut self.members[pos], info);
                true
            },
            None => false,
        }
    }

    /// Remove a member.
    pub fn leave(&mut self, nick: &str) -> Option<Participant> {
        self.position(nick).map(|pos| self.members.remove(pos))
    }

    /// Rename a member, keeping its colour and position.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        match self.position(old) {
            Some(pos) => {
                self.members[pos].nick = new.to_string();
                true
            },
            None => false,
        }
    }

    /// Record that `nick` just spoke.
    pub fn touch(&mut self, nick: &str, at: DateTime<Local>) {
        if let Some(pos) = self.position(nick) {
            self.members[pos].last_spoke_at = Some(at);
        }
    }

    /// Look up a member.
    pub fn get(&self, nick: &str) -> Option<&Participant> {
        self.members.iter().find(|p| p.nick == nick)
    }

    /// Members in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.members.iter()
    }

    /// Members who spoke, most recent first, then the silent ones in join
    /// order.
    pub fn by_last_spoken(&self) -> impl Iterator<Item = &Participant> {
        let mut members: Vec<&Participant> = self.members.iter().collect();
        members.sort_by(|a, b| b.last_spoke_at.cmp(&a.last_spoke_at));
        members.into_iter()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when nobody is in the room.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Forget every member, e.g. after leaving the room.
    pub fn clear(&mut self) {
        self.members.clear();
    }

    fn position(&self, nick: &str) -> Option<usize> {
        self.members.iter().position(|p| p.nick == nick)
    }
}

fn apply(member: &mut Participant, info: MemberInfo) {
    member.affiliation = info.affiliation;
    member.role = info.role;
    member.show = info.show;
    member.status = info.status;
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn colours_are_round_robin_and_stable() {
        let mut roster = Roster::new();
        for i in 0..10 {
            roster.join(MemberInfo::new(format!("user{i}")));
        }

        let colours: Vec<u8> = roster.iter().map(|p| p.color_index).collect();
        assert_eq!(colours, [0, 1, 2, 3, 4, 5, 6, 7, 0, 1]);

        roster.rename("user3", "renamed");
        roster.update(MemberInfo { show: PresenceShow::Away, ..MemberInfo::new("renamed") });
        assert_eq!(roster.get("renamed").map(|p| p.color_index), Some(3));
    }

    #[test]
    fn rejoin_updates_in_place() {
        let mut roster = Roster::new();
        roster.join(MemberInfo::new("alice"));
        roster.join(MemberInfo::new("bob"));
        roster.join(MemberInfo { status: Some("back".into()), ..MemberInfo::new("alice") });

        let nicks: Vec<&str> = roster.iter().map(|p| p.nick.as_str()).collect();
        assert_eq!(nicks, ["alice", "bob"]);
        assert_eq!(roster.get("alice").and_then(|p| p.status.as_deref()), Some("back"));
    }

    #[test]
    fn recent_speakers_come_first() {
        let now = Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut roster = Roster::new();
        for nick in ["alice", "bob", "carol", "dave"] {
            roster.join(MemberInfo::new(nick));
        }
        roster.touch("carol", now - Duration::seconds(30));
        roster.touch("bob", now - Duration::seconds(5));

        let order: Vec<&str> = roster.by_last_spoken().map(|p| p.nick.as_str()).collect();
        assert_eq!(order, ["bob", "carol", "alice", "dave"]);
    }
}
