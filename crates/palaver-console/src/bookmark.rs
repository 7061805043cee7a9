//! Room bookmarks.
//!
//! Bookmarks live in up to three places: the local store, and on the server
//! either as a PEP node or in private XML storage. The session keeps a single
//! merged [`BookmarkList`] and writes back whole lists.

use serde::{Deserialize, Serialize};

/// Where a bookmark is stored. Later variants are newer mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkMethod {
    /// Client-side only.
    #[default]
    Local,
    /// Server-side private XML storage.
    PrivateXml,
    /// Server-side PEP node.
    Pep,
}

impl BookmarkMethod {
    /// Parse the `use_bookmarks_method` configuration value.
    pub fn from_config(value: &str) -> Option<Self> {
        match value {
            "pep" => Some(Self::Pep),
            "privatexml" => Some(Self::PrivateXml),
            "local" => Some(Self::Local),
            _ => None,
        }
    }

    /// Whether the bookmark is stored on the server.
    pub fn is_remote(self) -> bool {
        self != Self::Local
    }
}

/// A saved room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Room address.
    pub jid: String,
    /// Nick to join with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    /// Room password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Join on connection.
    #[serde(default)]
    pub autojoin: bool,
    /// Storage mechanism.
    #[serde(default)]
    pub method: BookmarkMethod,
}

impl Bookmark {
    /// Bookmark without nick or password.
    pub fn new(jid: impl Into<String>, method: BookmarkMethod) -> Self {
        Self { jid: jid.into(), nick: None, password: None, autojoin: false, method }
    }
}

/// Merge local and remote bookmark lists.
///
/// A room present on both sides becomes one entry with the newer storage
/// method and the remote fields, falling back to the local nick and password
/// when the remote entry has none. Everything else is kept, local entries
/// first, each side in its own order.
pub fn merge(local: &[Bookmark], remote: &[Bookmark]) -> Vec<Bookmark> {
    let mut merged: Vec<Bookmark> = local
        .iter()
        .map(|l| match remote.iter().find(|r| r.jid == l.jid) {
            Some(r) => Bookmark {
                jid: r.jid.clone(),
                nick: r.nick.clone().or_else(|| l.nick.clone()),
                password: r.password.clone().or_else(|| l.password.clone()),
                autojoin: r.autojoin,
                method: l.method.max(r.method),
            },
            None => l.clone(),
        })
        .collect();

    merged.extend(remote.iter().filter(|r| !local.iter().any(|l| l.jid == r.jid)).cloned());
    merged
}

/// The session's bookmarks, one entry per room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkList {
    items: Vec<Bookmark>,
}

impl BookmarkList {
    /// List from already merged entries.
    pub fn new(items: Vec<Bookmark>) -> Self {
        Self { items }
    }

    /// Bookmark for a room.
    pub fn get(&self, jid: &str) -> Option<&Bookmark> {
        self.items.iter().find(|b| b.jid == jid)
    }

    /// Insert or replace the bookmark for `bookmark.jid`, keeping its position.
    pub fn upsert(&mut self, bookmark: Bookmark) {
        match self.items.iter_mut().find(|b| b.jid == bookmark.jid) {
            Some(existing) => *existing = bookmark,
            None => self.items.push(bookmark),
        }
    }

    /// Remove the bookmark for a room.
    pub fn remove(&mut self, jid: &str) -> Option<Bookmark> {
        let pos = self.items.iter().position(|b| b.jid == jid)?;
        Some(self.items.remove(pos))
    }

    /// Merge a freshly fetched remote list into this one.
    pub fn merge_remote(&mut self, remote: &[Bookmark]) {
        let local: Vec<Bookmark> = self.local().cloned().collect();
        let mut merged = merge(&local, remote);
        // Remote entries we already had but the server no longer lists stay
        for own in self.items.iter().filter(|b| b.method.is_remote()) {
            if !merged.iter().any(|b| b.jid == own.jid) {
                merged.push(own.clone());
            }
        }
        self.items = merged;
    }

    /// Entries stored locally.
    pub fn local(&self) -> impl Iterator<Item = &Bookmark> {
        self.items.iter().filter(|b| !b.method.is_remote())
    }

    /// Entries stored on the server.
    pub fn remote(&self) -> impl Iterator<Item = &Bookmark> {
        self.items.iter().filter(|b| b.method.is_remote())
    }

    /// Every entry.
    pub fn iter(&self) -> impl Iterator<Item = &Bookmark> {
        self.items.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when there are no bookmarks.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(jids: &[&str], method: BookmarkMethod) -> Vec<Bookmark> {
        jids.iter().map(|jid| Bookmark::new(*jid, method)).collect()
    }

    #[test]
    fn remote_method_wins_and_order_is_local_first() {
        let local = all(&["a"], BookmarkMethod::Local);
        let remote = all(&["a", "b"], BookmarkMethod::Pep);

        assert_eq!(merge(&local, &remote), remote);
    }

    #[test]
    fn local_fields_fill_remote_gaps() {
        let local = [Bookmark {
            nick: Some("me".into()),
            password: Some("secret".into()),
            ..Bookmark::new("room@muc", BookmarkMethod::Local)
        }];
        let remote =
            [Bookmark { autojoin: true, ..Bookmark::new("room@muc", BookmarkMethod::PrivateXml) }];

        let merged = merge(&local, &remote);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].nick.as_deref(), Some("me"));
        assert_eq!(merged[0].password.as_deref(), Some("secret"));
        assert!(merged[0].autojoin);
        assert_eq!(merged[0].method, BookmarkMethod::PrivateXml);
    }

    #[test]
    fn unmatched_entries_keep_side_order() {
        let local = all(&["l1", "l2"], BookmarkMethod::Local);
        let remote = all(&["r1", "r2"], BookmarkMethod::Pep);

        let jids: Vec<String> = merge(&local, &remote).into_iter().map(|b| b.jid).collect();
        assert_eq!(jids, ["l1", "l2", "r1", "r2"]);
    }

    #[test]
    fn upsert_keeps_position() {
        let mut list = BookmarkList::new(vec![
            Bookmark::new("a", BookmarkMethod::Local),
            Bookmark::new("b", BookmarkMethod::Local),
        ]);
        list.upsert(Bookmark::new("a", BookmarkMethod::Pep));

        let jids: Vec<&str> = list.iter().map(|b| b.jid.as_str()).collect();
        assert_eq!(jids, ["a", "b"]);
        assert_eq!(list.remote().count(), 1);
    }
}
