//! Persistence collaborator.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{bookmark::Bookmark, config::DEFAULT_SECTION, error::StoreError};

/// Configuration and bookmark storage.
///
/// Configuration is a set of sections holding string values; `None` as a
/// section means [`DEFAULT_SECTION`]. Typed access and defaults live in
/// [`crate::config::Config`].
pub trait Store: Send {
    /// Stored value, if any.
    fn config_get(&self, key: &str, section: Option<&str>) -> Option<String>;

    /// Store a value.
    fn config_set(&mut self, key: &str, value: &str, section: Option<&str>)
    -> Result<(), StoreError>;

    /// Whether a section exists.
    fn has_section(&self, section: &str) -> bool;

    /// Locally stored bookmarks.
    fn bookmarks_load(&self) -> Result<Vec<Bookmark>, StoreError>;

    /// Replace the locally stored bookmarks.
    fn bookmarks_save_local(&mut self, bookmarks: &[Bookmark]) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    sections: BTreeMap<String, BTreeMap<String, String>>,
    bookmarks: Vec<Bookmark>,
}

/// In-memory [`Store`].
///
/// Clones share the same contents, so a test can inspect what the session
/// persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with default-section values.
    pub fn with_options<'a>(options: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            let section = inner.sections.entry(DEFAULT_SECTION.to_string()).or_default();
            for (key, value) in options {
                section.insert(key.to_string(), value.to_string());
            }
        }
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn config_get(&self, key: &str, section: Option<&str>) -> Option<String> {
        let inner = self.lock();
        inner.sections.get(section.unwrap_or(DEFAULT_SECTION))?.get(key).cloned()
    }

    fn config_set(
        &mut self,
        key: &str,
        value: &str,
        section: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner
            .sections
            .entry(section.unwrap_or(DEFAULT_SECTION).to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn has_section(&self, section: &str) -> bool {
        self.lock().sections.contains_key(section)
    }

    fn bookmarks_load(&self) -> Result<Vec<Bookmark>, StoreError> {
        Ok(self.lock().bookmarks.clone())
    }

    fn bookmarks_save_local(&mut self, bookmarks: &[Bookmark]) -> Result<(), StoreError> {
        self.lock().bookmarks = bookmarks.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmark::BookmarkMethod;

    #[test]
    fn clones_share_contents() {
        let store = MemoryStore::new();
        let mut writer = store.clone();

        writer.config_set("nick", "alice", None).unwrap();
        writer.config_set("nick", "bob", Some("room@muc")).unwrap();
        writer.bookmarks_save_local(&[Bookmark::new("room@muc", BookmarkMethod::Local)]).unwrap();

        assert_eq!(store.config_get("nick", None).as_deref(), Some("alice"));
        assert_eq!(store.config_get("nick", Some("room@muc")).as_deref(), Some("bob"));
        assert!(store.has_section("room@muc"));
        assert_eq!(store.bookmarks_load().unwrap().len(), 1);
    }
}
