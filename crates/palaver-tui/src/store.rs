//! TOML-backed persistence.
//!
//! Two files live in the configuration directory:
//! - `palaver.toml`: one table per section, string values only
//! - `bookmarks.toml`: the local bookmarks as `[[bookmark]]` entries
//!
//! Every change is written through immediately.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use palaver_console::{Bookmark, Store, StoreError, config::DEFAULT_SECTION};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

const CONFIG_FILE: &str = "palaver.toml";
const BOOKMARKS_FILE: &str = "bookmarks.toml";

type Sections = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct BookmarkFile {
    #[serde(default)]
    bookmark: Vec<Bookmark>,
}

/// [`Store`] over a configuration directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    sections: Sections,
    bookmarks: Vec<Bookmark>,
}

impl FileStore {
    /// Platform configuration directory for palaver, if there is one.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("palaver"))
    }

    /// Open (and create if needed) the store in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or a file exists
    /// but cannot be read or parsed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_error)?;

        let sections: Sections = read_toml(&dir.join(CONFIG_FILE))?.unwrap_or_default();
        let bookmarks = read_toml::<BookmarkFile>(&dir.join(BOOKMARKS_FILE))?
            .map(|file| file.bookmark)
            .unwrap_or_default();
        tracing::debug!(dir = %dir.display(), sections = sections.len(), "store opened");

        Ok(Self { dir, sections, bookmarks })
    }

    /// Directory the files live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Store for FileStore {
    fn config_get(&self, key: &str, section: Option<&str>) -> Option<String> {
        self.sections.get(section.unwrap_or(DEFAULT_SECTION))?.get(key).cloned()
    }

    fn config_set(
        &mut self,
        key: &str,
        value: &str,
        section: Option<&str>,
    ) -> Result<(), StoreError> {
        self.sections
            .entry(section.unwrap_or(DEFAULT_SECTION).to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        write_toml(&self.dir.join(CONFIG_FILE), &self.sections)
    }

    fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    fn bookmarks_load(&self) -> Result<Vec<Bookmark>, StoreError> {
        Ok(self.bookmarks.clone())
    }

    fn bookmarks_save_local(&mut self, bookmarks: &[Bookmark]) -> Result<(), StoreError> {
        let file = BookmarkFile { bookmark: bookmarks.to_vec() };
        write_toml(&self.dir.join(BOOKMARKS_FILE), &file)?;
        self.bookmarks = file.bookmark;
        Ok(())
    }
}

fn io_error(err: io::Error) -> StoreError {
    StoreError::Io(err.to_string())
}

/// Parsed contents of `path`, or `None` if it does not exist.
fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_error(err)),
    };
    toml::from_str(&text)
        .map(Some)
        .map_err(|err| StoreError::Format(format!("{}: {err}", path.display())))
}

fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let text = toml::to_string(value).map_err(|err| StoreError::Format(err.to_string()))?;
    fs::write(path, text).map_err(io_error)
}

#[cfg(test)]
mod tests {
    use palaver_console::BookmarkMethod;

    use super::*;

    #[test]
    fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.config_set("nick", "alice", None).unwrap();
        store.config_set("password", "s3cret", Some("room@muc.example.org")).unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.config_get("nick", None).as_deref(), Some("alice"));
        assert_eq!(
            store.config_get("password", Some("room@muc.example.org")).as_deref(),
            Some("s3cret")
        );
        assert!(store.has_section("room@muc.example.org"));
        assert!(!store.has_section("elsewhere"));
    }

    #[test]
    fn bookmarks_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        let bookmark = Bookmark {
            nick: Some("me".into()),
            autojoin: true,
            ..Bookmark::new("room@muc.example.org", BookmarkMethod::Local)
        };
        store.bookmarks_save_local(&[bookmark.clone()]).unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.bookmarks_load().unwrap(), [bookmark]);
    }

    #[test]
    fn missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(store.bookmarks_load().unwrap().is_empty());
    }

    #[test]
    fn malformed_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[Options\nnick = ").unwrap();

        let err = FileStore::open(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Format(_)));
    }
}
