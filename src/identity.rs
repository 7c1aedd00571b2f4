//! The locally persisted user identity.
//!
//! [`IdentityStore`] owns the single user ID of this client. It reads the
//! durable slot once when opened and writes it only on [`capture`] and
//! [`clear`]. The backing slot is any [`IdentityStorage`]: a JSON file on
//! disk ([`FileStorage`]) or process memory ([`MemoryStorage`]).
//!
//! [`capture`]: IdentityStore::capture
//! [`clear`]: IdentityStore::clear

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{IshyError, Result, ValidationError};

/// A validated user ID: non-empty, decimal digits only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Validate `raw` as a user ID. Surrounding whitespace is ignored.
    ///
    /// No other checks are made; the server decides whether the ID means anything.
    ///
    /// ```
    /// use ishy_client::Identity;
    ///
    /// assert_eq!(Identity::parse(" 12345 ").unwrap().as_str(), "12345");
    /// assert!(Identity::parse("12a45").is_err());
    /// assert!(Identity::parse("").is_err());
    /// ```
    pub fn parse(raw: &str) -> std::result::Result<Self, ValidationError> {
        let id = raw.trim();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidIdentityFormat);
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── Storage ─────────────────────────────────────────────────────────

/// A durable string-keyed slot, in the manner of a browser's local storage.
pub trait IdentityStorage: Send + 'static {
    /// Read the entry for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store exists but cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write the entry for `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be persisted.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Delete the entry for `key`. Deleting a missing entry is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store could not be updated.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Storage kept in process memory. Useful for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(key.into(), value.into());
        Self { entries }
    }
}

impl IdentityStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Storage backed by a JSON object file, one member per key.
///
/// A missing file reads as empty. Writes go to a sibling temp file that is
/// then renamed over the original.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                IshyError::Storage(format!("corrupt storage file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl IdentityStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_all().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), "discarding unreadable storage file: {e}");
            BTreeMap::new()
        });
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

// ── Store ───────────────────────────────────────────────────────────

/// The process-wide holder of the current [`Identity`].
pub struct IdentityStore {
    storage: Box<dyn IdentityStorage>,
    key: String,
    current: Option<Identity>,
}

impl IdentityStore {
    /// Open the store, reading the persisted identity once.
    ///
    /// An unreadable slot or a malformed stored value yields no identity.
    pub fn open(storage: impl IdentityStorage, key: impl Into<String>) -> Self {
        let mut store = Self {
            storage: Box::new(storage),
            key: key.into(),
            current: None,
        };
        store.current = store.load();
        store
    }

    /// Read the persisted identity, or `None` if absent or malformed.
    pub fn load(&self) -> Option<Identity> {
        let raw = match self.storage.get(&self.key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %self.key, "failed to read stored identity: {e}");
                return None;
            }
        };
        match Identity::parse(&raw) {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(key = %self.key, "ignoring malformed stored identity");
                None
            }
        }
    }

    /// Validate `raw_input`, persist it, and make it the current identity.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidIdentityFormat`] (wrapped) for input
    /// that is empty or not all digits, or a storage error if it could not be
    /// persisted. Stored state is unchanged on any error.
    pub fn capture(&mut self, raw_input: &str) -> Result<Identity> {
        let id = Identity::parse(raw_input)?;
        self.storage.set(&self.key, id.as_str())?;
        debug!(user_id = %id, "identity captured");
        self.current = Some(id.clone());
        Ok(id)
    }

    /// Remove the persisted identity.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the entry could not be removed; the current
    /// identity is kept in that case.
    pub fn clear(&mut self) -> Result<()> {
        self.storage.remove(&self.key)?;
        debug!("identity cleared");
        self.current = None;
        Ok(())
    }

    /// The identity in effect.
    pub fn current(&self) -> Option<&Identity> {
        self.current.as_ref()
    }
}

impl fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityStore")
            .field("key", &self.key)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    const KEY: &str = "ishy_user_id";

    #[test]
    fn parse_accepts_digits_only() {
        assert!(Identity::parse("0").is_ok());
        assert!(Identity::parse("123456789012345678").is_ok());
        for bad in ["", "   ", "12 34", "-1", "1.5", "abc", "١٢٣", "12\n3"] {
            assert_eq!(
                Identity::parse(bad),
                Err(ValidationError::InvalidIdentityFormat),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn open_loads_existing_entry() {
        let store = IdentityStore::open(MemoryStorage::with_entry(KEY, "42"), KEY);
        assert_eq!(store.current().map(Identity::as_str), Some("42"));
    }

    #[test]
    fn open_ignores_malformed_entry() {
        let store = IdentityStore::open(MemoryStorage::with_entry(KEY, "not-an-id"), KEY);
        assert!(store.current().is_none());
    }

    #[test]
    fn rejected_capture_leaves_storage_untouched() {
        let mut store = IdentityStore::open(MemoryStorage::with_entry(KEY, "7"), KEY);
        let err = store.capture("12x").unwrap_err();
        assert!(matches!(
            err,
            IshyError::Validation(ValidationError::InvalidIdentityFormat)
        ));
        assert_eq!(store.current().map(Identity::as_str), Some("7"));
        assert_eq!(store.load().map(|id| id.to_string()), Some("7".into()));
    }

    #[test]
    fn capture_then_clear() {
        let mut store = IdentityStore::open(MemoryStorage::new(), KEY);
        assert!(store.current().is_none());

        let id = store.capture(" 12345 ").unwrap();
        assert_eq!(id.as_str(), "12345");
        assert_eq!(store.load(), Some(id));

        store.clear().unwrap();
        assert!(store.current().is_none());
        assert!(store.load().is_none());
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("identity.json");

        let mut store = IdentityStore::open(FileStorage::new(&path), KEY);
        store.capture("999").unwrap();
        drop(store);

        let reopened = IdentityStore::open(FileStorage::new(&path), KEY);
        assert_eq!(reopened.current().map(Identity::as_str), Some("999"));
    }

    #[test]
    fn file_storage_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let mut storage = FileStorage::new(&path);
        storage.set("theme", "dark").unwrap();
        storage.set(KEY, "1").unwrap();
        storage.remove(KEY).unwrap();

        assert_eq!(storage.get("theme").unwrap().as_deref(), Some("dark"));
        assert!(storage.get(KEY).unwrap().is_none());
    }

    #[test]
    fn corrupt_file_reads_as_no_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = IdentityStore::open(FileStorage::new(&path), KEY);
        assert!(store.current().is_none());
    }
}
