//! The reader's pseudonymous identity.
//!
//! A reader is known to the backend only by a UUID generated on first use and
//! kept in client-local storage. [`IdentityStore`] owns that value: it creates
//! it lazily, exports it for backup, and accepts a validated replacement on
//! import so a reader can carry their reactions to another device.
//!
//! Storage is a single string slot behind [`IdentityStorage`]. [`FileStorage`]
//! keeps it in one file under the platform data directory:
//! - Linux:   `~/.local/share/bookbyte/user_identifier`
//! - macOS:   `~/Library/Application Support/org.bookbyte.bookbyte/user_identifier`
//! - Windows: `{FOLDERID_RoamingAppData}\bookbyte\bookbyte\data\user_identifier`

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Name of the slot the identifier lives under.
pub const IDENTITY_KEY: &str = "user_identifier";

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("uuid pattern is valid")
});

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Please enter a valid identifier")]
    Empty,

    #[error("Invalid identifier format. Please enter a valid UUID: {0}")]
    InvalidFormat(String),

    #[error("Could not determine application data directory")]
    NoDataDir,

    #[error("Identifier storage is unusable after a panic")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Returns true for the canonical 8-4-4-4-12 hex form, in either case.
pub fn is_valid_identifier(candidate: &str) -> bool {
    UUID_RE.is_match(candidate)
}

/// Strips surrounding whitespace and a leading byte order mark.
fn clean(raw: &str) -> &str {
    raw.trim().trim_start_matches('\u{feff}').trim()
}

//=========================================================================================
// Storage Backends
//=========================================================================================

/// One string value under [`IDENTITY_KEY`].
pub trait IdentityStorage {
    fn read(&self) -> Result<Option<String>, IdentityError>;
    fn write(&self, value: &str) -> Result<(), IdentityError>;
    fn remove(&self) -> Result<(), IdentityError>;
}

/// Keeps the identifier in a single text file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage at the platform data directory.
    pub fn default_location() -> Result<Self, IdentityError> {
        let dirs =
            ProjectDirs::from("org", "bookbyte", "bookbyte").ok_or(IdentityError::NoDataDir)?;
        Ok(Self::at(dirs.data_dir().join(IDENTITY_KEY)))
    }

    /// Storage at an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStorage for FileStorage {
    fn read(&self) -> Result<Option<String>, IdentityError> {
        match fs::read_to_string(&self.path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, value: &str) -> Result<(), IdentityError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, value)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), IdentityError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local storage, for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    value: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStorage for MemoryStorage {
    fn read(&self) -> Result<Option<String>, IdentityError> {
        let slot = self.value.lock().map_err(|_| IdentityError::Poisoned)?;
        Ok(slot.clone())
    }

    fn write(&self, value: &str) -> Result<(), IdentityError> {
        let mut slot = self.value.lock().map_err(|_| IdentityError::Poisoned)?;
        *slot = Some(value.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<(), IdentityError> {
        let mut slot = self.value.lock().map_err(|_| IdentityError::Poisoned)?;
        *slot = None;
        Ok(())
    }
}

//=========================================================================================
// The Store
//=========================================================================================

pub struct IdentityStore<S: IdentityStorage> {
    storage: S,
}

impl<S: IdentityStorage> IdentityStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Returns the stored identifier, generating and persisting one first when
    /// none exists.
    ///
    /// A stored value is returned as is even when it is not a UUID, since it
    /// is the reader's only key to their reactions. Only imports are validated.
    pub fn get(&self) -> Result<String, IdentityError> {
        if let Some(stored) = self.storage.read()? {
            let stored = clean(&stored);
            if !stored.is_empty() {
                if !is_valid_identifier(stored) {
                    warn!("Stored identifier is not a UUID; keeping it");
                }
                return Ok(stored.to_string());
            }
        }
        let fresh = Uuid::new_v4().to_string();
        self.storage.write(&fresh)?;
        info!("Generated a new user identifier");
        Ok(fresh)
    }

    /// The identifier as shown to the reader for backup.
    pub fn export(&self) -> Result<String, IdentityError> {
        self.get()
    }

    /// Writes the identifier to `bookbyte-user-id-YYYY-MM-DD.txt` in `dir`.
    pub fn export_to_file(&self, dir: &Path) -> Result<PathBuf, IdentityError> {
        let identifier = self.export()?;
        let file_name = format!("bookbyte-user-id-{}.txt", Utc::now().format("%Y-%m-%d"));
        let path = dir.join(file_name);
        fs::write(&path, &identifier)?;
        Ok(path)
    }

    /// Replaces the stored identifier. Invalid input leaves storage untouched.
    pub fn import(&self, candidate: &str) -> Result<String, IdentityError> {
        let trimmed = clean(candidate);
        if trimmed.is_empty() {
            return Err(IdentityError::Empty);
        }
        if !is_valid_identifier(trimmed) {
            return Err(IdentityError::InvalidFormat(trimmed.to_string()));
        }
        self.storage.write(trimmed)?;
        info!("Imported user identifier");
        Ok(trimmed.to_string())
    }

    pub fn import_from_file(&self, path: &Path) -> Result<String, IdentityError> {
        let contents = fs::read_to_string(path)?;
        self.import(&contents)
    }

    pub fn exists(&self) -> Result<bool, IdentityError> {
        Ok(self
            .storage
            .read()?
            .map(|v| !clean(&v).is_empty())
            .unwrap_or(false))
    }

    pub fn clear(&self) -> Result<(), IdentityError> {
        self.storage.remove()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &str = "123e4567-e89b-12d3-a456-426614174000";

    #[test]
    fn get_generates_once_and_is_idempotent() {
        let store = IdentityStore::new(MemoryStorage::new());
        store.clear().unwrap();
        assert!(!store.exists().unwrap());

        let first = store.get().unwrap();
        assert!(is_valid_identifier(&first));
        assert_eq!(store.get().unwrap(), first);
        assert_eq!(store.export().unwrap(), first);
        assert!(store.exists().unwrap());
    }

    #[test]
    fn invalid_import_keeps_previous_value() {
        let store = IdentityStore::new(MemoryStorage::new());
        let before = store.get().unwrap();

        let err = store.import("not-a-uuid").unwrap_err();
        assert!(matches!(err, IdentityError::InvalidFormat(_)));
        assert!(matches!(store.import("   ").unwrap_err(), IdentityError::Empty));
        assert_eq!(store.get().unwrap(), before);
    }

    #[test]
    fn valid_import_replaces_value() {
        let store = IdentityStore::new(MemoryStorage::new());
        store.get().unwrap();
        store.import(&format!("  {KNOWN}\n")).unwrap();
        assert_eq!(store.get().unwrap(), KNOWN);
    }

    #[test]
    fn uppercase_uuid_is_accepted() {
        assert!(is_valid_identifier(&KNOWN.to_uppercase()));
        assert!(!is_valid_identifier("123e4567e89b12d3a456426614174000"));
    }

    #[test]
    fn file_storage_survives_a_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(IDENTITY_KEY);

        let first = IdentityStore::new(FileStorage::at(&path)).get().unwrap();
        let second = IdentityStore::new(FileStorage::at(&path)).get().unwrap();
        assert_eq!(first, second);

        let store = IdentityStore::new(FileStorage::at(&path));
        store.clear().unwrap();
        assert!(!store.exists().unwrap());
        store.clear().unwrap();
    }

    #[test]
    fn stored_value_with_bom_or_legacy_form_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(IDENTITY_KEY);
        fs::write(&path, format!("\u{feff}{KNOWN}\r\n")).unwrap();

        let store = IdentityStore::new(FileStorage::at(&path));
        assert!(store.exists().unwrap());
        assert_eq!(store.get().unwrap(), KNOWN);
        assert_eq!(fs::read_to_string(&path).unwrap(), format!("\u{feff}{KNOWN}\r\n"));

        fs::write(&path, "legacy-reader-42").unwrap();
        assert_eq!(store.get().unwrap(), "legacy-reader-42");
        assert_eq!(fs::read_to_string(&path).unwrap(), "legacy-reader-42");
    }

    #[test]
    fn blank_stored_value_is_replaced() {
        let store = IdentityStore::new(MemoryStorage::new());
        store.storage.write("  \n").unwrap();
        assert!(!store.exists().unwrap());
        let fresh = store.get().unwrap();
        assert!(is_valid_identifier(&fresh));
    }

    #[test]
    fn poisoned_memory_storage_is_an_error() {
        let storage = std::sync::Arc::new(MemoryStorage::new());
        let poisoner = storage.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.value.lock().unwrap();
            panic!("poison the slot");
        })
        .join();

        assert!(matches!(storage.read(), Err(IdentityError::Poisoned)));
        assert!(matches!(storage.write(KNOWN), Err(IdentityError::Poisoned)));
        assert!(matches!(storage.remove(), Err(IdentityError::Poisoned)));
    }

    #[test]
    fn export_and_import_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = IdentityStore::new(MemoryStorage::new());
        source.import(KNOWN).unwrap();

        let exported = source.export_to_file(dir.path()).unwrap();
        let name = exported.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("bookbyte-user-id-"));
        assert!(name.ends_with(".txt"));

        let target = IdentityStore::new(MemoryStorage::new());
        target.get().unwrap();
        assert_eq!(target.import_from_file(&exported).unwrap(), KNOWN);
        assert_eq!(target.get().unwrap(), KNOWN);
    }
}
