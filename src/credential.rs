//! Credential store for the Gemini API key.
//!
//! The rest of the program only sees [`CredentialStore::load`],
//! [`CredentialStore::get`] and [`CredentialStore::save`]. Persistence is
//! best-effort: read failures load as "no key", write failures are logged.

use crate::model::ApiKey;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Where the raw credential string is persisted.
pub trait CredentialBackend: Send {
    fn read(&self) -> io::Result<Option<String>>;
    fn write(&self, value: &str) -> io::Result<()>;
}

/// Plain file, owner-only permissions on Unix.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CredentialBackend for FileBackend {
    fn read(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, value: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_private_file(&self.path, value.as_bytes())
    }
}

#[cfg(unix)]
fn write_private_file(path: &std::path::Path, bytes: &[u8]) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on create; tighten a file that already existed.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(bytes)
}

#[cfg(not(unix))]
fn write_private_file(path: &std::path::Path, bytes: &[u8]) -> io::Result<()> {
    std::fs::write(path, bytes)
}

/// In-memory slot. Clones share the slot, so dropping a store and loading a
/// new one from a clone behaves like a fresh session.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slot: Arc<Mutex<Option<String>>>,
}

impl CredentialBackend for MemoryBackend {
    fn read(&self) -> io::Result<Option<String>> {
        self.slot
            .lock()
            .map(|g| g.clone())
            .map_err(|_| io::Error::other("credential slot poisoned"))
    }

    fn write(&self, value: &str) -> io::Result<()> {
        let mut guard = self
            .slot
            .lock()
            .map_err(|_| io::Error::other("credential slot poisoned"))?;
        *guard = Some(value.to_string());
        Ok(())
    }
}

pub struct CredentialStore {
    backend: Box<dyn CredentialBackend>,
    current: Option<ApiKey>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Load whatever was saved previously. Unreadable storage loads empty.
    pub fn load(backend: Box<dyn CredentialBackend>) -> Self {
        let current = match backend.read() {
            Ok(Some(raw)) => ApiKey::new(&raw),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "could not read saved credential; starting without one");
                None
            }
        };
        debug!(present = current.is_some(), "credential loaded");
        Self { backend, current }
    }

    /// Store backed by the default credential file; falls back to memory when
    /// no config directory exists.
    pub fn open_default() -> Self {
        match crate::storage::credential_path() {
            Some(path) => Self::load(Box::new(FileBackend::new(path))),
            None => {
                warn!("no config directory; saved API key will not persist");
                Self::load(Box::new(MemoryBackend::default()))
            }
        }
    }

    pub fn get(&self) -> Option<&ApiKey> {
        self.current.as_ref()
    }

    /// Trim, update the in-memory key, then persist (even an empty string).
    pub fn save(&mut self, value: &str) {
        let trimmed = value.trim();
        self.current = ApiKey::new(trimmed);
        if let Err(e) = self.backend.write(trimmed) {
            warn!(error = %e, "failed to persist credential");
        }
    }

    /// Use a key for this session without persisting it.
    pub fn set_session_override(&mut self, key: ApiKey) {
        self.current = Some(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingBackend;

    impl CredentialBackend for FailingBackend {
        fn read(&self) -> io::Result<Option<String>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
        fn write(&self, _value: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn test_save_then_load_in_fresh_session() {
        let backend = MemoryBackend::default();
        let mut store = CredentialStore::load(Box::new(backend.clone()));
        assert!(store.get().is_none());

        store.save("  AIza-test-key \n");
        assert_eq!(store.get().unwrap().expose(), "AIza-test-key");
        drop(store);

        let reloaded = CredentialStore::load(Box::new(backend));
        assert_eq!(reloaded.get().unwrap().expose(), "AIza-test-key");
    }

    #[test]
    fn test_blank_save_persists_empty_and_clears_key() {
        let backend = MemoryBackend::default();
        let mut store = CredentialStore::load(Box::new(backend.clone()));
        store.save("key");
        store.save("   ");
        assert!(store.get().is_none());
        assert_eq!(backend.read().unwrap(), Some(String::new()));
        assert!(CredentialStore::load(Box::new(backend)).get().is_none());
    }

    #[test]
    fn test_failures_are_soft() {
        let mut store = CredentialStore::load(Box::new(FailingBackend));
        assert!(store.get().is_none());
        store.save("new-key");
        assert_eq!(store.get().unwrap().expose(), "new-key");
    }

    #[test]
    fn test_file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credential");

        let mut store = CredentialStore::load(Box::new(FileBackend::new(path.clone())));
        assert!(store.get().is_none());
        store.save(" file-key ");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "file-key");

        let reloaded = CredentialStore::load(Box::new(FileBackend::new(path)));
        assert_eq!(reloaded.get().unwrap().expose(), "file-key");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_backend_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credential");
        FileBackend::new(path.clone()).write("k").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_tightens_existing_world_readable_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credential");
        std::fs::write(&path, "old-key").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut store = CredentialStore::load(Box::new(FileBackend::new(path.clone())));
        assert_eq!(store.get().unwrap().expose(), "old-key");
        store.save("new-key");

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new-key");
    }

    #[test]
    fn test_session_override_is_not_persisted() {
        let backend = MemoryBackend::default();
        let mut store = CredentialStore::load(Box::new(backend.clone()));
        store.set_session_override(ApiKey::new("env-key").unwrap());
        assert_eq!(store.get().unwrap().expose(), "env-key");
        assert_eq!(backend.read().unwrap(), None);
    }
}
