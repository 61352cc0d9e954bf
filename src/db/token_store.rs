use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::ApiResult;

/// Single-slot durable storage for the bearer token
///
/// Absence of a token means logged out. Only the session manager writes here.
pub trait TokenStore: Send + Sync {
    /// Reads the persisted token, if any
    fn load(&self) -> ApiResult<Option<String>>;

    /// Persists the token, replacing any previous one
    fn save(&self, token: &str) -> ApiResult<()>;

    /// Removes the persisted token; removing an absent token is not an error
    fn clear(&self) -> ApiResult<()>;
}

/// Token store backed by a single file
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> ApiResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> ApiResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, token)?;
        tracing::debug!(path = %self.path.display(), "Persisted auth token");
        Ok(())
    }

    fn clear(&self) -> ApiResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Removed auth token");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process token store, used by tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> ApiResult<Option<String>> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, token: &str) -> ApiResult<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> ApiResult<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_missing_file_is_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_save_creates_parent_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("token"));

        store.save("abc.def.ghi").unwrap();
        assert_eq!(store.load().unwrap(), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_file_store_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));

        store.save("first").unwrap();
        store.save("second").unwrap();
        assert_eq!(store.load().unwrap(), Some("second".to_string()));
    }

    #[test]
    fn test_file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));

        store.save("tok").unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_blank_file_is_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  \n").unwrap();

        let store = FileTokenStore::new(path);
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryTokenStore::with_token("tok");
        assert_eq!(store.load().unwrap(), Some("tok".to_string()));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
