//! Session registry: lazy loading, per-session locks and atomic persistence

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::session_file::SessionState;
use crate::config::StorageConfig;
use crate::error::{Error, Result};

/// Shared handle to one session's state
pub type SessionHandle = Arc<RwLock<SessionState>>;

/// Reject tokens that are not a single safe path component
pub fn validate_session_id(session_id: &str) -> Result<()> {
    let valid = !session_id.is_empty()
        && session_id.len() <= 128
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(Error::invalid_input(format!("Invalid session id: {:?}", session_id)))
    }
}

/// Run filesystem work on the blocking pool
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
}

/// On-disk session records with an in-memory cache
pub struct SessionStore {
    users_dir: PathBuf,
    uploads_dir: PathBuf,
    sessions: DashMap<String, SessionHandle>,
    writes: AtomicU64,
}

impl SessionStore {
    /// Open the store, creating `users/` and `uploads/` if needed
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let users_dir = config.users_dir();
        let uploads_dir = config.uploads_dir();

        for dir in [&users_dir, &uploads_dir] {
            std::fs::create_dir_all(dir).map_err(|e| Error::storage(dir, e))?;
        }

        tracing::info!("Session store opened at {}", config.data_dir.display());

        Ok(Self {
            users_dir,
            uploads_dir,
            sessions: DashMap::new(),
            writes: AtomicU64::new(0),
        })
    }

    /// Path of a session's record file
    pub fn session_path(&self, session_id: &str) -> PathBuf {
        self.users_dir.join(format!("{}.json", session_id))
    }

    /// Directory holding a session's uploaded files
    pub fn upload_dir(&self, session_id: &str) -> PathBuf {
        self.uploads_dir.join(session_id)
    }

    /// Directory holding every session record
    pub fn users_dir(&self) -> &Path {
        &self.users_dir
    }

    /// Number of session documents written since the store was opened
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Create and persist a new empty session
    pub async fn create(&self) -> Result<(String, SessionHandle)> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let state = SessionState::new(session_id.clone());
        self.persist(&state).await?;

        let handle = Arc::new(RwLock::new(state));
        self.sessions.insert(session_id.clone(), handle.clone());
        tracing::info!("Created session {}", session_id);
        Ok((session_id, handle))
    }

    /// Get a session, loading it from disk on first touch
    pub async fn get(&self, session_id: &str) -> Result<SessionHandle> {
        validate_session_id(session_id)?;

        if let Some(handle) = self.sessions.get(session_id) {
            return Ok(handle.clone());
        }

        let state = self.load_from_disk(session_id).await?;
        tracing::debug!("Loaded session {} from disk", session_id);

        // a concurrent first touch may have inserted meanwhile; its handle wins
        let handle = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(state)))
            .clone();
        Ok(handle)
    }

    /// Drop a session from the cache so the next touch reads disk again
    pub fn evict(&self, session_id: &str) -> bool {
        let evicted = self.sessions.remove(session_id).is_some();
        if evicted {
            tracing::info!("Evicted session {} from cache", session_id);
        }
        evicted
    }

    /// Ids of every session currently cached
    pub fn cached_session_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Read a session document straight from disk, bypassing the cache
    pub async fn load_from_disk(&self, session_id: &str) -> Result<SessionState> {
        validate_session_id(session_id)?;
        let path = self.session_path(session_id);
        let session_id = session_id.to_string();

        blocking(move || {
            if !path.is_file() {
                return Err(Error::SessionNotFound(session_id));
            }
            SessionState::load(&path, &session_id)
        })
        .await
    }

    /// Atomically write a session document
    pub async fn persist(&self, state: &SessionState) -> Result<()> {
        let path = self.session_path(&state.session_id);
        let snapshot = state.clone();
        blocking(move || snapshot.save_atomic(&path)).await?;

        self.writes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Persisted session {}", state.session_id);
        Ok(())
    }

    /// Ids of every persisted session, sorted
    pub async fn persisted_session_ids(&self) -> Result<Vec<String>> {
        let users_dir = self.users_dir.clone();

        blocking(move || {
            let entries =
                std::fs::read_dir(&users_dir).map_err(|e| Error::storage(&users_dir, e))?;

            let mut ids: Vec<String> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
                .filter_map(|path| {
                    path.file_stem()
                        .and_then(|s| s.to_str())
                        .map(str::to_string)
                })
                .filter(|id| validate_session_id(id).is_ok())
                .collect();

            ids.sort();
            Ok(ids)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bucket, FileMetadata};

    fn store(dir: &Path) -> SessionStore {
        SessionStore::open(&StorageConfig {
            data_dir: dir.to_path_buf(),
            ..StorageConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_validate_session_id() {
        assert!(validate_session_id("3f2c-ab_01").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("../etc").is_err());
        assert!(validate_session_id("a/b").is_err());
        assert!(validate_session_id("a.json").is_err());
    }

    #[tokio::test]
    async fn test_create_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let session_id = {
            let store = store(dir.path());
            let (id, handle) = store.create().await.unwrap();
            let mut state = handle.write().await;
            state.append(
                Bucket::Material,
                FileMetadata {
                    name: "a.txt".to_string(),
                    size: 1,
                    mime_type: "text/plain".to_string(),
                    storage_path: dir.path().join("a.txt"),
                    upload_time: None,
                },
            );
            store.persist(&state).await.unwrap();
            assert_eq!(store.write_count(), 2);
            id
        };

        let reopened = store(dir.path());
        let handle = reopened.get(&session_id).await.unwrap();
        let again = reopened.get(&session_id).await.unwrap();
        assert!(Arc::ptr_eq(&handle, &again));
        assert_eq!(handle.read().await.material.len(), 1);
        assert_eq!(reopened.write_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_touch_shares_handle() {
        let dir = tempfile::tempdir().unwrap();
        let session_id = store(dir.path()).create().await.unwrap().0;

        let reopened = Arc::new(store(dir.path()));
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = reopened.clone();
                let id = session_id.clone();
                tokio::spawn(async move { store.get(&id).await.unwrap() })
            })
            .collect();

        let handles: Vec<SessionHandle> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();
        let cached = reopened.get(&session_id).await.unwrap();
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &cached)));
    }

    #[tokio::test]
    async fn test_evict_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let (id, first) = store.create().await.unwrap();

        assert!(store.evict(&id));
        assert!(!store.evict(&id));
        let second = store.get(&id).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        std::fs::remove_file(store.session_path(&id)).unwrap();
        store.evict(&id);
        assert!(matches!(store.get(&id).await.unwrap_err(), Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
        assert!(matches!(store.get("../x").await.unwrap_err(), Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_persisted_session_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let (a, _) = store.create().await.unwrap();
        let (b, _) = store.create().await.unwrap();
        std::fs::write(store.users_dir().join("notes.txt"), "x").unwrap();

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(store.persisted_session_ids().await.unwrap(), expected);
    }
}
