//! Request-scoped transient media storage.
//!
//! Every stored blob gets its own UUID-named file under the configured root,
//! so concurrent requests never collide on file identity. The store keeps a
//! registry of live handles; a handle is allocated from the moment its bytes
//! are reserved until it is released.
//!
//! [`StoreScope`] groups the handles acquired by one pipeline invocation and
//! releases whatever is left when it is dropped, which covers cancellation
//! and timeouts that drop the owning future.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};

/// 2 GiB across all live handles.
const DEFAULT_QUOTA_BYTES: u64 = 2 * 1024 * 1024 * 1024;
const DEFAULT_WORK_DIR: &str = "/tmp/vidisnap";

/// Transient store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding transient files
    pub root: PathBuf,
    /// Upper bound on bytes held by live handles
    pub quota_bytes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_WORK_DIR),
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            root: std::env::var("VIDISNAP_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_WORK_DIR)),
            quota_bytes: std::env::var("VIDISNAP_STORE_QUOTA_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_QUOTA_BYTES),
        }
    }
}

/// Handle to one stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaHandle {
    id: Uuid,
    path: PathBuf,
}

impl MediaHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// On-disk location, valid until the handle is released.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug)]
struct Entry {
    path: PathBuf,
    size: u64,
}

/// Transient media store with per-handle files and a byte quota.
#[derive(Debug)]
pub struct TransientStore {
    config: StoreConfig,
    entries: Mutex<HashMap<Uuid, Entry>>,
}

impl TransientStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Persist `bytes` under a fresh handle.
    ///
    /// `name` only contributes its extension to the file name. Fails with
    /// [`MediaError::StorageFailure`] when the quota would be exceeded or the
    /// write does not complete; no handle stays allocated in that case.
    pub async fn store(&self, bytes: &[u8], name: &str) -> MediaResult<MediaHandle> {
        let root = &self.config.root;
        fs::create_dir_all(root).await.map_err(|e| {
            MediaError::storage_failure(format!("create {}: {}", root.display(), e))
        })?;

        let id = Uuid::new_v4();
        let path = root.join(file_name_for(id, name));
        let size = bytes.len() as u64;

        self.reserve(id, &path, size)?;
        let mut reservation = Reservation {
            store: self,
            id,
            armed: true,
        };

        write_new_file(&path, bytes).await.map_err(|e| {
            MediaError::storage_failure(format!("write {}: {}", path.display(), e))
        })?;

        reservation.disarm();
        debug!(handle = %id, bytes = size, path = %path.display(), "Stored transient media");

        Ok(MediaHandle { id, path })
    }

    /// Read back the bytes of a live handle.
    pub async fn read(&self, handle: &MediaHandle) -> MediaResult<Vec<u8>> {
        if !self.is_live(handle) {
            return Err(MediaError::UnknownHandle(handle.id));
        }
        Ok(fs::read(&handle.path).await?)
    }

    /// Release a handle and delete its file. Releasing twice is a no-op.
    pub async fn release(&self, handle: &MediaHandle) -> MediaResult<()> {
        let Some(entry) = self.take_entry(handle.id) else {
            return Ok(());
        };

        match fs::remove_file(&entry.path).await {
            Ok(()) => {
                debug!(handle = %handle.id, "Released transient media");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(
                    handle = %handle.id,
                    path = %entry.path.display(),
                    "Failed to delete transient file: {}",
                    e
                );
                Err(MediaError::storage_failure(format!(
                    "delete {}: {}",
                    entry.path.display(),
                    e
                )))
            }
        }
    }

    /// Synchronous [`release`](Self::release) for drop paths.
    pub fn release_blocking(&self, handle: &MediaHandle) -> MediaResult<()> {
        let Some(entry) = self.take_entry(handle.id) else {
            return Ok(());
        };

        match std::fs::remove_file(&entry.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::storage_failure(format!(
                "delete {}: {}",
                entry.path.display(),
                e
            ))),
        }
    }

    pub fn is_live(&self, handle: &MediaHandle) -> bool {
        self.entries().contains_key(&handle.id)
    }

    /// Number of allocated handles.
    pub fn live_handles(&self) -> usize {
        self.entries().len()
    }

    /// Bytes held by allocated handles.
    pub fn used_bytes(&self) -> u64 {
        self.entries().values().map(|e| e.size).sum()
    }

    fn reserve(&self, id: Uuid, path: &Path, size: u64) -> MediaResult<()> {
        let mut entries = self.entries();
        let used: u64 = entries.values().map(|e| e.size).sum();

        if used.saturating_add(size) > self.config.quota_bytes {
            return Err(MediaError::storage_failure(format!(
                "quota exceeded: {} bytes in use, {} requested, limit {}",
                used, size, self.config.quota_bytes
            )));
        }

        entries.insert(
            id,
            Entry {
                path: path.to_path_buf(),
                size,
            },
        );
        Ok(())
    }

    fn take_entry(&self, id: Uuid) -> Option<Entry> {
        self.entries().remove(&id)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Uuid, Entry>> {
        // Each critical section is a single map operation, so a poisoned map is still consistent.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Undoes a quota reservation unless the write completed.
struct Reservation<'a> {
    store: &'a TransientStore,
    id: Uuid,
    armed: bool,
}

impl Reservation<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(entry) = self.store.take_entry(self.id) {
            let _ = std::fs::remove_file(&entry.path);
        }
    }
}

async fn write_new_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await
}

/// UUID file name, keeping a short alphanumeric extension from `name`.
fn file_name_for(id: Uuid, name: &str) -> String {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase());

    match ext {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

/// Handles acquired by one pipeline invocation.
///
/// Call [`release_all`](Self::release_all) on normal exit. Anything still
/// held when the scope is dropped is released synchronously.
pub struct StoreScope {
    store: Arc<TransientStore>,
    handles: Vec<MediaHandle>,
}

impl StoreScope {
    pub fn new(store: Arc<TransientStore>) -> Self {
        Self {
            store,
            handles: Vec::new(),
        }
    }

    /// Store bytes and track the resulting handle.
    pub async fn store(&mut self, bytes: &[u8], name: &str) -> MediaResult<MediaHandle> {
        let handle = self.store.store(bytes, name).await?;
        self.handles.push(handle.clone());
        Ok(handle)
    }

    /// Release every tracked handle, returning how many were released cleanly.
    pub async fn release_all(&mut self) -> usize {
        let mut released = 0;

        // Pop only after the release finishes so a cancelled release is retried on drop.
        while let Some(handle) = self.handles.last().cloned() {
            match self.store.release(&handle).await {
                Ok(()) => released += 1,
                Err(e) => warn!(handle = %handle.id(), "Release failed: {}", e),
            }
            self.handles.pop();
        }

        released
    }
}

impl Drop for StoreScope {
    fn drop(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        debug!(count = self.handles.len(), "Releasing transient media on scope drop");
        for handle in self.handles.drain(..) {
            if let Err(e) = self.store.release_blocking(&handle) {
                warn!(handle = %handle.id(), "Release on drop failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn test_store(dir: &TempDir, quota_bytes: u64) -> Arc<TransientStore> {
        Arc::new(TransientStore::new(StoreConfig {
            root: dir.path().join("work"),
            quota_bytes,
        }))
    }

    #[tokio::test]
    async fn test_store_read_release() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 1024);

        let handle = store.store(b"video bytes", "cat.mp4").await.unwrap();
        assert!(handle.path().exists());
        assert_eq!(store.live_handles(), 1);
        assert_eq!(store.used_bytes(), 11);
        assert_eq!(store.read(&handle).await.unwrap(), b"video bytes");

        store.release(&handle).await.unwrap();
        assert!(!handle.path().exists());
        assert_eq!(store.live_handles(), 0);
        assert_eq!(store.used_bytes(), 0);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 1024);

        let handle = store.store(b"abc", "a.mp4").await.unwrap();
        assert_ok!(store.release(&handle).await);
        assert_ok!(store.release(&handle).await);
        assert_ok!(store.release_blocking(&handle));
        assert_eq!(store.live_handles(), 0);
    }

    #[tokio::test]
    async fn test_read_after_release_fails() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 1024);

        let handle = store.store(b"abc", "a.mp4").await.unwrap();
        store.release(&handle).await.unwrap();

        let err = assert_err!(store.read(&handle).await);
        assert!(matches!(err, MediaError::UnknownHandle(_)));
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_storage_failure() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 8);

        let _first = store.store(b"12345", "a.mp4").await.unwrap();
        let err = store.store(b"12345", "b.mp4").await.unwrap_err();

        assert!(matches!(err, MediaError::StorageFailure(_)));
        assert_eq!(store.live_handles(), 1);
        assert_eq!(store.used_bytes(), 5);
    }

    #[tokio::test]
    async fn test_failed_write_frees_reservation() {
        let dir = TempDir::new().unwrap();
        // A file where the root directory should be makes every write fail.
        let root = dir.path().join("blocked");
        std::fs::write(&root, b"not a directory").unwrap();
        let store = TransientStore::new(StoreConfig {
            root,
            quota_bytes: 1024,
        });

        let err = store.store(b"abc", "a.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::StorageFailure(_)));
        assert_eq!(store.live_handles(), 0);
    }

    #[tokio::test]
    async fn test_handles_are_unique_for_same_name() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 1024);

        let a = store.store(b"a", "same.mp4").await.unwrap();
        let b = store.store(b"b", "same.mp4").await.unwrap();

        assert_ne!(a.id(), b.id());
        assert_ne!(a.path(), b.path());
        assert_eq!(store.read(&a).await.unwrap(), b"a");
        assert_eq!(store.read(&b).await.unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_declared_name_cannot_escape_root() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 1024);

        let handle = store.store(b"x", "../../etc/passwd.mp4").await.unwrap();
        assert_eq!(handle.path().parent(), Some(store.root()));
        assert_eq!(handle.path().extension().and_then(|e| e.to_str()), Some("mp4"));
    }

    #[test]
    fn test_file_name_for_sanitizes_extension() {
        let id = Uuid::new_v4();
        assert_eq!(file_name_for(id, "clip.MP4"), format!("{}.mp4", id));
        assert_eq!(file_name_for(id, "noext"), id.to_string());
        assert_eq!(file_name_for(id, "weird.m p4"), id.to_string());
        assert_eq!(file_name_for(id, "long.extension123"), id.to_string());
    }

    #[tokio::test]
    async fn test_scope_release_all() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 1024);

        let mut scope = StoreScope::new(Arc::clone(&store));
        scope.store(b"video", "v.mp4").await.unwrap();
        scope.store(b"frame", "f.png").await.unwrap();
        assert_eq!(store.live_handles(), 2);

        assert_eq!(scope.release_all().await, 2);
        assert_eq!(scope.release_all().await, 0);
        assert_eq!(store.live_handles(), 0);
    }

    #[tokio::test]
    async fn test_scope_drop_releases() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 1024);

        let path = {
            let mut scope = StoreScope::new(Arc::clone(&store));
            let handle = scope.store(b"video", "v.mp4").await.unwrap();
            handle.path().to_path_buf()
        };

        assert_eq!(store.live_handles(), 0);
        assert!(!path.exists());
    }
}
