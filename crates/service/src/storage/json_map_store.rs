use std::{
    collections::BTreeMap,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use dashmap::DashMap;
use tokio::{fs, sync::Mutex};
use tracing::{debug, warn};

use crate::errors::ServiceError;

/// Generic JSON file-backed key-value map store.
///
/// The file is the only state: every call reads the whole document and every
/// write rewrites it. A missing file reads as an empty map and is created on
/// the first write. Writes inside one process are serialized through a lock
/// shared by every handle on the same file, so two concurrent
/// load-mutate-save sequences cannot lose each other's updates. Nothing
/// guards against a second process writing the same file.
pub struct JsonMapStore<K, V> {
    file_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
    _marker: std::marker::PhantomData<fn() -> (K, V)>,
}

/// One write lock per document, keyed by its absolute path.
fn document_lock(key: PathBuf) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<DashMap<PathBuf, Arc<Mutex<()>>>> = OnceLock::new();
    Arc::clone(&LOCKS.get_or_init(DashMap::new).entry(key).or_default())
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."))
}

impl<K, V> JsonMapStore<K, V>
where
    K: Ord + serde::Serialize + serde::de::DeserializeOwned + Clone,
    V: serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    /// Bind the store to a path. The parent directory is created if missing;
    /// the file itself is not touched until the first write.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        let dir = parent_dir(&file_path);
        fs::create_dir_all(dir)
            .await
            .map_err(|e| ServiceError::persistence("create data directory", e))?;
        let key = match (fs::canonicalize(dir).await, file_path.file_name()) {
            (Ok(dir), Some(name)) => dir.join(name),
            _ => file_path.clone(),
        };
        Ok(Arc::new(Self { write_lock: document_lock(key), file_path, _marker: std::marker::PhantomData }))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Read the whole document.
    pub async fn load(&self) -> Result<BTreeMap<K, V>, ServiceError> {
        let bytes = match fs::read(&self.file_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(ServiceError::persistence("read store", e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(file = %self.file_path.display(), error = %e, "store document is corrupt");
            ServiceError::persistence("parse store", e)
        })
    }

    async fn save(&self, map: &BTreeMap<K, V>) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(map).map_err(|e| ServiceError::persistence("serialize store", e))?;
        let dir = parent_dir(&self.file_path).to_path_buf();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ServiceError::persistence("create data directory", e))?;

        // write a uniquely named sibling and rename it so readers never see a partial file
        let target = self.file_path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &data))
            .await
            .map_err(|e| ServiceError::persistence("write store", e))??;
        debug!(file = %self.file_path.display(), entries = map.len(), "store saved");
        Ok(())
    }

    /// List all entries as `(key, value)` pairs, ordered by key.
    pub async fn list(&self) -> Result<Vec<(K, V)>, ServiceError> {
        Ok(self.load().await?.into_iter().collect())
    }

    /// Get value by key.
    pub async fn get(&self, key: &K) -> Result<Option<V>, ServiceError> {
        Ok(self.load().await?.get(key).cloned())
    }

    /// Insert or replace a value by key and persist; returns the previous value.
    pub async fn insert(&self, key: K, value: V) -> Result<Option<V>, ServiceError> {
        self.update_map(|map| Ok(map.insert(key, value))).await
    }

    /// Remove a key and persist; returns whether it existed.
    /// Nothing is written when the key was absent.
    pub async fn remove(&self, key: &K) -> Result<bool, ServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        if map.remove(key).is_none() {
            return Ok(false);
        }
        self.save(&map).await?;
        Ok(true)
    }

    /// Apply a mutation to a freshly loaded map and persist it.
    /// If `f` fails nothing is written.
    pub async fn update_map<F, R>(&self, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut BTreeMap<K, V>) -> Result<R, ServiceError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        let out = f(&mut map)?;
        self.save(&map).await?;
        Ok(out)
    }
}

fn write_atomically(dir: &Path, target: &Path, data: &[u8]) -> Result<(), ServiceError> {
    let mut prefix = std::ffi::OsString::from(".");
    if let Some(name) = target.file_name() {
        prefix.push(name);
        prefix.push(".");
    }
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| ServiceError::persistence("create temp file", e))?;
    tmp.write_all(data).map_err(|e| ServiceError::persistence("write store", e))?;
    tmp.as_file().sync_all().map_err(|e| ServiceError::persistence("sync store", e))?;
    tmp.persist(target).map_err(|e| ServiceError::persistence("replace store", e.error))?;
    Ok(())
}
