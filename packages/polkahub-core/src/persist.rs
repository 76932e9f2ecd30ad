use futures_signals::signal::{Mutable, Signal};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Durable storage of a single string value
/// `save(None)` clears it
pub trait PersistenceProvider: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, value: Option<&str>);
}

#[derive(Debug, Default)]
pub struct MemoryPersistence {
    value: Mutex<Option<String>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl ToString) -> Self {
        Self {
            value: Mutex::new(Some(value.to_string())),
        }
    }
}

impl PersistenceProvider for MemoryPersistence {
    fn load(&self) -> Option<String> {
        self.value.lock().clone()
    }

    fn save(&self, value: Option<&str>) {
        *self.value.lock() = value.map(|s| s.to_string());
    }
}

/// One json file per key
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{key}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceProvider for FilePersistence {
    fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => Some(s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("failed to read {}: {e}", self.path.display());
                None
            }
        }
    }

    fn save(&self, value: Option<&str>) {
        let res = match value {
            Some(value) => self
                .path
                .parent()
                .map(std::fs::create_dir_all)
                .unwrap_or(Ok(()))
                .and_then(|_| std::fs::write(&self.path, value)),
            None => match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                res => res,
            },
        };

        if let Err(e) = res {
            tracing::warn!("failed to write {}: {e}", self.path.display());
        }
    }
}

/// Hands out a persistence provider per storage key
#[derive(Clone, Debug)]
pub enum Storage {
    Memory(Arc<Mutex<HashMap<String, Arc<MemoryPersistence>>>>),
    Directory(PathBuf),
}

impl Storage {
    pub fn memory() -> Self {
        Self::Memory(Arc::new(Mutex::new(HashMap::new())))
    }

    pub fn directory(dir: impl Into<PathBuf>) -> Self {
        Self::Directory(dir.into())
    }

    /// The same key always maps to the same underlying value
    pub fn persistence(&self, key: &str) -> Arc<dyn PersistenceProvider> {
        match self {
            Self::Memory(map) => {
                let persist: Arc<MemoryPersistence> =
                    map.lock().entry(key.to_string()).or_default().clone();
                persist
            }
            Self::Directory(dir) => Arc::new(FilePersistence::new(dir, key)),
        }
    }
}

/// A reactive value that writes itself through to a persistence provider
/// on every change. Unreadable persisted values fall back to the default.
pub struct PersistedState<T> {
    value: Mutable<T>,
    persist: Arc<dyn PersistenceProvider>,
}

impl<T> PersistedState<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn load(persist: Arc<dyn PersistenceProvider>, default: T) -> Self {
        let value = match persist.load() {
            Some(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!("discarding unreadable persisted value: {e}");
                default
            }),
            None => default,
        };

        Self {
            value: Mutable::new(value),
            persist,
        }
    }

    pub fn get(&self) -> T {
        self.value.get_cloned()
    }

    pub fn set(&self, value: T) {
        self.write(&value);
        self.value.set(value);
    }

    /// Only persists and notifies if `f` returns true
    pub fn update(&self, f: impl FnOnce(&mut T) -> bool) {
        let mut value = self.value.get_cloned();
        if f(&mut value) {
            self.set(value);
        }
    }

    pub fn signal(&self) -> impl Signal<Item = T> {
        self.value.signal_cloned()
    }

    pub fn mutable(&self) -> &Mutable<T> {
        &self.value
    }

    fn write(&self, value: &T) {
        match serde_json::to_string(value) {
            Ok(s) => self.persist.save(Some(&s)),
            Err(e) => tracing::error!("failed to serialize persisted value: {e}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let persist = FilePersistence::new(dir.path().join("nested"), "key");

        assert_eq!(persist.load(), None);
        persist.save(Some("[1,2]"));
        assert_eq!(persist.load().as_deref(), Some("[1,2]"));

        persist.save(None);
        assert_eq!(persist.load(), None);
        // clearing twice is fine
        persist.save(None);
    }

    #[test]
    fn memory_storage_shares_keys() {
        let storage = Storage::memory();
        storage.persistence("a").save(Some("1"));
        assert_eq!(storage.persistence("a").load().as_deref(), Some("1"));
        assert_eq!(storage.persistence("b").load(), None);
    }

    #[test]
    fn persisted_state_writes_through() {
        let persist: Arc<dyn PersistenceProvider> = Arc::new(MemoryPersistence::new());
        let state = PersistedState::load(persist.clone(), Vec::<u32>::new());

        state.update(|v| {
            v.push(3);
            true
        });
        assert_eq!(persist.load().as_deref(), Some("[3]"));

        state.update(|_| false);
        assert_eq!(state.get(), vec![3]);

        let reloaded = PersistedState::load(persist, Vec::<u32>::new());
        assert_eq!(reloaded.get(), vec![3]);
    }

    #[test]
    fn garbage_falls_back_to_default() {
        let persist: Arc<dyn PersistenceProvider> = Arc::new(MemoryPersistence::with_value("{nope"));
        let state = PersistedState::load(persist, vec![7u32]);
        assert_eq!(state.get(), vec![7]);
    }
}
