//! Pointer index — the persisted list of live base keys
//!
//! Every logical entry a database currently holds is recorded as a pointer
//! in one JSON array stored at `"{name}/pointers"`. The array is cached in
//! memory; the cache is authoritative until invalidated, and invalidation
//! always forces a re-sync from the host on the next read. An absent or
//! malformed pointer property reads as an empty list.

use parking_lot::Mutex;
use tracing::warn;

use crate::error::{HiveError, HiveResult};
use crate::store::PropertyStore;

/// Cached, persisted ordered set of base keys.
pub struct PointerIndex {
    key: String,
    cached: Mutex<Option<Vec<String>>>,
}

impl PointerIndex {
    /// Index for database `name`, persisted at `"{name}/pointers"`.
    pub fn new(name: &str) -> Self {
        Self {
            key: format!("{}/pointers", name),
            cached: Mutex::new(None),
        }
    }

    /// Host property key holding the persisted list.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write an empty list if the pointer property does not exist yet.
    /// Reopening an existing database keeps its list untouched.
    pub fn ensure_initialized(&self, store: &dyn PropertyStore) -> HiveResult<()> {
        if store.read(&self.key).is_none() {
            store.write(&self.key, Some("[]"))?;
        }
        Ok(())
    }

    /// The current pointer list, from cache when warm.
    ///
    /// A cold cache re-reads the host property; absent or unparseable
    /// data yields an empty list (logged, never an error).
    pub fn list(&self, store: &dyn PropertyStore) -> Vec<String> {
        let mut cached = self.cached.lock();
        if let Some(list) = cached.as_ref() {
            return list.clone();
        }

        let list = Self::load(store, &self.key);
        *cached = Some(list.clone());
        list
    }

    /// Persist `new_list`, skipping the host write when it matches the
    /// cached value. A successful write marks the cache dirty so dependent
    /// readers re-sync from the host.
    pub fn replace(&self, store: &dyn PropertyStore, new_list: Vec<String>) -> HiveResult<()> {
        let mut cached = self.cached.lock();
        if cached.as_ref() == Some(&new_list) {
            return Ok(());
        }

        self.persist(store, &new_list)?;
        *cached = None;
        Ok(())
    }

    /// Add `base` if not yet present. Returns whether the list changed.
    ///
    /// Load, mutate and write happen under the cache mutex, so concurrent
    /// pointer updates through the same index cannot lose each other.
    pub fn insert(&self, store: &dyn PropertyStore, base: &str) -> HiveResult<bool> {
        let mut cached = self.cached.lock();
        let mut list = match cached.take() {
            Some(list) => list,
            None => Self::load(store, &self.key),
        };
        if list.iter().any(|p| p == base) {
            *cached = Some(list);
            return Ok(false);
        }
        list.push(base.to_string());
        self.persist(store, &list)?;
        Ok(true)
    }

    /// Remove `base` if present. Returns whether the list changed.
    pub fn remove(&self, store: &dyn PropertyStore, base: &str) -> HiveResult<bool> {
        let mut cached = self.cached.lock();
        let mut list = match cached.take() {
            Some(list) => list,
            None => Self::load(store, &self.key),
        };
        let before = list.len();
        list.retain(|p| p != base);
        if list.len() == before {
            *cached = Some(list);
            return Ok(false);
        }
        self.persist(store, &list)?;
        Ok(true)
    }

    fn load(store: &dyn PropertyStore, key: &str) -> Vec<String> {
        match store.read(key) {
            Some(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(key = %key, error = %err, "pointer list unparseable, treating as empty");
                    Vec::new()
                }
            },
            None => Vec::new(),
        }
    }

    fn persist(&self, store: &dyn PropertyStore, list: &[String]) -> HiveResult<()> {
        let raw = serde_json::to_string(list).map_err(|err| HiveError::Serialize {
            base: self.key.clone(),
            reason: err.to_string(),
        })?;
        store.write(&self.key, Some(&raw))
    }

    /// Drop the cache; the next `list` re-reads the host property.
    pub fn invalidate(&self) {
        let mut cached = self.cached.lock();
        *cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_absent_reads_empty() {
        let store = MemoryStore::new();
        let index = PointerIndex::new("db");
        assert!(index.list(&store).is_empty());
    }

    #[test]
    fn test_replace_then_list() {
        let store = MemoryStore::new();
        let index = PointerIndex::new("db");

        index
            .replace(&store, vec!["db/a".to_string(), "db/b".to_string()])
            .unwrap();

        assert_eq!(index.list(&store), vec!["db/a".to_string(), "db/b".to_string()]);
        assert_eq!(store.read("db/pointers"), Some(r#"["db/a","db/b"]"#.to_string()));
    }

    #[test]
    fn test_malformed_list_reads_empty() {
        let store = MemoryStore::new();
        store.write("db/pointers", Some("{not json")).unwrap();

        let index = PointerIndex::new("db");
        assert!(index.list(&store).is_empty());
    }

    #[test]
    fn test_ensure_initialized_idempotent() {
        let store = MemoryStore::new();
        let index = PointerIndex::new("db");

        index.ensure_initialized(&store).unwrap();
        assert_eq!(store.read("db/pointers"), Some("[]".to_string()));

        store.write("db/pointers", Some(r#"["db/kept"]"#)).unwrap();
        index.ensure_initialized(&store).unwrap();
        assert_eq!(store.read("db/pointers"), Some(r#"["db/kept"]"#.to_string()));
    }

    #[test]
    fn test_invalidate_picks_up_external_change() {
        let store = MemoryStore::new();
        let index = PointerIndex::new("db");
        index.replace(&store, vec!["db/a".to_string()]).unwrap();
        assert_eq!(index.list(&store), vec!["db/a".to_string()]);

        // Simulate another writer mutating the persisted list
        store.write("db/pointers", Some(r#"["db/z"]"#)).unwrap();
        index.invalidate();

        assert_eq!(index.list(&store), vec!["db/z".to_string()]);
    }

    #[test]
    fn test_insert_remove() {
        let store = MemoryStore::new();
        let index = PointerIndex::new("db");

        assert!(index.insert(&store, "db/a").unwrap());
        assert!(!index.insert(&store, "db/a").unwrap());
        assert!(index.insert(&store, "db/b").unwrap());
        assert_eq!(index.list(&store), vec!["db/a".to_string(), "db/b".to_string()]);

        assert!(index.remove(&store, "db/a").unwrap());
        assert!(!index.remove(&store, "db/a").unwrap());
        assert_eq!(index.list(&store), vec!["db/b".to_string()]);
    }

    /// Store that counts writes, to observe redundant-write suppression.
    struct CountingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    impl PropertyStore for CountingStore {
        fn read(&self, key: &str) -> Option<String> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: Option<&str>) -> HiveResult<()> {
            self.writes.fetch_add(1, Ordering::Relaxed);
            self.inner.write(key, value)
        }
    }

    #[test]
    fn test_replace_identical_skips_write() {
        let store = CountingStore {
            inner: MemoryStore::new(),
            writes: AtomicUsize::new(0),
        };
        let index = PointerIndex::new("db");

        index.replace(&store, vec!["db/a".to_string()]).unwrap();
        assert_eq!(store.writes.load(Ordering::Relaxed), 1);

        // Warm the cache, then replace with the identical list
        index.list(&store);
        index.replace(&store, vec!["db/a".to_string()]).unwrap();
        assert_eq!(store.writes.load(Ordering::Relaxed), 1);
    }
}
