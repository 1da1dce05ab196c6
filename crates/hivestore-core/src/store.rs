//! The host property store boundary
//!
//! HiveStore sits on top of a flat, synchronous key→scalar store supplied by
//! the host process. The host offers no transactions, no namespacing beyond
//! string prefixes, and no batch deletion; values are size-limited strings.
//! Everything above this trait (chunking, atomic swap, pointer index) exists
//! to build a usable database out of that narrow surface.
//!
//! `MemoryStore` is a process-local implementation of the same surface, used
//! as the test host and as a standalone volatile backend.

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::error::HiveResult;

/// Flat key→string store as exposed by the host.
///
/// `write(key, None)` deletes the key. `write_many` is best-effort batching
/// for additive writes only — the host cannot delete by batch, so callers
/// must never pass it as a deletion path.
pub trait PropertyStore: Send + Sync {
    /// Read the value stored at `key`, if any.
    fn read(&self, key: &str) -> Option<String>;

    /// Write `value` at `key`; `None` deletes the key.
    fn write(&self, key: &str, value: Option<&str>) -> HiveResult<()>;

    /// Write several key-value pairs in one host call. Additive only.
    ///
    /// The default implementation degrades to per-key writes for hosts
    /// without a batch primitive.
    fn write_many(&self, entries: Vec<(String, String)>) -> HiveResult<()> {
        for (key, value) in entries {
            self.write(&key, Some(&value))?;
        }
        Ok(())
    }
}

/// In-process property store backed by a hash table.
///
/// Concurrent readers via RwLock; writers serialize briefly on the write
/// lock. Persistence is out of scope here — durability semantics are
/// supplied by whatever host store replaces this in production.
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let data = self.data.read();
        data.len()
    }

    /// Returns true if the store has no keys.
    pub fn is_empty(&self) -> bool {
        let data = self.data.read();
        data.is_empty()
    }

    /// Count keys starting with `prefix`. Diagnostic helper for tests.
    pub fn key_count_with_prefix(&self, prefix: &str) -> usize {
        let data = self.data.read();
        data.keys().filter(|k| k.starts_with(prefix)).count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self { Self::new() }
}

impl PropertyStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        let data = self.data.read();
        data.get(key).cloned()
    }

    fn write(&self, key: &str, value: Option<&str>) -> HiveResult<()> {
        let mut data = self.data.write();
        match value {
            Some(v) => {
                data.insert(key.to_string(), v.to_string());
            }
            None => {
                data.remove(key);
            }
        }
        Ok(())
    }

    fn write_many(&self, entries: Vec<(String, String)>) -> HiveResult<()> {
        // One write lock for the whole batch
        let mut data = self.data.write();
        for (key, value) in entries {
            data.insert(key, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_delete() {
        let store = MemoryStore::new();
        store.write("k", Some("v")).unwrap();
        assert_eq!(store.read("k"), Some("v".to_string()));

        store.write("k", None).unwrap();
        assert_eq!(store.read("k"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_write_many_batch_visible() {
        let store = MemoryStore::new();
        store
            .write_many(vec![
                ("a/0".to_string(), "x".to_string()),
                ("a/1".to_string(), "y".to_string()),
            ])
            .unwrap();

        assert_eq!(store.read("a/0"), Some("x".to_string()));
        assert_eq!(store.read("a/1"), Some("y".to_string()));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_prefix_count() {
        let store = MemoryStore::new();
        store.write("db/a/0", Some("1")).unwrap();
        store.write("db/a/1", Some("2")).unwrap();
        store.write("db/b/0", Some("3")).unwrap();

        assert_eq!(store.key_count_with_prefix("db/a/"), 2);
        assert_eq!(store.key_count_with_prefix("db/"), 3);
        assert_eq!(store.key_count_with_prefix("other"), 0);
    }
}
