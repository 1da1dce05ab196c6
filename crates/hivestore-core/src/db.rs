//! Database façade — the public surface of HiveStore
//!
//! A `Database` binds one named entry namespace over the shared host store:
//! entry writes run through the atomic swap writer under a per-base advisory
//! lock, the pointer index tracks which entries exist, and reads resolve the
//! authoritative chunk set through the swap marker.
//!
//! **Read path**: lock-free but validated. `get` and `entries` never take
//! the entry lock; instead each read is stamped against the lock table's
//! write generation and retried if a writer committed a swap while the
//! reader was joining chunks. A validated read always returns a complete
//! old or complete new payload — never a torn mix — and a reader may
//! observe a value that a concurrent write is about to supersede.
//!
//! **Write path**: `set`/`delete` lock the base key; `clear`/`clean` lock
//! the database name. Locks are advisory and scoped to this process.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::chunk;
use crate::config::Config;
use crate::error::{HiveError, HiveResult};
use crate::index::PointerIndex;
use crate::lock::LockTable;
use crate::store::PropertyStore;
use crate::swap;

/// One named database over the shared host property store.
///
/// Entries are JSON records addressed by a user key; the host-level base
/// key is `"{name}/{key}"`. Construction is idempotent per name — reopening
/// keeps the existing pointer list.
pub struct Database {
    name: String,
    store: Arc<dyn PropertyStore>,
    locks: Arc<LockTable>,
    pointers: PointerIndex,
    config: Config,
}

impl Database {
    /// Open the database `name` over `store`.
    ///
    /// The name scopes every host key this database touches, so it must be
    /// non-empty and free of `"` and `/`. The pointer property is created
    /// empty on first open and left untouched on reopen.
    pub fn open(
        name: &str,
        store: Arc<dyn PropertyStore>,
        locks: Arc<LockTable>,
        config: Config,
    ) -> HiveResult<Self> {
        if name.is_empty() {
            return Err(HiveError::InvalidName {
                name: name.to_string(),
                reason: "name cannot be empty".to_string(),
            });
        }
        if name.contains('"') || name.contains('/') {
            return Err(HiveError::InvalidName {
                name: name.to_string(),
                reason: "name cannot contain `\"` or `/`".to_string(),
            });
        }

        let pointers = PointerIndex::new(name);
        pointers.ensure_initialized(store.as_ref())?;

        Ok(Self {
            name: name.to_string(),
            store,
            locks,
            pointers,
            config,
        })
    }

    /// Database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn base_key(&self, key: &str) -> String {
        format!("{}/{}", self.name, key)
    }

    fn acquire(&self, resource: &str) -> HiveResult<crate::lock::LockGuard<'_>> {
        self.locks
            .acquire(resource, self.config.lock_timeout, self.config.lock_poll_interval)
    }

    /// Store `value` under `key`, fully replacing any previous record.
    ///
    /// Serializes to JSON, then swaps the chunk set atomically under the
    /// entry lock. Repeating with an identical value is idempotent: the
    /// chunk count stabilizes and nothing grows. The pointer index is
    /// updated after the entry lock is released.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> HiveResult<()> {
        let base = self.base_key(key);
        let payload = serde_json::to_string(value).map_err(|err| HiveError::Serialize {
            base: base.clone(),
            reason: err.to_string(),
        })?;

        {
            let _guard = self.acquire(&base)?;
            swap::commit(self.store.as_ref(), &base, &payload, self.config.chunk_size)?;
        }

        self.pointers.insert(self.store.as_ref(), &base)?;
        Ok(())
    }

    /// Fetch the record stored under `key`, or `None` if absent.
    ///
    /// Never acquires the entry lock. The marker plus the chunk reads span
    /// several host accesses, so the read is validated against the lock
    /// table's write generation for this base: if a writer committed a swap
    /// mid-read, the joined payload could mix two checkpoints and is
    /// discarded and re-read. While a writer holds the entry lock the
    /// reader waits one tick and retries. A payload that fails to
    /// deserialize is treated as absent and logged, never surfaced as an
    /// error.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let base = self.base_key(key);
        loop {
            let stamp = match self.locks.begin_read(&base) {
                Some(stamp) => stamp,
                None => {
                    // Swap in flight on this entry; re-check next tick
                    std::thread::sleep(self.config.lock_poll_interval);
                    continue;
                }
            };

            let authority = swap::authoritative_base(self.store.as_ref(), &base);
            let payload = chunk::read_joined(self.store.as_ref(), &authority);

            if !self.locks.validate_read(&stamp) {
                continue;
            }

            let payload = payload?;
            return match serde_json::from_str(&payload) {
                Ok(value) => Some(value),
                Err(err) => {
                    let parse = HiveError::Parse {
                        base,
                        reason: err.to_string(),
                    };
                    warn!(error = %parse, "treating stored entry as absent");
                    None
                }
            };
        }
    }

    /// Delete the entry under `key`, including any shadow-set leftovers.
    /// A key that never existed is a no-op, not an error.
    pub fn delete(&self, key: &str) -> HiveResult<()> {
        let base = self.base_key(key);
        let _guard = self.acquire(&base)?;

        chunk::delete_chunks(self.store.as_ref(), &base);
        chunk::delete_chunks(self.store.as_ref(), &swap::tmp_base(&base));
        self.pointers.remove(self.store.as_ref(), &base)?;
        Ok(())
    }

    /// Delete every entry tracked by the pointer index and empty the index.
    ///
    /// Holds the database-name lock for the sweep; each entry is also
    /// deleted under its own base lock so validated readers of that entry
    /// see the deletion as a write, not a silent truncation.
    pub fn clear(&self) -> HiveResult<()> {
        let _guard = self.acquire(&self.name)?;

        for pointer in self.pointers.list(self.store.as_ref()) {
            let _entry = self.acquire(&pointer)?;
            chunk::delete_chunks(self.store.as_ref(), &pointer);
            chunk::delete_chunks(self.store.as_ref(), &swap::tmp_base(&pointer));
        }
        self.pointers.replace(self.store.as_ref(), Vec::new())?;
        Ok(())
    }

    /// All stored key-value pairs as a point-in-time snapshot.
    ///
    /// Lock-free and possibly stale; each entry is read through `get`'s
    /// validated read, so every returned value is self-consistent even if
    /// the snapshot as a whole spans concurrent writes. Pointers whose
    /// decode fails or returns absent are silently skipped.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.pointers
            .list(self.store.as_ref())
            .into_iter()
            .filter_map(|pointer| {
                let key = pointer.rsplit('/').next().unwrap_or_default().to_string();
                let value: Option<Value> = self.get(&key);
                value.map(|v| (key, v))
            })
            .collect()
    }

    /// Sweep out entries rejected by the default validator: JSON null,
    /// blank strings, empty arrays and empty objects. Returns the number
    /// of entries deleted.
    pub fn clean(&self) -> HiveResult<usize> {
        self.clean_with(|_, value| default_entry_valid(value))
    }

    /// Sweep out entries rejected by `validator`.
    ///
    /// Holds the database-name lock for the sweep, but each deletion is
    /// independently locked on its base key — the sweep as a whole is not
    /// atomic with respect to readers.
    pub fn clean_with<F>(&self, validator: F) -> HiveResult<usize>
    where
        F: Fn(&str, &Value) -> bool,
    {
        let _guard = self.acquire(&self.name)?;

        let mut deleted = 0usize;
        for (key, value) in self.entries() {
            if !validator(&key, &value) {
                self.delete(&key)?;
                warn!(database = %self.name, key = %key, "deleted invalid entry");
                deleted += 1;
            }
        }

        info!(database = %self.name, deleted, "cleanup complete");
        Ok(deleted)
    }

    /// Whether `key` is tracked by the pointer index.
    pub fn contains_key(&self, key: &str) -> bool {
        let base = self.base_key(key);
        self.pointers
            .list(self.store.as_ref())
            .iter()
            .any(|p| p == &base)
    }

    /// All base keys currently tracked by the pointer index.
    pub fn list_pointers(&self) -> Vec<String> {
        self.pointers.list(self.store.as_ref())
    }

    /// Drop the pointer cache; the next read re-syncs from the host.
    pub fn invalidate_pointers(&self) {
        self.pointers.invalidate();
    }

    /// Stored size of one entry in bytes, summed over its real chunk set.
    /// Counts UTF-16 code units at two bytes each, matching how the host
    /// accounts for scalar property storage.
    pub fn entry_size_bytes(&self, key: &str) -> usize {
        let base = self.base_key(key);
        let mut bytes = 0usize;
        let mut index = 0usize;
        while let Some(slice) = self.store.read(&chunk::chunk_key(&base, index)) {
            bytes += slice.encode_utf16().count() * 2;
            index += 1;
        }
        bytes
    }

    /// Number of real chunks stored for `key`.
    pub fn chunk_count(&self, key: &str) -> usize {
        chunk::chunk_count(self.store.as_ref(), &self.base_key(key))
    }

    /// Total stored size across all tracked entries, human-readable.
    pub fn total_size_formatted(&self) -> String {
        let total: usize = self
            .pointers
            .list(self.store.as_ref())
            .iter()
            .map(|pointer| {
                let key = pointer.rsplit('/').next().unwrap_or_default();
                self.entry_size_bytes(key)
            })
            .sum();
        format_bytes(total as u64)
    }
}

/// Default entry validity check used by `clean`.
///
/// Non-finite numbers cannot appear in a decoded JSON payload, so only
/// structural emptiness needs checking here.
fn default_entry_valid(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        _ => true,
    }
}

/// Render a byte count with two decimals in the largest fitting unit.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exponent = (((bytes as f64).ln() / 1024f64.ln()).floor() as usize).min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    format!("{:.2} {}", value, UNITS[exponent])
}
