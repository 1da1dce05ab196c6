//! Process-level context: shared host store, lock table, registry
//!
//! The original ran on module-level statics — one lock set and one
//! instance list for the whole process. `Hive` makes that context explicit
//! and test-injectable: it owns the host store handle, the advisory lock
//! table every database shares, and a diagnostic registry of opened
//! database names. Databases opened from different `Hive` values share
//! nothing, which is exactly what isolated tests want.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::db::Database;
use crate::error::HiveResult;
use crate::lock::LockTable;
use crate::store::{MemoryStore, PropertyStore};

/// Shared context for a family of databases over one host store.
pub struct Hive {
    store: Arc<dyn PropertyStore>,
    locks: Arc<LockTable>,
    config: Config,
    /// Names of databases opened through this context. Enumeration and
    /// diagnostics only — dropping a Database does not unregister it.
    databases: Mutex<Vec<String>>,
}

impl Hive {
    /// Create a context over the given host store.
    pub fn new(store: Arc<dyn PropertyStore>, config: Config) -> Self {
        Self {
            store,
            locks: Arc::new(LockTable::new()),
            config,
            databases: Mutex::new(Vec::new()),
        }
    }

    /// Context over a fresh in-process store with default configuration.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Config::default())
    }

    /// Open (or reopen) the database `name` and register it.
    pub fn open(&self, name: &str) -> HiveResult<Database> {
        let db = Database::open(
            name,
            Arc::clone(&self.store),
            Arc::clone(&self.locks),
            self.config.clone(),
        )?;

        let mut names = self.databases.lock();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        Ok(db)
    }

    /// Names of all databases opened through this context.
    pub fn databases(&self) -> Vec<String> {
        let names = self.databases.lock();
        names.clone()
    }

    /// The shared host store.
    pub fn store(&self) -> &Arc<dyn PropertyStore> {
        &self.store
    }

    /// The shared advisory lock table.
    pub fn locks(&self) -> &Arc<LockTable> {
        &self.locks
    }

    /// Context configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
