//! Advisory lock table for write-class operations
//!
//! Mutating operations (`set`, `delete`, `clear`, `clean`) serialize per
//! resource name: a base key for entry writes, a database name for whole-
//! database sweeps. Reads never take a lock — see the façade for that
//! documented trade-off.
//!
//! The original host runs everything on one cooperative thread and lock
//! waiters suspend until the next scheduler tick before re-checking. On a
//! real multi-threaded runtime that maps to a condvar wait bounded by one
//! tick interval; the serialization guarantee is identical. Waiters give up
//! with `LockTimeout` once the cumulative wait passes the configured bound.
//!
//! Locks are advisory and process-local: nothing is persisted, and only
//! callers that acquire are excluded from each other.

use std::time::{Duration, Instant};

use hashbrown::{HashMap, HashSet};
use parking_lot::{Condvar, Mutex};

use crate::error::{HiveError, HiveResult};

struct TableState {
    /// Resource names currently held
    held: HashSet<String>,
    /// Write generation per resource, bumped on every acquisition
    generations: HashMap<String, u64>,
}

/// Process-wide set of held resource names.
///
/// Besides mutual exclusion, the table keeps a write generation per
/// resource so lock-free readers can validate that no writer acquired the
/// resource while they were reading (`begin_read`/`validate_read`).
pub struct LockTable {
    state: Mutex<TableState>,
    tick: Condvar,
}

/// Witness for one validated lock-free read.
pub struct ReadStamp {
    resource: String,
    generation: u64,
}

impl LockTable {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TableState {
                held: HashSet::new(),
                generations: HashMap::new(),
            }),
            tick: Condvar::new(),
        }
    }

    /// Acquire `resource`, suspending tick-by-tick while it is held.
    ///
    /// Returns a guard that releases on every exit path, including panics
    /// inside the guarded operation. Fails with `LockTimeout` once the
    /// cumulative wait exceeds `timeout`.
    pub fn acquire(
        &self,
        resource: &str,
        timeout: Duration,
        poll: Duration,
    ) -> HiveResult<LockGuard<'_>> {
        let start = Instant::now();
        let mut state = self.state.lock();
        while state.held.contains(resource) {
            if start.elapsed() >= timeout {
                return Err(HiveError::LockTimeout {
                    resource: resource.to_string(),
                    waited: start.elapsed(),
                });
            }
            // Wake on release, or at the next tick boundary to re-check
            let _ = self.tick.wait_for(&mut state, poll);
        }
        state.held.insert(resource.to_string());
        *state.generations.entry(resource.to_string()).or_insert(0) += 1;
        Ok(LockGuard {
            table: self,
            resource: resource.to_string(),
        })
    }

    /// Whether `resource` is currently held. Diagnostic only — the answer
    /// can be stale by the time the caller acts on it.
    pub fn is_held(&self, resource: &str) -> bool {
        let state = self.state.lock();
        state.held.contains(resource)
    }

    /// Begin a validated lock-free read of `resource`.
    ///
    /// Returns `None` while a writer holds the resource — the caller waits
    /// a tick and retries rather than reading mid-swap. The returned stamp
    /// records the resource's write generation at this instant.
    pub fn begin_read(&self, resource: &str) -> Option<ReadStamp> {
        let state = self.state.lock();
        if state.held.contains(resource) {
            return None;
        }
        Some(ReadStamp {
            resource: resource.to_string(),
            generation: state.generations.get(resource).copied().unwrap_or(0),
        })
    }

    /// True when no writer acquired the stamp's resource since
    /// `begin_read`. A false result means data read in between may mix
    /// checkpoints and must be discarded and re-read.
    pub fn validate_read(&self, stamp: &ReadStamp) -> bool {
        let state = self.state.lock();
        !state.held.contains(&stamp.resource)
            && state.generations.get(&stamp.resource).copied().unwrap_or(0) == stamp.generation
    }

    fn release(&self, resource: &str) {
        let mut state = self.state.lock();
        state.held.remove(resource);
        self.tick.notify_all();
    }
}

impl Default for LockTable {
    fn default() -> Self { Self::new() }
}

/// RAII guard for one held resource. Dropping releases and wakes waiters.
pub struct LockGuard<'a> {
    table: &'a LockTable,
    resource: String,
}

impl std::fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("resource", &self.resource)
            .finish()
    }
}

impl LockGuard<'_> {
    /// Name of the held resource.
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.resource);
    }
}
