//! HiveStore Core — Chunked, Crash-Tolerant KV Store
//!
//! A key-value database built on a host-provided flat property store that
//! only accepts size-limited scalar values and offers no transactions.
//!
//! # Architecture
//!
//! - **Chunk codec**: oversized JSON payloads paginate into ordered,
//!   bounded slices at `{base}/0`, `{base}/1`, …
//! - **Atomic swap**: a new chunk set is staged in a shadow location and
//!   made authoritative by one marker write, so an interruption at any
//!   point leaves a complete old or new value — never a torn mix
//! - **Advisory locks**: write-class operations serialize per resource
//!   via cooperative tick-bounded waiting; reads never block
//! - **Pointer index**: a cached, persisted list of live entries drives
//!   enumeration and cleanup
//!
//! # Host Neutrality
//!
//! The host boundary is the `PropertyStore` trait. `MemoryStore` is the
//! bundled in-process implementation; adapters for real hosts live in
//! separate crates.

pub mod chunk;
pub mod config;
pub mod db;
pub mod error;
pub mod hive;
pub mod index;
pub mod lock;
pub mod store;
pub mod swap;

// Re-export key types for convenience
pub use config::Config;
pub use db::{format_bytes, Database};
pub use error::{HiveError, HiveResult};
pub use hive::Hive;
pub use index::PointerIndex;
pub use lock::{LockGuard, LockTable};
pub use store::{MemoryStore, PropertyStore};
pub use swap::{TMP_SUFFIX, USE_TMP};
