//! Chunk codec — pagination of serialized payloads over the host store
//!
//! A serialized entry larger than one host property allows is split into
//! ordered slices stored at `{base}/0`, `{base}/1`, … Each slice holds at
//! most `Config::chunk_size` bytes. Chunk indices are contiguous from 0;
//! the first absent index terminates the set and defines its length.
//!
//! Joining the slices in index order reconstructs the serialized payload
//! exactly. An empty chunk set is indistinguishable from an absent entry.

use tracing::warn;

use crate::store::PropertyStore;

/// Host property key for chunk `index` of `base`.
pub fn chunk_key(base: &str, index: usize) -> String {
    format!("{}/{}", base, index)
}

/// Split a payload into slices of at most `chunk_size` bytes.
///
/// Splits land on UTF-8 character boundaries, so a slice may fall up to
/// three bytes short of `chunk_size`. A character wider than `chunk_size`
/// is emitted whole rather than looping forever.
pub fn split_payload(payload: &str, chunk_size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = payload;
    while !rest.is_empty() {
        let mut end = chunk_size.min(rest.len());
        while end > 0 && !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = rest.chars().next().map_or(rest.len(), |c| c.len_utf8());
        }
        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

/// Read the contiguous chunk set at `base` and join it in index order.
///
/// Returns `None` for a zero-chunk set — absent and empty are equivalent.
pub fn read_joined(store: &dyn PropertyStore, base: &str) -> Option<String> {
    let mut joined = String::new();
    let mut count = 0usize;
    loop {
        match store.read(&chunk_key(base, count)) {
            Some(chunk) => {
                joined.push_str(&chunk);
                count += 1;
            }
            None => break,
        }
    }
    if count == 0 { None } else { Some(joined) }
}

/// Number of chunks currently stored at `base`.
pub fn chunk_count(store: &dyn PropertyStore, base: &str) -> usize {
    let mut count = 0usize;
    while store.read(&chunk_key(base, count)).is_some() {
        count += 1;
    }
    count
}

/// Delete the whole chunk set at `base`, plus the marker property at `base`
/// itself if present.
///
/// Best-effort: each per-key failure is logged and skipped — leftovers are
/// reclaimed by the next write to the same base key.
pub fn delete_chunks(store: &dyn PropertyStore, base: &str) {
    let mut index = 0usize;
    loop {
        let key = chunk_key(base, index);
        if store.read(&key).is_none() {
            break;
        }
        if let Err(err) = store.write(&key, None) {
            warn!(key = %key, error = %err, "failed to delete chunk");
        }
        index += 1;
    }
    if store.read(base).is_some() {
        if let Err(err) = store.write(base, None) {
            warn!(key = %base, error = %err, "failed to delete marker");
        }
    }
}

/// Delete an explicit list of host keys, one by one.
///
/// The host has no batch-delete primitive, so deletions cannot ride
/// `write_many`. Per-key failures are logged and do not abort the rest.
pub fn delete_keys(store: &dyn PropertyStore, keys: &[String]) {
    for key in keys {
        if let Err(err) = store.write(key, None) {
            warn!(key = %key, error = %err, "failed to delete host property");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HiveError, HiveResult};
    use crate::store::MemoryStore;

    const CHUNK_SIZE: usize = 30_000;

    #[test]
    fn test_split_exact_boundaries() {
        // 2 full chunks plus a 5000-byte tail
        let payload = "a".repeat(2 * CHUNK_SIZE + 5000);
        let chunks = split_payload(&payload, CHUNK_SIZE);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), CHUNK_SIZE);
        assert_eq!(chunks[1].len(), CHUNK_SIZE);
        assert_eq!(chunks[2].len(), 5000);
        assert_eq!(chunks.concat(), payload);
    }

    #[test]
    fn test_split_respects_char_boundaries() {
        // 'é' is 2 bytes; an odd chunk size forces a short slice
        let payload = "é".repeat(10);
        let chunks = split_payload(&payload, 5);

        for chunk in &chunks {
            assert!(chunk.len() <= 5);
        }
        assert_eq!(chunks.concat(), payload);
    }

    #[test]
    fn test_split_oversized_char_emitted_whole() {
        let payload = "\u{1F600}"; // 4 bytes
        let chunks = split_payload(payload, 1);
        assert_eq!(chunks, vec![payload]);
    }

    #[test]
    fn test_split_empty_is_empty() {
        assert!(split_payload("", CHUNK_SIZE).is_empty());
    }

    #[test]
    fn test_read_joined_roundtrip() {
        let store = MemoryStore::new();
        store.write("db/k/0", Some("hello ")).unwrap();
        store.write("db/k/1", Some("world")).unwrap();

        assert_eq!(read_joined(&store, "db/k"), Some("hello world".to_string()));
        assert_eq!(chunk_count(&store, "db/k"), 2);
    }

    #[test]
    fn test_read_joined_absent() {
        let store = MemoryStore::new();
        assert_eq!(read_joined(&store, "db/missing"), None);
        assert_eq!(chunk_count(&store, "db/missing"), 0);
    }

    #[test]
    fn test_read_joined_stops_at_gap() {
        let store = MemoryStore::new();
        store.write("db/k/0", Some("a")).unwrap();
        // index 1 missing terminates the set; index 2 is orphaned
        store.write("db/k/2", Some("b")).unwrap();

        assert_eq!(read_joined(&store, "db/k"), Some("a".to_string()));
        assert_eq!(chunk_count(&store, "db/k"), 1);
    }

    #[test]
    fn test_delete_chunks_removes_set_and_marker() {
        let store = MemoryStore::new();
        store.write("db/k", Some("USE_TMP")).unwrap();
        store.write("db/k/0", Some("a")).unwrap();
        store.write("db/k/1", Some("b")).unwrap();

        delete_chunks(&store, "db/k");

        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_chunks_absent_writes_nothing() {
        let store = MemoryStore::new();
        delete_chunks(&store, "db/never");
        assert!(store.is_empty());
    }

    /// Store whose deletions fail for one poisoned key.
    struct FailingStore {
        inner: MemoryStore,
        poisoned: String,
    }

    impl PropertyStore for FailingStore {
        fn read(&self, key: &str) -> Option<String> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: Option<&str>) -> HiveResult<()> {
            if value.is_none() && key == self.poisoned {
                return Err(HiveError::HostWrite {
                    key: key.to_string(),
                    reason: "injected failure".to_string(),
                });
            }
            self.inner.write(key, value)
        }
    }

    #[test]
    fn test_delete_keys_continues_past_failure() {
        let store = FailingStore {
            inner: MemoryStore::new(),
            poisoned: "db/k/1".to_string(),
        };
        store.inner.write("db/k/0", Some("a")).unwrap();
        store.inner.write("db/k/1", Some("b")).unwrap();
        store.inner.write("db/k/2", Some("c")).unwrap();

        delete_keys(
            &store,
            &["db/k/0".to_string(), "db/k/1".to_string(), "db/k/2".to_string()],
        );

        // Poisoned key survives, the rest are gone
        assert_eq!(store.read("db/k/0"), None);
        assert_eq!(store.read("db/k/1"), Some("b".to_string()));
        assert_eq!(store.read("db/k/2"), None);
    }
}
