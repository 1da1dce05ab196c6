//! Atomic swap writer — shadow-paged replacement of a chunk set
//!
//! The host store has no multi-key transactions, so replacing a chunked
//! entry naively could leave a reader with half of the old payload glued to
//! half of the new one. The swap writer stages the new payload in a shadow
//! location and flips authority with a single marker write:
//!
//! 1. clear any stale temp chunks at `{base}~tmp` (leftovers of an
//!    interrupted earlier swap)
//! 2. stage the new payload fully into `{base}~tmp/i`
//! 3. write the `USE_TMP` marker at `base`  ← the linearization point
//! 4. delete the superseded real chunk set at `{base}/i`
//! 5. copy each temp chunk to its real index
//! 6. delete the temp chunks and clear the marker
//!
//! CRITICAL ORDERING INVARIANT: observed at any checkpoint between host
//! writes, either the old payload or the new payload is fully recoverable.
//! Before step 3 the real set is untouched and the temp set is an orphan;
//! from step 3 onward a marker-aware reader resolves to the complete temp
//! set. Cleanup in steps 4 and 6 is best-effort per key — leftovers are
//! reclaimed by step 1 of the next swap on the same base.

use crate::chunk;
use crate::error::HiveResult;
use crate::store::PropertyStore;

/// Marker value naming the temp chunk set as authoritative.
pub const USE_TMP: &str = "USE_TMP";

/// Suffix of the shadow chunk location.
///
/// `~` cannot appear in chunk-index keys, so `{base}~tmp` never collides
/// with another entry's namespace.
pub const TMP_SUFFIX: &str = "~tmp";

/// Shadow location for `base`.
pub fn tmp_base(base: &str) -> String {
    format!("{}{}", base, TMP_SUFFIX)
}

/// Resolve which chunk set is authoritative for `base` right now.
///
/// A `USE_TMP` marker at `base` redirects readers to the shadow set; any
/// other state (absent marker, or real chunk data once an entry shrinks to
/// fit differently) means the real set rules.
pub fn authoritative_base(store: &dyn PropertyStore, base: &str) -> String {
    match store.read(base) {
        Some(marker) if marker == USE_TMP => tmp_base(base),
        _ => base.to_string(),
    }
}

/// Step 1: drop stale shadow chunks from an interrupted earlier swap.
pub(crate) fn clear_stale_temp(store: &dyn PropertyStore, base: &str) {
    chunk::delete_chunks(store, &tmp_base(base));
}

/// Step 2: stage the full payload into the shadow location.
///
/// Runs before the marker flip, so a failure here leaves the committed
/// value untouched and is safe to propagate.
pub(crate) fn stage_temp(
    store: &dyn PropertyStore,
    base: &str,
    payload: &str,
    chunk_size: usize,
) -> HiveResult<()> {
    let tmp = tmp_base(base);
    let staged: Vec<(String, String)> = chunk::split_payload(payload, chunk_size)
        .into_iter()
        .enumerate()
        .map(|(i, slice)| (chunk::chunk_key(&tmp, i), slice.to_string()))
        .collect();
    store.write_many(staged)
}

/// Step 3: flip authority to the shadow set. The linearization point.
pub(crate) fn set_marker(store: &dyn PropertyStore, base: &str) -> HiveResult<()> {
    store.write(base, Some(USE_TMP))
}

/// Steps 4–5: retire the old real set, then copy shadow chunks into place.
///
/// The marker stays up throughout, so readers keep resolving to the
/// complete shadow set while real indices are in flux.
pub(crate) fn promote(store: &dyn PropertyStore, base: &str) -> HiveResult<()> {
    let old_count = chunk::chunk_count(store, base);
    let old_keys: Vec<String> = (0..old_count).map(|i| chunk::chunk_key(base, i)).collect();
    chunk::delete_keys(store, &old_keys);

    let tmp = tmp_base(base);
    let mut copies = Vec::new();
    let mut index = 0usize;
    while let Some(slice) = store.read(&chunk::chunk_key(&tmp, index)) {
        copies.push((chunk::chunk_key(base, index), slice));
        index += 1;
    }
    store.write_many(copies)
}

/// Step 6: reclaim the shadow set and clear the marker.
///
/// Deletions are one key at a time (no batch delete on the host) and
/// best-effort; the real set is already complete, so nothing here can
/// lose data.
pub(crate) fn finish(store: &dyn PropertyStore, base: &str) {
    let tmp = tmp_base(base);
    let tmp_count = chunk::chunk_count(store, &tmp);
    let mut keys: Vec<String> = (0..tmp_count).map(|i| chunk::chunk_key(&tmp, i)).collect();
    keys.push(base.to_string());
    keys.push(tmp);
    chunk::delete_keys(store, &keys);
}

/// Replace the chunk set at `base` with `payload`, atomically with respect
/// to marker-aware readers. Caller holds the entry lock.
pub fn commit(
    store: &dyn PropertyStore,
    base: &str,
    payload: &str,
    chunk_size: usize,
) -> HiveResult<()> {
    clear_stale_temp(store, base);
    stage_temp(store, base, payload, chunk_size)?;
    set_marker(store, base)?;
    promote(store, base)?;
    finish(store, base);
    Ok(())
}
