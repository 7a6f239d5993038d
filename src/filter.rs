//! Cuckoo filter engine over caller-owned memory.
//!
//! The filter handle borrows a byte buffer supplied by the caller and never
//! allocates; all fingerprint storage lives in that buffer, so the raw bytes
//! are also the serialization format. Each fingerprint has two candidate
//! buckets; inserts displace residents along a bounded eviction chain when
//! both candidates are full.

use std::hash::Hash;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bucket::{BucketTable, SLOTS_PER_BUCKET};
use crate::fingerprint::Fingerprint;
use crate::hash;
use crate::sizing::TARGET_LOAD_FACTOR;
use crate::{FilterError, Result};

/// Eviction chain length before an insert gives up.
const MAX_KICKS: usize = 500;

/// A fingerprint displaced by an exhausted eviction chain, parked in the
/// handle so it stays visible to lookups and removes.
#[derive(Debug, Clone, Copy)]
struct Victim<F> {
    bucket: usize,
    fingerprint: F,
}

/// A cuckoo filter bound to a caller-owned byte buffer.
///
/// `F` fixes the fingerprint width (`u8`, `u16` or `u32`) at compile time;
/// `R` is the randomness source driving eviction choices, injected at
/// construction so behavior under a fixed seed is reproducible.
///
/// The handle holds `&mut` on the buffer for its whole lifetime, which also
/// makes the single-threaded access contract a compile-time guarantee.
pub struct CuckooFilter<'buf, F: Fingerprint, R: Rng = StdRng> {
    table: BucketTable<'buf, F>,
    count: usize,
    victim: Option<Victim<F>>,
    rng: R,
}

/// Filter over 8-bit fingerprints.
pub type CuckooFilter8<'buf, R = StdRng> = CuckooFilter<'buf, u8, R>;
/// Filter over 16-bit fingerprints.
pub type CuckooFilter16<'buf, R = StdRng> = CuckooFilter<'buf, u16, R>;
/// Filter over 32-bit fingerprints.
pub type CuckooFilter32<'buf, R = StdRng> = CuckooFilter<'buf, u32, R>;

impl<'buf, F: Fingerprint> CuckooFilter<'buf, F, StdRng> {
    /// Bind a fresh filter to zeroed memory, seeding the eviction RNG
    /// deterministically.
    pub fn with_seed(memory: &'buf mut [u8], seed: u64) -> Result<Self> {
        Self::new(memory, StdRng::seed_from_u64(seed))
    }

    /// Bind a fresh filter to zeroed memory with an OS-seeded RNG.
    pub fn from_entropy(memory: &'buf mut [u8]) -> Result<Self> {
        Self::new(memory, StdRng::from_entropy())
    }

    /// Re-attach to previously-populated bytes, seeding deterministically.
    /// See [`CuckooFilter::restore`].
    pub fn restore_with_seed(memory: &'buf mut [u8], seed: u64) -> Result<Self> {
        Self::restore(memory, StdRng::seed_from_u64(seed))
    }
}

impl<'buf, F: Fingerprint, R: Rng> CuckooFilter<'buf, F, R> {
    /// Bind a fresh filter to `memory` with an injected randomness source.
    ///
    /// The buffer length must be a positive multiple of the bucket byte
    /// width and yield a power-of-two bucket count; `sizing::size_for`
    /// produces suitable lengths. The memory is NOT zeroed here: zero bytes
    /// are the empty-slot sentinel, so callers must supply zeroed memory
    /// for a fresh filter (use [`CuckooFilter::restore`] for bytes that
    /// already hold a filter).
    pub fn new(memory: &'buf mut [u8], rng: R) -> Result<Self> {
        let table = BucketTable::bind(memory)?;
        Ok(CuckooFilter {
            table,
            count: 0,
            victim: None,
            rng,
        })
    }

    /// Re-attach a filter to bytes sourced externally (e.g. read back from
    /// a file or a mapped region), recomputing the element count by
    /// scanning occupied slots.
    pub fn restore(memory: &'buf mut [u8], rng: R) -> Result<Self> {
        let table = BucketTable::bind(memory)?;
        let count = table.occupied_slots();
        Ok(CuckooFilter {
            table,
            count,
            victim: None,
            rng,
        })
    }

    /// Re-bind this handle to `memory`, replacing the current buffer.
    ///
    /// The element count is recomputed from the bytes and any pending
    /// victim is discarded. Fails with `InvalidSize` when the length is
    /// incompatible with the bucket layout; the current binding is left
    /// untouched in that case.
    pub fn restore_memory(&mut self, memory: &'buf mut [u8]) -> Result<()> {
        let table = BucketTable::bind(memory)?;
        self.count = table.occupied_slots();
        self.table = table;
        self.victim = None;
        Ok(())
    }

    /// Add a fingerprint under the given item hash.
    ///
    /// Callers supply both values so the engine never sees items; derive
    /// the fingerprint from an independent part of the hash (or use the
    /// item-level [`CuckooFilter::insert`]). A zero fingerprint is coerced
    /// to 1.
    ///
    /// Fails with `TooFull` when the eviction chain exhausts its kick
    /// budget. The relocations already performed are kept and the displaced
    /// fingerprint is parked in the handle, so every previously added
    /// fingerprint (and the new one) remains visible to
    /// [`CuckooFilter::maybe_contains`]; `len` counts the parked
    /// fingerprint too. Until the overload is resolved by
    /// [`CuckooFilter::fix_too_full`] or a remove, further adds fail fast.
    pub fn add(&mut self, item_hash: u64, fingerprint: F) -> Result<()> {
        if self.victim.is_some() {
            return Err(FilterError::TooFull);
        }
        if self.count > self.capacity() {
            return Err(FilterError::Broken(format!(
                "element count {} exceeds the {}-slot capacity",
                self.count,
                self.capacity()
            )));
        }

        let fp = fingerprint.coerce_nonzero();
        let (i1, i2) = self.candidate_buckets(item_hash, fp);
        if self.table.try_insert(i1, fp) || self.table.try_insert(i2, fp) {
            self.count += 1;
            return Ok(());
        }

        // Both candidates full: displace residents along a bounded chain.
        let mut bucket = if self.rng.gen::<bool>() { i1 } else { i2 };
        let mut carried = fp;
        for _ in 0..MAX_KICKS {
            let slot = self.rng.gen_range(0..SLOTS_PER_BUCKET);
            let evicted = self.table.slot(bucket, slot);
            self.table.set_slot(bucket, slot, carried);
            carried = evicted;
            bucket = self.alt_bucket(bucket, carried);
            if self.table.try_insert(bucket, carried) {
                self.count += 1;
                return Ok(());
            }
        }

        // Kick budget exhausted. The incoming fingerprint already lives in
        // a bucket; the one left carrying parks here, still queryable.
        self.victim = Some(Victim {
            bucket,
            fingerprint: carried,
        });
        self.count += 1;
        Err(FilterError::TooFull)
    }

    /// True if the fingerprint may have been added under this hash.
    ///
    /// No false negatives: every fingerprint added and not since removed is
    /// found. False positives occur when another item collides on both the
    /// fingerprint and a candidate bucket.
    pub fn maybe_contains(&self, item_hash: u64, fingerprint: F) -> bool {
        let fp = fingerprint.coerce_nonzero();
        let (i1, i2) = self.candidate_buckets(item_hash, fp);
        if self.table.contains(i1, fp) || self.table.contains(i2, fp) {
            return true;
        }
        match self.victim {
            Some(v) => v.fingerprint == fp && (v.bucket == i1 || v.bucket == i2),
            None => false,
        }
    }

    /// Remove one occurrence of the fingerprint. Returns `false` when no
    /// occurrence exists; that is a normal negative, not an error.
    ///
    /// Removing a fingerprint that was never added but collides with a
    /// resident one removes the wrong logical item; only remove items that
    /// were added.
    pub fn remove(&mut self, item_hash: u64, fingerprint: F) -> bool {
        let fp = fingerprint.coerce_nonzero();
        let (i1, i2) = self.candidate_buckets(item_hash, fp);
        if self.table.remove(i1, fp) || self.table.remove(i2, fp) {
            self.count = self.count.saturating_sub(1);
            return true;
        }
        if let Some(v) = self.victim {
            if v.fingerprint == fp && (v.bucket == i1 || v.bucket == i2) {
                self.victim = None;
                self.count = self.count.saturating_sub(1);
                return true;
            }
        }
        false
    }

    /// Fingerprints currently in the table, including a pending victim.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Total fingerprint slots in the bound buffer.
    pub fn capacity(&self) -> usize {
        self.table.slot_count()
    }

    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// The raw backing bytes. Persist these and hand them to
    /// [`CuckooFilter::restore`] to rebuild an equivalent filter.
    pub fn memory(&self) -> &[u8] {
        self.table.as_bytes()
    }

    /// Structural self-check: true when the cached element count no longer
    /// matches a fresh scan of the buffer. A broken filter must not be used
    /// for adds or removes until rebuilt via [`CuckooFilter::restore`].
    ///
    /// This never repairs anything; it is intended as an on-demand check
    /// after re-attaching foreign bytes, not as a per-operation cost.
    pub fn is_broken(&self) -> bool {
        let scanned = self.table.occupied_slots() + usize::from(self.victim.is_some());
        scanned != self.count
    }

    /// True when occupancy passed the safe-insert threshold or an overload
    /// already parked a victim; adds are increasingly likely to fail.
    pub fn is_too_full(&self) -> bool {
        self.victim.is_some()
            || (self.count as f64) > TARGET_LOAD_FACTOR * (self.capacity() as f64)
    }

    /// Try to re-home a pending victim with fresh eviction passes, leaving
    /// the element count and buffer untouched.
    ///
    /// `Ok` clears the overload so adds work again. `Err(TooFull)` means no
    /// slot could be freed up; the victim stays parked and the table stays
    /// consistent. A no-op `Ok` when nothing is pending.
    pub fn fix_too_full(&mut self) -> Result<()> {
        let victim = match self.victim.take() {
            Some(v) => v,
            None => return Ok(()),
        };

        let mut bucket = victim.bucket;
        let mut carried = victim.fingerprint;
        if self.table.try_insert(bucket, carried)
            || self.table.try_insert(self.alt_bucket(bucket, carried), carried)
        {
            return Ok(());
        }
        for _ in 0..MAX_KICKS {
            let slot = self.rng.gen_range(0..SLOTS_PER_BUCKET);
            let evicted = self.table.slot(bucket, slot);
            self.table.set_slot(bucket, slot, carried);
            carried = evicted;
            bucket = self.alt_bucket(bucket, carried);
            if self.table.try_insert(bucket, carried) {
                return Ok(());
            }
        }

        self.victim = Some(Victim {
            bucket,
            fingerprint: carried,
        });
        Err(FilterError::TooFull)
    }

    /// Add an item, hashing it with FNV and deriving the fingerprint from
    /// the hash's upper bits.
    pub fn insert<T: Hash + ?Sized>(&mut self, item: &T) -> Result<()> {
        let item_hash = hash::item_hash(item);
        self.add(item_hash, F::from_hash(item_hash))
    }

    /// Item-level [`CuckooFilter::maybe_contains`].
    pub fn contains<T: Hash + ?Sized>(&self, item: &T) -> bool {
        let item_hash = hash::item_hash(item);
        self.maybe_contains(item_hash, F::from_hash(item_hash))
    }

    /// Item-level [`CuckooFilter::remove`].
    pub fn delete<T: Hash + ?Sized>(&mut self, item: &T) -> bool {
        let item_hash = hash::item_hash(item);
        self.remove(item_hash, F::from_hash(item_hash))
    }

    fn candidate_buckets(&self, item_hash: u64, fp: F) -> (usize, usize) {
        let i1 = (item_hash as usize) & self.index_mask();
        (i1, self.alt_bucket(i1, fp))
    }

    /// The other candidate bucket for `fp`. XOR with a masked spread of the
    /// fingerprint, so the mapping is its own inverse.
    fn alt_bucket(&self, bucket: usize, fp: F) -> usize {
        bucket ^ (hash::mix(fp.to_u64()) as usize & self.index_mask())
    }

    fn index_mask(&self) -> usize {
        self.table.bucket_count() - 1
    }
}
