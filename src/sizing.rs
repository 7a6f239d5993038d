//! Size and capacity arithmetic.
//!
//! Pure functions translating between requested capacities and buffer
//! lengths. All sizes produced here bind successfully with
//! [`crate::CuckooFilter::new`].

use crate::bucket::{bucket_bytes, SLOTS_PER_BUCKET};
use crate::fingerprint::Fingerprint;
use crate::{FilterError, Result};

/// Occupancy above which insert failures become likely; `size_for` leaves
/// this much headroom and `is_too_full` warns past it.
pub const TARGET_LOAD_FACTOR: f64 = 0.95;

/// Smallest buffer length able to hold `min_capacity` fingerprints at the
/// target load factor.
///
/// The bucket count is rounded up to a power of two, so the returned length
/// often exceeds the minimum considerably; `capacity(size_for(c)) >= c`
/// always holds.
pub fn size_for<F: Fingerprint>(min_capacity: usize) -> usize {
    let padded = ((min_capacity as f64) / TARGET_LOAD_FACTOR).ceil() as usize;
    size_for_exactly::<F>(padded)
}

/// Smallest buffer length that structurally holds `min_capacity` slots,
/// without load-factor headroom.
///
/// Filters operated this tight will start refusing inserts well before
/// every slot is filled; prefer [`size_for`] unless the bound matters more
/// than insert success.
pub fn size_for_exactly<F: Fingerprint>(min_capacity: usize) -> usize {
    let buckets = (min_capacity + SLOTS_PER_BUCKET - 1) / SLOTS_PER_BUCKET;
    buckets.max(1).next_power_of_two() * bucket_bytes::<F>()
}

/// Number of fingerprints a buffer of `size` bytes structurally holds.
///
/// Fails with `InvalidSize` when `size` is not a positive multiple of the
/// bucket byte width.
pub fn capacity<F: Fingerprint>(size: usize) -> Result<usize> {
    let bucket_width = bucket_bytes::<F>();
    if size == 0 || size % bucket_width != 0 {
        return Err(FilterError::InvalidSize(format!(
            "{} bytes is not a positive multiple of the {}-byte bucket width",
            size, bucket_width
        )));
    }
    Ok((size / bucket_width) * SLOTS_PER_BUCKET)
}
