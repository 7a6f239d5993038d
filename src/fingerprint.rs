//! Fingerprint encoding for the three supported widths.
//!
//! A fingerprint is a short unsigned value standing in for an item; the
//! all-zero bit pattern is reserved as the empty-slot sentinel and is never
//! stored as a real fingerprint.

use std::fmt::Debug;

/// Trait for fingerprint widths storable in a bucket table.
///
/// Implemented for `u8`, `u16` and `u32`. The filter is monomorphized per
/// width, so slot packing is fixed at compile time.
pub trait Fingerprint: Copy + Eq + Debug {
    /// Fingerprint width in bits.
    const BITS: u32;

    /// Bytes occupied by one slot.
    const BYTES: usize;

    /// The empty-slot sentinel (all zero bits).
    const EMPTY: Self;

    /// Derive a fingerprint from the upper bits of a 64-bit item hash.
    /// Never returns the sentinel.
    fn from_hash(hash: u64) -> Self;

    /// Map the reserved zero value to the smallest valid fingerprint.
    fn coerce_nonzero(self) -> Self;

    /// Read one slot from storage (little-endian).
    fn load(slot: &[u8]) -> Self;

    /// Write this fingerprint into one slot (little-endian).
    fn store(self, slot: &mut [u8]);

    fn is_sentinel(self) -> bool {
        self == Self::EMPTY
    }

    fn to_u64(self) -> u64;
}

macro_rules! fingerprint_impl {
    ($ty:ty) => {
        impl Fingerprint for $ty {
            const BITS: u32 = <$ty>::BITS;
            const BYTES: usize = std::mem::size_of::<$ty>();
            const EMPTY: Self = 0;

            fn from_hash(hash: u64) -> Self {
                ((hash >> (64 - Self::BITS)) as $ty).coerce_nonzero()
            }

            fn coerce_nonzero(self) -> Self {
                if self == 0 {
                    1
                } else {
                    self
                }
            }

            fn load(slot: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(slot);
                <$ty>::from_le_bytes(raw)
            }

            fn store(self, slot: &mut [u8]) {
                slot.copy_from_slice(&self.to_le_bytes());
            }

            fn to_u64(self) -> u64 {
                u64::from(self)
            }
        }
    };
}

fingerprint_impl!(u8);
fingerprint_impl!(u16);
fingerprint_impl!(u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hash_takes_upper_bits() {
        assert_eq!(u8::from_hash(0xab00_0000_0000_0000), 0xab);
        assert_eq!(u16::from_hash(0xabcd_0000_0000_0000), 0xabcd);
        assert_eq!(u32::from_hash(0xabcd_ef01_0000_0000), 0xabcd_ef01);
    }

    #[test]
    fn test_from_hash_never_returns_sentinel() {
        assert_eq!(u8::from_hash(0), 1);
        assert_eq!(u16::from_hash(0), 1);
        assert_eq!(u32::from_hash(0), 1);
        // Low bits alone must not rescue a zero upper part
        assert_eq!(u8::from_hash(0x00ff_ffff_ffff_ffff), 1);
    }

    #[test]
    fn test_coerce_nonzero() {
        assert_eq!(0u16.coerce_nonzero(), 1);
        assert_eq!(7u16.coerce_nonzero(), 7);
        assert_eq!(u32::MAX.coerce_nonzero(), u32::MAX);
    }

    #[test]
    fn test_slot_round_trip() {
        let mut buf = [0u8; 4];
        0xdead_beefu32.store(&mut buf);
        assert_eq!(u32::load(&buf), 0xdead_beef);

        let mut buf = [0u8; 2];
        0x1234u16.store(&mut buf);
        assert_eq!(buf, 0x1234u16.to_le_bytes());
        assert_eq!(u16::load(&buf), 0x1234);
    }

    #[test]
    fn test_sentinel() {
        assert!(u8::EMPTY.is_sentinel());
        assert!(!1u8.is_sentinel());
        assert_eq!(u16::EMPTY, 0);
    }
}
