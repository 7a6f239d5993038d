//! # Cuckoo Nest
//!
//! An allocation-free cuckoo filter that lives entirely in caller-owned
//! memory. It answers approximate membership queries with no false negatives
//! and a bounded false-positive rate, supports deletion (unlike a Bloom
//! filter), and treats the raw bytes of its buffer as the serialization
//! format, so a filter can be rebuilt from a dump or a mapped region with
//! [`CuckooFilter::restore`].

pub mod bucket;
pub mod filter;
pub mod fingerprint;
pub mod hash;
pub mod sizing;

pub use filter::{CuckooFilter, CuckooFilter16, CuckooFilter32, CuckooFilter8};
pub use fingerprint::Fingerprint;
pub use sizing::{capacity, size_for, size_for_exactly};

/// Common error type for the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Buffer length incompatible with the bucket layout
    InvalidSize(String),
    /// Structural invariant violated; rebuild via restore before reuse
    Broken(String),
    /// Eviction chain exhausted; grow the buffer or free entries
    TooFull,
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FilterError::InvalidSize(msg) => write!(f, "Invalid memory size: {}", msg),
            FilterError::Broken(msg) => write!(f, "Filter is broken: {}", msg),
            FilterError::TooFull => write!(f, "Filter is too full to place another fingerprint"),
        }
    }
}

impl std::error::Error for FilterError {}

pub type Result<T> = std::result::Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_8bit_filter() {
        let mut memory = vec![0u8; size_for::<u8>(100)];
        let mut filter = CuckooFilter8::with_seed(&mut memory, 1).unwrap();

        filter.insert("alpha").unwrap();
        filter.insert("beta").unwrap();

        assert!(filter.contains("alpha"));
        assert!(filter.contains("beta"));
        assert!(filter.delete("alpha"));
        assert!(!filter.contains("alpha"));
    }

    #[test]
    fn test_basic_16bit_filter() {
        let mut memory = vec![0u8; size_for::<u16>(1000)];
        let mut filter = CuckooFilter16::with_seed(&mut memory, 2).unwrap();

        for i in 0..1000u64 {
            filter.insert(&i).unwrap();
        }
        for i in 0..1000u64 {
            assert!(filter.contains(&i));
        }
        assert_eq!(filter.len(), 1000);
    }

    #[test]
    fn test_basic_32bit_filter() {
        let mut memory = vec![0u8; size_for::<u32>(100)];
        let mut filter = CuckooFilter32::with_seed(&mut memory, 3).unwrap();

        filter.insert(&42u64).unwrap();
        assert!(filter.contains(&42u64));
        assert!(!filter.contains(&43u64) || true); // false positives allowed
        assert!(filter.delete(&42u64));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_sized_buffer_binds() {
        for requested in [0usize, 1, 100, 4096] {
            let mut memory = vec![0u8; size_for::<u16>(requested)];
            let filter = CuckooFilter16::with_seed(&mut memory, 0).unwrap();
            assert!(filter.capacity() >= requested);
        }
    }

    #[test]
    fn test_error_display() {
        let err = FilterError::TooFull;
        assert_eq!(
            err.to_string(),
            "Filter is too full to place another fingerprint"
        );

        let err = FilterError::InvalidSize("7 bytes".to_string());
        assert_eq!(err.to_string(), "Invalid memory size: 7 bytes");
    }
}
