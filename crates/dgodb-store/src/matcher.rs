//! Content identity strategies
//!
//! Deciding whether a newly seen object is a duplicate of a stored variant
//! is delegated to a [`ContentMatcher`]. The default compares length and
//! CRC-32 only; [`ExactMatcher`] also compares the bytes, at the cost of a
//! full scan per candidate.

use std::fmt;

use crate::record::ObjectRecord;

/// Decides whether new content is the same as a stored variant
pub trait ContentMatcher: Send + Sync + fmt::Debug {
    /// Fingerprint stored in [`ObjectRecord::hash`]
    fn fingerprint(&self, data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }

    /// True if `data` (with fingerprint `hash`) is the stored variant
    fn matches(&self, stored: &ObjectRecord, stored_data: &[u8], hash: u32, data: &[u8]) -> bool;
}

/// Length plus CRC-32 comparison
///
/// Two different blobs of equal length and equal CRC are treated as one
/// object. This is not verified.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintMatcher;

impl ContentMatcher for FingerprintMatcher {
    fn matches(&self, stored: &ObjectRecord, stored_data: &[u8], hash: u32, data: &[u8]) -> bool {
        stored_data.len() == data.len() && stored.hash == hash
    }
}

/// Length, CRC-32 and full byte comparison
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExactMatcher;

impl ContentMatcher for ExactMatcher {
    fn matches(&self, stored: &ObjectRecord, stored_data: &[u8], hash: u32, data: &[u8]) -> bool {
        stored_data.len() == data.len() && stored.hash == hash && stored_data == data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Fingerprint that collides for every input
    #[derive(Debug)]
    struct ConstantFingerprint<M>(M);

    impl<M: ContentMatcher> ContentMatcher for ConstantFingerprint<M> {
        fn fingerprint(&self, _data: &[u8]) -> u32 {
            7
        }

        fn matches(&self, stored: &ObjectRecord, stored_data: &[u8], hash: u32, data: &[u8]) -> bool {
            self.0.matches(stored, stored_data, hash, data)
        }
    }

    fn record(hash: u32) -> ObjectRecord {
        ObjectRecord {
            name: Arc::from("obj"),
            version: 0,
            hash,
        }
    }

    #[test]
    fn test_fingerprint_is_crc32() {
        assert_eq!(FingerprintMatcher.fingerprint(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_fingerprint_matcher() {
        let a = b"abcd";
        let hash = FingerprintMatcher.fingerprint(a);
        assert!(FingerprintMatcher.matches(&record(hash), a, hash, a));
        assert!(!FingerprintMatcher.matches(&record(hash), a, hash, b"abcde"));
        assert!(!FingerprintMatcher.matches(&record(hash), a, hash ^ 1, a));
    }

    #[test]
    fn test_collision_handling() {
        // Same length, forced equal fingerprints, different bytes
        let loose = ConstantFingerprint(FingerprintMatcher);
        let strict = ConstantFingerprint(ExactMatcher);
        let stored = record(7);

        assert!(loose.matches(&stored, b"aaaa", loose.fingerprint(b"bbbb"), b"bbbb"));
        assert!(!strict.matches(&stored, b"aaaa", strict.fingerprint(b"bbbb"), b"bbbb"));
        assert!(strict.matches(&stored, b"aaaa", 7, b"aaaa"));
    }
}
