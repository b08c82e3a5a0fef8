//! Substring search for resynchronization
//!
//! After a message fails to decode, the parser looks for the next position
//! at which any known header start pattern occurs. Two interchangeable
//! algorithms are provided behind [`PatternMatcher`]:
//!
//!  * [`Bndm`], a bit-parallel backward scan supporting a wildcard byte,
//!    limited to patterns of at most [`Bndm::MAX_PATTERN`] bytes;
//!  * [`KarpRabin`], a rolling-hash scan for patterns of any length.
//!
//! [`naive_find`] is the brute-force reference both agree with.

pub mod bndm;
pub mod karp_rabin;

pub use bndm::Bndm;
pub use karp_rabin::KarpRabin;

use crate::error::PatternTooLongError;

/// Search for a preprocessed pattern in arbitrary byte sources
pub trait PatternMatcher {
    /// Length of the pattern in bytes
    fn pattern_len(&self) -> usize;

    /// Returns the first index `>= offset` at which the pattern occurs in
    /// `source`, if any.
    fn find(&self, source: &[u8], offset: usize) -> Option<usize>;
}

/// Brute-force reference search, treating `wildcard` bytes in the pattern as
/// matching anything
#[must_use]
pub fn naive_find(source: &[u8], pattern: &[u8], wildcard: Option<u8>, offset: usize) -> Option<usize> {
    if offset > source.len() || pattern.len() > source.len() - offset {
        return None;
    }
    (offset..=source.len() - pattern.len()).find(|&at| {
        pattern
            .iter()
            .zip(&source[at..])
            .all(|(&p, &s)| p == s || Some(p) == wildcard)
    })
}

/// Matcher chosen for a header pattern according to its length
#[derive(Clone, Debug)]
pub enum HeaderMatcher {
    Bndm(Bndm),
    KarpRabin(KarpRabin),
}

impl HeaderMatcher {
    /// Uses BNDM where the pattern fits, Karp-Rabin otherwise.
    ///
    /// # Errors
    ///
    /// Karp-Rabin has no wildcard support, so a pattern longer than
    /// [`Bndm::MAX_PATTERN`] that contains the wildcard byte is rejected.
    pub fn new(pattern: &[u8], wildcard: Option<u8>) -> Result<Self, PatternTooLongError> {
        if pattern.len() <= Bndm::MAX_PATTERN {
            Bndm::new(pattern, wildcard).map(HeaderMatcher::Bndm)
        } else if wildcard.map_or(false, |w| pattern.contains(&w)) {
            Err(PatternTooLongError {
                length: pattern.len(),
                limit: Bndm::MAX_PATTERN,
            })
        } else {
            Ok(HeaderMatcher::KarpRabin(KarpRabin::new(pattern)))
        }
    }
}

impl PatternMatcher for HeaderMatcher {
    fn pattern_len(&self) -> usize {
        match self {
            HeaderMatcher::Bndm(m) => m.pattern_len(),
            HeaderMatcher::KarpRabin(m) => m.pattern_len(),
        }
    }

    fn find(&self, source: &[u8], offset: usize) -> Option<usize> {
        match self {
            HeaderMatcher::Bndm(m) => m.find(source, offset),
            HeaderMatcher::KarpRabin(m) => m.find(source, offset),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    const WILDCARD: u8 = b'?';

    #[test]
    fn naive_edges() {
        assert_eq!(naive_find(b"abc", b"", None, 3), Some(3));
        assert_eq!(naive_find(b"abc", b"", None, 4), None);
        assert_eq!(naive_find(b"abcabc", b"bc", None, 2), Some(4));
        assert_eq!(naive_find(b"ab", b"abc", None, 0), None);
        assert_eq!(naive_find(b"xaqc", b"a?c", Some(WILDCARD), 0), Some(1));
    }

    #[test]
    fn header_matcher_selection() {
        let long = vec![0x55u8; 40];
        assert!(matches!(HeaderMatcher::new(&long, None), Ok(HeaderMatcher::KarpRabin(_))));
        assert!(matches!(HeaderMatcher::new(&long, Some(0x55)), Err(_)));
        assert!(matches!(HeaderMatcher::new(&long, Some(0x00)), Ok(HeaderMatcher::KarpRabin(_))));
        assert!(matches!(HeaderMatcher::new(b"\x7e", None), Ok(HeaderMatcher::Bndm(_))));
    }

    fn small_alphabet(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<u8>> {
        // a tiny alphabet makes matches (and near-misses) common
        proptest::collection::vec(prop_oneof![Just(b'a'), Just(b'b'), Just(b'c'), Just(WILDCARD)], len)
    }

    proptest! {
        #[test]
        fn bndm_agrees_with_reference(pattern in small_alphabet(1..32), source in small_alphabet(0..200), offset in 0usize..210) {
            let m = Bndm::new(&pattern, Some(WILDCARD)).unwrap();
            prop_assert_eq!(m.find(&source, offset), naive_find(&source, &pattern, Some(WILDCARD), offset));
        }

        #[test]
        fn karp_rabin_agrees_with_reference(pattern in proptest::collection::vec(0u8..4, 1..48), source in proptest::collection::vec(0u8..4, 0..300), offset in 0usize..310) {
            let kr = KarpRabin::new(&pattern);
            let expected = naive_find(&source, &pattern, None, offset);
            prop_assert_eq!(kr.find(&source, offset), expected);
            if pattern.len() <= Bndm::MAX_PATTERN {
                prop_assert_eq!(Bndm::new(&pattern, None).unwrap().find(&source, offset), expected);
            }
        }
    }
}
