//! Backward Nondeterministic DAWG Matching
//!
//! A bit-parallel simulation of the suffix automaton of the reversed
//! pattern. One bit of a `u32` state word is kept per pattern position, so
//! patterns are limited to 31 bytes; the top bit of the word is never used,
//! which keeps the left shift from overflowing.

use super::PatternMatcher;
use crate::error::PatternTooLongError;

/// Preprocessed BNDM pattern
#[derive(Clone, Debug)]
pub struct Bndm {
    masks: Box<[u32; 256]>,
    len: usize,
}

impl Bndm {
    /// Longest pattern supported, in bytes
    pub const MAX_PATTERN: usize = 31;

    /// Builds the per-byte position masks for `pattern`.
    ///
    /// Pattern bytes equal to `wildcard` match any source byte: their
    /// position bit is set in the mask of every byte value.
    pub fn new(pattern: &[u8], wildcard: Option<u8>) -> Result<Self, PatternTooLongError> {
        let len = pattern.len();
        if len > Self::MAX_PATTERN {
            return Err(PatternTooLongError {
                length: len,
                limit: Self::MAX_PATTERN,
            });
        }
        let mut masks = Box::new([0u32; 256]);
        let mut any = 0u32;
        for (i, &p) in pattern.iter().enumerate() {
            let bit = 1u32 << (len - 1 - i);
            if Some(p) == wildcard {
                any |= bit;
            } else {
                masks[p as usize] |= bit;
            }
        }
        if any != 0 {
            for m in masks.iter_mut() {
                *m |= any;
            }
        }
        Ok(Self { masks, len })
    }
}

impl PatternMatcher for Bndm {
    fn pattern_len(&self) -> usize {
        self.len
    }

    fn find(&self, source: &[u8], offset: usize) -> Option<usize> {
        let m = self.len;
        if offset > source.len() {
            return None;
        }
        if m == 0 {
            return Some(offset);
        }
        let full = (1u32 << m) - 1;
        let high = 1u32 << (m - 1);
        let mut pos = offset;
        while pos + m <= source.len() {
            let mut j = m;
            let mut last = m;
            let mut d = full;
            while d != 0 {
                d &= self.masks[source[pos + j - 1] as usize];
                j -= 1;
                if d & high != 0 {
                    if j > 0 {
                        // a pattern prefix ends here; remember it as the next window start
                        last = j;
                    } else {
                        return Some(pos);
                    }
                }
                d = (d << 1) & full;
            }
            pos += last;
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn finds_first_occurrence() {
        let m = Bndm::new(b"abab", None).unwrap();
        assert_eq!(m.find(b"xxababab", 0), Some(2));
        assert_eq!(m.find(b"xxababab", 3), Some(4));
        assert_eq!(m.find(b"xxababab", 5), None);
        assert_eq!(m.find(b"aba", 0), None);
    }

    #[test]
    fn wildcard_positions() {
        let m = Bndm::new(&[0x7e, 0xff, 0x01], Some(0xff)).unwrap();
        assert_eq!(m.find(&[0x00, 0x7e, 0x42, 0x01], 0), Some(1));
        assert_eq!(m.find(&[0x7e, 0x42, 0x02, 0x7e, 0x00, 0x01], 0), Some(3));
    }

    #[test]
    fn length_limit() {
        assert!(Bndm::new(&[0u8; 31], None).is_ok());
        assert_eq!(
            Bndm::new(&[0u8; 32], None).unwrap_err(),
            PatternTooLongError {
                length: 32,
                limit: 31
            }
        );
    }
}
