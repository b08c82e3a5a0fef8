//! Karp-Rabin rolling-hash search
//!
//! Hashes are polynomials in base 256 reduced modulo a 31-bit prime, so all
//! intermediate products fit in a `u64`. Every hash hit is verified by a
//! direct comparison.

use super::PatternMatcher;

const BASE: u64 = 256;
const MODULUS: u64 = 2_147_483_647;

/// Preprocessed Karp-Rabin pattern
#[derive(Clone, Debug)]
pub struct KarpRabin {
    pattern: Vec<u8>,
    hash: u64,
    /// `BASE^(len - 1) mod MODULUS`, the weight of the byte leaving the window
    lead: u64,
}

fn hash(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0, |h, &b| (h * BASE + b as u64) % MODULUS)
}

impl KarpRabin {
    #[must_use]
    pub fn new(pattern: &[u8]) -> Self {
        let lead = (1..pattern.len()).fold(1, |acc, _| acc * BASE % MODULUS);
        Self {
            pattern: pattern.to_vec(),
            hash: hash(pattern),
            lead,
        }
    }
}

impl PatternMatcher for KarpRabin {
    fn pattern_len(&self) -> usize {
        self.pattern.len()
    }

    fn find(&self, source: &[u8], offset: usize) -> Option<usize> {
        let m = self.pattern.len();
        if offset > source.len() || m > source.len() - offset {
            return None;
        }
        let mut h = hash(&source[offset..offset + m]);
        let mut at = offset;
        loop {
            if h == self.hash && source[at..at + m] == self.pattern[..] {
                return Some(at);
            }
            if at + m >= source.len() {
                return None;
            }
            let out = source[at] as u64 * self.lead % MODULUS;
            h = ((h + MODULUS - out) * BASE + source[at + m] as u64) % MODULUS;
            at += 1;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn finds_long_patterns() {
        let pattern: Vec<u8> = (0u8..40).collect();
        let mut source = vec![0xaau8; 17];
        source.extend_from_slice(&pattern);
        source.extend_from_slice(&pattern);
        let kr = KarpRabin::new(&pattern);
        assert_eq!(kr.find(&source, 0), Some(17));
        assert_eq!(kr.find(&source, 18), Some(57));
        assert_eq!(kr.find(&source, 58), None);
    }

    #[test]
    fn empty_pattern_matches_at_offset() {
        let kr = KarpRabin::new(b"");
        assert_eq!(kr.find(b"abc", 1), Some(1));
        assert_eq!(kr.find(b"abc", 3), Some(3));
    }
}
