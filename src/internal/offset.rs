//! Bit-granular offsets and checkpoint stacks for the bit reader and writer
//!
//! This module contains the stateful components shared by
//! [`BitReader`](crate::parse::BitReader) and
//! [`BitWriter`](crate::builder::BitWriter): a monotonic bit index with
//! an invariant absolute limit, and a stack of saved positions used to
//! implement fallback points.

use std::fmt::Debug;

use crate::parse::error::{BufferError, InternalError, ParseResult};

/// Wrapper around [`usize`] that represents an index into a buffer,
/// measured in bits rather than bytes.
///
/// The byte containing the indexed bit is `ix / 8`, and the bit within that
/// byte is counted from the most significant end.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[repr(transparent)]
pub struct BitIndex(usize);

impl BitIndex {
    /// Constructs a new `BitIndex` initialized to `0`
    #[inline(always)]
    #[must_use]
    pub const fn new() -> Self {
        Self(0usize)
    }

    /// Advances the held value by `n` bits unless this would cause it to
    /// exceed `lim`.
    ///
    /// Returns the original value (before incrementation), along with a boolean
    /// value that is `true` if and only if the increment occurred.
    #[inline]
    pub fn increment_checked(&mut self, n: usize, lim: usize) -> (usize, bool) {
        let ret = self.0;
        let is_valid = self.0.checked_add(n).map_or(false, |sum| sum <= lim);
        if is_valid {
            self.0 += n;
        }
        (ret, is_valid)
    }

    /// Unwraps the bit count stored within a `BitIndex`.
    #[must_use]
    #[inline(always)]
    pub const fn to_usize(self) -> usize {
        self.0
    }

    /// Index of the byte containing the bit this index points at.
    #[must_use]
    #[inline(always)]
    pub const fn byte(self) -> usize {
        self.0 >> 3
    }

    /// Offset of the indexed bit within its byte, counted from the MSB.
    #[must_use]
    #[inline(always)]
    pub const fn bit(self) -> usize {
        self.0 & 7
    }

    /// Returns `true` if the index falls on a byte boundary.
    #[must_use]
    #[inline(always)]
    pub const fn is_aligned(self) -> bool {
        self.0 & 7 == 0
    }
}

impl From<usize> for BitIndex {
    #[inline]
    fn from(ix: usize) -> Self {
        Self(ix)
    }
}

impl From<BitIndex> for usize {
    #[inline]
    fn from(ix: BitIndex) -> Self {
        ix.0
    }
}

impl std::fmt::Display for BitIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_aligned() {
            write!(f, "byte {}", self.byte())
        } else {
            write!(f, "byte {} bit {}", self.byte(), self.bit())
        }
    }
}

/// Tracker of a bit index bounded above by an absolute limit.
///
/// The limit is fixed at construction time; the index may reach it but never
/// exceed it.
#[derive(Debug, Clone)]
pub struct BitCursor {
    abs: usize,
    cur: BitIndex,
}

impl BitCursor {
    /// Creates a cursor at bit `0` that can advance up to `abs` bits.
    #[must_use]
    pub const fn with_limit(abs: usize) -> Self {
        Self {
            abs,
            cur: BitIndex::new(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn index(&self) -> BitIndex {
        self.cur
    }

    #[inline(always)]
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.abs
    }

    /// Number of bits between the current index and the limit.
    #[inline]
    #[must_use]
    pub fn rem(&self) -> usize {
        debug_assert!(self.abs >= self.cur.to_usize(), "BitCursor: limit < index");
        self.abs - self.cur.to_usize()
    }

    /// Advances the cursor by `n` bits, returning the index prior to the
    /// increment.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Underflow`] without moving the cursor when fewer
    /// than `n` bits remain.
    pub fn advance(&mut self, n: usize) -> ParseResult<BitIndex> {
        match self.cur.increment_checked(n, self.abs) {
            (old, true) => Ok(BitIndex(old)),
            (old, false) => Err(BufferError::Underflow {
                position: old,
                requested: n,
                available: self.abs - old,
            }
            .into()),
        }
    }

    /// Moves the cursor to an arbitrary index within the limit.
    pub fn seek(&mut self, ix: BitIndex) -> ParseResult<()> {
        if ix.to_usize() > self.abs {
            return Err(BufferError::SeekOutOfRange {
                target: ix.to_usize(),
                limit: self.abs,
            }
            .into());
        }
        self.cur = ix;
        Ok(())
    }
}

/// Stack of saved states, used to implement nested fallback points.
///
/// Each push corresponds to one `create_fallback_point` call, and must be
/// matched by exactly one `restore` or `release`.
#[derive(Debug, Clone, Default)]
#[repr(transparent)]
pub struct FallbackStack<T>(Vec<T>);

impl<T: Copy + Debug> FallbackStack<T> {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, state: T) {
        self.0.push(state)
    }

    /// Pops the most recent saved state.
    ///
    /// # Errors
    ///
    /// Fails with [`InternalError::NoFallbackPoint`] if nothing was saved.
    pub fn pop(&mut self) -> ParseResult<T> {
        self.0
            .pop()
            .ok_or_else(|| InternalError::NoFallbackPoint.into())
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse::error::ParseError;

    #[test]
    fn cursor_advance_and_underflow() {
        let mut c = BitCursor::with_limit(12);
        assert_eq!(c.advance(5).unwrap(), BitIndex::from(0));
        assert_eq!(c.index().byte(), 0);
        assert_eq!(c.index().bit(), 5);
        assert_eq!(c.advance(7).unwrap().to_usize(), 5);
        assert_eq!(c.rem(), 0);
        match c.advance(1) {
            Err(ParseError::Buffer(BufferError::Underflow {
                position,
                requested,
                available,
            })) => {
                assert_eq!((position, requested, available), (12, 1, 0));
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(c.index().to_usize(), 12);
    }

    #[test]
    fn fallback_stack_is_lifo() {
        let mut s: FallbackStack<usize> = FallbackStack::new();
        s.push(3);
        s.push(9);
        assert_eq!(s.depth(), 2);
        assert_eq!(s.pop().unwrap(), 9);
        assert_eq!(s.pop().unwrap(), 3);
        assert!(s.pop().is_err());
    }
}
