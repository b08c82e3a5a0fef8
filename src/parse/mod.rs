//! Bit-precise reading model
//!
//! This module, along with its submodules, provides the decoding side of the
//! engine: the [`BitReader`] that every codec reads through, the error
//! hierarchy of the read path, and (in [`scan`]) the multi-message
//! [`MessageParser`](scan::MessageParser) that drives template selection and
//! resynchronization over a buffer.
//!
//! # Model
//!
//!  * A `BitReader` is constructed over an immutable byte-buffer.
//!  * Reading is sequential, with the head measured in bits. Bits within a
//!    byte are consumed from the most significant end.
//!  * A read that would run past the end of the buffer fails with
//!    [`BufferError::Underflow`](error::BufferError::Underflow) and leaves the
//!    head where it was.
//!  * *Fallback points* are a stack of saved head positions. A failed message
//!    decode restores the innermost one; a successful one releases it.

pub mod error;
pub mod scan;

use num_bigint::{BigInt, BigUint};

pub use error::{ParseError, ParseResult};
use error::{DataIntegrityError, InternalError};

use crate::charset::Charset;
use crate::int::{self, ByteOrder};
use crate::internal::{BitCursor, BitIndex, FallbackStack};

/// Sequential bit-addressable reader over a borrowed byte slice
///
/// Each decode call owns its reader; readers are cheap to construct and are
/// never shared between calls.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    buf: &'a [u8],
    cursor: BitCursor,
    fallback: FallbackStack<BitIndex>,
}

impl<'a> BitReader<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            cursor: BitCursor::with_limit(buf.len() * 8),
            fallback: FallbackStack::new(),
        }
    }

    /// Current position of the read head, in bits
    #[inline]
    #[must_use]
    pub fn position(&self) -> BitIndex {
        self.cursor.index()
    }

    /// Index of the byte currently under the read head
    #[inline]
    #[must_use]
    pub fn byte_position(&self) -> usize {
        self.cursor.index().byte()
    }

    #[inline]
    #[must_use]
    pub fn remaining_bits(&self) -> usize {
        self.cursor.rem()
    }

    /// Number of whole bytes left to read
    #[inline]
    #[must_use]
    pub fn remaining_bytes(&self) -> usize {
        self.cursor.rem() / 8
    }

    #[inline]
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.cursor.rem() > 0
    }

    /// The full underlying buffer, independent of the head position
    #[must_use]
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Moves the read head to an absolute bit position.
    pub fn seek(&mut self, ix: BitIndex) -> ParseResult<()> {
        self.cursor.seek(ix)
    }

    /// Saves the current head position so that it can be restored after a
    /// failed attempt.
    pub fn create_fallback_point(&mut self) {
        self.fallback.push(self.cursor.index());
    }

    /// Rewinds the head to the most recently saved fallback point, removing it.
    pub fn restore_fallback_point(&mut self) -> ParseResult<()> {
        let ix = self.fallback.pop()?;
        self.cursor.seek(ix)
    }

    /// Discards the most recently saved fallback point without moving.
    pub fn release_fallback_point(&mut self) -> ParseResult<()> {
        self.fallback.pop().map(|_| ())
    }

    /// Reads `n` bits starting at absolute bit `start`, most significant first.
    ///
    /// The caller is responsible for bounds-checking; `n` is at most 64.
    fn gather(&self, start: usize, n: usize) -> u64 {
        let mut acc: u64 = 0;
        let mut pos = start;
        let mut left = n;
        while left > 0 {
            let bit = pos & 7;
            let take = usize::min(8 - bit, left);
            let byte = self.buf[pos >> 3] as u64;
            let chunk = (byte >> (8 - bit - take)) & int::mask(take);
            acc = (acc << take) | chunk;
            pos += take;
            left -= take;
        }
        acc
    }

    /// Consumes `n <= 64` bits as a big-endian unsigned quantity.
    fn take_raw(&mut self, n: usize) -> ParseResult<u64> {
        if n > 64 {
            return Err(InternalError::WidthOverflow { bits: n }.into());
        }
        let start = self.cursor.advance(n)?;
        Ok(self.gather(start.to_usize(), n))
    }

    /// Reads an `n`-bit unsigned integer (`n <= 64`) in the given byte order.
    ///
    /// # Errors
    ///
    /// Fails with a buffer underflow if fewer than `n` bits remain, in which
    /// case nothing is consumed.
    pub fn read_unsigned(&mut self, n: usize, order: ByteOrder) -> ParseResult<u64> {
        match order {
            ByteOrder::BigEndian => self.take_raw(n),
            ByteOrder::LittleEndian => {
                if n > 64 {
                    return Err(InternalError::WidthOverflow { bits: n }.into());
                }
                let start = self.cursor.advance(n)?.to_usize();
                let mut acc = 0u64;
                let mut shift = 0;
                let mut pos = start;
                for width in int::le_groups(n) {
                    acc |= self.gather(pos, width) << shift;
                    shift += width;
                    pos += width;
                }
                Ok(acc)
            }
        }
    }

    /// Reads an `n`-bit two's-complement integer (`n <= 64`), sign-extended.
    pub fn read_signed(&mut self, n: usize, order: ByteOrder) -> ParseResult<i64> {
        self.read_unsigned(n, order).map(|raw| int::sign_extend(raw, n))
    }

    /// Reads an integer of arbitrary width, sign-extending at bit `n - 1`
    /// when `signed` is set.
    pub fn read_wide(&mut self, n: usize, order: ByteOrder, signed: bool) -> ParseResult<BigInt> {
        let start = self.cursor.advance(n)?.to_usize();
        let raw = match order {
            ByteOrder::LittleEndian => {
                let mut bytes = Vec::with_capacity(int::bytes_for_bits(n));
                let mut pos = start;
                for width in int::le_groups(n) {
                    bytes.push(self.gather(pos, width) as u8);
                    pos += width;
                }
                BigUint::from_bytes_le(&bytes)
            }
            ByteOrder::BigEndian => {
                let mut bytes = Vec::with_capacity(int::bytes_for_bits(n));
                let lead = n % 8;
                let mut pos = start;
                if lead > 0 {
                    bytes.push(self.gather(pos, lead) as u8);
                    pos += lead;
                }
                while pos < start + n {
                    bytes.push(self.gather(pos, 8) as u8);
                    pos += 8;
                }
                BigUint::from_bytes_be(&bytes)
            }
        };
        Ok(int::from_raw_wide(raw, n, signed))
    }

    /// Reads `n` raw bits in stream order.
    pub fn read_bits(&mut self, n: usize) -> ParseResult<Vec<bool>> {
        let start = self.cursor.advance(n)?.to_usize();
        Ok((start..start + n).map(|pos| self.gather(pos, 1) == 1).collect())
    }

    /// Reads `n` whole bytes, which need not be byte-aligned in the stream.
    ///
    /// # Errors
    ///
    /// Fails with a buffer underflow, consuming nothing, if fewer than `n`
    /// bytes remain. Counts too large to express in bits always underflow.
    pub fn read_bytes(&mut self, n: usize) -> ParseResult<Vec<u8>> {
        let start = self.cursor.advance(n.saturating_mul(8))?;
        if start.is_aligned() {
            let from = start.byte();
            Ok(self.buf[from..from + n].to_vec())
        } else {
            let start = start.to_usize();
            Ok((0..n).map(|k| self.gather(start + 8 * k, 8) as u8).collect())
        }
    }

    /// Reads `n` bytes and decodes them as text.
    pub fn read_text(&mut self, n: usize, charset: Charset) -> ParseResult<String> {
        let bytes = self.read_bytes(n)?;
        Ok(charset.decode(&bytes)?)
    }

    /// Returns the `k`-th whole byte ahead of the head without consuming it.
    #[must_use]
    pub fn peek_byte_at(&self, k: usize) -> Option<u8> {
        let start = self.cursor.index().to_usize() + 8 * k;
        if start + 8 <= self.cursor.limit() {
            Some(self.gather(start, 8) as u8)
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub fn peek_byte(&self) -> Option<u8> {
        self.peek_byte_at(0)
    }

    /// Tests whether `pattern` occurs at the head, treating bytes equal to
    /// `wildcard` as matching anything.
    #[must_use]
    pub fn matches_at(&self, pattern: &[u8], wildcard: Option<u8>) -> bool {
        pattern.iter().enumerate().all(|(k, &p)| match self.peek_byte_at(k) {
            Some(b) => Some(p) == wildcard || b == p,
            None => false,
        })
    }

    /// Number of whole bytes between the head and the first `terminator`.
    fn distance_to(&self, terminator: u8) -> ParseResult<usize> {
        let mut k = 0;
        loop {
            match self.peek_byte_at(k) {
                Some(b) if b == terminator => break Ok(k),
                Some(_) => k += 1,
                None => {
                    break Err(DataIntegrityError::MissingTerminator {
                        expected: vec![terminator],
                    }
                    .into())
                }
            }
        }
    }

    /// Reads text up to the first occurrence of `terminator`, consuming the
    /// terminator only when `consume` is set.
    ///
    /// # Errors
    ///
    /// If the terminator does not occur before the end of the buffer, fails
    /// with [`DataIntegrityError::MissingTerminator`] and consumes nothing.
    pub fn read_text_until(
        &mut self,
        terminator: u8,
        consume: bool,
        charset: Charset,
    ) -> ParseResult<String> {
        let len = self.distance_to(terminator)?;
        let text = self.read_text(len, charset)?;
        if consume {
            self.skip_bits(8)?;
        }
        Ok(text)
    }

    pub fn skip_bits(&mut self, n: usize) -> ParseResult<()> {
        self.cursor.advance(n).map(|_| ())
    }

    /// Advances to the next byte boundary, unless already on one.
    pub fn align(&mut self) -> ParseResult<()> {
        match self.cursor.index().bit() {
            0 => Ok(()),
            bit => self.skip_bits(8 - bit),
        }
    }

    /// Advances to the first occurrence of `terminator`, and past it if
    /// `consume` is set.
    pub fn skip_until(&mut self, terminator: u8, consume: bool) -> ParseResult<()> {
        let len = self.distance_to(terminator)?;
        self.skip_bits(8 * (len + usize::from(consume)))
    }
}
