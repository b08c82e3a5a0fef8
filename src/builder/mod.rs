//! Bit-precise writing model
//!
//! The encoding dual of [`crate::parse`]: [`BitWriter`] appends bit-fields to
//! a growable byte vector, and [`compose`] drives templates over a batch of
//! records to produce a single concatenated buffer.
//!
//! The writer never fails for lack of space. Bits are packed from the most
//! significant end of each byte; a trailing partial byte is kept zero-filled
//! in its unused low bits.

pub mod compose;

use num_bigint::BigUint;

use crate::charset::{Charset, CharsetError};
use crate::int::{self, ByteOrder};
use crate::internal::{BitIndex, FallbackStack};
use crate::parse::error::ParseResult;

/// Sequential bit-addressable writer over an owned, growable buffer
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    bits: usize,
    fallback: FallbackStack<usize>,
}

impl BitWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            bits: 0,
            fallback: FallbackStack::new(),
        }
    }

    /// Number of bits written so far
    #[inline]
    #[must_use]
    pub fn position(&self) -> BitIndex {
        BitIndex::from(self.bits)
    }

    /// Number of bytes in the buffer, counting a trailing partial byte
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Bytes written so far
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Finalizes the writer by destructing it
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Saves the current write state so that it can be rolled back.
    pub fn create_fallback_point(&mut self) {
        self.fallback.push(self.bits);
    }

    /// Discards everything written since the most recent fallback point.
    pub fn restore_fallback_point(&mut self) -> ParseResult<()> {
        let bits = self.fallback.pop()?;
        self.bits = bits;
        self.buf.truncate(int::bytes_for_bits(bits));
        let used = bits & 7;
        if used != 0 {
            if let Some(last) = self.buf.last_mut() {
                *last &= !(0xffu8 >> used);
            }
        }
        Ok(())
    }

    /// Drops the most recent fallback point, keeping what was written.
    pub fn release_fallback_point(&mut self) -> ParseResult<()> {
        self.fallback.pop().map(|_| ())
    }

    /// Stores the low `n <= 64` bits of `v`, most significant first, at
    /// absolute bit `pos`, which must not exceed the current length.
    fn scatter(&mut self, pos: usize, v: u64, n: usize) {
        let end = pos + n;
        let need = int::bytes_for_bits(end);
        if self.buf.len() < need {
            self.buf.resize(need, 0);
        }
        let mut pos = pos;
        let mut left = n;
        while left > 0 {
            let bit = pos & 7;
            let take = usize::min(8 - bit, left);
            let chunk = ((v >> (left - take)) & int::mask(take)) as u8;
            let shift = 8 - bit - take;
            let clear = (int::mask(take) as u8) << shift;
            let byte = &mut self.buf[pos >> 3];
            *byte = (*byte & !clear) | (chunk << shift);
            pos += take;
            left -= take;
        }
        if end > self.bits {
            self.bits = end;
        }
    }

    fn put(&mut self, pos: usize, v: u64, n: usize, order: ByteOrder) {
        match order {
            ByteOrder::BigEndian => self.scatter(pos, v, n),
            ByteOrder::LittleEndian => {
                let mut shift = 0;
                let mut at = pos;
                for width in int::le_groups(n) {
                    self.scatter(at, (v >> shift) & int::mask(width), width);
                    shift += width;
                    at += width;
                }
            }
        }
    }

    /// Appends the low `n` bits of `v` in the given byte order.
    ///
    /// Widths beyond 64 bits are zero-extended.
    pub fn write_unsigned(&mut self, v: u64, n: usize, order: ByteOrder) {
        if n > 64 {
            self.write_wide(&BigUint::from(v), n, order);
        } else {
            self.put(self.bits, v, n, order);
        }
    }

    /// Appends `v` as an `n`-bit two's-complement value (`n <= 64`).
    pub fn write_signed(&mut self, v: i64, n: usize, order: ByteOrder) {
        self.write_unsigned((v as u64) & int::mask(n), n, order)
    }

    /// Appends the low `n` bits of an arbitrary-width raw pattern.
    pub fn write_wide(&mut self, raw: &BigUint, n: usize, order: ByteOrder) {
        let width = int::bytes_for_bits(n);
        let mut le = raw.to_bytes_le();
        le.resize(width, 0);
        match order {
            ByteOrder::LittleEndian => {
                for (byte, bits) in le.iter().zip(int::le_groups(n)) {
                    self.scatter(self.bits, *byte as u64, bits);
                }
            }
            ByteOrder::BigEndian => {
                let lead = n % 8;
                let mut be = le;
                be.reverse();
                let mut rest = be.as_slice();
                if lead > 0 {
                    if let Some((first, tail)) = rest.split_first() {
                        self.scatter(self.bits, *first as u64 & int::mask(lead), lead);
                        rest = tail;
                    }
                }
                for byte in rest {
                    self.scatter(self.bits, *byte as u64, 8);
                }
            }
        }
    }

    /// Appends raw bits in stream order.
    pub fn write_bits(&mut self, bits: &[bool]) {
        for &b in bits {
            self.scatter(self.bits, u64::from(b), 1);
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.bits & 7 == 0 {
            self.buf.extend_from_slice(bytes);
            self.bits += bytes.len() * 8;
        } else {
            for &b in bytes {
                self.scatter(self.bits, b as u64, 8);
            }
        }
    }

    /// Encodes `text` in `charset` and appends it, returning the byte count.
    pub fn write_text(&mut self, text: &str, charset: Charset) -> Result<usize, CharsetError> {
        let bytes = charset.encode(text)?;
        self.write_bytes(&bytes);
        Ok(bytes.len())
    }

    /// Appends `n` zero bits.
    pub fn skip_bits(&mut self, n: usize) {
        let mut left = n;
        while left > 0 {
            let take = usize::min(left, 64);
            self.scatter(self.bits, 0, take);
            left -= take;
        }
    }

    /// Zero-fills up to the next byte boundary.
    pub fn align(&mut self) {
        let bit = self.bits % 8;
        if bit != 0 {
            self.skip_bits(8 - bit);
        }
    }

    /// Overwrites `n <= 64` previously written bits starting at `at`.
    ///
    /// Used to fill in values, such as checksums, that depend on bytes
    /// written after their own position.
    pub fn patch_unsigned(&mut self, at: BitIndex, v: u64, n: usize, order: ByteOrder) {
        debug_assert!(at.to_usize() + n <= self.bits, "patch beyond written data");
        self.put(at.to_usize(), v, n, order);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse::BitReader;
    use num_bigint::BigInt;
    use proptest::prelude::*;

    #[test]
    fn packs_msb_first() {
        let mut w = BitWriter::new();
        w.write_unsigned(0b101, 3, ByteOrder::BigEndian);
        w.write_unsigned(0b01100_01, 7, ByteOrder::BigEndian);
        w.write_signed(19, 6, ByteOrder::BigEndian);
        assert_eq!(w.finish(), vec![0b1010_1100, 0b0101_0011]);
    }

    #[test]
    fn little_endian_bytes() {
        let mut w = BitWriter::new();
        w.write_unsigned(0x1234, 16, ByteOrder::LittleEndian);
        w.write_unsigned(0x1234_5678, 32, ByteOrder::LittleEndian);
        assert_eq!(w.finish(), vec![0x34, 0x12, 0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn fallback_rolls_back_partial_byte() {
        let mut w = BitWriter::new();
        w.write_unsigned(0b1, 1, ByteOrder::BigEndian);
        w.create_fallback_point();
        w.write_unsigned(0x7f, 7, ByteOrder::BigEndian);
        w.write_bytes(&[0xaa, 0xbb]);
        w.restore_fallback_point().unwrap();
        assert_eq!(w.position().to_usize(), 1);
        w.write_unsigned(0, 7, ByteOrder::BigEndian);
        assert_eq!(w.finish(), vec![0x80]);
    }

    #[test]
    fn patch_overwrites_in_place() {
        let mut w = BitWriter::new();
        w.write_bytes(&[0x7e]);
        let at = w.position();
        w.write_unsigned(0, 16, ByteOrder::LittleEndian);
        w.write_bytes(&[0x0d]);
        w.patch_unsigned(at, 0xbeef, 16, ByteOrder::LittleEndian);
        assert_eq!(w.finish(), vec![0x7e, 0xef, 0xbe, 0x0d]);
    }

    fn order() -> impl Strategy<Value = ByteOrder> {
        prop_oneof![Just(ByteOrder::BigEndian), Just(ByteOrder::LittleEndian)]
    }

    proptest! {
        #[test]
        fn unsigned_fidelity(n in 1usize..=64, seed in any::<u64>(), lead in 0usize..8, order in order()) {
            let v = seed & int::mask(n);
            let mut w = BitWriter::new();
            w.skip_bits(lead);
            w.write_unsigned(v, n, order);
            let bytes = w.finish();
            let mut r = BitReader::new(&bytes);
            r.skip_bits(lead).unwrap();
            prop_assert_eq!(r.read_unsigned(n, order).unwrap(), v);
        }

        #[test]
        fn signed_fidelity_at_boundaries(n in 1usize..=64, pick in 0usize..4, order in order()) {
            let (min, max) = int::native_range(n, true);
            let v = [0i128, -1, min, max][pick];
            // a 1-bit signed field holds only 0 and -1
            let v = v.clamp(min, max) as i64;
            let mut w = BitWriter::new();
            w.write_signed(v, n, order);
            let bytes = w.finish();
            prop_assert_eq!(BitReader::new(&bytes).read_signed(n, order).unwrap(), v);
        }

        #[test]
        fn wide_fidelity(n in 65usize..=130, seed in any::<i64>(), order in order()) {
            let v = BigInt::from(seed) * 3;
            let raw = int::to_raw_wide(&v, n, true).unwrap();
            let mut w = BitWriter::new();
            w.write_wide(&raw, n, order);
            let bytes = w.finish();
            prop_assert_eq!(BitReader::new(&bytes).read_wide(n, order, true).unwrap(), v);
        }
    }
}
