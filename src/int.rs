//! Fixed-width integer packing
//!
//! Helpers for mapping integer values to and from their raw `N`-bit
//! two's-complement representation. Widths up to 64 bits use native
//! integers (with `i128` as the lossless intermediate for range checks);
//! wider fields go through [`BigInt`] with explicit sign extension at the
//! declared width.

extern crate num_bigint;
extern crate num_integer;

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::error::BoundsError;

/// Order in which the bytes of a multi-byte integer appear on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

/// Number of whole bytes needed to hold `bits` bits.
#[inline]
#[must_use]
pub fn bytes_for_bits(bits: usize) -> usize {
    Integer::div_ceil(&bits, &8)
}

/// Mask selecting the low `n` bits of a `u64` (`n <= 64`).
#[inline]
#[must_use]
pub const fn mask(n: usize) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Interprets the low `n` bits of `raw` as a two's-complement signed value.
#[inline]
#[must_use]
pub const fn sign_extend(raw: u64, n: usize) -> i64 {
    if n == 0 {
        0
    } else if n >= 64 {
        raw as i64
    } else {
        let shift = 64 - n;
        ((raw << shift) as i64) >> shift
    }
}

/// Inclusive range of values representable in `n <= 64` bits. Zero bits
/// represent only zero.
#[must_use]
pub fn native_range(n: usize, signed: bool) -> (i128, i128) {
    if n == 0 {
        (0, 0)
    } else if signed {
        let half = 1i128 << (n - 1);
        (-half, half - 1)
    } else {
        (0, (1i128 << n) - 1)
    }
}

/// Checks that `val` fits in `n` bits and returns its raw bit pattern.
///
/// Unsigned fields accept `0..2^n`; signed fields accept `-2^(n-1)..2^(n-1)`.
pub fn to_raw(val: i128, n: usize, signed: bool) -> Result<u64, BoundsError<i128>> {
    let (min, max) = native_range(n, signed);
    let val = BoundsError::restrict(val, min, max)?;
    Ok((val as u64) & mask(n))
}

/// Inclusive range of values representable in `n` bits, of any width.
#[must_use]
pub fn wide_range(n: usize, signed: bool) -> (BigInt, BigInt) {
    let one = BigInt::one();
    if n == 0 {
        (BigInt::zero(), BigInt::zero())
    } else if signed {
        let half: BigInt = &one << (n - 1);
        (-half.clone(), half - one)
    } else {
        let full: BigInt = &one << n;
        (BigInt::zero(), full - one)
    }
}

/// Wide analogue of [`to_raw`]: checks the range and returns the unsigned
/// magnitude of the `n`-bit two's-complement pattern.
pub fn to_raw_wide(val: &BigInt, n: usize, signed: bool) -> Result<BigUint, BoundsError<BigInt>> {
    let (min, max) = wide_range(n, signed);
    let val = BoundsError::restrict(val.clone(), min, max)?;
    let raw = if val.sign() == Sign::Minus {
        (BigInt::one() << n) + val
    } else {
        val
    };
    // non-negative after the adjustment above
    Ok(raw.magnitude().clone())
}

/// Wide analogue of [`sign_extend`].
#[must_use]
pub fn from_raw_wide(raw: BigUint, n: usize, signed: bool) -> BigInt {
    let raw = BigInt::from_biguint(Sign::Plus, raw);
    if signed && n > 0 && raw.bit((n - 1) as u64) {
        raw - (BigInt::one() << n)
    } else {
        raw
    }
}

/// Splits an `n`-bit little-endian field into its 8-bit groups, lowest first.
///
/// The final group carries the leftover `n mod 8` bits when `n` is not a
/// multiple of eight.
pub fn le_groups(n: usize) -> impl Iterator<Item = usize> {
    let full = n / 8;
    let rest = n % 8;
    std::iter::repeat(8)
        .take(full)
        .chain(std::iter::once(rest).filter(|&r| r > 0))
}
