//! Crate-internal state-tracking helpers for the bit reader and writer

pub mod offset;

pub use offset::{BitCursor, BitIndex, FallbackStack};
