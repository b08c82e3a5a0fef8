//! Checksum fields
//!
//! Decoding reads the declared checksum as a plain unsigned integer; it is
//! verified against the message bytes once the enclosing template's bound
//! fields are done (see [`message`](super::message)). Encoding writes a zero
//! placeholder and records its position, to be patched with the computed
//! value once the range it covers has been written.

use super::context::DecodeContext;
use super::error::EncodeErrorKind;
use super::{mismatch, Codec};
use crate::builder::BitWriter;
use crate::parse::{BitReader, ParseResult};
use crate::schema::{Binding, BindingKind, BindingTag, ValueType};
use crate::value::Value;

/// Codec for [`BindingKind::Checksum`]
#[derive(Clone, Copy, Debug, Default)]
pub struct ChecksumCodec;

impl Codec for ChecksumCodec {
    fn tag(&self) -> BindingTag {
        BindingTag::Checksum
    }

    fn decode(
        &self,
        _cx: &mut DecodeContext<'_>,
        reader: &mut BitReader<'_>,
        binding: &Binding,
        _ty: &ValueType,
    ) -> ParseResult<Value> {
        let BindingKind::Checksum(params) = &binding.kind else {
            return Err(mismatch(self.tag()).into());
        };
        Ok(Value::UInt(reader.read_unsigned(params.size_bits as usize, params.byte_order)?))
    }

    fn encode(
        &self,
        cx: &mut DecodeContext<'_>,
        writer: &mut BitWriter,
        binding: &Binding,
        _ty: &ValueType,
        _value: &Value,
    ) -> Result<(), EncodeErrorKind> {
        let BindingKind::Checksum(params) = &binding.kind else {
            return Err(mismatch(self.tag()).into());
        };
        cx.push_checksum_slot(writer.position());
        writer.write_unsigned(0, params.size_bits as usize, params.byte_order);
        Ok(())
    }
}
