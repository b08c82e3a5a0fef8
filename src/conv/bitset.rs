//! Raw bit sequences

use super::context::DecodeContext;
use super::error::EncodeErrorKind;
use super::{mismatch, Codec};
use crate::builder::BitWriter;
use crate::parse::{BitReader, ParseResult};
use crate::schema::{Binding, BindingKind, BindingTag, ValueType};
use crate::value::Value;

/// Codec for [`BindingKind::BitSet`]
#[derive(Clone, Copy, Debug, Default)]
pub struct BitSetCodec;

impl Codec for BitSetCodec {
    fn tag(&self) -> BindingTag {
        BindingTag::BitSet
    }

    fn decode(
        &self,
        cx: &mut DecodeContext<'_>,
        reader: &mut BitReader<'_>,
        binding: &Binding,
        _ty: &ValueType,
    ) -> ParseResult<Value> {
        let BindingKind::BitSet { size } = &binding.kind else {
            return Err(mismatch(self.tag()).into());
        };
        let n = cx.size(size)?;
        Ok(Value::Bits(reader.read_bits(n)?))
    }

    fn encode(
        &self,
        cx: &mut DecodeContext<'_>,
        writer: &mut BitWriter,
        binding: &Binding,
        _ty: &ValueType,
        value: &Value,
    ) -> Result<(), EncodeErrorKind> {
        let BindingKind::BitSet { size } = &binding.kind else {
            return Err(mismatch(self.tag()).into());
        };
        let n = cx.size(size)?;
        let Value::Bits(bits) = value else {
            return Err(EncodeErrorKind::UnhandledType {
                expected: ValueType::Bits.to_string(),
                found: value.kind_name(),
            });
        };
        if bits.len() != n {
            return Err(EncodeErrorKind::LengthMismatch {
                expected: n,
                found: bits.len(),
            });
        }
        writer.write_bits(bits);
        Ok(())
    }
}
