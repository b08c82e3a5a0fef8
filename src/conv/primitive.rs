//! Fixed- and computed-width numeric fields
//!
//! The declared (wire) type decides how the bits are interpreted: signed
//! types are sign-extended at the declared width, `f32`/`f64` reinterpret a
//! 32- or 64-bit pattern, and widths beyond 64 bits go through
//! [`num_bigint::BigInt`].

use super::context::DecodeContext;
use super::error::EncodeErrorKind;
use super::{mismatch, Codec};
use crate::builder::BitWriter;
use crate::int;
use crate::parse::error::ExternalError;
use crate::parse::{BitReader, ParseResult};
use crate::schema::{Binding, BindingKind, BindingTag, ValueType};
use crate::value::Value;

fn float_width_mismatch(ty: &ValueType) -> ExternalError {
    ExternalError::TypeMismatch {
        expected: ty.to_string(),
        found: "integer of another width",
    }
}

/// Codec for [`BindingKind::Primitive`]
#[derive(Clone, Copy, Debug, Default)]
pub struct PrimitiveCodec;

impl Codec for PrimitiveCodec {
    fn tag(&self) -> BindingTag {
        BindingTag::Primitive
    }

    fn decode(
        &self,
        cx: &mut DecodeContext<'_>,
        reader: &mut BitReader<'_>,
        binding: &Binding,
        ty: &ValueType,
    ) -> ParseResult<Value> {
        let BindingKind::Primitive { size, byte_order } = &binding.kind else {
            return Err(mismatch(self.tag()).into());
        };
        let n = cx.size(size)?;
        if n == 0 {
            return Err(ExternalError::ZeroWidth { ty: ty.to_string() }.into());
        }
        match ty {
            ValueType::F32 => {
                if n != 32 {
                    return Err(float_width_mismatch(ty).into());
                }
                let raw = reader.read_unsigned(32, *byte_order)?;
                Ok(Value::Float(f64::from(f32::from_bits(raw as u32))))
            }
            ValueType::F64 => {
                if n != 64 {
                    return Err(float_width_mismatch(ty).into());
                }
                let raw = reader.read_unsigned(64, *byte_order)?;
                Ok(Value::Float(f64::from_bits(raw)))
            }
            _ if n > 64 => Ok(Value::Big(reader.read_wide(n, *byte_order, ty.is_signed())?)),
            _ if ty.is_signed() => Ok(Value::Int(reader.read_signed(n, *byte_order)?)),
            _ => Ok(Value::UInt(reader.read_unsigned(n, *byte_order)?)),
        }
    }

    fn encode(
        &self,
        cx: &mut DecodeContext<'_>,
        writer: &mut BitWriter,
        binding: &Binding,
        ty: &ValueType,
        value: &Value,
    ) -> Result<(), EncodeErrorKind> {
        let BindingKind::Primitive { size, byte_order } = &binding.kind else {
            return Err(mismatch(self.tag()).into());
        };
        let n = cx.size(size)?;
        if n == 0 {
            return Err(EncodeErrorKind::OutOfRange(format!("{ty} field is zero bits wide")));
        }
        let unhandled = || EncodeErrorKind::UnhandledType {
            expected: format!("{n}-bit {ty}"),
            found: value.kind_name(),
        };
        match ty {
            ValueType::F32 | ValueType::F64 => {
                let f = value.as_f64().ok_or_else(unhandled)?;
                match (ty, n) {
                    (ValueType::F32, 32) => writer.write_unsigned(u64::from((f as f32).to_bits()), 32, *byte_order),
                    (ValueType::F64, 64) => writer.write_unsigned(f.to_bits(), 64, *byte_order),
                    _ => return Err(unhandled()),
                }
            }
            _ if n > 64 => {
                if matches!(value, Value::Float(_)) {
                    return Err(unhandled());
                }
                let big = value.as_bigint().ok_or_else(unhandled)?;
                let raw = int::to_raw_wide(&big, n, ty.is_signed())?;
                writer.write_wide(&raw, n, *byte_order);
            }
            _ => {
                let i = match value {
                    Value::Float(_) | Value::Null => return Err(unhandled()),
                    Value::Bool(b) => i128::from(*b),
                    other => other.as_i128().ok_or_else(unhandled)?,
                };
                let raw = int::to_raw(i, n, ty.is_signed())?;
                writer.write_unsigned(raw, n, *byte_order);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::conv::Environment;
    use crate::int::ByteOrder;
    use crate::schema::TemplateRegistry;
    use crate::value::Record;

    fn env() -> Environment {
        Environment::new(TemplateRegistry::default())
    }

    fn round_trip(binding: &Binding, ty: &ValueType, value: Value) -> (Vec<u8>, Value) {
        let env = env();
        let mut cx = DecodeContext::new(&env, None);
        let mut w = BitWriter::new();
        PrimitiveCodec.encode(&mut cx, &mut w, binding, ty, &value).unwrap();
        let bytes = w.finish();
        let mut r = BitReader::new(&bytes);
        let back = PrimitiveCodec.decode(&mut cx, &mut r, binding, ty).unwrap();
        (bytes, back)
    }

    #[test]
    fn signedness_follows_type() {
        let b = Binding::primitive(12, ByteOrder::BigEndian);
        let (bytes, v) = round_trip(&b, &ValueType::I16, Value::Int(-2));
        assert_eq!(bytes, vec![0xff, 0xe0]);
        assert_eq!(v, Value::Int(-2));
        let (_, v) = round_trip(&b, &ValueType::U16, Value::UInt(0xfff));
        assert_eq!(v, Value::UInt(0xfff));
    }

    #[test]
    fn floats_by_bit_pattern() {
        let b = Binding::primitive(32, ByteOrder::LittleEndian);
        let (bytes, v) = round_trip(&b, &ValueType::F32, Value::Float(1.5));
        assert_eq!(bytes, 1.5f32.to_le_bytes().to_vec());
        assert_eq!(v, Value::Float(1.5));
    }

    #[test]
    fn wide_values() {
        let b = Binding::primitive(80, ByteOrder::BigEndian);
        let (bytes, v) = round_trip(&b, &ValueType::BigInt, Value::Int(-1));
        assert_eq!(bytes, vec![0xff; 10]);
        assert_eq!(v, Value::Big(num_bigint::BigInt::from(-1)));
    }

    #[test]
    fn out_of_range_is_rejected() {
        let env = env();
        let mut cx = DecodeContext::new(&env, None);
        let mut w = BitWriter::new();
        let b = Binding::primitive(4, ByteOrder::BigEndian);
        let err = PrimitiveCodec
            .encode(&mut cx, &mut w, &b, &ValueType::U8, &Value::UInt(16))
            .unwrap_err();
        assert!(matches!(err, EncodeErrorKind::OutOfRange(_)));
        let err = PrimitiveCodec
            .encode(&mut cx, &mut w, &b, &ValueType::U8, &Value::from("x"))
            .unwrap_err();
        assert!(matches!(err, EncodeErrorKind::UnhandledType { .. }));
    }

    #[test]
    fn computed_zero_width_is_an_error() {
        let env = env();
        let mut cx = DecodeContext::new(&env, None);
        cx.push_record(Record::new("M").with("width", 0u8));
        let b = Binding::primitive(crate::schema::Size::expr("width"), ByteOrder::BigEndian);
        let mut w = BitWriter::new();
        let err = PrimitiveCodec
            .encode(&mut cx, &mut w, &b, &ValueType::I8, &Value::Int(0))
            .unwrap_err();
        assert!(matches!(err, EncodeErrorKind::OutOfRange(_)));
        assert!(w.is_empty());
        let mut r = BitReader::new(&[0xff]);
        let err = PrimitiveCodec.decode(&mut cx, &mut r, &b, &ValueType::I8).unwrap_err();
        assert_eq!(
            err,
            ExternalError::ZeroWidth {
                ty: ValueType::I8.to_string()
            }
            .into()
        );
        assert_eq!(r.position().to_usize(), 0);
    }

    #[test]
    fn size_from_expression() {
        let env = env();
        let mut cx = DecodeContext::new(&env, None);
        cx.push_record(Record::new("M").with("width", 3u8));
        let b = Binding::primitive(crate::schema::Size::expr("width + 1"), ByteOrder::BigEndian);
        let mut r = BitReader::new(&[0b1011_0000]);
        let v = PrimitiveCodec.decode(&mut cx, &mut r, &b, &ValueType::U8).unwrap();
        assert_eq!(v, Value::UInt(0b1011));
        assert_eq!(r.position().to_usize(), 4);
    }
}
