//! Homogeneous collections: counted arrays and terminated lists
//!
//! Elements are processed by the element binding through the shared
//! pipeline of [`field`](super::field), so they may carry their own
//! converter and validator. Element indices appear in error paths.

use super::context::DecodeContext;
use super::error::EncodeErrorKind;
use super::field::{decode_bound, encode_bound};
use super::{mismatch, Codec};
use crate::builder::BitWriter;
use crate::parse::error::{DataIntegrityError, ExternalError, TokenError};
use crate::parse::{BitReader, ParseResult};
use crate::schema::{Binding, BindingKind, BindingTag, ValueType};
use crate::value::Value;

fn element_type(ty: &ValueType) -> Result<&ValueType, ExternalError> {
    match ty {
        ValueType::List(elem) => Ok(elem.as_ref()),
        other => Err(ExternalError::TypeMismatch {
            expected: other.to_string(),
            found: "list",
        }),
    }
}

fn elements<'v>(ty: &ValueType, value: &'v Value) -> Result<&'v [Value], EncodeErrorKind> {
    value.as_list().ok_or_else(|| EncodeErrorKind::UnhandledType {
        expected: ty.to_string(),
        found: value.kind_name(),
    })
}

fn decode_element(
    cx: &mut DecodeContext<'_>,
    reader: &mut BitReader<'_>,
    element: &Binding,
    elem: &ValueType,
    index: usize,
) -> ParseResult<Value> {
    cx.enter(index.to_string());
    let res = decode_bound(cx, reader, element, elem);
    if res.is_err() {
        cx.note_failure(reader.byte_position());
    }
    cx.leave();
    res
}

fn encode_element(
    cx: &mut DecodeContext<'_>,
    writer: &mut BitWriter,
    element: &Binding,
    elem: &ValueType,
    index: usize,
    value: &Value,
) -> Result<(), EncodeErrorKind> {
    cx.enter(index.to_string());
    let res = encode_bound(cx, writer, element, elem, value);
    if res.is_err() {
        cx.note_failure(writer.len());
    }
    cx.leave();
    res
}

/// Codec for [`BindingKind::Array`]
#[derive(Clone, Copy, Debug, Default)]
pub struct ArrayCodec;

impl Codec for ArrayCodec {
    fn tag(&self) -> BindingTag {
        BindingTag::Array
    }

    fn decode(
        &self,
        cx: &mut DecodeContext<'_>,
        reader: &mut BitReader<'_>,
        binding: &Binding,
        ty: &ValueType,
    ) -> ParseResult<Value> {
        let BindingKind::Array { element, count } = &binding.kind else {
            return Err(mismatch(self.tag()).into());
        };
        let elem = element_type(ty)?;
        let count = cx.size(count)?;
        // the count is untrusted input; each element needs at least one bit
        let mut out = Vec::with_capacity(count.min(reader.remaining_bits()));
        for ix in 0..count {
            out.push(decode_element(cx, reader, element, elem, ix)?);
        }
        Ok(Value::List(out))
    }

    fn encode(
        &self,
        cx: &mut DecodeContext<'_>,
        writer: &mut BitWriter,
        binding: &Binding,
        ty: &ValueType,
        value: &Value,
    ) -> Result<(), EncodeErrorKind> {
        let BindingKind::Array { element, count } = &binding.kind else {
            return Err(mismatch(self.tag()).into());
        };
        let elem = element_type(ty).map_err(|_| EncodeErrorKind::UnhandledType {
            expected: ty.to_string(),
            found: value.kind_name(),
        })?;
        let items = elements(ty, value)?;
        let count = cx.size(count)?;
        if items.len() != count {
            return Err(EncodeErrorKind::LengthMismatch {
                expected: count,
                found: items.len(),
            });
        }
        for (ix, item) in items.iter().enumerate() {
            encode_element(cx, writer, element, elem, ix, item)?;
        }
        Ok(())
    }
}

/// Codec for [`BindingKind::List`]
#[derive(Clone, Copy, Debug, Default)]
pub struct ListCodec;

impl Codec for ListCodec {
    fn tag(&self) -> BindingTag {
        BindingTag::List
    }

    fn decode(
        &self,
        cx: &mut DecodeContext<'_>,
        reader: &mut BitReader<'_>,
        binding: &Binding,
        ty: &ValueType,
    ) -> ParseResult<Value> {
        let BindingKind::List {
            element,
            terminator,
            consume,
        } = &binding.kind
        else {
            return Err(mismatch(self.tag()).into());
        };
        let elem = element_type(ty)?;
        let mut out = Vec::new();
        loop {
            match reader.peek_byte() {
                Some(b) if b == *terminator => {
                    if *consume {
                        reader.skip_bits(8)?;
                    }
                    break;
                }
                Some(_) => {
                    let before = reader.position();
                    out.push(decode_element(cx, reader, element, elem, out.len())?);
                    if reader.position() == before {
                        return Err(TokenError::NoProgress {
                            template: elem.to_string(),
                        }
                        .into());
                    }
                }
                None => {
                    return Err(DataIntegrityError::MissingTerminator {
                        expected: vec![*terminator],
                    }
                    .into())
                }
            }
        }
        Ok(Value::List(out))
    }

    fn encode(
        &self,
        cx: &mut DecodeContext<'_>,
        writer: &mut BitWriter,
        binding: &Binding,
        ty: &ValueType,
        value: &Value,
    ) -> Result<(), EncodeErrorKind> {
        let BindingKind::List {
            element,
            terminator,
            consume,
        } = &binding.kind
        else {
            return Err(mismatch(self.tag()).into());
        };
        let elem = element_type(ty).map_err(|_| EncodeErrorKind::UnhandledType {
            expected: ty.to_string(),
            found: value.kind_name(),
        })?;
        for (ix, item) in elements(ty, value)?.iter().enumerate() {
            let aligned = writer.position().is_aligned();
            let start = writer.len();
            encode_element(cx, writer, element, elem, ix, item)?;
            if aligned && writer.as_bytes().get(start) == Some(terminator) {
                return Err(EncodeErrorKind::EmbeddedTerminator {
                    terminator: *terminator,
                });
            }
        }
        if *consume {
            writer.write_bytes(&[*terminator]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::conv::Environment;
    use crate::int::ByteOrder;
    use crate::schema::{Size, TemplateRegistry};
    use crate::value::Record;

    fn env() -> Environment {
        Environment::new(TemplateRegistry::default())
    }

    #[test]
    fn counted_array() {
        let env = env();
        let mut cx = DecodeContext::new(&env, None);
        cx.push_record(Record::new("M").with("n", 3u8));
        let b = Binding::array(Binding::primitive(4, ByteOrder::BigEndian), Size::expr("n"));
        let ty = ValueType::list(ValueType::U8);
        let mut r = BitReader::new(&[0x12, 0x30]);
        let v = ArrayCodec.decode(&mut cx, &mut r, &b, &ty).unwrap();
        assert_eq!(v, Value::List(vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)]));

        let mut w = BitWriter::new();
        ArrayCodec.encode(&mut cx, &mut w, &b, &ty, &v).unwrap();
        assert_eq!(w.finish(), vec![0x12, 0x30]);

        let mut w = BitWriter::new();
        let short = Value::List(vec![Value::UInt(1)]);
        assert_eq!(
            ArrayCodec.encode(&mut cx, &mut w, &b, &ty, &short),
            Err(EncodeErrorKind::LengthMismatch { expected: 3, found: 1 })
        );
    }

    #[test]
    fn terminated_list() {
        let env = env();
        let mut cx = DecodeContext::new(&env, None);
        let b = Binding::list_until(Binding::primitive(8, ByteOrder::BigEndian), 0, true);
        let ty = ValueType::list(ValueType::U8);
        let mut r = BitReader::new(&[5, 6, 0, 9]);
        let v = ListCodec.decode(&mut cx, &mut r, &b, &ty).unwrap();
        assert_eq!(v, Value::List(vec![Value::UInt(5), Value::UInt(6)]));
        assert_eq!(r.byte_position(), 3);

        let mut w = BitWriter::new();
        ListCodec.encode(&mut cx, &mut w, &b, &ty, &v).unwrap();
        assert_eq!(w.finish(), vec![5, 6, 0]);

        let mut r = BitReader::new(&[5, 6]);
        assert!(matches!(
            ListCodec.decode(&mut cx, &mut r, &b, &ty),
            Err(crate::parse::ParseError::Integrity(DataIntegrityError::MissingTerminator { .. }))
        ));
    }

    #[test]
    fn element_paths_in_failures() {
        let env = env();
        let mut cx = DecodeContext::new(&env, None);
        let b = Binding::array(Binding::primitive(8, ByteOrder::BigEndian), 3);
        let ty = ValueType::list(ValueType::U8);
        let mut r = BitReader::new(&[1, 2]);
        assert!(ArrayCodec.decode(&mut cx, &mut r, &b, &ty).is_err());
        assert_eq!(cx.take_failure(0), (vec!["2".to_owned()], 2));
    }
}
