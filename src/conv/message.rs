//! Whole-template processing
//!
//! A template is decoded into a fresh [`Record`] pushed on the context, so
//! that expressions in its fields see the values decoded so far. After the
//! bound fields, the checksum (if the template declares one and it was
//! present) is verified over the message bytes, then evaluated fields are
//! computed and post-processed fields rewritten, in that order.
//!
//! Encoding works on a copy of the caller's record: post-processing is
//! applied to the copy first, the bound fields are written from it, and the
//! checksum placeholder is finally patched with the value computed over the
//! bytes just written.
//!
//! A checksum covers the bytes `[start + skip_start, end - skip_end)`, where
//! `start` is the first byte of the message (its start pattern included)
//! and `end` is the byte following the last bound field, before any end
//! terminator.

use std::ops::Range;

use tracing::debug;

use super::context::DecodeContext;
use super::error::EncodeErrorKind;
use super::field::{apply_evaluated, decode_field, encode_field, post_process_decoded, post_process_for_encode};
use crate::builder::BitWriter;
use crate::checksum::ChecksumAlgorithm;
use crate::int;
use crate::parse::error::{DataIntegrityError, ExternalError, InternalError, TokenError};
use crate::parse::{BitReader, ParseResult};
use crate::schema::{ChecksumParams, Template};
use crate::value::Record;

fn algorithm(params: &ChecksumParams) -> Result<ChecksumAlgorithm, InternalError> {
    ChecksumAlgorithm::for_id(&params.algorithm)
        .ok_or_else(|| InternalError::UnresolvedChecksum(params.algorithm.clone()))
}

/// Byte range covered by a checksum for a message spanning `start..end`
fn checksum_range(start: usize, end: usize, params: &ChecksumParams) -> Range<usize> {
    let hi = end.saturating_sub(params.skip_end);
    let lo = start.saturating_add(params.skip_start).min(hi);
    lo..hi
}

fn verify_checksum(
    cx: &mut DecodeContext<'_>,
    reader: &BitReader<'_>,
    template: &Template,
    start: usize,
) -> ParseResult<()> {
    let Some((field, params)) = template.checksum() else {
        return Ok(());
    };
    let declared = match cx.current().and_then(|r| r.get(&field.name)) {
        Some(v) => v.as_i128().unwrap_or_default() as u64,
        // gated out by version or condition
        None => return Ok(()),
    };
    let alg = algorithm(params)?;
    let end = int::bytes_for_bits(reader.position().to_usize());
    let computed = alg.compute(&reader.buffer()[checksum_range(start, end, params)], params.start_value);
    if computed != declared {
        cx.enter(field.name.as_str());
        cx.note_failure(end);
        cx.leave();
        return Err(DataIntegrityError::ChecksumMismatch {
            algorithm: alg.id(),
            declared,
            computed,
        }
        .into());
    }
    Ok(())
}

fn decode_body(
    cx: &mut DecodeContext<'_>,
    reader: &mut BitReader<'_>,
    template: &Template,
    start: usize,
) -> ParseResult<()> {
    for field in template.fields() {
        decode_field(cx, reader, field)?;
    }
    verify_checksum(cx, reader, template, start)?;
    apply_evaluated(cx, template, reader.byte_position())?;
    post_process_decoded(cx, template, reader.byte_position())
}

/// Decodes the fields of `template` into a new record.
///
/// `start` is the byte offset the enclosing message began at, used as the
/// base of checksum ranges.
pub fn decode_template(
    cx: &mut DecodeContext<'_>,
    reader: &mut BitReader<'_>,
    template: &Template,
    start: usize,
) -> ParseResult<Record> {
    cx.push_record(Record::new(template.name()));
    let res = decode_body(cx, reader, template, start);
    let record = cx.pop_record();
    res?;
    Ok(record.unwrap_or_else(|| Record::new(template.name())))
}

/// Decodes a nested record of the named type at the reader's head.
pub fn decode_nested(
    cx: &mut DecodeContext<'_>,
    reader: &mut BitReader<'_>,
    type_name: &str,
) -> ParseResult<Record> {
    let template = cx
        .env()
        .templates
        .get(type_name)
        .ok_or_else(|| ExternalError::UnknownTemplate(type_name.to_owned()))?;
    let start = reader.byte_position();
    decode_template(cx, reader, template, start)
}

/// Decodes one framed message: start pattern, fields and end terminator.
///
/// The longest start pattern of `template` matching at the reader's head is
/// consumed. Templates without start patterns are decoded unframed.
pub fn decode_message(
    cx: &mut DecodeContext<'_>,
    reader: &mut BitReader<'_>,
    template: &Template,
) -> ParseResult<Record> {
    let start = reader.byte_position();
    let header = template.header();
    if template.is_message() {
        let len = header.longest_match(reader).ok_or(TokenError::NoHeaderMatch {
            found: reader.peek_byte(),
        })?;
        reader.skip_bits(8 * len)?;
    }
    debug!(template = template.name(), offset = start, "decoding message");
    let record = decode_template(cx, reader, template, start)?;
    if let Some(end) = &header.end {
        reader.align()?;
        if !reader.matches_at(end, None) {
            cx.note_failure(reader.byte_position());
            return Err(DataIntegrityError::MissingTerminator {
                expected: end.clone(),
            }
            .into());
        }
        reader.skip_bits(8 * end.len())?;
    }
    Ok(record)
}

fn encode_body(
    cx: &mut DecodeContext<'_>,
    writer: &mut BitWriter,
    template: &Template,
    start: usize,
) -> Result<(), EncodeErrorKind> {
    post_process_for_encode(cx, template)?;
    let mark = cx.checksum_slots();
    for field in template.fields() {
        encode_field(cx, writer, field)?;
    }
    let slot = if cx.checksum_slots() > mark {
        cx.pop_checksum_slot()
    } else {
        None
    };
    if let (Some((_, params)), Some(at)) = (template.checksum(), slot) {
        let alg = algorithm(params)?;
        let range = checksum_range(start, writer.len(), params);
        let value = alg.compute(&writer.as_bytes()[range], params.start_value);
        writer.patch_unsigned(at, value, params.size_bits as usize, params.byte_order);
    }
    Ok(())
}

/// Encodes the fields of `record` as laid out by `template`.
pub fn encode_template(
    cx: &mut DecodeContext<'_>,
    writer: &mut BitWriter,
    template: &Template,
    record: &Record,
    start: usize,
) -> Result<(), EncodeErrorKind> {
    cx.push_record(record.clone());
    let res = encode_body(cx, writer, template, start);
    cx.pop_record();
    res
}

/// Encodes a nested record, laid out by the template its type names.
pub fn encode_nested(
    cx: &mut DecodeContext<'_>,
    writer: &mut BitWriter,
    record: &Record,
) -> Result<(), EncodeErrorKind> {
    let template = cx
        .env()
        .templates
        .get(record.type_name())
        .ok_or_else(|| EncodeErrorKind::UnknownTemplate(record.type_name().to_owned()))?;
    let start = writer.len();
    encode_template(cx, writer, template, record, start)
}

/// Encodes one framed message: primary start pattern, fields and end
/// terminator.
pub fn encode_message(
    cx: &mut DecodeContext<'_>,
    writer: &mut BitWriter,
    record: &Record,
) -> Result<(), EncodeErrorKind> {
    let template = cx
        .env()
        .templates
        .get(record.type_name())
        .ok_or_else(|| EncodeErrorKind::UnknownTemplate(record.type_name().to_owned()))?;
    let start = writer.len();
    debug!(template = template.name(), offset = start, "encoding message");
    if let Some(pattern) = template.header().primary_start() {
        writer.write_bytes(pattern);
    }
    encode_template(cx, writer, template, record, start)?;
    if let Some(end) = &template.header().end {
        writer.align();
        writer.write_bytes(end);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::conv::convert::ConverterRegistry;
    use crate::conv::Environment;
    use crate::int::ByteOrder;
    use crate::parse::ParseError;
    use crate::schema::{Binding, FieldDescriptor, Size, TemplateDescriptor, TemplateRegistry, ValueType};
    use crate::value::Value;

    fn env(descs: &[TemplateDescriptor]) -> Environment {
        let templates = descs
            .iter()
            .map(|d| Template::build(d, &ConverterRegistry::default()).unwrap())
            .collect();
        Environment::new(TemplateRegistry::seal(templates).unwrap())
    }

    fn byte(name: &str) -> FieldDescriptor {
        FieldDescriptor::new(name, ValueType::U8).bind(Binding::primitive(8, ByteOrder::BigEndian))
    }

    fn framed() -> TemplateDescriptor {
        TemplateDescriptor::new("Ping")
            .starts_with(b"\x7e\x7e")
            .ends_with(b"\r\n")
            .field(byte("seq"))
            .field(
                FieldDescriptor::new("crc", ValueType::U8)
                    .checksum(ChecksumParams::new("xor8", 8).skip(2, 1)),
            )
            .field(FieldDescriptor::new("next", ValueType::U16).evaluate("seq + 1"))
    }

    #[test]
    fn checksum_is_patched_and_verified() {
        let env = env(&[framed()]);
        let mut cx = DecodeContext::new(&env, None);
        let mut w = BitWriter::new();
        encode_message(&mut cx, &mut w, &Record::new("Ping").with("seq", 0x5au8)).unwrap();
        let bytes = w.finish();
        assert_eq!(bytes, vec![0x7e, 0x7e, 0x5a, 0x5a, b'\r', b'\n']);

        let template = env.templates.get("Ping").unwrap();
        let mut r = BitReader::new(&bytes);
        let rec = decode_message(&mut cx, &mut r, template).unwrap();
        assert_eq!(rec.get("crc"), Some(&Value::UInt(0x5a)));
        assert_eq!(rec.get("next"), Some(&Value::UInt(0x5b)));
        assert!(!r.has_remaining());

        let mut corrupt = bytes.clone();
        corrupt[3] ^= 1;
        let mut r = BitReader::new(&corrupt);
        let mut cx = DecodeContext::new(&env, None);
        let err = decode_message(&mut cx, &mut r, template).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Integrity(DataIntegrityError::ChecksumMismatch {
                declared: 0x5b,
                computed: 0x5a,
                ..
            })
        ));
        assert_eq!(cx.take_failure(0), (vec!["crc".to_owned()], 4));
    }

    #[test]
    fn missing_end_terminator() {
        let env = env(&[framed()]);
        let mut cx = DecodeContext::new(&env, None);
        let template = env.templates.get("Ping").unwrap();
        let mut r = BitReader::new(&[0x7e, 0x7e, 1, 1, b'\r', b'X']);
        assert!(matches!(
            decode_message(&mut cx, &mut r, template),
            Err(ParseError::Integrity(DataIntegrityError::MissingTerminator { .. }))
        ));
    }

    #[test]
    fn nested_records_see_their_own_fields() {
        let inner = TemplateDescriptor::new("Inner").field(byte("len")).field(
            FieldDescriptor::new("data", ValueType::list(ValueType::U8))
                .bind(Binding::array(Binding::primitive(8, ByteOrder::BigEndian), Size::expr("len"))),
        );
        let outer = TemplateDescriptor::new("Outer")
            .starts_with(b"O")
            .field(byte("len"))
            .field(FieldDescriptor::new("inner", ValueType::object("Inner")).bind(Binding::object()));
        let env = env(&[inner, outer]);
        let mut cx = DecodeContext::new(&env, None);
        let template = env.templates.get("Outer").unwrap();
        let bytes = [b'O', 9, 2, 0xa, 0xb];
        let mut r = BitReader::new(&bytes);
        let rec = decode_message(&mut cx, &mut r, template).unwrap();
        let inner = rec.get("inner").and_then(Value::as_record).unwrap();
        assert_eq!(inner.get("len"), Some(&Value::UInt(2)));
        assert_eq!(
            inner.get("data"),
            Some(&Value::List(vec![Value::UInt(0xa), Value::UInt(0xb)]))
        );

        let mut w = BitWriter::new();
        encode_message(&mut cx, &mut w, &rec).unwrap();
        assert_eq!(w.finish(), bytes.to_vec());
    }
}
