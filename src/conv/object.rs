//! Nested records and discriminated choices
//!
//! An object binding without choices decodes the template named by the
//! field's declared type. With choices, an optional tag of `prefix_bits`
//! bits is read first and bound as `#prefix`; the alternatives are then
//! tried in declaration order and the first whose condition holds names the
//! concrete type. The default type, if any, is used when none matches.
//!
//! A choice list repeats this selection with byte-sequence prefixes instead
//! of conditions, until a prefix fails to match or the terminator is found.

use tracing::debug;

use super::context::DecodeContext;
use super::error::EncodeErrorKind;
use super::message::{decode_nested, encode_nested};
use super::{charset, mismatch, Codec};
use crate::builder::BitWriter;
use crate::charset::{Charset, CharsetError};
use crate::int;
use crate::parse::error::{DataIntegrityError, ExternalError, SelectionError};
use crate::parse::{BitReader, ParseResult};
use crate::schema::{
    Binding, BindingKind, BindingTag, Choices, ListAlternative, ValueType, PREFIX_PARAM,
};
use crate::value::{Record, Value};

fn base_type(ty: &ValueType) -> Result<&str, ExternalError> {
    match ty {
        ValueType::Object(base) => Ok(base),
        other => Err(ExternalError::TypeMismatch {
            expected: other.to_string(),
            found: "object",
        }),
    }
}

fn record<'v>(ty: &ValueType, value: &'v Value) -> Result<&'v Record, EncodeErrorKind> {
    value.as_record().ok_or_else(|| EncodeErrorKind::UnhandledType {
        expected: ty.to_string(),
        found: value.kind_name(),
    })
}

/// Type name of the first alternative whose condition holds, falling back
/// to the default type.
fn select<'c>(
    cx: &DecodeContext<'_>,
    choices: &'c Choices,
    base: &str,
    tag: Option<u64>,
) -> ParseResult<&'c str> {
    for alt in &choices.alternatives {
        if cx.condition(Some(&alt.condition))? {
            return Ok(&alt.type_name);
        }
    }
    choices.default_type.as_deref().ok_or_else(|| {
        SelectionError {
            base: base.to_owned(),
            tag,
        }
        .into()
    })
}

fn decode_choice(
    cx: &mut DecodeContext<'_>,
    reader: &mut BitReader<'_>,
    choices: &Choices,
    base: &str,
) -> ParseResult<Record> {
    if choices.prefix_bits == 0 {
        let name = select(cx, choices, base, None)?;
        debug!(base, selected = name, "choice resolved");
        return decode_nested(cx, reader, name);
    }
    let tag = reader.read_unsigned(choices.prefix_bits as usize, choices.byte_order)?;
    cx.push_param(PREFIX_PARAM, Value::UInt(tag));
    let res = select(cx, choices, base, Some(tag)).and_then(|name| {
        debug!(base, tag, selected = name, "choice resolved");
        decode_nested(cx, reader, name)
    });
    cx.pop_params(1);
    res
}

fn encode_choice(
    cx: &mut DecodeContext<'_>,
    writer: &mut BitWriter,
    choices: &Choices,
    base: &str,
    record: &Record,
) -> Result<(), EncodeErrorKind> {
    let name = record.type_name();
    let candidates: Vec<_> = choices
        .alternatives
        .iter()
        .filter(|alt| alt.type_name == name)
        .collect();
    if choices.prefix_bits == 0 {
        let known = !candidates.is_empty() || choices.default_type.as_deref() == Some(name);
        if !known {
            return Err(EncodeErrorKind::Selection {
                base: base.to_owned(),
                type_name: name.to_owned(),
            });
        }
        return encode_nested(cx, writer, record);
    }
    // several tags may map to one type: prefer the one whose condition
    // accepts its own tag, so that decoding selects the same alternative
    let mut chosen = None;
    for alt in &candidates {
        cx.push_param(PREFIX_PARAM, Value::UInt(alt.prefix));
        let holds = cx.condition(Some(&alt.condition));
        cx.pop_params(1);
        if holds? {
            chosen = Some(*alt);
            break;
        }
    }
    let alt = chosen
        .or_else(|| candidates.first().copied())
        .ok_or_else(|| EncodeErrorKind::Selection {
            base: base.to_owned(),
            type_name: name.to_owned(),
        })?;
    let raw = int::to_raw(i128::from(alt.prefix), choices.prefix_bits as usize, false)?;
    writer.write_unsigned(raw, choices.prefix_bits as usize, choices.byte_order);
    cx.push_param(PREFIX_PARAM, Value::UInt(alt.prefix));
    let res = encode_nested(cx, writer, record);
    cx.pop_params(1);
    res
}

/// Codec for [`BindingKind::Object`]
#[derive(Clone, Copy, Debug, Default)]
pub struct ObjectCodec;

impl Codec for ObjectCodec {
    fn tag(&self) -> BindingTag {
        BindingTag::Object
    }

    fn decode(
        &self,
        cx: &mut DecodeContext<'_>,
        reader: &mut BitReader<'_>,
        binding: &Binding,
        ty: &ValueType,
    ) -> ParseResult<Value> {
        let BindingKind::Object { choices } = &binding.kind else {
            return Err(mismatch(self.tag()).into());
        };
        let base = base_type(ty)?;
        let record = match choices {
            None => decode_nested(cx, reader, base)?,
            Some(choices) => decode_choice(cx, reader, choices, base)?,
        };
        Ok(Value::Record(record))
    }

    fn encode(
        &self,
        cx: &mut DecodeContext<'_>,
        writer: &mut BitWriter,
        binding: &Binding,
        ty: &ValueType,
        value: &Value,
    ) -> Result<(), EncodeErrorKind> {
        let BindingKind::Object { choices } = &binding.kind else {
            return Err(mismatch(self.tag()).into());
        };
        let base = base_type(ty).map_err(|_| EncodeErrorKind::UnhandledType {
            expected: ty.to_string(),
            found: value.kind_name(),
        })?;
        let record = record(ty, value)?;
        match choices {
            // decoding reads the declared type, so no other layout may be written
            None if record.type_name() != base => Err(EncodeErrorKind::Selection {
                base: base.to_owned(),
                type_name: record.type_name().to_owned(),
            }),
            None => encode_nested(cx, writer, record),
            Some(choices) => encode_choice(cx, writer, choices, base, record),
        }
    }
}

/// Codec for [`BindingKind::ChoiceList`]
#[derive(Clone, Copy, Debug, Default)]
pub struct ChoiceListCodec;

impl ChoiceListCodec {
    /// Raw prefix bytes of each alternative, paired with its type name
    fn prefixes(
        alternatives: &[ListAlternative],
        cs: Charset,
    ) -> Result<Vec<(Vec<u8>, &str)>, CharsetError> {
        alternatives
            .iter()
            .map(|alt| Ok((alt.prefix.encode(cs)?.into_owned(), alt.type_name.as_str())))
            .collect()
    }
}

impl Codec for ChoiceListCodec {
    fn tag(&self) -> BindingTag {
        BindingTag::ChoiceList
    }

    fn decode(
        &self,
        cx: &mut DecodeContext<'_>,
        reader: &mut BitReader<'_>,
        binding: &Binding,
        _ty: &ValueType,
    ) -> ParseResult<Value> {
        let BindingKind::ChoiceList {
            alternatives,
            charset: name,
            terminator,
        } = &binding.kind
        else {
            return Err(mismatch(self.tag()).into());
        };
        let prefixes = Self::prefixes(alternatives, charset(name)?)?;
        let mut out = Vec::new();
        loop {
            if let Some(t) = terminator {
                if reader.peek_byte() == Some(*t) {
                    reader.skip_bits(8)?;
                    break;
                }
            }
            let Some((prefix, type_name)) = prefixes.iter().find(|(p, _)| reader.matches_at(p, None)) else {
                if let Some(t) = terminator {
                    return Err(DataIntegrityError::MissingTerminator { expected: vec![*t] }.into());
                }
                break;
            };
            reader.skip_bits(8 * prefix.len())?;
            cx.enter(out.len().to_string());
            let res = decode_nested(cx, reader, type_name);
            if res.is_err() {
                cx.note_failure(reader.byte_position());
            }
            cx.leave();
            out.push(Value::Record(res?));
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
        let BindingKind::ChoiceList {
            alternatives,
            charset: name,
            terminator,
        } = &binding.kind
        else {
            return Err(mismatch(self.tag()).into());
        };
        let items = value.as_list().ok_or_else(|| EncodeErrorKind::UnhandledType {
            expected: ty.to_string(),
            found: value.kind_name(),
        })?;
        let prefixes = Self::prefixes(alternatives, charset(name)?)?;
        for (ix, item) in items.iter().enumerate() {
            cx.enter(ix.to_string());
            let res = record(ty, item).and_then(|rec| {
                let (prefix, _) = prefixes
                    .iter()
                    .find(|(_, t)| *t == rec.type_name())
                    .ok_or_else(|| EncodeErrorKind::Selection {
                        base: ty.to_string(),
                        type_name: rec.type_name().to_owned(),
                    })?;
                writer.write_bytes(prefix);
                encode_nested(cx, writer, rec)
            });
            if res.is_err() {
                cx.note_failure(writer.len());
            }
            cx.leave();
            res?;
        }
        if let Some(t) = terminator {
            writer.write_bytes(&[*t]);
        }
        Ok(())
    }
}
