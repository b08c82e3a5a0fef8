//! Per-field processing common to every binding kind
//!
//! Decoding one [`TemplateField`] proceeds as follows:
//!
//! 1. the version gate and then the binding condition are checked; if
//!    either fails, the field is absent and nothing is read;
//! 2. each [`SkipParams`] is applied in order, gated by its own condition;
//! 3. the field's context parameters are evaluated and pushed;
//! 4. the codec for the binding kind reads the raw value, which is passed
//!    through the converter (if any), coerced to the declared type and
//!    checked by the validator (if any);
//! 5. the parameters are popped and the value is stored in the current
//!    record, where later expressions can see it.
//!
//! Encoding mirrors these steps, taking the value from the current record.
//! Evaluated and post-processed fields are applied per template once the
//! bound fields are done.

use tracing::trace;

use super::context::DecodeContext;
use super::error::EncodeErrorKind;
use crate::builder::BitWriter;
use crate::expr::ExpressionError;
use crate::parse::error::ExternalError;
use crate::parse::{BitReader, ParseResult};
use crate::schema::{Binding, BindingKind, ContextParameter, SkipParams, Template, TemplateField, ValueType};
use crate::value::Value;

fn param_name(name: &str) -> &str {
    name.trim_start_matches('#')
}

/// Evaluates and pushes `params` in order, returning how many were pushed.
fn push_params(
    cx: &mut DecodeContext<'_>,
    params: &[ContextParameter],
) -> Result<usize, ExpressionError> {
    for (pushed, p) in params.iter().enumerate() {
        match cx.evaluate(&p.expr) {
            Ok(v) => cx.push_param(param_name(&p.name), v),
            Err(e) => {
                cx.pop_params(pushed);
                return Err(e);
            }
        }
    }
    Ok(params.len())
}

fn coerce(ty: &ValueType, value: Value) -> Result<Value, ExternalError> {
    let found = value.kind_name();
    ty.coerce(value).ok_or_else(|| ExternalError::TypeMismatch {
        expected: ty.to_string(),
        found,
    })
}

fn unregistered(id: &str) -> String {
    format!("`{id}` is not registered")
}

/// Reads the value of `binding` and brings it to the `declared` type.
///
/// This is the part of the pipeline shared by fields and by the elements of
/// arrays and lists.
pub fn decode_bound(
    cx: &mut DecodeContext<'_>,
    reader: &mut BitReader<'_>,
    binding: &Binding,
    declared: &ValueType,
) -> ParseResult<Value> {
    let env = cx.env();
    let converter = match &binding.converter {
        Some(id) => {
            let conv = env.converters.converter(id).ok_or_else(|| ExternalError::Conversion {
                converter: id.clone(),
                reason: unregistered(id),
            })?;
            Some((id, conv))
        }
        None => None,
    };
    let wire = converter.map_or_else(|| declared.clone(), |(_, conv)| conv.input());
    let codec = env.codecs.get(binding.tag())?;
    let raw = codec.decode(cx, reader, binding, &wire)?;
    let value = match converter {
        Some((id, conv)) => conv.decode(raw).map_err(|reason| ExternalError::Conversion {
            converter: id.clone(),
            reason,
        })?,
        None => raw,
    };
    let value = coerce(declared, value)?;
    if let Some(id) = &binding.validator {
        let accepted = env
            .converters
            .validator(id)
            .map_or(false, |v| v.validate(&value));
        if !accepted {
            return Err(ExternalError::Validation {
                validator: id.clone(),
                value: value.to_string(),
            }
            .into());
        }
    }
    Ok(value)
}

/// Writes `value` as laid out by `binding`, converting it first if the
/// binding declares a converter.
pub fn encode_bound(
    cx: &mut DecodeContext<'_>,
    writer: &mut BitWriter,
    binding: &Binding,
    declared: &ValueType,
    value: &Value,
) -> Result<(), EncodeErrorKind> {
    let env = cx.env();
    let codec = env.codecs.get(binding.tag())?;
    match &binding.converter {
        None => codec.encode(cx, writer, binding, declared, value),
        Some(id) => {
            let conv = env
                .converters
                .converter(id)
                .ok_or_else(|| EncodeErrorKind::Conversion {
                    converter: id.clone(),
                    reason: unregistered(id),
                })?;
            let raw = conv.encode(value).map_err(|reason| EncodeErrorKind::Conversion {
                converter: id.clone(),
                reason,
            })?;
            codec.encode(cx, writer, binding, &conv.input(), &raw)
        }
    }
}

fn decode_skip(
    cx: &mut DecodeContext<'_>,
    reader: &mut BitReader<'_>,
    skip: &SkipParams,
) -> ParseResult<()> {
    if !cx.condition(skip.condition())? {
        return Ok(());
    }
    match skip {
        SkipParams::Bits { size, .. } => reader.skip_bits(cx.size(size)?),
        SkipParams::UntilTerminator {
            terminator,
            consume,
            ..
        } => reader.skip_until(*terminator, *consume),
    }
}

fn encode_skip(
    cx: &mut DecodeContext<'_>,
    writer: &mut BitWriter,
    skip: &SkipParams,
) -> Result<(), EncodeErrorKind> {
    if !cx.condition(skip.condition())? {
        return Ok(());
    }
    match skip {
        SkipParams::Bits { size, .. } => writer.skip_bits(cx.size(size)?),
        SkipParams::UntilTerminator {
            terminator,
            consume,
            ..
        } => {
            if *consume {
                writer.write_bytes(&[*terminator]);
            }
        }
    }
    Ok(())
}

fn decode_present(
    cx: &mut DecodeContext<'_>,
    reader: &mut BitReader<'_>,
    field: &TemplateField,
) -> ParseResult<()> {
    if !cx.condition(field.binding.condition.as_deref())? {
        return Ok(());
    }
    for skip in &field.skips {
        decode_skip(cx, reader, skip)?;
    }
    let pushed = push_params(cx, &field.params)?;
    let res = decode_bound(cx, reader, &field.binding, &field.ty);
    cx.pop_params(pushed);
    let value = res?;
    if let Some(record) = cx.current_mut() {
        record.set(field.name.as_str(), value);
    }
    Ok(())
}

/// Decodes one bound field into the current record.
pub fn decode_field(
    cx: &mut DecodeContext<'_>,
    reader: &mut BitReader<'_>,
    field: &TemplateField,
) -> ParseResult<()> {
    if !cx.in_version(field.version.as_ref()) {
        return Ok(());
    }
    trace!(field = %field.name, kind = %field.binding.tag(), at = %reader.position(), "decoding field");
    cx.enter(field.name.as_str());
    let res = decode_present(cx, reader, field);
    if res.is_err() {
        cx.note_failure(reader.byte_position());
    }
    cx.leave();
    res
}

fn encode_present(
    cx: &mut DecodeContext<'_>,
    writer: &mut BitWriter,
    field: &TemplateField,
) -> Result<(), EncodeErrorKind> {
    if !cx.condition(field.binding.condition.as_deref())? {
        return Ok(());
    }
    for skip in &field.skips {
        encode_skip(cx, writer, skip)?;
    }
    let value = match cx.current().and_then(|r| r.get(&field.name)) {
        Some(v) => v.clone(),
        // checksums are computed, never supplied
        None if matches!(field.binding.kind, BindingKind::Checksum(_)) => Value::Null,
        None => return Err(EncodeErrorKind::MissingValue),
    };
    let pushed = push_params(cx, &field.params)?;
    let res = encode_bound(cx, writer, &field.binding, &field.ty, &value);
    cx.pop_params(pushed);
    res
}

/// Encodes one bound field from the current record.
pub fn encode_field(
    cx: &mut DecodeContext<'_>,
    writer: &mut BitWriter,
    field: &TemplateField,
) -> Result<(), EncodeErrorKind> {
    if !cx.in_version(field.version.as_ref()) {
        return Ok(());
    }
    trace!(field = %field.name, kind = %field.binding.tag(), at = %writer.position(), "encoding field");
    cx.enter(field.name.as_str());
    let res = encode_present(cx, writer, field);
    if res.is_err() {
        cx.note_failure(writer.len());
    }
    cx.leave();
    res
}

/// Post-processing only rewrites values that are present.
fn is_stored(cx: &DecodeContext<'_>, name: &str) -> bool {
    cx.current().map_or(false, |r| r.contains(name))
}

fn store(cx: &mut DecodeContext<'_>, name: &str, value: Option<Value>) {
    if let (Some(value), Some(record)) = (value, cx.current_mut()) {
        record.set(name, value);
    }
}

/// Evaluates `expr` if `condition` holds, coercing the result to `ty`.
fn computed(
    cx: &DecodeContext<'_>,
    condition: Option<&str>,
    expr: &str,
    ty: &ValueType,
) -> ParseResult<Option<Value>> {
    if !cx.condition(condition)? {
        return Ok(None);
    }
    let v = cx.evaluate(expr)?;
    Ok(Some(coerce(ty, v)?))
}

fn fail_at<E>(cx: &mut DecodeContext<'_>, name: &str, offset: usize, err: E) -> Result<(), E> {
    cx.enter(name);
    cx.note_failure(offset);
    cx.leave();
    Err(err)
}

/// Computes every applicable evaluated field of `template` into the current
/// record.
pub fn apply_evaluated(cx: &mut DecodeContext<'_>, template: &Template, offset: usize) -> ParseResult<()> {
    for ev in template.evaluated() {
        if !cx.in_version(ev.version.as_ref()) {
            continue;
        }
        match computed(cx, ev.condition.as_deref(), &ev.formula, &ev.ty) {
            Ok(value) => store(cx, &ev.name, value),
            Err(e) => return fail_at(cx, &ev.name, offset, e),
        }
    }
    Ok(())
}

/// Applies the decode expression of every applicable post-processed field.
pub fn post_process_decoded(
    cx: &mut DecodeContext<'_>,
    template: &Template,
    offset: usize,
) -> ParseResult<()> {
    for pp in template.post_processed() {
        if !cx.in_version(pp.version.as_ref()) || !is_stored(cx, &pp.name) {
            continue;
        }
        match computed(cx, pp.condition.as_deref(), &pp.decode, &pp.ty) {
            Ok(value) => store(cx, &pp.name, value),
            Err(e) => return fail_at(cx, &pp.name, offset, e),
        }
    }
    Ok(())
}

/// Applies the encode expression of every applicable post-processed field
/// to the current (working) record.
pub fn post_process_for_encode(
    cx: &mut DecodeContext<'_>,
    template: &Template,
) -> Result<(), EncodeErrorKind> {
    for pp in template.post_processed() {
        if !cx.in_version(pp.version.as_ref()) || !is_stored(cx, &pp.name) {
            continue;
        }
        let res = match cx.condition(pp.condition.as_deref()) {
            Ok(false) => Ok(None),
            Ok(true) => cx.evaluate(&pp.encode).map_err(EncodeErrorKind::from).and_then(|v| {
                let found = v.kind_name();
                pp.ty.coerce(v).map(Some).ok_or_else(|| EncodeErrorKind::UnhandledType {
                    expected: pp.ty.to_string(),
                    found,
                })
            }),
            Err(e) => Err(e.into()),
        };
        match res {
            Ok(value) => store(cx, &pp.name, value),
            Err(e) => return fail_at(cx, &pp.name, 0, e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use crate::engine::Engine;
    use crate::int::ByteOrder;
    use crate::parse::error::DataIntegrityError;
    use crate::parse::ParseError;
    use crate::schema::{Binding, FieldDescriptor, Size, SkipParams, TemplateDescriptor, ValueType};
    use crate::value::Record;

    fn byte(name: &str) -> FieldDescriptor {
        FieldDescriptor::new(name, ValueType::U8)
    }

    fn octet() -> Binding {
        Binding::primitive(8, ByteOrder::BigEndian)
    }

    fn padded() -> Engine {
        let desc = TemplateDescriptor::new("Padded")
            .starts_with(b"S")
            .field(byte("f").bind(octet()))
            .field(
                byte("v")
                    .skip(SkipParams::bits(Size::expr("f * 8")).when("f >= 1"))
                    .skip(SkipParams::until(b';', true))
                    .bind(octet()),
            )
            .field(byte("tail").skip(SkipParams::until(b'|', false)).bind(octet()));
        Engine::builder().template(desc).build().unwrap()
    }

    fn record(f: u8) -> Record {
        Record::new("Padded").with("f", f).with("v", 0x50u8).with("tail", b'|')
    }

    #[test]
    fn skips_round_trip() {
        let engine = padded();
        let bytes = engine.encode_one(&record(2)).unwrap();
        assert_eq!(bytes, vec![b'S', 2, 0, 0, b';', 0x50, b'|']);
        assert_eq!(engine.decode_one("Padded", &bytes).unwrap(), record(2));

        // gated skip turned off
        let bytes = engine.encode_one(&record(0)).unwrap();
        assert_eq!(bytes, vec![b'S', 0, b';', 0x50, b'|']);
        assert_eq!(engine.decode_one("Padded", &bytes).unwrap(), record(0));
    }

    #[test]
    fn skips_pass_over_filler() {
        let engine = padded();
        let rec = engine
            .decode_one("Padded", &[b'S', 1, 0xaa, b'x', b';', 0x50, b'q', b'q', b'|'])
            .unwrap();
        assert_eq!(rec, record(1));

        let err = engine.decode_one("Padded", &[b'S', 0, 0x50]).unwrap_err();
        assert_eq!(err.path, vec!["v".to_owned()]);
        assert!(matches!(
            err.error,
            ParseError::Integrity(DataIntegrityError::MissingTerminator { .. })
        ));
    }
}
