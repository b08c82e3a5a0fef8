//! Text fields, fixed-size and terminated
//!
//! A fixed-size string occupies exactly its declared number of bytes: it is
//! padded with NUL bytes on encode, and trailing NULs are stripped on
//! decode. A terminated string runs up to the first occurrence of its
//! terminator byte, which is consumed (and written) only when the binding
//! says so.

use super::context::DecodeContext;
use super::error::EncodeErrorKind;
use super::{charset, mismatch, Codec};
use crate::builder::BitWriter;
use crate::parse::{BitReader, ParseResult};
use crate::schema::{Binding, BindingKind, BindingTag, ValueType};
use crate::value::Value;

fn text(value: &Value) -> Result<&str, EncodeErrorKind> {
    value.as_str().ok_or_else(|| EncodeErrorKind::UnhandledType {
        expected: ValueType::Text.to_string(),
        found: value.kind_name(),
    })
}

/// Codec for [`BindingKind::StringFixed`]
#[derive(Clone, Copy, Debug, Default)]
pub struct StringFixedCodec;

impl Codec for StringFixedCodec {
    fn tag(&self) -> BindingTag {
        BindingTag::StringFixed
    }

    fn decode(
        &self,
        cx: &mut DecodeContext<'_>,
        reader: &mut BitReader<'_>,
        binding: &Binding,
        _ty: &ValueType,
    ) -> ParseResult<Value> {
        let BindingKind::StringFixed { size, charset: name } = &binding.kind else {
            return Err(mismatch(self.tag()).into());
        };
        let cs = charset(name)?;
        let n = cx.size(size)?;
        let mut s = reader.read_text(n, cs)?;
        s.truncate(s.trim_end_matches('\0').len());
        Ok(Value::Text(s))
    }

    fn encode(
        &self,
        cx: &mut DecodeContext<'_>,
        writer: &mut BitWriter,
        binding: &Binding,
        _ty: &ValueType,
        value: &Value,
    ) -> Result<(), EncodeErrorKind> {
        let BindingKind::StringFixed { size, charset: name } = &binding.kind else {
            return Err(mismatch(self.tag()).into());
        };
        let cs = charset(name)?;
        let n = cx.size(size)?;
        let bytes = cs.encode(text(value)?)?;
        if bytes.len() > n {
            return Err(EncodeErrorKind::LengthMismatch {
                expected: n,
                found: bytes.len(),
            });
        }
        let pad = (n - bytes.len())
            .checked_mul(8)
            .ok_or_else(|| EncodeErrorKind::OutOfRange(format!("{n} bytes of padding")))?;
        writer.write_bytes(&bytes);
        writer.skip_bits(pad);
        Ok(())
    }
}

/// Codec for [`BindingKind::StringTerminated`]
#[derive(Clone, Copy, Debug, Default)]
pub struct StringTerminatedCodec;

impl Codec for StringTerminatedCodec {
    fn tag(&self) -> BindingTag {
        BindingTag::StringTerminated
    }

    fn decode(
        &self,
        _cx: &mut DecodeContext<'_>,
        reader: &mut BitReader<'_>,
        binding: &Binding,
        _ty: &ValueType,
    ) -> ParseResult<Value> {
        let BindingKind::StringTerminated {
            terminator,
            consume,
            charset: name,
        } = &binding.kind
        else {
            return Err(mismatch(self.tag()).into());
        };
        let cs = charset(name)?;
        Ok(Value::Text(reader.read_text_until(*terminator, *consume, cs)?))
    }

    fn encode(
        &self,
        _cx: &mut DecodeContext<'_>,
        writer: &mut BitWriter,
        binding: &Binding,
        _ty: &ValueType,
        value: &Value,
    ) -> Result<(), EncodeErrorKind> {
        let BindingKind::StringTerminated {
            terminator,
            consume,
            charset: name,
        } = &binding.kind
        else {
            return Err(mismatch(self.tag()).into());
        };
        let cs = charset(name)?;
        let bytes = cs.encode(text(value)?)?;
        if bytes.contains(terminator) {
            return Err(EncodeErrorKind::EmbeddedTerminator {
                terminator: *terminator,
            });
        }
        writer.write_bytes(&bytes);
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
    use crate::schema::TemplateRegistry;

    #[test]
    fn fixed_strings_pad_and_strip() {
        let env = Environment::new(TemplateRegistry::default());
        let mut cx = DecodeContext::new(&env, None);
        let b = Binding::string(6, "US-ASCII");
        let mut w = BitWriter::new();
        StringFixedCodec
            .encode(&mut cx, &mut w, &b, &ValueType::Text, &Value::from("abc"))
            .unwrap();
        let bytes = w.finish();
        assert_eq!(bytes, b"abc\0\0\0".to_vec());
        let mut r = BitReader::new(&bytes);
        let v = StringFixedCodec.decode(&mut cx, &mut r, &b, &ValueType::Text).unwrap();
        assert_eq!(v, Value::from("abc"));

        let mut w = BitWriter::new();
        assert_eq!(
            StringFixedCodec.encode(&mut cx, &mut w, &b, &ValueType::Text, &Value::from("toolong")),
            Err(EncodeErrorKind::LengthMismatch { expected: 6, found: 7 })
        );
    }

    #[test]
    fn terminated_strings() {
        let env = Environment::new(TemplateRegistry::default());
        let mut cx = DecodeContext::new(&env, None);
        let b = Binding::string_until(b',', true, "UTF-8");
        let mut r = BitReader::new(b"GPS,rest");
        let v = StringTerminatedCodec.decode(&mut cx, &mut r, &b, &ValueType::Text).unwrap();
        assert_eq!(v, Value::from("GPS"));
        assert_eq!(r.byte_position(), 4);

        let mut w = BitWriter::new();
        StringTerminatedCodec
            .encode(&mut cx, &mut w, &b, &ValueType::Text, &v)
            .unwrap();
        assert_eq!(w.finish(), b"GPS,".to_vec());

        let mut w = BitWriter::new();
        assert_eq!(
            StringTerminatedCodec.encode(&mut cx, &mut w, &b, &ValueType::Text, &Value::from("a,b")),
            Err(EncodeErrorKind::EmbeddedTerminator { terminator: b',' })
        );
    }
}
