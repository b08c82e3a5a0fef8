//! Multi-message encoding
//!
//! [`Composer::compose`] encodes a batch of records back to back into one
//! buffer. Each record is laid out by the template named by its type. A
//! record that fails to encode is rolled back (nothing it wrote remains in
//! the output) and recorded by its index; the rest of the batch is still
//! encoded.

use tracing::{debug, warn};

use super::BitWriter;
use crate::conv::message::encode_message;
use crate::conv::{DecodeContext, EncodeError, Environment, ParserOptions};
use crate::value::Record;

/// A record of the batch that failed to encode
#[derive(Clone, Debug, PartialEq)]
pub struct ComposeFailure {
    /// Position of the record in the batch
    pub index: usize,
    pub error: EncodeError,
}

/// Outcome of composing a batch
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComposeReport {
    /// Concatenated encodings of every record that succeeded
    pub bytes: Vec<u8>,
    /// In increasing index order
    pub errors: Vec<ComposeFailure>,
}

impl ComposeReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Encoder of message batches
#[derive(Debug)]
pub struct Composer<'e> {
    env: &'e Environment,
    options: ParserOptions,
}

impl<'e> Composer<'e> {
    #[must_use]
    pub fn new(env: &'e Environment) -> Self {
        Self {
            env,
            options: ParserOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn compose(&self, records: &[Record]) -> ComposeReport {
        let mut writer = BitWriter::new();
        let mut cx = DecodeContext::from_options(self.env, &self.options);
        let mut errors = Vec::new();
        for (index, record) in records.iter().enumerate() {
            cx.reset();
            writer.create_fallback_point();
            match encode_message(&mut cx, &mut writer, record) {
                Ok(()) => {
                    writer.align();
                    if let Err(e) = writer.release_fallback_point() {
                        warn!(index, error = %e, "fallback point lost");
                    }
                    debug!(index, template = record.type_name(), end = writer.len(), "message encoded");
                }
                Err(kind) => {
                    let (path, _) = cx.take_failure(writer.len());
                    let error = EncodeError::new(path, kind);
                    warn!(index, template = record.type_name(), %error, "record dropped from batch");
                    if let Err(e) = writer.restore_fallback_point() {
                        warn!(index, error = %e, "fallback point lost");
                    }
                    errors.push(ComposeFailure { index, error });
                }
            }
        }
        ComposeReport {
            bytes: writer.finish(),
            errors,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::conv::convert::ConverterRegistry;
    use crate::conv::EncodeErrorKind;
    use crate::int::ByteOrder;
    use crate::schema::{Binding, FieldDescriptor, Size, Template, TemplateDescriptor, TemplateRegistry, ValueType};

    fn env() -> Environment {
        let desc = TemplateDescriptor::new("Nibbles")
            .starts_with(b"N")
            .field(FieldDescriptor::new("hi", ValueType::U8).bind(Binding::primitive(4, ByteOrder::BigEndian)))
            .field(FieldDescriptor::new("lo", ValueType::U8).bind(Binding::primitive(3, ByteOrder::BigEndian)));
        let t = Template::build(&desc, &ConverterRegistry::default()).unwrap();
        Environment::new(TemplateRegistry::seal(vec![t]).unwrap())
    }

    #[test]
    fn failed_items_are_rolled_back() {
        let env = env();
        let ok = Record::new("Nibbles").with("hi", 0xau8).with("lo", 7u8);
        let too_wide = Record::new("Nibbles").with("hi", 1u8).with("lo", 9u8);
        let unknown = Record::new("Other");
        let report = Composer::new(&env).compose(&[ok.clone(), too_wide, unknown, ok]);
        assert_eq!(report.bytes, vec![b'N', 0xae, b'N', 0xae]);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].index, 1);
        assert_eq!(report.errors[0].error.path, vec!["lo".to_owned()]);
        assert!(matches!(report.errors[0].error.kind, EncodeErrorKind::OutOfRange(_)));
        assert_eq!(report.errors[1].index, 2);
        assert_eq!(
            report.errors[1].error.kind,
            EncodeErrorKind::UnknownTemplate("Other".into())
        );
    }

    #[test]
    fn computed_zero_width_drops_only_its_item() {
        let desc = TemplateDescriptor::new("Sized")
            .starts_with(b"S")
            .field(FieldDescriptor::new("w", ValueType::U8).bind(Binding::primitive(8, ByteOrder::BigEndian)))
            .field(FieldDescriptor::new("v", ValueType::I8).bind(Binding::primitive(Size::expr("w"), ByteOrder::BigEndian)));
        let t = Template::build(&desc, &ConverterRegistry::default()).unwrap();
        let env = Environment::new(TemplateRegistry::seal(vec![t]).unwrap());
        let empty = Record::new("Sized").with("w", 0u8).with("v", 0i8);
        let nibble = Record::new("Sized").with("w", 4u8).with("v", -1i8);
        let report = Composer::new(&env).compose(&[empty, nibble]);
        assert_eq!(report.bytes, vec![b'S', 4, 0xf0]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].index, 0);
        assert_eq!(report.errors[0].error.path, vec!["v".to_owned()]);
        assert!(matches!(report.errors[0].error.kind, EncodeErrorKind::OutOfRange(_)));
    }
}
