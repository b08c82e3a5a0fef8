//! Top-level entry point
//!
//! An [`Engine`] is built once from template descriptors (plus any custom
//! converters, validators, codecs or evaluator) through an
//! [`EngineBuilder`], after which it is immutable and cheap to clone and
//! share between threads. Each call creates its own reader or writer and
//! [`DecodeContext`].

use std::sync::Arc;

use tracing::info;

use crate::builder::compose::{ComposeReport, Composer};
use crate::builder::BitWriter;
use crate::conv::convert::{Converter, ConverterRegistry, Validator};
use crate::conv::message::{decode_message, encode_message};
use crate::conv::{
    Codec, CodecRegistry, DecodeContext, DecodeError, DecodeResult, EncodeError, EncodeResult,
    Environment, ParserOptions,
};
use crate::error::SchemaResult;
use crate::expr::{Evaluator, SimpleEvaluator};
use crate::parse::error::ExternalError;
use crate::parse::scan::{HeaderIndex, MessageParser, ParseReport};
use crate::parse::BitReader;
use crate::schema::{Template, TemplateDescriptor, TemplateRegistry};
use crate::value::Record;

/// Collects the configuration of an [`Engine`]
#[derive(Debug)]
pub struct EngineBuilder {
    descriptors: Vec<TemplateDescriptor>,
    converters: ConverterRegistry,
    codecs: CodecRegistry,
    evaluator: Arc<dyn Evaluator>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            descriptors: Vec::new(),
            converters: ConverterRegistry::with_builtins(),
            codecs: CodecRegistry::with_defaults(),
            evaluator: Arc::new(SimpleEvaluator),
        }
    }
}

impl EngineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template. Registration order breaks ties between templates
    /// whose start patterns match at the same position.
    #[must_use]
    pub fn template(mut self, desc: TemplateDescriptor) -> Self {
        self.descriptors.push(desc);
        self
    }

    #[must_use]
    pub fn templates(mut self, descs: impl IntoIterator<Item = TemplateDescriptor>) -> Self {
        self.descriptors.extend(descs);
        self
    }

    #[must_use]
    pub fn converter(mut self, id: impl Into<String>, converter: Arc<dyn Converter>) -> Self {
        self.converters.register_converter(id, converter);
        self
    }

    #[must_use]
    pub fn validator(mut self, id: impl Into<String>, validator: Arc<dyn Validator>) -> Self {
        self.converters.register_validator(id, validator);
        self
    }

    /// Replaces the codec of one binding kind.
    #[must_use]
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codecs.register(codec);
        self
    }

    #[must_use]
    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Validates every template and seals them into an engine.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`](crate::error::SchemaError) found;
    /// no partially-built engine is ever produced.
    pub fn build(self) -> SchemaResult<Engine> {
        let templates = self
            .descriptors
            .iter()
            .map(|d| Template::build(d, &self.converters))
            .collect::<SchemaResult<Vec<_>>>()?;
        let templates = TemplateRegistry::seal(templates)?;
        let headers = HeaderIndex::new(&templates)?;
        info!(templates = templates.len(), start_patterns = headers.len(), "engine built");
        let env = Environment {
            templates,
            codecs: self.codecs,
            converters: self.converters,
            evaluator: self.evaluator,
        };
        Ok(Engine {
            inner: Arc::new(Inner { env, headers }),
        })
    }
}

#[derive(Debug)]
struct Inner {
    env: Environment,
    headers: HeaderIndex,
}

/// Immutable, shareable decoder and encoder of a set of message templates
#[derive(Clone, Debug)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.inner.env
    }

    #[must_use]
    pub fn template(&self, name: &str) -> Option<&Arc<Template>> {
        self.inner.env.templates.get(name)
    }

    /// Decodes every message in `bytes`.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> ParseReport {
        self.decode_with(bytes, ParserOptions::default())
    }

    #[must_use]
    pub fn decode_with(&self, bytes: &[u8], options: ParserOptions) -> ParseReport {
        MessageParser::new(&self.inner.env, &self.inner.headers)
            .with_options(options)
            .parse(bytes)
    }

    /// Encodes `records` back to back.
    #[must_use]
    pub fn compose(&self, records: &[Record]) -> ComposeReport {
        self.compose_with(records, ParserOptions::default())
    }

    #[must_use]
    pub fn compose_with(&self, records: &[Record], options: ParserOptions) -> ComposeReport {
        Composer::new(&self.inner.env).with_options(options).compose(records)
    }

    /// Decodes a single message of the named type from the start of `bytes`.
    ///
    /// If the feature-flag `check_complete_parse` is enabled, bytes left
    /// over after the message are reported as an error.
    pub fn decode_one(&self, type_name: &str, bytes: &[u8]) -> DecodeResult<Record> {
        self.decode_one_with(type_name, bytes, &ParserOptions::default())
    }

    pub fn decode_one_with(
        &self,
        type_name: &str,
        bytes: &[u8],
        options: &ParserOptions,
    ) -> DecodeResult<Record> {
        let template = self
            .template(type_name)
            .ok_or_else(|| DecodeError::new(0, Vec::new(), ExternalError::UnknownTemplate(type_name.to_owned())))?;
        let mut reader = BitReader::new(bytes);
        let mut cx = DecodeContext::from_options(&self.inner.env, options);
        match decode_message(&mut cx, &mut reader, template) {
            Ok(record) => {
                Self::check_complete(&mut reader)?;
                Ok(record)
            }
            Err(error) => {
                let (path, at) = cx.take_failure(reader.byte_position());
                Err(DecodeError::new(at, path, error))
            }
        }
    }

    cfg_if::cfg_if! {
        if #[cfg(feature = "check_complete_parse")] {
            fn check_complete(reader: &mut BitReader<'_>) -> DecodeResult<()> {
                use crate::parse::error::TokenError;

                let at = reader.byte_position();
                reader.align().map_err(|e| DecodeError::new(at, Vec::new(), e))?;
                if reader.has_remaining() {
                    let remaining = reader.remaining_bytes();
                    return Err(DecodeError::new(
                        reader.byte_position(),
                        Vec::new(),
                        TokenError::TrailingData { remaining },
                    ));
                }
                Ok(())
            }
        } else {
            fn check_complete(_reader: &mut BitReader<'_>) -> DecodeResult<()> {
                Ok(())
            }
        }
    }

    /// Encodes a single record as one framed message.
    pub fn encode_one(&self, record: &Record) -> EncodeResult<Vec<u8>> {
        self.encode_one_with(record, &ParserOptions::default())
    }

    pub fn encode_one_with(&self, record: &Record, options: &ParserOptions) -> EncodeResult<Vec<u8>> {
        let mut writer = BitWriter::new();
        let mut cx = DecodeContext::from_options(&self.inner.env, options);
        match encode_message(&mut cx, &mut writer, record) {
            Ok(()) => Ok(writer.finish()),
            Err(kind) => {
                let (path, _) = cx.take_failure(writer.len());
                Err(EncodeError::new(path, kind))
            }
        }
    }
}
