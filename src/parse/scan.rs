//! Multi-message decoding with resynchronization
//!
//! [`MessageParser::parse`] walks a buffer holding any number of messages.
//! At each position the template whose start pattern matches is selected
//! and decoded in full. When a decode fails, the reader is rewound to the
//! start of the failed message, the failure is recorded, and scanning
//! resumes at the earliest later position where any known start pattern
//! occurs. The head strictly advances on every iteration, so the parser
//! always terminates.
//!
//! When start patterns of several templates match at the same position,
//! the longest pattern wins, then the template registered first.

use std::sync::Arc;

use tracing::{debug, warn};

use super::error::TokenError;
use super::{BitReader, ParseResult};
use crate::conv::message::decode_message;
use crate::conv::{DecodeContext, DecodeError, Environment, ParserOptions};
use crate::error::{SchemaError, SchemaErrorKind, SchemaResult};
use crate::internal::BitIndex;
use crate::matcher::{HeaderMatcher, PatternMatcher};
use crate::schema::{Template, TemplateRegistry};
use crate::value::Record;

/// Start patterns of every message template, in registration order
#[derive(Clone, Debug, Default)]
pub struct HeaderIndex {
    templates: Vec<Arc<Template>>,
    matchers: Vec<HeaderMatcher>,
}

impl HeaderIndex {
    /// Indexes the start patterns of every template that has any.
    ///
    /// # Errors
    ///
    /// Fails if a start pattern cannot be searched for, which templates
    /// built through [`Template::build`] rule out.
    pub fn new(templates: &TemplateRegistry) -> SchemaResult<Self> {
        let mut index = Self::default();
        for t in templates.iter().filter(|t| t.is_message()) {
            let header = t.header();
            for start in &header.starts {
                let matcher = HeaderMatcher::new(start, header.wildcard)
                    .map_err(|e| SchemaError::new(t.name(), SchemaErrorKind::HeaderPattern(e)))?;
                index.matchers.push(matcher);
            }
            index.templates.push(Arc::clone(t));
        }
        Ok(index)
    }

    /// Number of indexed start patterns
    #[must_use]
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Template whose start pattern matches at the reader's head.
    #[must_use]
    pub fn select(&self, reader: &BitReader<'_>) -> Option<&Arc<Template>> {
        let mut best: Option<(usize, &Arc<Template>)> = None;
        for t in &self.templates {
            if let Some(len) = t.header().longest_match(reader) {
                if best.map_or(true, |(b, _)| len > b) {
                    best = Some((len, t));
                }
            }
        }
        best.map(|(_, t)| t)
    }

    /// Earliest position `>= from` at which any start pattern occurs.
    #[must_use]
    pub fn next_candidate(&self, source: &[u8], from: usize) -> Option<usize> {
        self.matchers
            .iter()
            .filter_map(|m| m.find(source, from))
            .min()
    }
}

/// A message decoded at `offset`
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    pub offset: usize,
    pub record: Record,
}

/// A message that failed to decode at `offset`
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeFailure {
    pub offset: usize,
    pub error: DecodeError,
}

/// Outcome of parsing a buffer
///
/// Both lists are in increasing offset order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParseReport {
    pub successes: Vec<Decoded>,
    pub errors: Vec<DecodeFailure>,
}

impl ParseReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Decoded records, dropping offsets
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.successes.iter().map(|d| &d.record)
    }
}

/// Decoder of message streams
#[derive(Debug)]
pub struct MessageParser<'e> {
    env: &'e Environment,
    headers: &'e HeaderIndex,
    options: ParserOptions,
}

impl<'e> MessageParser<'e> {
    #[must_use]
    pub fn new(env: &'e Environment, headers: &'e HeaderIndex) -> Self {
        Self {
            env,
            headers,
            options: ParserOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Decodes every message in `bytes`, recording failures instead of
    /// stopping at them.
    #[must_use]
    pub fn parse(&self, bytes: &[u8]) -> ParseReport {
        let mut reader = BitReader::new(bytes);
        let mut cx = DecodeContext::from_options(self.env, &self.options);
        let mut report = ParseReport::default();
        if let Err(error) = self.scan(&mut cx, &mut reader, &mut report) {
            // only reachable through unbalanced fallback points
            let offset = reader.byte_position();
            report.errors.push(DecodeFailure {
                offset,
                error: DecodeError::new(offset, Vec::new(), error),
            });
        }
        if report.errors.is_empty() && reader.has_remaining() {
            let offset = reader.byte_position();
            let remaining = reader.remaining_bytes();
            warn!(offset, remaining, "trailing bytes after last message");
            report.errors.push(DecodeFailure {
                offset,
                error: DecodeError::new(offset, Vec::new(), TokenError::TrailingData { remaining }),
            });
        }
        report
    }

    fn scan(
        &self,
        cx: &mut DecodeContext<'_>,
        reader: &mut BitReader<'_>,
        report: &mut ParseReport,
    ) -> ParseResult<()> {
        let bytes = reader.buffer();
        while reader.has_remaining() {
            let offset = reader.byte_position();
            let Some(template) = self.headers.select(reader) else {
                // leave the bytes unread when nothing follows, so that they
                // count as trailing data
                let Some(next) = self.headers.next_candidate(bytes, offset + 1) else {
                    break;
                };
                Self::record_failure(
                    report,
                    offset,
                    DecodeError::new(offset, Vec::new(), TokenError::NoHeaderMatch { found: reader.peek_byte() }),
                );
                reader.seek(BitIndex::from(8 * next))?;
                continue;
            };
            cx.reset();
            reader.create_fallback_point();
            match Self::attempt(cx, reader, template, offset) {
                Ok(record) => {
                    reader.release_fallback_point()?;
                    debug!(template = template.name(), offset, end = reader.byte_position(), "message decoded");
                    report.successes.push(Decoded { offset, record });
                }
                Err(error) => {
                    reader.restore_fallback_point()?;
                    let (path, at) = cx.take_failure(offset);
                    Self::record_failure(report, offset, DecodeError::new(at, path, error));
                    match self.headers.next_candidate(bytes, offset + 1) {
                        Some(next) => reader.seek(BitIndex::from(8 * next))?,
                        None => {
                            reader.seek(BitIndex::from(8 * bytes.len()))?;
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn attempt(
        cx: &mut DecodeContext<'_>,
        reader: &mut BitReader<'_>,
        template: &Template,
        offset: usize,
    ) -> ParseResult<Record> {
        let record = decode_message(cx, reader, template)?;
        reader.align()?;
        if reader.byte_position() <= offset {
            return Err(TokenError::NoProgress {
                template: template.name().to_owned(),
            }
            .into());
        }
        Ok(record)
    }

    fn record_failure(report: &mut ParseReport, offset: usize, error: DecodeError) {
        warn!(offset, %error, "message rejected, resynchronizing");
        report.errors.push(DecodeFailure { offset, error });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::conv::convert::ConverterRegistry;
    use crate::int::ByteOrder;
    use crate::parse::ParseError;
    use crate::schema::{Binding, ChecksumParams, FieldDescriptor, TemplateDescriptor, ValueType};
    use crate::value::Value;

    fn registry(descs: &[TemplateDescriptor]) -> TemplateRegistry {
        let templates = descs
            .iter()
            .map(|d| Template::build(d, &ConverterRegistry::default()).unwrap())
            .collect();
        TemplateRegistry::seal(templates).unwrap()
    }

    fn byte(name: &str) -> FieldDescriptor {
        FieldDescriptor::new(name, ValueType::U8).bind(Binding::primitive(8, ByteOrder::BigEndian))
    }

    fn setup(descs: &[TemplateDescriptor]) -> (Environment, HeaderIndex) {
        let env = Environment::new(registry(descs));
        let headers = HeaderIndex::new(&env.templates).unwrap();
        (env, headers)
    }

    #[test]
    fn longest_start_then_registration_order() {
        let (env, headers) = setup(&[
            TemplateDescriptor::new("Short").starts_with(b"AB").field(byte("v")),
            TemplateDescriptor::new("Long").starts_with(b"ABC").field(byte("v")),
            TemplateDescriptor::new("Twin").starts_with(b"ABC").field(byte("v")),
        ]);
        assert_eq!(headers.len(), 3);
        let r = BitReader::new(b"ABC\x01");
        assert_eq!(headers.select(&r).map(|t| t.name()), Some("Long"));
        let r = BitReader::new(b"ABX\x01");
        assert_eq!(headers.select(&r).map(|t| t.name()), Some("Short"));

        let report = MessageParser::new(&env, &headers).parse(b"ABC\x01");
        assert!(report.is_clean());
        assert_eq!(report.successes[0].record.type_name(), "Long");
    }

    #[test]
    fn resynchronizes_after_garbage() {
        let (env, headers) = setup(&[TemplateDescriptor::new("M")
            .starts_with(b"\x7e")
            .field(byte("a"))
            .field(FieldDescriptor::new("crc", ValueType::U8).checksum(ChecksumParams::new("sum8", 8).skip(1, 1)))]);
        let bytes = [0x7e, 5, 5, 0x00, 0x7e, 0x13, 0x7e, 9, 9];
        let report = MessageParser::new(&env, &headers).parse(&bytes);
        let offsets: Vec<_> = report.successes.iter().map(|d| d.offset).collect();
        assert_eq!(offsets, vec![0, 6]);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].offset, 3);
        assert!(matches!(
            report.errors[0].error.error,
            ParseError::Token(TokenError::NoHeaderMatch { found: Some(0) })
        ));
        assert_eq!(report.errors[1].offset, 4);
        assert!(matches!(report.errors[1].error.error, ParseError::Integrity(_)));
        assert_eq!(report.successes[1].record.get("a"), Some(&Value::UInt(9)));
    }

    #[test]
    fn trailing_bytes_reported_once() {
        let (env, headers) = setup(&[TemplateDescriptor::new("M").starts_with(b"\x7e").field(byte("a"))]);
        let report = MessageParser::new(&env, &headers).parse(&[0x7e, 1, 0xff, 0xff]);
        assert_eq!(report.successes.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].offset, 2);
        assert_eq!(
            report.errors[0].error.error,
            ParseError::Token(TokenError::TrailingData { remaining: 2 })
        );
    }

    #[test]
    fn truncated_final_message() {
        let (env, headers) = setup(&[TemplateDescriptor::new("M").starts_with(b"\x7e").field(byte("a")).field(byte("b"))]);
        let report = MessageParser::new(&env, &headers).parse(&[0x7e, 1, 2, 0x7e, 3]);
        assert_eq!(report.successes.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].offset, 3);
        assert_eq!(report.errors[0].error.path, vec!["b".to_owned()]);
    }
}
