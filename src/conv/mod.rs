//! Core of the transcoding API
//!
//! This module contains the [`Codec`] trait, which is the unit of dispatch
//! between a field's [`Binding`] and the bit-level reader and writer, and the
//! [`CodecRegistry`] that maps each [`BindingTag`] to the codec handling it.
//!
//! One codec is provided for every binding kind; callers may replace any of
//! them through [`CodecRegistry::register`]. A codec sees the *wire* type of
//! the field (the input type of the field's converter, if it declares one,
//! and its declared type otherwise) and produces or consumes a raw
//! [`Value`]. Everything that is common to every kind (version gate,
//! conditions, skips, context parameters, conversion, validation) lives in
//! [`field`], and whole-template processing lives in [`message`].
//!
//! The submodule [`convert`] defines converters and validators, and
//! [`context`] defines the per-call [`DecodeContext`].

pub mod bitset;
pub mod checksum;
pub mod collection;
pub mod context;
pub mod convert;
pub mod error;
pub mod field;
pub mod message;
pub mod object;
pub mod primitive;
pub mod string;

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

pub use context::{DecodeContext, Environment, ParserOptions};
pub use error::{DecodeError, DecodeResult, EncodeError, EncodeErrorKind, EncodeResult};

use crate::builder::BitWriter;
use crate::charset::Charset;
use crate::error::CodecNotFoundError;
use crate::parse::error::InternalError;
use crate::parse::{BitReader, ParseResult};
use crate::schema::{Binding, BindingTag, ValueType};
use crate::value::Value;

/// Reader and writer of one binding kind
///
/// Implementations must be stateless with respect to individual calls: all
/// per-call state lives in the [`DecodeContext`].
pub trait Codec: Send + Sync + Debug {
    /// Binding kind this codec handles
    fn tag(&self) -> BindingTag;

    /// Reads the raw value of `binding` at the reader's head.
    fn decode(
        &self,
        cx: &mut DecodeContext<'_>,
        reader: &mut BitReader<'_>,
        binding: &Binding,
        ty: &ValueType,
    ) -> ParseResult<Value>;

    /// Writes `value` as laid out by `binding`.
    fn encode(
        &self,
        cx: &mut DecodeContext<'_>,
        writer: &mut BitWriter,
        binding: &Binding,
        ty: &ValueType,
        value: &Value,
    ) -> Result<(), EncodeErrorKind>;
}

/// Codec lookup by binding kind
#[derive(Clone, Debug, Default)]
pub struct CodecRegistry {
    codecs: HashMap<BindingTag, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// Registry with no codecs; every lookup fails until codecs are added
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in codec for every binding kind
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut reg = Self::empty();
        reg.register(Arc::new(primitive::PrimitiveCodec));
        reg.register(Arc::new(bitset::BitSetCodec));
        reg.register(Arc::new(string::StringFixedCodec));
        reg.register(Arc::new(string::StringTerminatedCodec));
        reg.register(Arc::new(collection::ArrayCodec));
        reg.register(Arc::new(collection::ListCodec));
        reg.register(Arc::new(object::ObjectCodec));
        reg.register(Arc::new(object::ChoiceListCodec));
        reg.register(Arc::new(checksum::ChecksumCodec));
        reg
    }

    /// Installs `codec` for its binding kind, returning the one it replaces.
    pub fn register(&mut self, codec: Arc<dyn Codec>) -> Option<Arc<dyn Codec>> {
        self.codecs.insert(codec.tag(), codec)
    }

    pub fn get(&self, tag: BindingTag) -> Result<&Arc<dyn Codec>, CodecNotFoundError> {
        self.codecs.get(&tag).ok_or(CodecNotFoundError { kind: tag })
    }
}

pub(crate) fn mismatch(codec: BindingTag) -> InternalError {
    InternalError::BindingMismatch { codec }
}

/// Resolves a charset name already validated at template build.
pub(crate) fn charset(name: &str) -> Result<Charset, InternalError> {
    Charset::for_name(name).ok_or_else(|| InternalError::UnresolvedCharset(name.to_owned()))
}
