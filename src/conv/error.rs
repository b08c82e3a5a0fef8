//! Per-call errors of the decode and encode paths
//!
//! A [`DecodeError`] wraps the low-level [`ParseError`] together with the
//! byte offset and the field path at which decoding failed. An
//! [`EncodeError`] does the same for the encoding direction, where the
//! failure classes are those of [`EncodeErrorKind`].

use std::error::Error;
use std::fmt::{Display, Formatter};

use num_bigint::BigInt;

use crate::charset::CharsetError;
use crate::error::{BoundsError, CodecNotFoundError};
use crate::expr::ExpressionError;
use crate::parse::error::{InternalError, ParseError};

fn write_path(f: &mut Formatter<'_>, path: &[String]) -> std::fmt::Result {
    if path.is_empty() {
        Ok(())
    } else {
        write!(f, " in `{}`", path.join("."))
    }
}

/// Failure to decode one message
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    /// Byte offset of the read head when the failure occurred
    pub offset: usize,
    /// Field names (and element indices) leading to the failing field
    pub path: Vec<String>,
    pub error: ParseError,
}

impl DecodeError {
    pub fn new(offset: usize, path: Vec<String>, error: impl Into<ParseError>) -> Self {
        Self {
            offset,
            path,
            error: error.into(),
        }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "decode failed at byte {}", self.offset)?;
        write_path(f, &self.path)?;
        write!(f, ": {}", self.error)
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Type alias for Result with an error type of [`DecodeError`]
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Reasons a value cannot be written
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeErrorKind {
    /// The record has no value for a bound field whose condition holds
    MissingValue,
    /// The value's variant does not fit the binding
    UnhandledType {
        expected: String,
        found: &'static str,
    },
    /// The value does not fit the declared bit width
    OutOfRange(String),
    Charset(CharsetError),
    Expression(ExpressionError),
    Conversion { converter: String, reason: String },
    /// No alternative of a choice produces a record of this concrete type
    Selection { base: String, type_name: String },
    UnknownTemplate(String),
    CodecNotFound(CodecNotFoundError),
    /// A collection or fixed string does not have the declared length
    LengthMismatch { expected: usize, found: usize },
    /// Terminated text or a terminated list contains its own terminator
    EmbeddedTerminator { terminator: u8 },
    Internal(InternalError),
}

impl Display for EncodeErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingValue => write!(f, "no value supplied"),
            Self::UnhandledType { expected, found } => {
                write!(f, "cannot write {found} value as {expected}")
            }
            Self::OutOfRange(reason) => write!(f, "value out of range: {reason}"),
            Self::Charset(err) => Display::fmt(err, f),
            Self::Expression(err) => Display::fmt(err, f),
            Self::Conversion { converter, reason } => {
                write!(f, "converter `{converter}` failed: {reason}")
            }
            Self::Selection { base, type_name } => write!(
                f,
                "no alternative of `{base}` encodes a record of type `{type_name}`"
            ),
            Self::UnknownTemplate(name) => write!(f, "no template registered for type `{name}`"),
            Self::CodecNotFound(err) => Display::fmt(err, f),
            Self::LengthMismatch { expected, found } => {
                write!(f, "expected length {expected}, found {found}")
            }
            Self::EmbeddedTerminator { terminator } => {
                write!(f, "value contains its terminator 0x{terminator:02x}")
            }
            Self::Internal(err) => Display::fmt(err, f),
        }
    }
}

impl From<CharsetError> for EncodeErrorKind {
    fn from(err: CharsetError) -> Self {
        Self::Charset(err)
    }
}

impl From<ExpressionError> for EncodeErrorKind {
    fn from(err: ExpressionError) -> Self {
        Self::Expression(err)
    }
}

impl From<CodecNotFoundError> for EncodeErrorKind {
    fn from(err: CodecNotFoundError) -> Self {
        Self::CodecNotFound(err)
    }
}

impl From<InternalError> for EncodeErrorKind {
    fn from(err: InternalError) -> Self {
        Self::Internal(err)
    }
}

impl From<BoundsError<i128>> for EncodeErrorKind {
    fn from(err: BoundsError<i128>) -> Self {
        Self::OutOfRange(err.to_string())
    }
}

impl From<BoundsError<BigInt>> for EncodeErrorKind {
    fn from(err: BoundsError<BigInt>) -> Self {
        Self::OutOfRange(err.to_string())
    }
}

/// Failure to encode one record
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeError {
    pub path: Vec<String>,
    pub kind: EncodeErrorKind,
}

impl EncodeError {
    pub fn new(path: Vec<String>, kind: impl Into<EncodeErrorKind>) -> Self {
        Self {
            path,
            kind: kind.into(),
        }
    }
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "encode failed")?;
        write_path(f, &self.path)?;
        write!(f, ": {}", self.kind)
    }
}

impl Error for EncodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            EncodeErrorKind::Charset(err) => Some(err),
            EncodeErrorKind::Expression(err) => Some(err),
            EncodeErrorKind::CodecNotFound(err) => Some(err),
            EncodeErrorKind::Internal(err) => Some(err),
            _ => None,
        }
    }
}

/// Type alias for Result with an error type of [`EncodeError`]
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;
