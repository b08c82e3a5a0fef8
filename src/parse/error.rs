//! Error types used to report failure while decoding
//!
//! This module contains a hierarchy of types representing specific
//! classes of error that may arise while a [`BitReader`](crate::parse::BitReader)
//! is driven by the codec layer. Errors of these types are wrapped, along with
//! the byte offset and field path at which they occurred, into a
//! [`DecodeError`](crate::conv::error::DecodeError) before they are reported
//! to callers.
//!
//! # Layout
//!
//! This module defines the primary type `ParseError` and the alias
//! `ParseResult<T>`; it additionally defines various type-level refinements of
//! `ParseError`, grouped according to similar provenance or nature.

use std::error::Error;
use std::fmt::{Display, Formatter, Result};

use crate::charset::CharsetError;
use crate::error::CodecNotFoundError;
use crate::expr::ExpressionError;
use crate::schema::BindingTag;

/// Enumeration type over all errors that may be encountered while
/// decoding a single message.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Error class encountered when a read would run past the buffer
    Buffer(BufferError),
    /// Error class encountered when the raw content of the buffer does not
    /// have the lexical shape the schema requires (no header, trailing bytes)
    Token(TokenError),
    /// Error class encountered when no alternative of a discriminated choice
    /// can be selected
    Selection(SelectionError),
    /// Error class encountered when low-level reading succeeds but the value
    /// is rejected by a converter, validator, expression, or type check
    External(ExternalError),
    /// Error class encountered when the message is structurally readable but
    /// fails an integrity check (checksum, terminator)
    Integrity(DataIntegrityError),
    /// No codec is registered for a binding kind used by the schema
    CodecNotFound(CodecNotFoundError),
    /// Error class encountered when internal invariants are violated
    Internal(InternalError),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            ParseError::Buffer(err) => Display::fmt(err, f),
            ParseError::Token(err) => Display::fmt(err, f),
            ParseError::Selection(err) => Display::fmt(err, f),
            ParseError::External(err) => Display::fmt(err, f),
            ParseError::Integrity(err) => Display::fmt(err, f),
            ParseError::CodecNotFound(err) => Display::fmt(err, f),
            ParseError::Internal(err) => Display::fmt(err, f),
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParseError::Buffer(err) => Some(err),
            ParseError::Token(err) => Some(err),
            ParseError::Selection(err) => Some(err),
            ParseError::External(err) => Some(err),
            ParseError::Integrity(err) => Some(err),
            ParseError::CodecNotFound(err) => Some(err),
            ParseError::Internal(err) => Some(err),
        }
    }
}

/// Type alias for Result with an error type of [`ParseError`]
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Errors related to the extent of the input buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// A read of `requested` bits starting at bit `position` would run past
    /// the end of the buffer, where only `available` bits remain.
    Underflow {
        position: usize,
        requested: usize,
        available: usize,
    },
    /// An attempt was made to move the read head beyond the buffer.
    SeekOutOfRange { target: usize, limit: usize },
}

impl From<BufferError> for ParseError {
    fn from(err: BufferError) -> Self {
        Self::Buffer(err)
    }
}

impl Display for BufferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match *self {
            BufferError::Underflow {
                position,
                requested,
                available,
            } => {
                if available == 0 {
                    write!(
                        f,
                        "buffer underflow: cannot read {} bits at bit {}, buffer fully consumed",
                        requested, position
                    )
                } else {
                    write!(
                        f,
                        "buffer underflow: cannot read {} bits at bit {}, only {} remain",
                        requested, position, available
                    )
                }
            }
            BufferError::SeekOutOfRange { target, limit } => {
                write!(f, "cannot seek to bit {} beyond buffer limit {}", target, limit)
            }
        }
    }
}

impl Error for BufferError {}

/// Errors arising from unexpected bytes in the stream, at the level of
/// whole messages rather than individual fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// No known template header starts at this position
    NoHeaderMatch { found: Option<u8> },
    /// Decoding finished cleanly but bytes were left over
    TrailingData { remaining: usize },
    /// A template decoded successfully without consuming any input
    NoProgress { template: String },
}

impl From<TokenError> for ParseError {
    fn from(err: TokenError) -> Self {
        Self::Token(err)
    }
}

impl Display for TokenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            TokenError::NoHeaderMatch { found: Some(byte) } => {
                write!(f, "no template header matches at byte 0x{byte:02x}")
            }
            TokenError::NoHeaderMatch { found: None } => {
                write!(f, "no template header matches at end of input")
            }
            TokenError::TrailingData { remaining } => {
                write!(f, "{remaining} unread bytes remain after the last message")
            }
            TokenError::NoProgress { template } => {
                write!(f, "template `{template}` decoded without consuming input")
            }
        }
    }
}

impl Error for TokenError {}

/// Failure to pick an alternative of a discriminated choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionError {
    /// Declared base type of the choice
    pub base: String,
    /// Tag value read from the prefix, if the choice has one
    pub tag: Option<u64>,
}

impl From<SelectionError> for ParseError {
    fn from(err: SelectionError) -> Self {
        Self::Selection(err)
    }
}

impl Display for SelectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self.tag {
            Some(tag) => write!(
                f,
                "no alternative of `{}` matches tag {:#x} and no default type is declared",
                self.base, tag
            ),
            None => write!(
                f,
                "no alternative of `{}` matches and no default type is declared",
                self.base
            ),
        }
    }
}

impl Error for SelectionError {}

/// Rejections of successfully-read raw values
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalError {
    /// A validator returned `false` for the decoded value
    Validation { validator: String, value: String },
    /// A converter could not transform the raw value
    Conversion { converter: String, reason: String },
    /// The raw value cannot be represented as the declared type
    TypeMismatch {
        expected: String,
        found: &'static str,
    },
    /// An expression (condition, size, formula) failed to evaluate
    Expression(ExpressionError),
    /// Raw bytes could not be decoded in the declared charset
    Charset(CharsetError),
    /// A nested object refers to a type with no registered template
    UnknownTemplate(String),
    /// A computed field width evaluated to zero bits
    ZeroWidth { ty: String },
}

impl From<ExternalError> for ParseError {
    fn from(err: ExternalError) -> Self {
        Self::External(err)
    }
}

impl From<ExpressionError> for ParseError {
    fn from(err: ExpressionError) -> Self {
        Self::External(ExternalError::Expression(err))
    }
}

impl From<CharsetError> for ParseError {
    fn from(err: CharsetError) -> Self {
        Self::External(ExternalError::Charset(err))
    }
}

impl Display for ExternalError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            ExternalError::Validation { validator, value } => {
                write!(f, "validator `{validator}` rejected value {value}")
            }
            ExternalError::Conversion { converter, reason } => {
                write!(f, "converter `{converter}` failed: {reason}")
            }
            ExternalError::TypeMismatch { expected, found } => {
                write!(f, "cannot represent {found} value as {expected}")
            }
            ExternalError::Expression(err) => write!(f, "{}", err),
            ExternalError::Charset(err) => write!(f, "{}", err),
            ExternalError::UnknownTemplate(name) => {
                write!(f, "no template registered for type `{name}`")
            }
            ExternalError::ZeroWidth { ty } => write!(f, "width of {ty} field evaluated to zero bits"),
        }
    }
}

impl Error for ExternalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExternalError::Expression(err) => Some(err),
            ExternalError::Charset(err) => Some(err),
            _ => None,
        }
    }
}

/// Integrity failures of an otherwise well-formed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataIntegrityError {
    /// The checksum carried by the message differs from the one computed
    /// over its bytes
    ChecksumMismatch {
        algorithm: &'static str,
        declared: u64,
        computed: u64,
    },
    /// An expected terminator sequence was not found
    MissingTerminator { expected: Vec<u8> },
}

impl From<DataIntegrityError> for ParseError {
    fn from(err: DataIntegrityError) -> Self {
        Self::Integrity(err)
    }
}

impl Display for DataIntegrityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            DataIntegrityError::ChecksumMismatch {
                algorithm,
                declared,
                computed,
            } => write!(
                f,
                "{algorithm} checksum mismatch: message declares {declared:#x}, computed {computed:#x}"
            ),
            DataIntegrityError::MissingTerminator { expected } => {
                write!(f, "missing terminator ")?;
                for b in expected {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for DataIntegrityError {}

impl From<CodecNotFoundError> for ParseError {
    fn from(err: CodecNotFoundError) -> Self {
        Self::CodecNotFound(err)
    }
}

/// Implementation-internal errors
///
/// This error class represents 'impossible' cases, which signify either a bug
/// or a violated precondition (such as restoring a fallback point that was
/// never created).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalError {
    NoFallbackPoint,
    UnresolvedCharset(String),
    UnresolvedChecksum(String),
    WidthOverflow { bits: usize },
    /// A codec was handed a binding of a kind it does not handle
    BindingMismatch { codec: BindingTag },
}

impl From<InternalError> for ParseError {
    fn from(err: InternalError) -> Self {
        Self::Internal(err)
    }
}

impl Display for InternalError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            InternalError::NoFallbackPoint => write!(f, "no fallback point to restore"),
            InternalError::UnresolvedCharset(name) => {
                write!(f, "charset `{name}` was not validated at schema build")
            }
            InternalError::UnresolvedChecksum(id) => {
                write!(f, "checksum `{id}` was not validated at schema build")
            }
            InternalError::WidthOverflow { bits } => {
                write!(f, "{bits}-bit value does not fit in a native integer")
            }
            InternalError::BindingMismatch { codec } => {
                write!(f, "{codec} codec invoked on a binding of another kind")
            }
        }
    }
}

impl Error for InternalError {}

#[cfg(test)]
mod test {
    use super::*;

    fn dummy<T: Send + Sync>() {}

    #[test]
    fn parse_error_threadsafe() {
        dummy::<ParseError>()
    }

    #[test]
    fn checksum_mismatch_reports_both_values() {
        let err: ParseError = DataIntegrityError::ChecksumMismatch {
            algorithm: "sum8",
            declared: 0x10,
            computed: 0x2a,
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("0x10"));
        assert!(msg.contains("0x2a"));
    }
}
