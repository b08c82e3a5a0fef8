//! General error types
//!
//! This module contains the error types that are not tied to a single
//! decode or encode call: schema validation failures, which are fatal and
//! raised while templates are built, missing codecs, oversized resync
//! patterns, and the numeric bounds violations shared by both directions.

use std::error::Error;
use std::fmt::{Debug, Display};

use crate::schema::binding::BindingTag;

/// Reason a template descriptor was rejected.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SchemaErrorKind {
    /// The template declares no bound fields
    NoFields,
    /// A modifier appears after one that must follow it
    ModifierOrder {
        found: &'static str,
        after: &'static str,
    },
    /// A field carries more than one bind-kind modifier
    DuplicateBinding,
    /// More than one checksum is declared on a field or a template
    DuplicateChecksum,
    /// Two fields of one template share a name
    DuplicateField,
    /// The output of a binding is not assignable to the declared type
    TypeMismatch { produced: String, declared: String },
    /// A converter's input or output does not line up with the field
    ConverterMismatch {
        converter: String,
        produced: String,
        declared: String,
    },
    UnknownConverter(String),
    UnknownValidator(String),
    UnknownCharset(String),
    UnknownChecksum(String),
    /// A nested object or choice alternative names an unregistered type
    UnknownType(String),
    /// Two templates are registered under one type name
    DuplicateTemplate(String),
    /// A discriminator prefix length outside `0..=64`
    PrefixLength(u32),
    /// An alternative's condition references the tag without a prefix, or
    /// fails to reference it with one
    TagReference { condition: String, prefix_bits: u32 },
    /// A default alternative is declared with no alternatives
    DefaultWithoutAlternatives,
    /// A choice alternative (or default) is not assignable to the base type
    NotAssignable { type_name: String, base: String },
    /// The checksum field width differs from the algorithm width
    ChecksumWidth {
        algorithm: &'static str,
        algorithm_bits: u32,
        declared_bits: u32,
    },
    /// A fixed size of zero bits for a primitive, bit-set, or string, or an
    /// empty prefix or start pattern
    ZeroWidth,
    /// A textual pattern cannot be encoded in its declared charset
    UnencodablePattern(String),
    /// Skip or context-parameter modifiers on a field with no binding
    SkipWithoutBinding,
    /// A header start pattern with a wildcard exceeds the matcher limit
    HeaderPattern(PatternTooLongError),
}

impl Display for SchemaErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoFields => write!(f, "template declares no bound fields"),
            Self::ModifierOrder { found, after } => {
                write!(f, "{found} modifier must not follow {after} modifier")
            }
            Self::DuplicateBinding => write!(f, "more than one binding declared"),
            Self::DuplicateChecksum => write!(f, "more than one checksum declared"),
            Self::DuplicateField => write!(f, "field name declared twice"),
            Self::TypeMismatch { produced, declared } => {
                write!(f, "binding produces {produced}, not assignable to {declared}")
            }
            Self::ConverterMismatch {
                converter,
                produced,
                declared,
            } => write!(
                f,
                "converter `{converter}` cannot bridge {produced} to {declared}"
            ),
            Self::UnknownConverter(id) => write!(f, "unknown converter `{id}`"),
            Self::UnknownValidator(id) => write!(f, "unknown validator `{id}`"),
            Self::UnknownCharset(name) => write!(f, "unknown charset `{name}`"),
            Self::UnknownChecksum(id) => write!(f, "unknown checksum algorithm `{id}`"),
            Self::UnknownType(name) => write!(f, "unknown type `{name}`"),
            Self::DuplicateTemplate(name) => write!(f, "type `{name}` registered twice"),
            Self::PrefixLength(bits) => {
                write!(f, "prefix length {bits} outside of 0..=64 bits")
            }
            Self::TagReference {
                condition,
                prefix_bits: 0,
            } => write!(
                f,
                "condition `{condition}` references the tag but no prefix is declared"
            ),
            Self::TagReference {
                condition,
                prefix_bits,
            } => write!(
                f,
                "condition `{condition}` ignores the {prefix_bits}-bit tag"
            ),
            Self::DefaultWithoutAlternatives => {
                write!(f, "default type declared without alternatives")
            }
            Self::NotAssignable { type_name, base } => {
                write!(f, "type `{type_name}` is not assignable to `{base}`")
            }
            Self::ChecksumWidth {
                algorithm,
                algorithm_bits,
                declared_bits,
            } => write!(
                f,
                "{algorithm} produces {algorithm_bits} bits but the field declares {declared_bits}"
            ),
            Self::ZeroWidth => write!(f, "binding declares a width of zero"),
            Self::UnencodablePattern(text) => {
                write!(f, "pattern {text:?} cannot be encoded in its charset")
            }
            Self::SkipWithoutBinding => {
                write!(f, "skip or parameter modifiers declared without a binding")
            }
            Self::HeaderPattern(err) => write!(f, "header pattern rejected: {err}"),
        }
    }
}

/// Fatal error raised while building a [`Template`](crate::schema::Template)
///
/// Carries the name of the offending template and, where applicable, the
/// field the problem was found on.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SchemaError {
    pub template: String,
    pub field: Option<String>,
    pub kind: SchemaErrorKind,
}

impl SchemaError {
    pub fn new(template: impl Into<String>, kind: SchemaErrorKind) -> Self {
        Self {
            template: template.into(),
            field: None,
            kind,
        }
    }

    pub fn on_field(
        template: impl Into<String>,
        field: impl Into<String>,
        kind: SchemaErrorKind,
    ) -> Self {
        Self {
            template: template.into(),
            field: Some(field.into()),
            kind,
        }
    }
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "invalid schema {}.{}: {}", self.template, field, self.kind),
            None => write!(f, "invalid schema {}: {}", self.template, self.kind),
        }
    }
}

impl Error for SchemaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            SchemaErrorKind::HeaderPattern(err) => Some(err),
            _ => None,
        }
    }
}

/// Type alias for Result with an error type of [`SchemaError`]
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

/// No codec is registered for a binding kind
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CodecNotFoundError {
    pub kind: BindingTag,
}

impl Display for CodecNotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no codec registered for {} bindings", self.kind)
    }
}

impl Error for CodecNotFoundError {}

/// Pattern too long for the bit-parallel matcher
///
/// BNDM keeps one bit per pattern position in a machine word, so patterns
/// are limited to [`Bndm::MAX_PATTERN`](crate::matcher::Bndm::MAX_PATTERN)
/// bytes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PatternTooLongError {
    pub length: usize,
    pub limit: usize,
}

impl Display for PatternTooLongError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-byte pattern exceeds limit of {} bytes",
            self.length, self.limit
        )
    }
}

impl Error for PatternTooLongError {}

/// Error type representing invalidity of numeric values relative to the
/// range representable in a declared bit width.
///
/// * `Underflow {..}` contains the illegal value and the lower bound it falls below
/// * `Overflow {..}` contains the illegal value and the upper bound it falls above
///
/// The generic parameter `Ext` is the type used to hold both the value and
/// the bounds without loss; `i128` covers every width up to 64 bits and
/// [`num_bigint::BigInt`] covers the rest.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum BoundsError<Ext: Debug> {
    Underflow { min: Ext, val: Ext },
    Overflow { max: Ext, val: Ext },
}

impl<Ext: Debug + PartialOrd + Clone> BoundsError<Ext> {
    /// Checks that `val` falls into the inclusive range `[min, max]`,
    /// returning it unchanged if so.
    pub fn restrict(val: Ext, min: Ext, max: Ext) -> Result<Ext, Self> {
        if val < min {
            Err(Self::Underflow { min, val })
        } else if val > max {
            Err(Self::Overflow { max, val })
        } else {
            Ok(val)
        }
    }
}

impl<Ext: Debug + Display> Display for BoundsError<Ext> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundsError::Underflow { min, val } => {
                write!(f, "provided value {} less than minimum bound {}", val, min)
            }
            BoundsError::Overflow { max, val } => {
                write!(
                    f,
                    "provided value {} greater than maximum bound {}",
                    val, max
                )
            }
        }
    }
}

impl<Ext: Display + Debug> std::error::Error for BoundsError<Ext> {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn restrict_bounds() {
        assert_eq!(BoundsError::restrict(5i128, 0, 255), Ok(5));
        assert_eq!(
            BoundsError::restrict(256i128, 0, 255),
            Err(BoundsError::Overflow { max: 255, val: 256 })
        );
        assert_eq!(
            BoundsError::restrict(-129i128, -128, 127),
            Err(BoundsError::Underflow {
                min: -128,
                val: -129
            })
        );
    }

    #[test]
    fn schema_error_names_field() {
        let err = SchemaError::on_field("Frame", "len", SchemaErrorKind::DuplicateBinding);
        assert_eq!(
            err.to_string(),
            "invalid schema Frame.len: more than one binding declared"
        );
    }
}
