//! Bindings: how a field is laid out on the wire
//!
//! A [`Binding`] pairs a [`BindingKind`] (the codec to use and its
//! parameters) with the optional presence condition, validator and
//! converter that apply to any kind.

use std::borrow::Cow;
use std::fmt::{Display, Formatter};

use crate::charset::{Charset, CharsetError};
use crate::int::ByteOrder;

/// A byte sequence given either literally or as text in some charset
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pattern {
    Bytes(Vec<u8>),
    Text(String),
}

impl Pattern {
    /// Raw bytes of the pattern, encoding text in `charset`.
    pub fn encode(&self, charset: Charset) -> Result<Cow<'_, [u8]>, CharsetError> {
        match self {
            Pattern::Bytes(b) => Ok(Cow::Borrowed(b)),
            Pattern::Text(t) => charset.encode(t).map(Cow::Owned),
        }
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Pattern::Text(s.to_owned())
    }
}

impl From<Vec<u8>> for Pattern {
    fn from(b: Vec<u8>) -> Self {
        Pattern::Bytes(b)
    }
}

impl From<&[u8]> for Pattern {
    fn from(b: &[u8]) -> Self {
        Pattern::Bytes(b.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Pattern {
    fn from(b: &[u8; N]) -> Self {
        Pattern::Bytes(b.to_vec())
    }
}

/// A bit or byte count, either fixed or computed per message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Size {
    Const(usize),
    /// Expression evaluated against the in-progress message
    Expr(String),
}

impl Size {
    pub fn expr(src: impl Into<String>) -> Self {
        Size::Expr(src.into())
    }

    #[must_use]
    pub fn as_const(&self) -> Option<usize> {
        match self {
            Size::Const(n) => Some(*n),
            Size::Expr(_) => None,
        }
    }
}

impl From<usize> for Size {
    fn from(n: usize) -> Self {
        Size::Const(n)
    }
}

impl Display for Size {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Size::Const(n) => write!(f, "{n}"),
            Size::Expr(e) => write!(f, "`{e}`"),
        }
    }
}

/// One alternative of a discriminated choice
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alternative {
    /// Selection condition; when the choice has a prefix, the tag is bound as
    /// `#prefix`
    pub condition: String,
    /// Tag value written for this alternative on encode
    pub prefix: u64,
    /// Concrete type decoded when this alternative is selected
    pub type_name: String,
}

impl Alternative {
    pub fn new(condition: impl Into<String>, prefix: u64, type_name: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            prefix,
            type_name: type_name.into(),
        }
    }

    /// Alternative selected by the condition alone, for choices without a
    /// prefix
    pub fn when(condition: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(condition, 0, type_name)
    }
}

/// Discriminated-choice parameters of an object binding
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Choices {
    /// Width of the tag read before the object, `0..=64`
    pub prefix_bits: u32,
    pub byte_order: ByteOrder,
    /// Tried in declaration order; the first whose condition holds is selected
    pub alternatives: Vec<Alternative>,
    /// Type decoded when no alternative matches
    pub default_type: Option<String>,
}

impl Choices {
    #[must_use]
    pub fn with_prefix(prefix_bits: u32) -> Self {
        Self {
            prefix_bits,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn alternative(mut self, alt: Alternative) -> Self {
        self.alternatives.push(alt);
        self
    }

    #[must_use]
    pub fn default_type(mut self, type_name: impl Into<String>) -> Self {
        self.default_type = Some(type_name.into());
        self
    }
}

/// One alternative of a choice list, selected by a leading byte sequence
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListAlternative {
    pub prefix: Pattern,
    pub type_name: String,
}

impl ListAlternative {
    pub fn new(prefix: impl Into<Pattern>, type_name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            type_name: type_name.into(),
        }
    }
}

/// Parameters of a checksum binding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChecksumParams {
    /// Algorithm id, see [`ChecksumAlgorithm`](crate::checksum::ChecksumAlgorithm)
    pub algorithm: String,
    /// Bytes excluded at the start of the message
    pub skip_start: usize,
    /// Bytes excluded at the end of the message
    pub skip_end: usize,
    /// Width of the checksum on the wire; must equal the algorithm's width
    pub size_bits: u32,
    pub byte_order: ByteOrder,
    /// Overrides the algorithm's initial register value
    pub start_value: Option<u64>,
}

impl ChecksumParams {
    pub fn new(algorithm: impl Into<String>, size_bits: u32) -> Self {
        Self {
            algorithm: algorithm.into(),
            skip_start: 0,
            skip_end: 0,
            size_bits,
            byte_order: ByteOrder::BigEndian,
            start_value: None,
        }
    }

    #[must_use]
    pub fn skip(mut self, start: usize, end: usize) -> Self {
        self.skip_start = start;
        self.skip_end = end;
        self
    }

    #[must_use]
    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    #[must_use]
    pub fn start_value(mut self, start: u64) -> Self {
        self.start_value = Some(start);
        self
    }
}

/// Codec kind of a binding, with its parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingKind {
    /// Integer (or float bit-pattern) of `size` bits
    Primitive { size: Size, byte_order: ByteOrder },
    /// Raw sequence of `size` bits
    BitSet { size: Size },
    /// Text occupying exactly `size` bytes
    StringFixed { size: Size, charset: String },
    /// Text running up to the first `terminator` byte
    StringTerminated {
        terminator: u8,
        consume: bool,
        charset: String,
    },
    /// `count` repetitions of `element`
    Array { element: Box<Binding>, count: Size },
    /// Repetitions of `element` up to the first `terminator` byte
    List {
        element: Box<Binding>,
        terminator: u8,
        consume: bool,
    },
    /// Nested record, optionally selected among alternatives
    Object { choices: Option<Choices> },
    /// Sequence of records, each introduced by its alternative's prefix
    ChoiceList {
        alternatives: Vec<ListAlternative>,
        /// Charset of textual prefixes
        charset: String,
        /// Ends the list when found where a prefix is expected
        terminator: Option<u8>,
    },
    Checksum(ChecksumParams),
}

/// Discriminant of [`BindingKind`], used to look up codecs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingTag {
    Primitive,
    BitSet,
    StringFixed,
    StringTerminated,
    Array,
    List,
    Object,
    ChoiceList,
    Checksum,
}

impl Display for BindingTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BindingTag::Primitive => "primitive",
            BindingTag::BitSet => "bit-set",
            BindingTag::StringFixed => "fixed-string",
            BindingTag::StringTerminated => "terminated-string",
            BindingTag::Array => "array",
            BindingTag::List => "list",
            BindingTag::Object => "object",
            BindingTag::ChoiceList => "choice-list",
            BindingTag::Checksum => "checksum",
        })
    }
}

impl BindingKind {
    #[must_use]
    pub const fn tag(&self) -> BindingTag {
        match self {
            BindingKind::Primitive { .. } => BindingTag::Primitive,
            BindingKind::BitSet { .. } => BindingTag::BitSet,
            BindingKind::StringFixed { .. } => BindingTag::StringFixed,
            BindingKind::StringTerminated { .. } => BindingTag::StringTerminated,
            BindingKind::Array { .. } => BindingTag::Array,
            BindingKind::List { .. } => BindingTag::List,
            BindingKind::Object { .. } => BindingTag::Object,
            BindingKind::ChoiceList { .. } => BindingTag::ChoiceList,
            BindingKind::Checksum(_) => BindingTag::Checksum,
        }
    }
}

/// A codec kind together with the modifiers common to every kind
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub kind: BindingKind,
    /// Presence gate; the field is absent when this evaluates false
    pub condition: Option<String>,
    /// Id of a validator applied to the decoded (converted) value
    pub validator: Option<String>,
    /// Id of a converter between the wire value and the field type
    pub converter: Option<String>,
}

impl From<BindingKind> for Binding {
    fn from(kind: BindingKind) -> Self {
        Self {
            kind,
            condition: None,
            validator: None,
            converter: None,
        }
    }
}

impl Binding {
    pub fn primitive(size: impl Into<Size>, byte_order: ByteOrder) -> Self {
        BindingKind::Primitive {
            size: size.into(),
            byte_order,
        }
        .into()
    }

    pub fn bits(size: impl Into<Size>) -> Self {
        BindingKind::BitSet { size: size.into() }.into()
    }

    pub fn string(size: impl Into<Size>, charset: impl Into<String>) -> Self {
        BindingKind::StringFixed {
            size: size.into(),
            charset: charset.into(),
        }
        .into()
    }

    pub fn string_until(terminator: u8, consume: bool, charset: impl Into<String>) -> Self {
        BindingKind::StringTerminated {
            terminator,
            consume,
            charset: charset.into(),
        }
        .into()
    }

    pub fn array(element: Binding, count: impl Into<Size>) -> Self {
        BindingKind::Array {
            element: Box::new(element),
            count: count.into(),
        }
        .into()
    }

    pub fn list_until(element: Binding, terminator: u8, consume: bool) -> Self {
        BindingKind::List {
            element: Box::new(element),
            terminator,
            consume,
        }
        .into()
    }

    #[must_use]
    pub fn object() -> Self {
        BindingKind::Object { choices: None }.into()
    }

    #[must_use]
    pub fn choice(choices: Choices) -> Self {
        BindingKind::Object {
            choices: Some(choices),
        }
        .into()
    }

    pub fn choice_list(
        alternatives: Vec<ListAlternative>,
        charset: impl Into<String>,
        terminator: Option<u8>,
    ) -> Self {
        BindingKind::ChoiceList {
            alternatives,
            charset: charset.into(),
            terminator,
        }
        .into()
    }

    #[must_use]
    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    #[must_use]
    pub fn validate(mut self, validator: impl Into<String>) -> Self {
        self.validator = Some(validator.into());
        self
    }

    #[must_use]
    pub fn convert(mut self, converter: impl Into<String>) -> Self {
        self.converter = Some(converter.into());
        self
    }

    #[must_use]
    pub fn tag(&self) -> BindingTag {
        self.kind.tag()
    }
}

/// Bits skipped immediately before a field, each gated by its own condition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipParams {
    Bits {
        size: Size,
        condition: Option<String>,
    },
    UntilTerminator {
        terminator: u8,
        consume: bool,
        condition: Option<String>,
    },
}

impl SkipParams {
    pub fn bits(size: impl Into<Size>) -> Self {
        SkipParams::Bits {
            size: size.into(),
            condition: None,
        }
    }

    #[must_use]
    pub fn until(terminator: u8, consume: bool) -> Self {
        SkipParams::UntilTerminator {
            terminator,
            consume,
            condition: None,
        }
    }

    #[must_use]
    pub fn when(mut self, cond: impl Into<String>) -> Self {
        match &mut self {
            SkipParams::Bits { condition, .. } | SkipParams::UntilTerminator { condition, .. } => {
                *condition = Some(cond.into())
            }
        }
        self
    }

    #[must_use]
    pub fn condition(&self) -> Option<&str> {
        match self {
            SkipParams::Bits { condition, .. } | SkipParams::UntilTerminator { condition, .. } => {
                condition.as_deref()
            }
        }
    }
}
