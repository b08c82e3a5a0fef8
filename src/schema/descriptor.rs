//! Data-only schema descriptions
//!
//! Descriptors are what a schema provider hands to the engine: plain data,
//! in declaration order, with no validation applied. [`Template::build`]
//! turns a [`TemplateDescriptor`] into a validated [`Template`].
//!
//! [`Template::build`]: super::Template::build
//! [`Template`]: super::Template

use super::binding::{Binding, ChecksumParams, Pattern, SkipParams};
use super::types::ValueType;
use crate::version::VersionRange;

/// One annotation-like entry on a field
///
/// Within a field, modifiers must appear in the order
/// `Skip`/`ContextParameter`, `Bind`, `Checksum`, `Evaluate`, `PostProcess`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Modifier {
    Skip(SkipParams),
    ContextParameter {
        name: String,
        expr: String,
    },
    Bind(Binding),
    Checksum {
        params: ChecksumParams,
        condition: Option<String>,
    },
    Evaluate {
        formula: String,
        condition: Option<String>,
    },
    PostProcess {
        decode: String,
        encode: String,
        condition: Option<String>,
    },
}

impl Modifier {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Modifier::Skip(_) => "skip",
            Modifier::ContextParameter { .. } => "context-parameter",
            Modifier::Bind(_) => "bind",
            Modifier::Checksum { .. } => "checksum",
            Modifier::Evaluate { .. } => "evaluate",
            Modifier::PostProcess { .. } => "post-process",
        }
    }

    /// Position in the required modifier order
    pub(crate) const fn rank(&self) -> u8 {
        match self {
            Modifier::Skip(_) | Modifier::ContextParameter { .. } => 0,
            Modifier::Bind(_) => 1,
            Modifier::Checksum { .. } => 2,
            Modifier::Evaluate { .. } => 3,
            Modifier::PostProcess { .. } => 4,
        }
    }
}

/// Declaration of one field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: ValueType,
    pub version: Option<VersionRange>,
    pub modifiers: Vec<Modifier>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            version: None,
            modifiers: Vec::new(),
        }
    }

    #[must_use]
    pub fn modifier(mut self, m: Modifier) -> Self {
        self.modifiers.push(m);
        self
    }

    #[must_use]
    pub fn skip(self, skip: SkipParams) -> Self {
        self.modifier(Modifier::Skip(skip))
    }

    #[must_use]
    pub fn param(self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.modifier(Modifier::ContextParameter {
            name: name.into(),
            expr: expr.into(),
        })
    }

    #[must_use]
    pub fn bind(self, binding: Binding) -> Self {
        self.modifier(Modifier::Bind(binding))
    }

    #[must_use]
    pub fn checksum(self, params: ChecksumParams) -> Self {
        self.modifier(Modifier::Checksum {
            params,
            condition: None,
        })
    }

    #[must_use]
    pub fn evaluate(self, formula: impl Into<String>) -> Self {
        self.modifier(Modifier::Evaluate {
            formula: formula.into(),
            condition: None,
        })
    }

    #[must_use]
    pub fn post_process(self, decode: impl Into<String>, encode: impl Into<String>) -> Self {
        self.modifier(Modifier::PostProcess {
            decode: decode.into(),
            encode: encode.into(),
            condition: None,
        })
    }

    #[must_use]
    pub fn version(mut self, range: VersionRange) -> Self {
        self.version = Some(range);
        self
    }
}

/// Message framing: start patterns, end terminator and their charset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderDescriptor {
    /// Alternative start patterns; empty for types only used nested
    pub starts: Vec<Pattern>,
    /// Byte that matches anything within a start pattern
    pub wildcard: Option<u8>,
    pub end: Option<Pattern>,
    pub charset: String,
}

impl Default for HeaderDescriptor {
    fn default() -> Self {
        Self {
            starts: Vec::new(),
            wildcard: None,
            end: None,
            charset: "UTF-8".to_owned(),
        }
    }
}

/// Declaration of one message (or nested record) type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateDescriptor {
    pub name: String,
    /// Types this type may stand in for in discriminated choices
    pub supertypes: Vec<String>,
    pub header: HeaderDescriptor,
    pub fields: Vec<FieldDescriptor>,
}

impl TemplateDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            header: HeaderDescriptor::default(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    #[must_use]
    pub fn starts_with(mut self, pattern: impl Into<Pattern>) -> Self {
        self.header.starts.push(pattern.into());
        self
    }

    #[must_use]
    pub fn ends_with(mut self, pattern: impl Into<Pattern>) -> Self {
        self.header.end = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn wildcard(mut self, byte: u8) -> Self {
        self.header.wildcard = Some(byte);
        self
    }

    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.header.charset = charset.into();
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}
