//! Resolved fields of a template

use super::binding::{Binding, SkipParams};
use super::types::ValueType;
use crate::version::VersionRange;

/// Named expression bound while a field and its descendants are processed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextParameter {
    pub name: String,
    pub expr: String,
}

/// A field read from or written to the wire
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateField {
    pub name: String,
    pub ty: ValueType,
    pub binding: Binding,
    /// Applied in order immediately before the field
    pub skips: Vec<SkipParams>,
    pub params: Vec<ContextParameter>,
    pub version: Option<VersionRange>,
}

/// A field computed from the others once every bound field is decoded
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluatedField {
    pub name: String,
    pub ty: ValueType,
    pub formula: String,
    pub condition: Option<String>,
    pub version: Option<VersionRange>,
}

/// A rewrite of a stored value: `decode` is applied after reading, `encode`
/// before writing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostProcessedField {
    pub name: String,
    pub ty: ValueType,
    pub decode: String,
    pub encode: String,
    pub condition: Option<String>,
    pub version: Option<VersionRange>,
}
