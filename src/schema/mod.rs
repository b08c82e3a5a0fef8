//! Schema model
//!
//! Schemas enter the engine as plain descriptor data ([`descriptor`]), are
//! validated into immutable [`Template`]s, and are finally sealed into a
//! [`TemplateRegistry`] that resolves type names across templates.

pub mod binding;
pub mod descriptor;
pub mod field;
pub mod registry;
pub mod template;
pub mod types;

pub use binding::{
    Alternative, Binding, BindingKind, BindingTag, ChecksumParams, Choices, ListAlternative,
    Pattern, Size, SkipParams,
};
pub use descriptor::{FieldDescriptor, HeaderDescriptor, Modifier, TemplateDescriptor};
pub use field::{ContextParameter, EvaluatedField, PostProcessedField, TemplateField};
pub use registry::TemplateRegistry;
pub use template::{Header, Template, PREFIX_PARAM};
pub use types::ValueType;
