//! Assorted imports for describing templates and driving an engine

pub use crate::conv::convert::{FnConverter, FnValidator};
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::int::ByteOrder;
pub use crate::schema::{
    Alternative, Binding, ChecksumParams, Choices, FieldDescriptor, ListAlternative, Size,
    SkipParams, TemplateDescriptor, ValueType,
};
pub use crate::value::{Record, Value};
pub use crate::version::{Version, VersionRange};
pub use crate::ParserOptions;
