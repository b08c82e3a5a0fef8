//! Declarative engine for bit-level binary protocol messages
//!
//! # Overview
//!
//! Devices in the field (trackers, meters, sensors) tend to speak ad-hoc
//! binary protocols: a start pattern, a run of bit-packed fields whose
//! widths and presence depend on earlier fields, an optional checksum and
//! an optional terminator. Writing a parser and a serializer by hand for
//! each message type is repetitive and error-prone, and the two easily
//! drift apart.
//!
//! `bitframe` instead takes a data-only description of each message type
//! (a [`TemplateDescriptor`](schema::TemplateDescriptor)), validates it
//! once into an immutable [`Template`](schema::Template), and interprets it
//! both ways: decoding a byte buffer holding any number of messages into
//! [`Record`]s, and composing records back into bytes.
//!
//! # Layers
//!
//! From the bottom up:
//!
//!  * [`parse::BitReader`] and [`builder::BitWriter`] read and write
//!    unsigned, signed and arbitrary-precision integers of any bit width,
//!    in either byte order, at any bit offset;
//!  * [`schema`] holds the descriptor data model and its validation;
//!  * [`conv`] dispatches each field to the [`Codec`](conv::Codec) for its
//!    binding kind, within a per-call [`DecodeContext`](conv::DecodeContext)
//!    that tracks the records in progress, named parameters and the
//!    protocol [`Version`](version::Version);
//!  * [`expr`] evaluates the conditions, sizes and formulas that templates
//!    embed, through a replaceable [`Evaluator`](expr::Evaluator);
//!  * [`checksum`] and [`matcher`] provide checksum algorithms and the
//!    start-pattern search used to resynchronize after corrupt input;
//!  * [`parse::scan`] and [`builder::compose`] drive whole buffers and
//!    batches, and [`Engine`] ties everything together.
//!
//! ```
//! use bitframe::prelude::*;
//!
//! let engine = Engine::builder()
//!     .template(
//!         TemplateDescriptor::new("Ping")
//!             .starts_with(b"\x7e")
//!             .field(FieldDescriptor::new("seq", ValueType::U8).bind(Binding::primitive(8, ByteOrder::BigEndian))),
//!     )
//!     .build()
//!     .unwrap();
//! let report = engine.decode(b"\x7e\x01\x7e\x02");
//! assert_eq!(report.successes.len(), 2);
//! assert_eq!(engine.compose(&[report.successes[1].record.clone()]).bytes, b"\x7e\x02");
//! ```

pub mod builder;
pub mod charset;
pub mod checksum;
pub mod conv;
pub mod engine;
pub mod error;
pub mod expr;
pub mod int;
pub mod matcher;
pub mod parse;
pub mod prelude;
pub mod schema;
pub mod value;
pub mod version;

cfg_if::cfg_if! {
    if #[cfg(feature = "expose_internal")] {
        pub mod internal;
    } else {
        mod internal;
    }
}

pub use crate::builder::compose::{ComposeFailure, ComposeReport, Composer};
pub use crate::builder::BitWriter;
pub use crate::conv::{DecodeError, EncodeError, ParserOptions};
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::error::{SchemaError, SchemaResult};
pub use crate::internal::BitIndex;
pub use crate::parse::scan::{DecodeFailure, Decoded, MessageParser, ParseReport};
pub use crate::parse::{BitReader, ParseError, ParseResult};
pub use crate::value::{Record, Value};
pub use crate::version::{Version, VersionRange};
