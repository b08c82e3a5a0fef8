//! Validated, immutable message templates
//!
//! A [`Template`] is the resolved form of a [`TemplateDescriptor`]: modifiers
//! are sorted into bound, evaluated and post-processed fields, charsets and
//! patterns are resolved to bytes, and every binding has been checked against
//! the type its field declares. Checks that need other templates (nested type
//! names, assignability of alternatives) are deferred to
//! [`TemplateRegistry::seal`](super::TemplateRegistry::seal).

use std::collections::HashSet;

use super::binding::{Binding, BindingKind, ChecksumParams, Pattern, Size};
use super::descriptor::{HeaderDescriptor, Modifier, TemplateDescriptor};
use super::field::{ContextParameter, EvaluatedField, PostProcessedField, TemplateField};
use super::types::ValueType;
use crate::charset::Charset;
use crate::checksum::ChecksumAlgorithm;
use crate::conv::convert::ConverterRegistry;
use crate::error::{SchemaError, SchemaErrorKind, SchemaResult};
use crate::matcher::HeaderMatcher;
use crate::parse::BitReader;

/// Name under which a choice's tag is visible to alternative conditions
pub const PREFIX_PARAM: &str = "prefix";

/// Resolves a charset label, failing as a schema error.
pub(crate) fn resolve_charset(name: &str) -> Result<Charset, SchemaErrorKind> {
    Charset::for_name(name).ok_or_else(|| SchemaErrorKind::UnknownCharset(name.to_owned()))
}

fn encode_pattern(pattern: &Pattern, charset: Charset) -> Result<Vec<u8>, SchemaErrorKind> {
    let bytes = pattern.encode(charset).map_err(|_| match pattern {
        Pattern::Text(t) => SchemaErrorKind::UnencodablePattern(t.clone()),
        Pattern::Bytes(_) => SchemaErrorKind::ZeroWidth,
    })?;
    if bytes.is_empty() {
        return Err(SchemaErrorKind::ZeroWidth);
    }
    Ok(bytes.into_owned())
}

/// Resolved message framing
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Header {
    /// Alternative start patterns, in declaration order
    pub starts: Vec<Vec<u8>>,
    pub wildcard: Option<u8>,
    pub end: Option<Vec<u8>>,
}

impl Header {
    fn build(desc: &HeaderDescriptor) -> Result<Self, SchemaErrorKind> {
        let charset = resolve_charset(&desc.charset)?;
        let mut starts = Vec::with_capacity(desc.starts.len());
        for pattern in &desc.starts {
            let bytes = encode_pattern(pattern, charset)?;
            HeaderMatcher::new(&bytes, desc.wildcard).map_err(SchemaErrorKind::HeaderPattern)?;
            starts.push(bytes);
        }
        let end = desc
            .end
            .as_ref()
            .map(|p| encode_pattern(p, charset))
            .transpose()?;
        Ok(Self {
            starts,
            wildcard: desc.wildcard,
            end,
        })
    }

    /// Length of the longest start pattern occurring at the reader's head.
    #[must_use]
    pub fn longest_match(&self, reader: &BitReader<'_>) -> Option<usize> {
        self.starts
            .iter()
            .filter(|p| reader.matches_at(p, self.wildcard))
            .map(Vec::len)
            .max()
    }

    /// Pattern written ahead of an encoded message
    #[must_use]
    pub fn primary_start(&self) -> Option<&[u8]> {
        self.starts.first().map(Vec::as_slice)
    }
}

/// A type name a template refers to through an object or choice-list binding
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TypeReference {
    /// Declared type of the field (or list element)
    pub base: String,
    /// Concrete alternative, or `None` for a plain nested object
    pub concrete: Option<String>,
}

/// Validated description of one message or nested record type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    name: String,
    supertypes: Vec<String>,
    header: Header,
    fields: Vec<TemplateField>,
    evaluated: Vec<EvaluatedField>,
    post_processed: Vec<PostProcessedField>,
    checksum: Option<usize>,
}

impl Template {
    /// Validates `desc`, resolving converter and validator ids against
    /// `converters`.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] naming the template (and field, where one is
    /// at fault) on the first violated rule.
    pub fn build(desc: &TemplateDescriptor, converters: &ConverterRegistry) -> SchemaResult<Self> {
        let header =
            Header::build(&desc.header).map_err(|kind| SchemaError::new(&desc.name, kind))?;
        let mut fields = Vec::new();
        let mut evaluated = Vec::new();
        let mut post_processed = Vec::new();
        let mut checksum = None;
        let mut seen = HashSet::new();

        for fd in &desc.fields {
            let fail = |kind| SchemaError::on_field(&desc.name, &fd.name, kind);
            if !seen.insert(fd.name.as_str()) {
                return Err(fail(SchemaErrorKind::DuplicateField));
            }
            check_order(&fd.modifiers).map_err(fail)?;

            let mut skips = Vec::new();
            let mut params = Vec::new();
            let mut binding: Option<Binding> = None;
            let mut is_checksum = false;
            for m in &fd.modifiers {
                match m {
                    Modifier::Skip(skip) => skips.push(skip.clone()),
                    Modifier::ContextParameter { name, expr } => params.push(ContextParameter {
                        name: name.clone(),
                        expr: expr.clone(),
                    }),
                    Modifier::Bind(b) => {
                        if binding.is_some() {
                            return Err(fail(SchemaErrorKind::DuplicateBinding));
                        }
                        binding = Some(b.clone());
                    }
                    Modifier::Checksum {
                        params: checksum_params,
                        condition,
                    } => {
                        if is_checksum {
                            return Err(fail(SchemaErrorKind::DuplicateChecksum));
                        }
                        if binding.is_some() {
                            return Err(fail(SchemaErrorKind::DuplicateBinding));
                        }
                        let mut b = Binding::from(BindingKind::Checksum(checksum_params.clone()));
                        b.condition = condition.clone();
                        binding = Some(b);
                        is_checksum = true;
                    }
                    Modifier::Evaluate { formula, condition } => evaluated.push(EvaluatedField {
                        name: fd.name.clone(),
                        ty: fd.ty.clone(),
                        formula: formula.clone(),
                        condition: condition.clone(),
                        version: fd.version.clone(),
                    }),
                    Modifier::PostProcess {
                        decode,
                        encode,
                        condition,
                    } => post_processed.push(PostProcessedField {
                        name: fd.name.clone(),
                        ty: fd.ty.clone(),
                        decode: decode.clone(),
                        encode: encode.clone(),
                        condition: condition.clone(),
                        version: fd.version.clone(),
                    }),
                }
            }

            let binding = match binding {
                Some(b) => b,
                None if skips.is_empty() && params.is_empty() => continue,
                None => return Err(fail(SchemaErrorKind::SkipWithoutBinding)),
            };
            check_binding(&binding, &fd.ty, converters).map_err(fail)?;
            if is_checksum {
                if checksum.is_some() {
                    return Err(fail(SchemaErrorKind::DuplicateChecksum));
                }
                checksum = Some(fields.len());
            }
            fields.push(TemplateField {
                name: fd.name.clone(),
                ty: fd.ty.clone(),
                binding,
                skips,
                params,
                version: fd.version.clone(),
            });
        }

        if fields.is_empty() {
            return Err(SchemaError::new(&desc.name, SchemaErrorKind::NoFields));
        }
        Ok(Self {
            name: desc.name.clone(),
            supertypes: desc.supertypes.clone(),
            header,
            fields,
            evaluated,
            post_processed,
            checksum,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn supertypes(&self) -> &[String] {
        &self.supertypes
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Bound fields in wire order
    #[must_use]
    pub fn fields(&self) -> &[TemplateField] {
        &self.fields
    }

    #[must_use]
    pub fn evaluated(&self) -> &[EvaluatedField] {
        &self.evaluated
    }

    #[must_use]
    pub fn post_processed(&self) -> &[PostProcessedField] {
        &self.post_processed
    }

    /// The checksum field together with its parameters
    #[must_use]
    pub fn checksum(&self) -> Option<(&TemplateField, &ChecksumParams)> {
        let field = &self.fields[self.checksum?];
        match &field.binding.kind {
            BindingKind::Checksum(params) => Some((field, params)),
            _ => None,
        }
    }

    /// Whether the template can start a top-level message
    #[must_use]
    pub fn is_message(&self) -> bool {
        !self.header.starts.is_empty()
    }

    /// Object types named by this template's bindings, nested ones included
    pub(crate) fn type_references(&self) -> Vec<TypeReference> {
        let mut refs = Vec::new();
        for field in &self.fields {
            collect_references(&field.binding, &field.ty, &mut refs);
        }
        refs
    }
}

fn collect_references(binding: &Binding, ty: &ValueType, out: &mut Vec<TypeReference>) {
    match (&binding.kind, ty) {
        (BindingKind::Array { element, .. } | BindingKind::List { element, .. }, ValueType::List(elem)) => {
            collect_references(element, elem, out)
        }
        (BindingKind::Object { choices: None }, ValueType::Object(base)) => out.push(TypeReference {
            base: base.clone(),
            concrete: None,
        }),
        (BindingKind::Object { choices: Some(c) }, ValueType::Object(base)) => {
            let names = c.alternatives.iter().map(|a| &a.type_name).chain(&c.default_type);
            for name in names {
                out.push(TypeReference {
                    base: base.clone(),
                    concrete: Some(name.clone()),
                });
            }
        }
        (BindingKind::ChoiceList { alternatives, .. }, ValueType::List(elem)) => {
            if let ValueType::Object(base) = elem.as_ref() {
                for alt in alternatives {
                    out.push(TypeReference {
                        base: base.clone(),
                        concrete: Some(alt.type_name.clone()),
                    });
                }
            }
        }
        _ => {}
    }
}

fn check_order(modifiers: &[Modifier]) -> Result<(), SchemaErrorKind> {
    for pair in modifiers.windows(2) {
        if pair[1].rank() < pair[0].rank() {
            return Err(SchemaErrorKind::ModifierOrder {
                found: pair[1].name(),
                after: pair[0].name(),
            });
        }
    }
    Ok(())
}

/// Checks a binding, with its converter and validator, against the declared
/// field type.
fn check_binding(
    binding: &Binding,
    declared: &ValueType,
    converters: &ConverterRegistry,
) -> Result<(), SchemaErrorKind> {
    if let Some(id) = &binding.validator {
        if converters.validator(id).is_none() {
            return Err(SchemaErrorKind::UnknownValidator(id.clone()));
        }
    }
    match &binding.converter {
        None => check_kind(&binding.kind, declared, converters),
        Some(id) => {
            let conv = converters
                .converter(id)
                .ok_or_else(|| SchemaErrorKind::UnknownConverter(id.clone()))?;
            let mismatch = |produced: String| SchemaErrorKind::ConverterMismatch {
                converter: id.clone(),
                produced,
                declared: declared.to_string(),
            };
            if !declared.accepts(&conv.output()) {
                return Err(mismatch(conv.output().to_string()));
            }
            check_kind(&binding.kind, &conv.input(), converters).map_err(|e| match e {
                SchemaErrorKind::TypeMismatch { produced, .. } => mismatch(produced),
                other => other,
            })
        }
    }
}

fn nonzero(size: &Size) -> Result<(), SchemaErrorKind> {
    match size {
        Size::Const(0) => Err(SchemaErrorKind::ZeroWidth),
        _ => Ok(()),
    }
}

fn check_kind(
    kind: &BindingKind,
    declared: &ValueType,
    converters: &ConverterRegistry,
) -> Result<(), SchemaErrorKind> {
    let mismatch = |produced: &str| SchemaErrorKind::TypeMismatch {
        produced: produced.to_owned(),
        declared: declared.to_string(),
    };
    match kind {
        BindingKind::Primitive { size, .. } => {
            nonzero(size)?;
            let numeric = declared.is_integer()
                || matches!(declared, ValueType::Bool | ValueType::F32 | ValueType::F64);
            if !numeric {
                return Err(mismatch("integer"));
            }
            match size.as_const() {
                Some(bits) if !declared.holds_bits(bits as u32) => {
                    Err(mismatch(&format!("{bits}-bit integer")))
                }
                _ => Ok(()),
            }
        }
        BindingKind::BitSet { size } => {
            nonzero(size)?;
            match declared {
                ValueType::Bits => Ok(()),
                _ => Err(mismatch("bits")),
            }
        }
        BindingKind::StringFixed { size, charset } => {
            nonzero(size)?;
            resolve_charset(charset)?;
            match declared {
                ValueType::Text => Ok(()),
                _ => Err(mismatch("text")),
            }
        }
        BindingKind::StringTerminated { charset, .. } => {
            resolve_charset(charset)?;
            match declared {
                ValueType::Text => Ok(()),
                _ => Err(mismatch("text")),
            }
        }
        BindingKind::Array { element, .. } | BindingKind::List { element, .. } => match declared {
            ValueType::List(elem) => check_binding(element, elem, converters),
            _ => Err(mismatch("list")),
        },
        BindingKind::Object { choices } => {
            if !matches!(declared, ValueType::Object(_)) {
                return Err(mismatch("object"));
            }
            let Some(choices) = choices else {
                return Ok(());
            };
            if choices.prefix_bits > 64 {
                return Err(SchemaErrorKind::PrefixLength(choices.prefix_bits));
            }
            if choices.alternatives.is_empty() && choices.default_type.is_some() {
                return Err(SchemaErrorKind::DefaultWithoutAlternatives);
            }
            let tag = format!("#{PREFIX_PARAM}");
            for alt in &choices.alternatives {
                if alt.condition.contains(&tag) != (choices.prefix_bits > 0) {
                    return Err(SchemaErrorKind::TagReference {
                        condition: alt.condition.clone(),
                        prefix_bits: choices.prefix_bits,
                    });
                }
            }
            Ok(())
        }
        BindingKind::ChoiceList {
            alternatives,
            charset,
            ..
        } => {
            let charset = resolve_charset(charset)?;
            match declared {
                ValueType::List(elem) if matches!(elem.as_ref(), ValueType::Object(_)) => {}
                _ => return Err(mismatch("list of objects")),
            }
            for alt in alternatives {
                encode_pattern(&alt.prefix, charset)?;
            }
            Ok(())
        }
        BindingKind::Checksum(params) => {
            let alg = ChecksumAlgorithm::for_id(&params.algorithm)
                .ok_or_else(|| SchemaErrorKind::UnknownChecksum(params.algorithm.clone()))?;
            if alg.bits() != params.size_bits {
                return Err(SchemaErrorKind::ChecksumWidth {
                    algorithm: alg.id(),
                    algorithm_bits: alg.bits(),
                    declared_bits: params.size_bits,
                });
            }
            if !declared.is_integer() || !declared.holds_bits(params.size_bits) {
                return Err(mismatch(&format!("{}-bit checksum", params.size_bits)));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::int::ByteOrder;
    use crate::schema::binding::{Alternative, Choices, SkipParams};
    use crate::schema::descriptor::FieldDescriptor;

    fn build(desc: TemplateDescriptor) -> SchemaResult<Template> {
        Template::build(&desc, &ConverterRegistry::with_builtins())
    }

    fn kind_of(desc: TemplateDescriptor) -> SchemaErrorKind {
        build(desc).unwrap_err().kind
    }

    fn byte_field(name: &str) -> FieldDescriptor {
        FieldDescriptor::new(name, ValueType::U8).bind(Binding::primitive(8, ByteOrder::BigEndian))
    }

    #[test]
    fn sorts_modifiers_into_field_lists() {
        let desc = TemplateDescriptor::new("Frame")
            .starts_with(&[0x7eu8])
            .field(byte_field("len").skip(SkipParams::bits(4)))
            .field(FieldDescriptor::new("double", ValueType::U16).evaluate("len * 2"))
            .field(
                FieldDescriptor::new("crc", ValueType::U8)
                    .checksum(ChecksumParams::new("crc8", 8).skip(1, 0)),
            )
            .field(byte_field("scaled").post_process("scaled * 10", "scaled / 10"));
        let t = build(desc).unwrap();
        assert_eq!(t.fields().len(), 3);
        assert_eq!(t.evaluated().len(), 1);
        assert_eq!(t.post_processed().len(), 1);
        assert_eq!(t.fields()[0].skips.len(), 1);
        let (field, params) = t.checksum().unwrap();
        assert_eq!(field.name, "crc");
        assert_eq!(params.skip_start, 1);
        assert_eq!(t.header().primary_start(), Some(&[0x7e][..]));
    }

    #[test]
    fn modifier_order_is_enforced() {
        let desc = TemplateDescriptor::new("T").field(
            FieldDescriptor::new("x", ValueType::U8)
                .bind(Binding::primitive(8, ByteOrder::BigEndian))
                .skip(SkipParams::bits(1)),
        );
        assert_eq!(
            kind_of(desc),
            SchemaErrorKind::ModifierOrder {
                found: "skip",
                after: "bind"
            }
        );
    }

    #[test]
    fn duplicate_bindings_and_checksums() {
        let desc = TemplateDescriptor::new("T").field(
            byte_field("x").bind(Binding::primitive(8, ByteOrder::BigEndian)),
        );
        assert_eq!(kind_of(desc), SchemaErrorKind::DuplicateBinding);

        let crc = |name: &str| {
            FieldDescriptor::new(name, ValueType::U8).checksum(ChecksumParams::new("sum8", 8))
        };
        let desc = TemplateDescriptor::new("T").field(crc("a")).field(crc("b"));
        assert_eq!(kind_of(desc), SchemaErrorKind::DuplicateChecksum);
    }

    #[test]
    fn empty_template_rejected() {
        let desc = TemplateDescriptor::new("T")
            .field(FieldDescriptor::new("e", ValueType::U8).evaluate("1"));
        assert_eq!(kind_of(desc), SchemaErrorKind::NoFields);
        let desc = TemplateDescriptor::new("T")
            .field(FieldDescriptor::new("s", ValueType::U8).skip(SkipParams::bits(8)));
        assert_eq!(kind_of(desc), SchemaErrorKind::SkipWithoutBinding);
    }

    #[test]
    fn binding_type_checks() {
        let desc = TemplateDescriptor::new("T").field(
            FieldDescriptor::new("x", ValueType::U8).bind(Binding::primitive(12, ByteOrder::BigEndian)),
        );
        assert!(matches!(kind_of(desc), SchemaErrorKind::TypeMismatch { .. }));

        let desc = TemplateDescriptor::new("T").field(
            FieldDescriptor::new("x", ValueType::Text).bind(Binding::string(4, "EBCDIC")),
        );
        assert_eq!(kind_of(desc), SchemaErrorKind::UnknownCharset("EBCDIC".into()));

        let desc = TemplateDescriptor::new("T").field(
            FieldDescriptor::new("x", ValueType::Bits).bind(Binding::bits(0)),
        );
        assert_eq!(kind_of(desc), SchemaErrorKind::ZeroWidth);
    }

    #[test]
    fn converters_bridge_types() {
        let ok = TemplateDescriptor::new("T").field(
            FieldDescriptor::new("flag", ValueType::Bool)
                .bind(Binding::primitive(8, ByteOrder::BigEndian).convert("bool")),
        );
        assert!(build(ok).is_ok());

        let bad = TemplateDescriptor::new("T").field(
            FieldDescriptor::new("flag", ValueType::Text)
                .bind(Binding::primitive(8, ByteOrder::BigEndian).convert("bool")),
        );
        assert!(matches!(kind_of(bad), SchemaErrorKind::ConverterMismatch { .. }));

        let unknown = TemplateDescriptor::new("T").field(
            FieldDescriptor::new("x", ValueType::U8)
                .bind(Binding::primitive(8, ByteOrder::BigEndian).validate("prime")),
        );
        assert_eq!(kind_of(unknown), SchemaErrorKind::UnknownValidator("prime".into()));
    }

    #[test]
    fn choice_rules() {
        let choice = |prefix_bits, cond: &str| {
            TemplateDescriptor::new("T").field(
                FieldDescriptor::new("body", ValueType::object("Body")).bind(Binding::choice(
                    Choices::with_prefix(prefix_bits).alternative(Alternative::new(cond, 1, "A")),
                )),
            )
        };
        assert!(build(choice(8, "#prefix == 1")).is_ok());
        assert!(matches!(
            kind_of(choice(0, "#prefix == 1")),
            SchemaErrorKind::TagReference { prefix_bits: 0, .. }
        ));
        assert!(matches!(
            kind_of(choice(8, "kind == 1")),
            SchemaErrorKind::TagReference { prefix_bits: 8, .. }
        ));
        assert_eq!(kind_of(choice(65, "#prefix == 1")), SchemaErrorKind::PrefixLength(65));

        let lonely_default = TemplateDescriptor::new("T").field(
            FieldDescriptor::new("body", ValueType::object("Body"))
                .bind(Binding::choice(Choices::default().default_type("A"))),
        );
        assert_eq!(kind_of(lonely_default), SchemaErrorKind::DefaultWithoutAlternatives);
    }

    #[test]
    fn checksum_width_must_match() {
        let desc = TemplateDescriptor::new("T")
            .field(byte_field("x"))
            .field(FieldDescriptor::new("crc", ValueType::U16).checksum(ChecksumParams::new("crc32", 16)));
        assert_eq!(
            kind_of(desc),
            SchemaErrorKind::ChecksumWidth {
                algorithm: "crc32",
                algorithm_bits: 32,
                declared_bits: 16
            }
        );
    }

    #[test]
    fn long_wildcard_header_rejected() {
        let mut pattern = vec![b'A'; 40];
        pattern[3] = b'?';
        let desc = TemplateDescriptor::new("T")
            .starts_with(pattern)
            .wildcard(b'?')
            .field(byte_field("x"));
        assert!(matches!(kind_of(desc), SchemaErrorKind::HeaderPattern(_)));
    }

    #[test]
    fn longest_start_wins() {
        let desc = TemplateDescriptor::new("T")
            .starts_with("AB")
            .starts_with("ABC")
            .charset("US-ASCII")
            .field(byte_field("x"));
        let t = build(desc).unwrap();
        assert_eq!(t.header().longest_match(&BitReader::new(b"ABCD")), Some(3));
        assert_eq!(t.header().longest_match(&BitReader::new(b"ABD")), Some(2));
        assert_eq!(t.header().longest_match(&BitReader::new(b"XAB")), None);
    }
}
