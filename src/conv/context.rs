//! Per-call state shared by every codec
//!
//! An [`Environment`] holds everything immutable an engine is configured
//! with. A [`DecodeContext`] is created for each decode or encode call over
//! a borrowed environment and carries the mutable state of that call: the
//! stack of records in progress, the stack of named parameters, the
//! protocol version, and the field path used in error reports. Contexts are
//! never shared between calls.

use std::sync::Arc;

use crate::conv::convert::ConverterRegistry;
use crate::conv::CodecRegistry;
use crate::expr::{Evaluator, ExpressionError, Scope, SimpleEvaluator};
use crate::internal::BitIndex;
use crate::schema::{Size, TemplateRegistry};
use crate::value::{Record, Value};
use crate::version::{Version, VersionRange};

/// Immutable configuration of an engine
#[derive(Debug, Clone)]
pub struct Environment {
    pub templates: TemplateRegistry,
    pub codecs: CodecRegistry,
    pub converters: ConverterRegistry,
    pub evaluator: Arc<dyn Evaluator>,
}

impl Environment {
    /// Environment with the default codecs, converters and evaluator
    #[must_use]
    pub fn new(templates: TemplateRegistry) -> Self {
        Self {
            templates,
            codecs: CodecRegistry::with_defaults(),
            converters: ConverterRegistry::with_builtins(),
            evaluator: Arc::new(SimpleEvaluator),
        }
    }
}

/// Per-call settings of a parse or compose run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParserOptions {
    /// Protocol version gating versioned fields; `None` enables every field
    pub version: Option<Version>,
    /// Parameters visible to every expression as `#name`
    pub params: Vec<(String, Value)>,
}

impl ParserOptions {
    #[must_use]
    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }
}

/// Mutable state of one decode or encode call
#[derive(Debug)]
pub struct DecodeContext<'e> {
    env: &'e Environment,
    records: Vec<Record>,
    params: Vec<(String, Value)>,
    version: Option<Version>,
    path: Vec<String>,
    failure: Option<(Vec<String>, usize)>,
    checksum_slots: Vec<BitIndex>,
}

impl<'e> DecodeContext<'e> {
    #[must_use]
    pub fn new(env: &'e Environment, version: Option<Version>) -> Self {
        Self {
            env,
            records: Vec::new(),
            params: Vec::new(),
            version,
            path: Vec::new(),
            failure: None,
            checksum_slots: Vec::new(),
        }
    }

    /// Context seeded with caller-supplied parameters, visible as `#name`
    #[must_use]
    pub fn with_params(
        env: &'e Environment,
        version: Option<Version>,
        params: Vec<(String, Value)>,
    ) -> Self {
        Self {
            params,
            ..Self::new(env, version)
        }
    }

    #[must_use]
    pub fn from_options(env: &'e Environment, options: &ParserOptions) -> Self {
        Self::with_params(env, options.version, options.params.clone())
    }

    #[must_use]
    pub fn env(&self) -> &'e Environment {
        self.env
    }

    #[must_use]
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// Whether a field restricted to `range` is present under the current
    /// version. With no version set, every field is present.
    #[must_use]
    pub fn in_version(&self, range: Option<&VersionRange>) -> bool {
        match (range, &self.version) {
            (Some(range), Some(v)) => range.contains(v),
            _ => true,
        }
    }

    #[must_use]
    pub fn scope(&self) -> Scope<'_> {
        Scope::new(&self.records, &self.params)
    }

    pub fn evaluate(&self, expr: &str) -> Result<Value, ExpressionError> {
        self.env.evaluator.evaluate(expr, &self.scope())
    }

    /// Evaluates an optional condition; an absent condition holds.
    pub fn condition(&self, cond: Option<&str>) -> Result<bool, ExpressionError> {
        match cond {
            None => Ok(true),
            Some(expr) => self.env.evaluator.evaluate_bool(expr, &self.scope()),
        }
    }

    pub fn size(&self, size: &Size) -> Result<usize, ExpressionError> {
        match size {
            Size::Const(n) => Ok(*n),
            Size::Expr(expr) => self.env.evaluator.evaluate_size(expr, &self.scope()),
        }
    }

    pub fn push_param(&mut self, name: impl Into<String>, value: Value) {
        self.params.push((name.into(), value));
    }

    /// Removes the `n` most recently pushed parameters.
    pub fn pop_params(&mut self, n: usize) {
        let keep = self.params.len().saturating_sub(n);
        self.params.truncate(keep);
    }

    pub fn push_record(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn pop_record(&mut self) -> Option<Record> {
        self.records.pop()
    }

    /// The record currently being decoded or encoded
    #[must_use]
    pub fn current(&self) -> Option<&Record> {
        self.records.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut Record> {
        self.records.last_mut()
    }

    pub fn enter(&mut self, segment: impl Into<String>) {
        self.path.push(segment.into());
    }

    pub fn leave(&mut self) {
        self.path.pop();
    }

    /// Records the current path and `offset` as the failure site, unless a
    /// deeper failure was already recorded.
    pub fn note_failure(&mut self, offset: usize) {
        if self.failure.is_none() {
            self.failure = Some((self.path.clone(), offset));
        }
    }

    /// Takes the recorded failure site, defaulting to the current path.
    pub fn take_failure(&mut self, offset: usize) -> (Vec<String>, usize) {
        self.failure
            .take()
            .unwrap_or_else(|| (self.path.clone(), offset))
    }

    /// Clears per-message state so the context can be reused for the next
    /// message of a stream.
    pub fn reset(&mut self) {
        self.records.clear();
        self.path.clear();
        self.failure = None;
        self.checksum_slots.clear();
    }

    pub(crate) fn push_checksum_slot(&mut self, at: BitIndex) {
        self.checksum_slots.push(at);
    }

    pub(crate) fn checksum_slots(&self) -> usize {
        self.checksum_slots.len()
    }

    pub(crate) fn pop_checksum_slot(&mut self) -> Option<BitIndex> {
        self.checksum_slots.pop()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::version::Version;

    #[test]
    fn parameters_and_records_scope_expressions() {
        let env = Environment::new(TemplateRegistry::default());
        let mut cx = DecodeContext::new(&env, None);
        cx.push_record(Record::new("M").with("len", 3u8));
        cx.push_param("prefix", Value::UInt(7));
        assert_eq!(cx.evaluate("len + #prefix"), Ok(Value::Int(10)));
        assert_eq!(cx.size(&Size::expr("len * 2")), Ok(6));
        assert_eq!(cx.condition(None), Ok(true));
        cx.pop_params(1);
        assert_eq!(cx.evaluate("#prefix"), Ok(Value::Null));
    }

    #[test]
    fn version_gate() {
        let env = Environment::new(TemplateRegistry::default());
        let range = VersionRange::since(Version::new(2, 0, 0));
        assert!(DecodeContext::new(&env, None).in_version(Some(&range)));
        assert!(!DecodeContext::new(&env, Some(Version::new(1, 9, 0))).in_version(Some(&range)));
        assert!(DecodeContext::new(&env, Some(Version::new(2, 1, 0))).in_version(Some(&range)));
    }

    #[test]
    fn innermost_failure_wins() {
        let env = Environment::new(TemplateRegistry::default());
        let mut cx = DecodeContext::new(&env, None);
        cx.enter("outer");
        cx.enter("inner");
        cx.note_failure(4);
        cx.leave();
        cx.note_failure(9);
        assert_eq!(cx.take_failure(0), (vec!["outer".into(), "inner".into()], 4));
        assert_eq!(cx.take_failure(2), (vec!["outer".into()], 2));
    }
}
