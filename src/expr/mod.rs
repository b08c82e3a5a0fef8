//! Expression evaluation capability
//!
//! Conditions, sizes, counts, formulas and post-processing rules are all
//! written as expression text in schemas. The engine never interprets that
//! text itself: it hands it, together with a [`Scope`] describing the
//! in-progress message, to an [`Evaluator`]. [`SimpleEvaluator`] is the
//! default implementation; callers may substitute their own.
//!
//! # Name resolution
//!
//! * A bare name (`len`) or dotted path (`header.flags`) is looked up in the
//!   record currently being processed ("self"), then in each enclosing record
//!   outward to the root, so that nested objects can see their parents'
//!   fields.
//! * `root.` followed by a path always resolves against the outermost record.
//! * `#name` refers to a named context parameter; the innermost binding of a
//!   name wins. Discriminated choices bind the tag they read as `#prefix`.
//! * Names that resolve to nothing evaluate to `null`.

pub mod simple;

use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

use crate::value::{Record, Value};

pub use simple::SimpleEvaluator;

/// Errors raised while compiling or evaluating an expression
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpressionError {
    /// The expression text is malformed at byte `at`
    Syntax {
        expr: String,
        at: usize,
        reason: String,
    },
    UnknownFunction(String),
    Arity {
        function: String,
        expected: &'static str,
        found: usize,
    },
    /// An operator was applied to a value of the wrong kind
    Type { op: &'static str, found: &'static str },
    DivisionByZero,
    /// A condition evaluated to a value with no truth value
    NotBoolean { expr: String, found: &'static str },
    /// A size or count evaluated to something other than a non-negative integer
    NotSize { expr: String, value: String },
}

impl Display for ExpressionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpressionError::Syntax { expr, at, reason } => {
                write!(f, "syntax error in `{expr}` at {at}: {reason}")
            }
            ExpressionError::UnknownFunction(name) => write!(f, "unknown function `{name}`"),
            ExpressionError::Arity {
                function,
                expected,
                found,
            } => write!(
                f,
                "function `{function}` expects {expected} arguments, found {found}"
            ),
            ExpressionError::Type { op, found } => {
                write!(f, "operator `{op}` cannot be applied to {found}")
            }
            ExpressionError::DivisionByZero => write!(f, "division by zero"),
            ExpressionError::NotBoolean { expr, found } => {
                write!(f, "condition `{expr}` evaluated to {found}, not a boolean")
            }
            ExpressionError::NotSize { expr, value } => {
                write!(f, "size `{expr}` evaluated to {value}, not a non-negative integer")
            }
        }
    }
}

impl Error for ExpressionError {}

/// Read-only view of the state an expression is evaluated against
#[derive(Clone, Copy, Debug)]
pub struct Scope<'a> {
    records: &'a [Record],
    params: &'a [(String, Value)],
}

impl<'a> Scope<'a> {
    /// Builds a scope over a stack of records (root first, "self" last) and a
    /// stack of named parameters (innermost last).
    #[must_use]
    pub fn new(records: &'a [Record], params: &'a [(String, Value)]) -> Self {
        Self { records, params }
    }

    #[must_use]
    pub fn empty() -> Scope<'static> {
        Scope {
            records: &[],
            params: &[],
        }
    }

    /// The record currently being processed
    #[must_use]
    pub fn current(&self) -> Option<&'a Record> {
        self.records.last()
    }

    #[must_use]
    pub fn root(&self) -> Option<&'a Record> {
        self.records.first()
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&'a Value> {
        self.params
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Resolves a path against "self", falling back to enclosing records.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Option<&'a Value> {
        let (head, rest) = path.split_first()?;
        self.records
            .iter()
            .rev()
            .find_map(|r| r.get(head.as_ref()))
            .and_then(|v| v.get_path(rest))
    }

    #[must_use]
    pub fn resolve_root<S: AsRef<str>>(&self, path: &[S]) -> Option<&'a Value> {
        let (head, rest) = path.split_first()?;
        self.root()?.get(head.as_ref())?.get_path(rest)
    }
}

/// Injected capability that evaluates expression text against a [`Scope`]
///
/// Implementations must be shareable across threads, as an engine holds a
/// single evaluator for all concurrent calls.
pub trait Evaluator: Send + Sync + Debug {
    fn evaluate(&self, expr: &str, scope: &Scope<'_>) -> Result<Value, ExpressionError>;

    /// Evaluates a condition.
    fn evaluate_bool(&self, expr: &str, scope: &Scope<'_>) -> Result<bool, ExpressionError> {
        let v = self.evaluate(expr, scope)?;
        v.truthy().ok_or_else(|| ExpressionError::NotBoolean {
            expr: expr.to_owned(),
            found: v.kind_name(),
        })
    }

    /// Evaluates a size or element count.
    fn evaluate_size(&self, expr: &str, scope: &Scope<'_>) -> Result<usize, ExpressionError> {
        let v = self.evaluate(expr, scope)?;
        v.as_i128()
            .filter(|_| !matches!(v, Value::Bool(_)))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| ExpressionError::NotSize {
                expr: expr.to_owned(),
                value: v.to_string(),
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolution_order() {
        let root = Record::new("Outer").with("len", 4u8).with("kind", 1u8);
        let inner = Record::new("Inner").with("len", 9u8);
        let stack = [root, inner];
        let params = [("prefix".to_owned(), Value::UInt(1)), ("prefix".to_owned(), Value::UInt(2))];
        let scope = Scope::new(&stack, &params);
        assert_eq!(scope.resolve(&["len"]), Some(&Value::UInt(9)));
        assert_eq!(scope.resolve(&["kind"]), Some(&Value::UInt(1)));
        assert_eq!(scope.resolve_root(&["len"]), Some(&Value::UInt(4)));
        assert_eq!(scope.param("prefix"), Some(&Value::UInt(2)));
        assert_eq!(scope.resolve(&["missing"]), None);
    }

    #[test]
    fn size_must_be_non_negative() {
        let ev = SimpleEvaluator;
        let scope = Scope::empty();
        assert_eq!(ev.evaluate_size("2 * 3", &scope), Ok(6));
        assert!(matches!(
            ev.evaluate_size("0 - 1", &scope),
            Err(ExpressionError::NotSize { .. })
        ));
        assert!(matches!(
            ev.evaluate_bool("'yes'", &scope),
            Err(ExpressionError::NotBoolean { .. })
        ));
    }
}
