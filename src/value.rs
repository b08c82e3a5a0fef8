//! Dynamically-typed values produced by decoding and consumed by encoding
//!
//! Decoded messages are represented as [`Record`]s: ordered field bags tagged
//! with the name of the template they were decoded from. Callers that want
//! native structs adapt at the boundary with their own `From`/`TryFrom`
//! implementations.

use std::fmt::{Display, Formatter};

use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// A single decoded (or to-be-encoded) value
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Big(BigInt),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Bits(Vec<bool>),
    List(Vec<Value>),
    Record(Record),
}

impl Value {
    /// Short name of the variant, used in type-mismatch diagnostics
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "signed integer",
            Value::UInt(_) => "unsigned integer",
            Value::Big(_) => "big integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Bits(_) => "bits",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view of the value, if it is an integer that fits in `i128`
    #[must_use]
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(*i as i128),
            Value::UInt(u) => Some(*u as i128),
            Value::Big(b) => b.to_i128(),
            Value::Bool(b) => Some(i128::from(*b)),
            _ => None,
        }
    }

    /// Arbitrary-precision view of an integer value
    #[must_use]
    pub fn as_bigint(&self) -> Option<BigInt> {
        match self {
            Value::Int(i) => Some(BigInt::from(*i)),
            Value::UInt(u) => Some(BigInt::from(*u)),
            Value::Big(b) => Some(b.clone()),
            Value::Bool(b) => Some(BigInt::from(u8::from(*b))),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            Value::Big(b) => b.to_f64(),
            _ => None,
        }
    }

    /// Truth value under the usual conventions: `null` and zero are false.
    ///
    /// Returns `None` for values that have no truth value (text, lists, ...).
    #[must_use]
    pub fn truthy(&self) -> Option<bool> {
        match self {
            Value::Null => Some(false),
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::UInt(u) => Some(*u != 0),
            Value::Big(b) => Some(b.sign() != num_bigint::Sign::NoSign),
            Value::Float(f) => Some(*f != 0.0),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(xs) => Some(xs),
            _ => None,
        }
    }

    /// Follows a dotted path of field names through nested records.
    #[must_use]
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self.as_record()?.get(head.as_ref())?.get_path(rest),
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $var:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(x: $t) -> Self {
                    Value::$var(x.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int, i16 => Int, i32 => Int, i64 => Int,
    u8 => UInt, u16 => UInt, u32 => UInt, u64 => UInt,
    BigInt => Big,
    f64 => Float,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    Vec<bool> => Bits,
    Vec<Value> => List,
    Record => Record,
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Big(b) => write!(f, "{b}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(bs) => {
                f.write_str("0x")?;
                bs.iter().try_for_each(|b| write!(f, "{b:02x}"))
            }
            Value::Bits(bits) => {
                f.write_str("0b")?;
                bits.iter()
                    .try_for_each(|b| f.write_str(if *b { "1" } else { "0" }))
            }
            Value::List(xs) => {
                f.write_str("[")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{x}")?;
                }
                f.write_str("]")
            }
            Value::Record(r) => write!(f, "{r}"),
        }
    }
}

/// Ordered field bag tagged with its concrete type name
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.iter_mut().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Stores `value` under `name`, replacing an existing entry in place or
    /// appending a new one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.get_mut(&name) {
            Some(slot) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let ix = self.fields.iter().position(|(k, _)| k == name)?;
        Some(self.fields.remove(ix).1)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {{", self.type_name)?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, " {k}: {v}")?;
        }
        f.write_str(" }")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut r = Record::new("Frame").with("a", 1u8).with("b", "x");
        r.set("a", 2u8);
        assert_eq!(r.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(r.get("a"), Some(&Value::UInt(2)));
        assert_eq!(r.remove("b"), Some(Value::from("x")));
        assert!(!r.contains("b"));
    }

    #[test]
    fn nested_paths() {
        let inner = Record::new("Inner").with("x", -3i32);
        let v = Value::Record(Record::new("Outer").with("inner", inner));
        assert_eq!(v.get_path(&["inner", "x"]), Some(&Value::Int(-3)));
        assert_eq!(v.get_path(&["inner", "y"]), None);
    }

    #[test]
    fn display_forms() {
        let r = Record::new("M")
            .with("n", 5u8)
            .with("raw", vec![0xdeu8, 0xad])
            .with("flags", vec![true, false]);
        assert_eq!(r.to_string(), "M { n: 5, raw: 0xdead, flags: 0b10 }");
    }
}
