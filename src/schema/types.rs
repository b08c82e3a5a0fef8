//! Declared field types
//!
//! Every field of a template declares the [`ValueType`] its decoded value
//! takes. The declared type decides signedness and width of integer reads,
//! the canonical [`Value`] variant of the result, and which bindings and
//! converters are compatible with the field.

use std::fmt::{Display, Formatter};

use num_bigint::BigInt;

use crate::value::Value;

/// Declared type of a field
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    /// Signed integer of arbitrary width
    BigInt,
    /// Unsigned integer of arbitrary width
    BigUint,
    F32,
    F64,
    Text,
    Bytes,
    Bits,
    List(Box<ValueType>),
    /// Nested record of the named template type (or a subtype thereof)
    Object(String),
}

impl ValueType {
    pub fn list(elem: ValueType) -> Self {
        ValueType::List(Box::new(elem))
    }

    pub fn object(name: impl Into<String>) -> Self {
        ValueType::Object(name.into())
    }

    /// Bit width of a fixed-width integer type
    #[must_use]
    pub const fn int_width(&self) -> Option<u32> {
        match self {
            ValueType::I8 | ValueType::U8 => Some(8),
            ValueType::I16 | ValueType::U16 => Some(16),
            ValueType::I32 | ValueType::U32 => Some(32),
            ValueType::I64 | ValueType::U64 => Some(64),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_integer(&self) -> bool {
        self.int_width().is_some() || matches!(self, ValueType::BigInt | ValueType::BigUint)
    }

    #[must_use]
    pub const fn is_signed(&self) -> bool {
        matches!(
            self,
            ValueType::I8 | ValueType::I16 | ValueType::I32 | ValueType::I64 | ValueType::BigInt
        )
    }

    /// Whether an integer read of `bits` bits always fits this type.
    #[must_use]
    pub fn holds_bits(&self, bits: u32) -> bool {
        match self {
            ValueType::BigInt | ValueType::BigUint | ValueType::Bool => true,
            ValueType::F32 => bits == 32,
            ValueType::F64 => bits == 64,
            other => other.int_width().map_or(false, |w| bits <= w),
        }
    }

    /// Inclusive value range of an integer type
    fn int_range(&self) -> Option<(i128, i128)> {
        let w = self.int_width()? as usize;
        Some(crate::int::native_range(w, self.is_signed()))
    }

    /// Whether values of type `other` can be stored in a field of this type
    /// without loss.
    #[must_use]
    pub fn accepts(&self, other: &ValueType) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (ValueType::BigInt, o) => o.is_integer(),
            (ValueType::BigUint, o) => o.is_integer() && !o.is_signed(),
            (ValueType::F64, ValueType::F32) => true,
            (ValueType::List(a), ValueType::List(b)) => a.accepts(b),
            (s, o) => match (s.int_range(), o.int_range()) {
                (Some((smin, smax)), Some((omin, omax))) => smin <= omin && omax <= smax,
                _ => false,
            },
        }
    }

    /// Converts `v` to the canonical variant for this type, checking range.
    ///
    /// Canonical variants: `Bool`; `Int` for signed types up to 64 bits;
    /// `UInt` for unsigned ones; `Big` for the arbitrary-width types;
    /// `Float`; `Text`; `Bytes`; `Bits`; `List` (element-wise); `Record`.
    /// Returns `None` if the value has no lossless representation.
    #[must_use]
    pub fn coerce(&self, v: Value) -> Option<Value> {
        match self {
            ValueType::Bool => v.truthy().map(Value::Bool).filter(|_| {
                !matches!(v, Value::Float(_) | Value::Null) && v.as_i128().map_or(true, |i| i == 0 || i == 1)
            }),
            ValueType::BigInt => v.as_bigint().map(Value::Big),
            ValueType::BigUint => v
                .as_bigint()
                .filter(|b| b.sign() != num_bigint::Sign::Minus)
                .map(Value::Big),
            ValueType::F32 | ValueType::F64 => v.as_f64().map(Value::Float),
            ValueType::Text => match v {
                Value::Text(_) => Some(v),
                _ => None,
            },
            ValueType::Bytes => match v {
                Value::Bytes(_) => Some(v),
                _ => None,
            },
            ValueType::Bits => match v {
                Value::Bits(_) => Some(v),
                _ => None,
            },
            ValueType::List(elem) => match v {
                Value::List(xs) => xs
                    .into_iter()
                    .map(|x| elem.coerce(x))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::List),
                _ => None,
            },
            ValueType::Object(_) => match v {
                Value::Record(_) => Some(v),
                _ => None,
            },
            int => {
                let (min, max) = int.int_range()?;
                let i = match v {
                    Value::Bool(_) | Value::Float(_) => return None,
                    _ => v.as_i128()?,
                };
                if i < min || i > max {
                    None
                } else if int.is_signed() {
                    Some(Value::Int(i as i64))
                } else {
                    Some(Value::UInt(i as u64))
                }
            }
        }
    }

    /// Canonical zero of a numeric type, used for placeholders
    #[must_use]
    pub fn zero(&self) -> Value {
        match self {
            ValueType::BigInt | ValueType::BigUint => Value::Big(BigInt::default()),
            t if t.is_signed() => Value::Int(0),
            _ => Value::UInt(0),
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::Bool => f.write_str("bool"),
            ValueType::I8 => f.write_str("i8"),
            ValueType::I16 => f.write_str("i16"),
            ValueType::I32 => f.write_str("i32"),
            ValueType::I64 => f.write_str("i64"),
            ValueType::U8 => f.write_str("u8"),
            ValueType::U16 => f.write_str("u16"),
            ValueType::U32 => f.write_str("u32"),
            ValueType::U64 => f.write_str("u64"),
            ValueType::BigInt => f.write_str("bigint"),
            ValueType::BigUint => f.write_str("biguint"),
            ValueType::F32 => f.write_str("f32"),
            ValueType::F64 => f.write_str("f64"),
            ValueType::Text => f.write_str("text"),
            ValueType::Bytes => f.write_str("bytes"),
            ValueType::Bits => f.write_str("bits"),
            ValueType::List(elem) => write!(f, "list<{elem}>"),
            ValueType::Object(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn widening_is_accepted() {
        assert!(ValueType::U64.accepts(&ValueType::U32));
        assert!(ValueType::I16.accepts(&ValueType::U8));
        assert!(!ValueType::U16.accepts(&ValueType::I8));
        assert!(!ValueType::U8.accepts(&ValueType::U16));
        assert!(ValueType::BigInt.accepts(&ValueType::U64));
        assert!(ValueType::BigInt.accepts(&ValueType::BigUint));
        assert!(!ValueType::BigUint.accepts(&ValueType::I8));
        assert!(ValueType::list(ValueType::U16).accepts(&ValueType::list(ValueType::U8)));
        assert!(!ValueType::Text.accepts(&ValueType::Bytes));
    }

    #[test]
    fn coercion_is_canonical() {
        assert_eq!(ValueType::U8.coerce(Value::Int(5)), Some(Value::UInt(5)));
        assert_eq!(ValueType::U8.coerce(Value::Int(256)), None);
        assert_eq!(ValueType::I8.coerce(Value::UInt(127)), Some(Value::Int(127)));
        assert_eq!(ValueType::Bool.coerce(Value::UInt(1)), Some(Value::Bool(true)));
        assert_eq!(ValueType::Bool.coerce(Value::UInt(2)), None);
        assert_eq!(
            ValueType::BigInt.coerce(Value::Int(-1)),
            Some(Value::Big(BigInt::from(-1)))
        );
        assert_eq!(ValueType::BigUint.coerce(Value::Int(-1)), None);
        assert_eq!(
            ValueType::list(ValueType::U16).coerce(Value::List(vec![Value::Int(1)])),
            Some(Value::List(vec![Value::UInt(1)]))
        );
    }

    #[test]
    fn bit_capacity() {
        assert!(ValueType::U8.holds_bits(3));
        assert!(!ValueType::U8.holds_bits(9));
        assert!(ValueType::BigUint.holds_bits(200));
        assert!(ValueType::F32.holds_bits(32));
        assert!(!ValueType::F32.holds_bits(16));
    }
}
