//! Converters and validators
//!
//! A converter bridges the value a binding reads (its *input* type) and the
//! type the field declares (its *output* type), in both directions. A
//! validator is a predicate applied to the converted value after decoding.
//! Both are referenced from bindings by id and looked up in a
//! [`ConverterRegistry`], which comes preloaded with:
//!
//! | id          | kind      | behaviour                                      |
//! |-------------|-----------|------------------------------------------------|
//! | `bcd`       | converter | packed BCD `u64` to its decimal value          |
//! | `bool`      | converter | integer to `bool` (non-zero is `true`)         |
//! | `non-empty` | validator | text, bytes, bits and lists must be non-empty  |
//! | `ascii`     | validator | text must be pure ASCII                        |

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::schema::ValueType;
use crate::value::Value;

/// Two-way transform between a wire value and a field value
pub trait Converter: Send + Sync + Debug {
    /// Type the binding reads and writes
    fn input(&self) -> ValueType;

    /// Type exposed to the field
    fn output(&self) -> ValueType;

    fn decode(&self, raw: Value) -> Result<Value, String>;

    fn encode(&self, value: &Value) -> Result<Value, String>;
}

/// Predicate over decoded values
pub trait Validator: Send + Sync + Debug {
    fn validate(&self, value: &Value) -> bool;
}

/// [`Converter`] backed by a pair of plain functions
#[derive(Clone, Debug)]
pub struct FnConverter {
    pub input: ValueType,
    pub output: ValueType,
    pub decode: fn(Value) -> Result<Value, String>,
    pub encode: fn(&Value) -> Result<Value, String>,
}

impl Converter for FnConverter {
    fn input(&self) -> ValueType {
        self.input.clone()
    }

    fn output(&self) -> ValueType {
        self.output.clone()
    }

    fn decode(&self, raw: Value) -> Result<Value, String> {
        (self.decode)(raw)
    }

    fn encode(&self, value: &Value) -> Result<Value, String> {
        (self.encode)(value)
    }
}

/// [`Validator`] backed by a plain function
#[derive(Clone, Copy, Debug)]
pub struct FnValidator(pub fn(&Value) -> bool);

impl Validator for FnValidator {
    fn validate(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

fn unsigned(v: &Value) -> Result<u64, String> {
    v.as_i128()
        .and_then(|i| u64::try_from(i).ok())
        .ok_or_else(|| format!("expected an unsigned integer, found {}", v.kind_name()))
}

fn bcd_decode(raw: Value) -> Result<Value, String> {
    let mut raw = unsigned(&raw)?;
    let mut acc = 0u64;
    let mut scale = 1u64;
    while raw != 0 {
        let digit = raw & 0xf;
        if digit > 9 {
            return Err(format!("nibble {digit:#x} is not a decimal digit"));
        }
        acc += digit * scale;
        raw >>= 4;
        scale = scale.saturating_mul(10);
    }
    Ok(Value::UInt(acc))
}

fn bcd_encode(value: &Value) -> Result<Value, String> {
    let mut dec = unsigned(value)?;
    let mut acc = 0u64;
    let mut shift = 0;
    while dec != 0 {
        if shift >= 64 {
            return Err(format!("{} has too many digits for packed BCD", unsigned(value)?));
        }
        acc |= (dec % 10) << shift;
        dec /= 10;
        shift += 4;
    }
    Ok(Value::UInt(acc))
}

fn bool_decode(raw: Value) -> Result<Value, String> {
    unsigned(&raw).map(|u| Value::Bool(u != 0))
}

fn bool_encode(value: &Value) -> Result<Value, String> {
    match value {
        Value::Bool(b) => Ok(Value::UInt(u64::from(*b))),
        other => Err(format!("expected bool, found {}", other.kind_name())),
    }
}

fn non_empty(value: &Value) -> bool {
    match value {
        Value::Text(s) => !s.is_empty(),
        Value::Bytes(b) => !b.is_empty(),
        Value::Bits(b) => !b.is_empty(),
        Value::List(xs) => !xs.is_empty(),
        Value::Null => false,
        _ => true,
    }
}

fn ascii(value: &Value) -> bool {
    value.as_str().map_or(false, str::is_ascii)
}

/// Id-keyed collection of converters and validators
#[derive(Clone, Debug)]
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<dyn Converter>>,
    validators: HashMap<String, Arc<dyn Validator>>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ConverterRegistry {
    /// Registry with no entries at all
    #[must_use]
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
            validators: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_builtins() -> Self {
        let mut reg = Self::empty();
        reg.register_converter(
            "bcd",
            Arc::new(FnConverter {
                input: ValueType::U64,
                output: ValueType::U64,
                decode: bcd_decode,
                encode: bcd_encode,
            }),
        );
        reg.register_converter(
            "bool",
            Arc::new(FnConverter {
                input: ValueType::U64,
                output: ValueType::Bool,
                decode: bool_decode,
                encode: bool_encode,
            }),
        );
        reg.register_validator("non-empty", Arc::new(FnValidator(non_empty)));
        reg.register_validator("ascii", Arc::new(FnValidator(ascii)));
        reg
    }

    /// Adds a converter, replacing any previous one with the same id.
    pub fn register_converter(&mut self, id: impl Into<String>, converter: Arc<dyn Converter>) {
        self.converters.insert(id.into(), converter);
    }

    /// Adds a validator, replacing any previous one with the same id.
    pub fn register_validator(&mut self, id: impl Into<String>, validator: Arc<dyn Validator>) {
        self.validators.insert(id.into(), validator);
    }

    #[must_use]
    pub fn converter(&self, id: &str) -> Option<&dyn Converter> {
        self.converters.get(id).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn validator(&self, id: &str) -> Option<&dyn Validator> {
        self.validators.get(id).map(AsRef::as_ref)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bcd_both_ways() {
        let reg = ConverterRegistry::with_builtins();
        let bcd = reg.converter("bcd").unwrap();
        assert_eq!(bcd.decode(Value::UInt(0x1234)), Ok(Value::UInt(1234)));
        assert_eq!(bcd.encode(&Value::UInt(1234)), Ok(Value::UInt(0x1234)));
        assert!(bcd.decode(Value::UInt(0x1a)).is_err());
        assert_eq!(bcd.decode(Value::UInt(0)), Ok(Value::UInt(0)));
    }

    #[test]
    fn builtin_validators() {
        let reg = ConverterRegistry::default();
        let non_empty = reg.validator("non-empty").unwrap();
        assert!(non_empty.validate(&Value::from("x")));
        assert!(!non_empty.validate(&Value::from("")));
        let ascii = reg.validator("ascii").unwrap();
        assert!(ascii.validate(&Value::from("plain")));
        assert!(!ascii.validate(&Value::from("naïve")));
        assert!(reg.validator("nope").is_none());
    }
}
