//! Registry of the basic kinds: string conversion and schema fragments.

use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::text::comma_sentence;

/// Kinds accepted directly as parameters, returns and fields.
///
/// Variants are declared in the order used when listing them in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BasicKind {
    /// `bool`
    Bool,
    /// `f32`
    Float32,
    /// `f64`
    Float64,
    /// `isize`
    Int,
    /// `i16`
    Int16,
    /// `i32`
    Int32,
    /// `i64`
    Int64,
    /// `i8`
    Int8,
    /// Any JSON value
    Interface,
    /// `String`
    String,
    /// `usize`
    Uint,
    /// `u16`
    Uint16,
    /// `u32`
    Uint32,
    /// `u64`
    Uint64,
    /// `u8`
    Uint8,
}

/// cannot convert passed value {value} to {kind}
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub struct ConversionError {
    /// Raw argument
    pub value: String,
    /// Target kind
    pub kind: BasicKind,
}

impl BasicKind {
    /// All kinds, sorted by name
    pub const ALL: [Self; 15] = [
        Self::Bool,
        Self::Float32,
        Self::Float64,
        Self::Int,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Int8,
        Self::Interface,
        Self::String,
        Self::Uint,
        Self::Uint16,
        Self::Uint32,
        Self::Uint64,
        Self::Uint8,
    ];

    /// Name of the kind as used in diagnostics and type names
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Int => "int",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Int8 => "int8",
            Self::Interface => "interface",
            Self::String => "string",
            Self::Uint => "uint",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Uint8 => "uint8",
        }
    }

    /// Convert a raw argument into a JSON value of this kind.
    ///
    /// An empty string yields the zero value for numeric and boolean kinds.
    ///
    /// # Errors
    /// If the string does not parse or is out of range for the kind.
    pub fn convert(self, raw: &str) -> Result<Value, ConversionError> {
        let fail = || ConversionError {
            value: raw.to_owned(),
            kind: self,
        };

        match self {
            Self::String | Self::Interface => Ok(Value::String(raw.to_owned())),
            Self::Bool => match raw {
                "" | "false" => Ok(Value::Bool(false)),
                "true" => Ok(Value::Bool(true)),
                _ => Err(fail()),
            },
            Self::Int | Self::Int64 => integer::<i64>(raw).ok_or_else(fail),
            Self::Int32 => integer::<i32>(raw).ok_or_else(fail),
            Self::Int16 => integer::<i16>(raw).ok_or_else(fail),
            Self::Int8 => integer::<i8>(raw).ok_or_else(fail),
            Self::Uint | Self::Uint64 => integer::<u64>(raw).ok_or_else(fail),
            Self::Uint32 => integer::<u32>(raw).ok_or_else(fail),
            Self::Uint16 => integer::<u16>(raw).ok_or_else(fail),
            Self::Uint8 => integer::<u8>(raw).ok_or_else(fail),
            Self::Float32 => float(raw, |raw| raw.parse::<f32>().is_ok_and(f32::is_finite))
                .ok_or_else(fail),
            Self::Float64 => float(raw, |raw| raw.parse::<f64>().is_ok_and(f64::is_finite))
                .ok_or_else(fail),
        }
    }

    /// Structural schema fragment describing values of this kind
    pub fn schema(self) -> Value {
        match self {
            Self::String => json!({ "type": "string" }),
            Self::Bool => json!({ "type": "boolean" }),
            Self::Interface => json!({}),
            Self::Int | Self::Int64 => json!({ "type": "integer", "format": "int64" }),
            Self::Int32 => bounded_integer("int32", i32::MIN.into(), i32::MAX.into()),
            Self::Int16 => bounded_integer("int16", i16::MIN.into(), i16::MAX.into()),
            Self::Int8 => bounded_integer("int8", i8::MIN.into(), i8::MAX.into()),
            Self::Uint8 => bounded_integer("int32", 0, u8::MAX.into()),
            Self::Uint16 => bounded_integer("int64", 0, u16::MAX.into()),
            Self::Uint32 => bounded_integer("int64", 0, u32::MAX.into()),
            Self::Uint | Self::Uint64 => json!({
                "type": "number",
                "format": "double",
                "multipleOf": 1.0,
                "minimum": 0.0,
                "maximum": u64_max_as_float(),
            }),
            Self::Float32 => json!({ "type": "number", "format": "float" }),
            Self::Float64 => json!({ "type": "number", "format": "double" }),
        }
    }
}

impl fmt::Display for BasicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Names of all basic kinds joined into a sentence.
pub fn list_basic_kinds() -> String {
    comma_sentence(&BasicKind::ALL.map(BasicKind::name))
}

fn integer<T>(raw: &str) -> Option<Value>
where
    T: FromStr + Default + Into<Value>,
{
    if raw.is_empty() {
        return Some(T::default().into());
    }
    raw.parse::<T>().ok().map(Into::into)
}

fn float(raw: &str, in_range: impl Fn(&str) -> bool) -> Option<Value> {
    if raw.is_empty() {
        return Some(json!(0.0));
    }
    if !in_range(raw) {
        return None;
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

fn bounded_integer(format: &str, minimum: i64, maximum: i64) -> Value {
    json!({
        "type": "integer",
        "format": format,
        "minimum": minimum,
        "maximum": maximum,
    })
}

#[allow(clippy::cast_precision_loss)]
fn u64_max_as_float() -> f64 {
    u64::MAX as f64
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn kinds_are_sorted_by_name() {
        let names = BasicKind::ALL.map(BasicKind::name);
        let mut sorted = names;
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn blank_converts_to_zero_value() {
        assert_eq!(BasicKind::Bool.convert(""), Ok(json!(false)));
        assert_eq!(BasicKind::Int8.convert(""), Ok(json!(0)));
        assert_eq!(BasicKind::Uint64.convert(""), Ok(json!(0)));
        assert_eq!(BasicKind::Float32.convert(""), Ok(json!(0.0)));
        assert_eq!(BasicKind::String.convert(""), Ok(json!("")));
    }

    #[test]
    fn bool_accepts_only_exact_literals() {
        assert_eq!(BasicKind::Bool.convert("true"), Ok(json!(true)));
        assert_eq!(BasicKind::Bool.convert("false"), Ok(json!(false)));
        let err = BasicKind::Bool.convert("TRUE").unwrap_err();
        assert_eq!(err.to_string(), "cannot convert passed value TRUE to bool");
    }

    #[test]
    fn integers_enforce_exact_width() {
        assert_eq!(BasicKind::Int8.convert("127"), Ok(json!(127)));
        assert_eq!(
            BasicKind::Int8.convert("128").unwrap_err().to_string(),
            "cannot convert passed value 128 to int8"
        );
        assert_eq!(BasicKind::Int16.convert("-32768"), Ok(json!(-32768)));
        assert!(BasicKind::Int16.convert("32768").is_err());
        assert!(BasicKind::Int32.convert("2147483648").is_err());
        assert_eq!(
            BasicKind::Int64.convert("not a number").unwrap_err().to_string(),
            "cannot convert passed value not a number to int64"
        );
    }

    #[test]
    fn int64_boundaries_are_exact() {
        assert_eq!(
            BasicKind::Int64.convert("9223372036854775807"),
            Ok(json!(i64::MAX))
        );
        assert_eq!(
            BasicKind::Int64.convert("-9223372036854775808"),
            Ok(json!(i64::MIN))
        );
        assert!(BasicKind::Int64.convert("9223372036854775808").is_err());
        assert!(BasicKind::Int.convert("-9223372036854775809").is_err());
    }

    #[test]
    fn unsigned_rejects_negative_and_overflow() {
        assert_eq!(
            BasicKind::Uint8.convert("-1").unwrap_err().to_string(),
            "cannot convert passed value -1 to uint8"
        );
        assert!(BasicKind::Uint8.convert("256").is_err());
        assert!(BasicKind::Uint16.convert("65536").is_err());
        assert!(BasicKind::Uint32.convert("4294967296").is_err());
        assert_eq!(
            BasicKind::Uint64.convert("18446744073709551615"),
            Ok(json!(u64::MAX))
        );
        assert!(BasicKind::Uint64.convert("18446744073709551616").is_err());
        assert!(BasicKind::Uint.convert("-1").is_err());
    }

    #[test]
    fn floats_reject_overflow() {
        assert_eq!(BasicKind::Float32.convert("123.456"), Ok(json!(123.456)));
        let too_big = f64::MAX.to_string();
        assert_eq!(
            BasicKind::Float32.convert(&too_big).unwrap_err().to_string(),
            format!("cannot convert passed value {too_big} to float32")
        );
        assert!(BasicKind::Float64.convert(&too_big).is_ok());
        assert!(BasicKind::Float64.convert("1e400").is_err());
        assert!(BasicKind::Float64.convert("not a number").is_err());
    }

    #[test]
    fn interface_passes_string_through() {
        assert_eq!(
            BasicKind::Interface.convert("{\"a\":1}"),
            Ok(json!("{\"a\":1}"))
        );
    }

    #[test]
    fn unsigned_wide_kinds_use_float_schema() {
        let schema = BasicKind::Uint64.schema();
        assert_eq!(schema["type"], "number");
        assert_eq!(schema["multipleOf"], 1.0);
        assert_eq!(schema["minimum"], 0.0);
        assert_eq!(BasicKind::Uint.schema(), schema);
    }

    #[test]
    fn narrow_integers_carry_bounds() {
        assert_eq!(
            BasicKind::Uint8.schema(),
            json!({ "type": "integer", "format": "int32", "minimum": 0, "maximum": 255 })
        );
        assert_eq!(BasicKind::Int8.schema()["minimum"], -128);
        assert_eq!(BasicKind::Interface.schema(), json!({}));
    }

    #[test]
    fn list_is_a_sentence() {
        let list = list_basic_kinds();
        assert!(list.starts_with("bool, float32, float64, int, "));
        assert!(list.ends_with("uint32, uint64 and uint8"));
    }

    proptest! {
        #[test]
        fn int32_round_trips(value in any::<i32>()) {
            prop_assert_eq!(BasicKind::Int32.convert(&value.to_string()), Ok(json!(value)));
        }

        #[test]
        fn uint16_round_trips(value in any::<u16>()) {
            prop_assert_eq!(BasicKind::Uint16.convert(&value.to_string()), Ok(json!(value)));
        }

        #[test]
        fn finite_float64_round_trips(value in -1.0e300_f64..1.0e300_f64) {
            let converted = BasicKind::Float64.convert(&value.to_string()).unwrap();
            prop_assert_eq!(converted.as_f64(), Some(value));
        }
    }
}
