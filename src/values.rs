use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The type a flag's values are declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Boolean,
    String,
    Number,
    Json,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Json => "json",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value type '{0}'")]
pub struct UnknownValueType(pub String);

impl FromStr for ValueType {
    type Err = UnknownValueType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(ValueType::Boolean),
            "string" => Ok(ValueType::String),
            "number" => Ok(ValueType::Number),
            "json" => Ok(ValueType::Json),
            other => Err(UnknownValueType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected a {expected} value, got {actual}")]
pub struct ValueTypeMismatch {
    pub expected: ValueType,
    pub actual: &'static str,
}

/// A flag or gate value. Serialized as the plain JSON value.
///
/// Objects, arrays and null land in `Json`; scalars land in their own variant, so a
/// `json`-typed flag may legitimately carry any of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    #[serde(serialize_with = "serialize_number")]
    Number(f64),
    String(String),
    Json(serde_json::Value),
}

impl FlagValue {
    /// Build a value for a flag declared as `value_type`, rejecting anything that does not fit.
    pub fn from_json(
        value_type: ValueType,
        value: serde_json::Value,
    ) -> Result<FlagValue, ValueTypeMismatch> {
        let mismatch = |value: &serde_json::Value| ValueTypeMismatch {
            expected: value_type,
            actual: json_type_name(value),
        };

        match (value_type, value) {
            (_, serde_json::Value::Null) => Err(mismatch(&serde_json::Value::Null)),
            (ValueType::Boolean, serde_json::Value::Bool(b)) => Ok(FlagValue::Bool(b)),
            (ValueType::String, serde_json::Value::String(s)) => Ok(FlagValue::String(s)),
            (ValueType::Number, serde_json::Value::Number(n)) => n
                .as_f64()
                .map(FlagValue::Number)
                .ok_or(ValueTypeMismatch {
                    expected: value_type,
                    actual: "number",
                }),
            (ValueType::Json, other) => Ok(FlagValue::Json(other)),
            (_, other) => Err(mismatch(&other)),
        }
    }

    /// Name of the JSON type this value holds, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FlagValue::Bool(_) => "boolean",
            FlagValue::Number(_) => "number",
            FlagValue::String(_) => "string",
            FlagValue::Json(v) => json_type_name(v),
        }
    }

    /// Whether this value can be stored on a flag declared as `value_type`.
    pub fn conforms_to(&self, value_type: ValueType) -> bool {
        match (self, value_type) {
            (FlagValue::Json(serde_json::Value::Null), _) => false,
            (_, ValueType::Json) => true,
            (FlagValue::Bool(_), ValueType::Boolean) => true,
            (FlagValue::Number(_), ValueType::Number) => true,
            (FlagValue::String(_), ValueType::String) => true,
            (FlagValue::Json(v), ValueType::Boolean) => v.is_boolean(),
            (FlagValue::Json(v), ValueType::Number) => v.is_number(),
            (FlagValue::Json(v), ValueType::String) => v.is_string(),
            _ => false,
        }
    }

    pub fn check_type(&self, value_type: ValueType) -> Result<(), ValueTypeMismatch> {
        if self.conforms_to(value_type) {
            Ok(())
        } else {
            Err(ValueTypeMismatch {
                expected: value_type,
                actual: self.type_name(),
            })
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FlagValue::Json(serde_json::Value::Null))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(*b),
            FlagValue::Json(v) => v.as_bool(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FlagValue::Number(n) => Some(*n),
            FlagValue::Json(v) => v.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::String(s) => Some(s),
            FlagValue::Json(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FlagValue::Bool(b) => serde_json::Value::Bool(*b),
            FlagValue::Number(n) => match as_integer(*n) {
                Some(i) => serde_json::Value::Number(i.into()),
                None => serde_json::Number::from_f64(*n)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            },
            FlagValue::String(s) => serde_json::Value::String(s.clone()),
            FlagValue::Json(v) => v.clone(),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(b: bool) -> Self {
        FlagValue::Bool(b)
    }
}

impl From<f64> for FlagValue {
    fn from(n: f64) -> Self {
        FlagValue::Number(n)
    }
}

impl From<&str> for FlagValue {
    fn from(s: &str) -> Self {
        FlagValue::String(s.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(s: String) -> Self {
        FlagValue::String(s)
    }
}

/// The value as an `i64` when it is whole and in range, so `5` stays `5` on the wire and
/// deserializes into integer types.
fn as_integer(n: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is out of range
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

fn serialize_number<S>(n: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match as_integer(*n) {
        Some(i) => serializer.serialize_i64(i),
        None => serializer.serialize_f64(*n),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_type_round_trips_through_str() {
        for vt in [
            ValueType::Boolean,
            ValueType::String,
            ValueType::Number,
            ValueType::Json,
        ] {
            assert_eq!(vt.as_str().parse::<ValueType>(), Ok(vt));
        }
        assert!("integer".parse::<ValueType>().is_err());
    }

    #[test]
    fn test_untagged_deserialization() {
        let values: Vec<FlagValue> =
            serde_json::from_value(json!([true, 3, "blue", {"a": 1}])).unwrap();
        assert_eq!(values[0], FlagValue::Bool(true));
        assert_eq!(values[1], FlagValue::Number(3.0));
        assert_eq!(values[2], FlagValue::String("blue".to_string()));
        assert_eq!(values[3], FlagValue::Json(json!({"a": 1})));
    }

    #[test]
    fn test_conforms_to() {
        assert!(FlagValue::Bool(true).conforms_to(ValueType::Boolean));
        assert!(!FlagValue::String("true".into()).conforms_to(ValueType::Boolean));
        assert!(FlagValue::Number(1.5).conforms_to(ValueType::Number));
        assert!(FlagValue::Bool(false).conforms_to(ValueType::Json));
        assert!(FlagValue::Json(json!([1, 2])).conforms_to(ValueType::Json));
        assert!(!FlagValue::Json(json!(null)).conforms_to(ValueType::Json));
    }

    #[test]
    fn test_from_json_rejects_mismatch() {
        let err = FlagValue::from_json(ValueType::Boolean, json!("on")).unwrap_err();
        assert_eq!(err.expected, ValueType::Boolean);
        assert_eq!(err.actual, "string");
        assert_eq!(err.to_string(), "expected a boolean value, got string");

        assert!(FlagValue::from_json(ValueType::Json, json!(null)).is_err());
        assert_eq!(
            FlagValue::from_json(ValueType::Number, json!(42)).unwrap(),
            FlagValue::Number(42.0)
        );
    }

    #[test]
    fn test_whole_numbers_stay_integers() {
        let five = FlagValue::Number(5.0);
        assert_eq!(five.to_json(), json!(5));
        assert_eq!(serde_json::to_string(&five).unwrap(), "5");
        assert_eq!(serde_json::from_value::<i64>(five.to_json()).unwrap(), 5);
        assert_eq!(serde_json::from_value::<u32>(five.to_json()).unwrap(), 5);

        let negative = FlagValue::Number(-3.0);
        assert_eq!(serde_json::from_value::<i32>(negative.to_json()).unwrap(), -3);

        let fraction = FlagValue::Number(2.5);
        assert_eq!(fraction.to_json(), json!(2.5));
        assert_eq!(serde_json::to_string(&fraction).unwrap(), "2.5");
        assert!(serde_json::from_value::<i64>(fraction.to_json()).is_err());

        // beyond i64 the value keeps its float form
        assert!(FlagValue::Number(1e20).to_json().is_f64());
    }
}
