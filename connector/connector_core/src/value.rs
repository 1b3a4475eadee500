//! Dynamic values.
//!
//! `Value` is the payload of literal expressions in constraints, of
//! extensible policy properties, and of the facts a caller places into an
//! evaluation context. It deserializes from any JSON or TOML scalar or
//! collection without a schema.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Null value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Integer value.
    Integer(i64),

    /// Floating-point value.
    Float(f64),

    /// String value.
    String(String),

    /// Array of values.
    Array(Vec<Value>),

    /// Map of values.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this value is a number (integer or float).
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }

    /// Get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer.
    ///
    /// Floats without a fractional part that fit in an `i64` are converted.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f)
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 =>
            {
                Some(*f as i64)
            }
            _ => None,
        }
    }

    /// Get this value as a floating-point number.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get this value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as a map.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Get a value from a map by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(m) => m.get(key),
            _ => None,
        }
    }

    /// View this value as a set of members.
    ///
    /// Arrays yield their elements, null yields nothing, and every other
    /// value is a one-element set containing itself.
    pub fn members(&self) -> &[Value] {
        match self {
            Self::Array(a) => a,
            Self::Null => &[],
            other => std::slice::from_ref(other),
        }
    }

    /// Equality that treats integers and floats as the same numeric domain.
    ///
    /// `Integer(1)` and `Float(1.0)` compare equal here while remaining
    /// distinct under `PartialEq`, which is structural.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                (*a as f64) == *b
            }
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            _ => self == other,
        }
    }

    /// Order two values of a comparable kind.
    ///
    /// Numbers order numerically and strings lexicographically (which also
    /// orders ISO-8601 timestamps chronologically). Any other pairing is
    /// incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (a, b) if a.is_number() && b.is_number() => {
                a.as_float()?.partial_cmp(&b.as_float()?)
            }
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
            Self::Array(a) => {
                write!(f, "[")?;
                for (i, value) in a.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Self::Map(m) => {
                write!(f, "{{")?;
                for (i, (key, value)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::Array(values.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(a) => Self::Array(a.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(o) => {
                Self::Map(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(42).as_integer(), Some(42));
        assert_eq!(Value::Float(3.0).as_integer(), Some(3));
        assert_eq!(Value::Float(3.5).as_integer(), None);
        assert_eq!(Value::from(7).as_float(), Some(7.0));
        assert_eq!(Value::from("EU").as_str(), Some("EU"));
        assert!(Value::Null.is_null());
        assert!(Value::from(vec!["a", "b"]).as_array().is_some());
    }

    #[test]
    fn test_members() {
        assert!(Value::Null.members().is_empty());
        assert_eq!(Value::from("x").members(), &[Value::from("x")]);
        assert_eq!(Value::from(vec![1, 2]).members().len(), 2);
    }

    #[test]
    fn test_loosely_equals() {
        assert!(Value::Integer(1).loosely_equals(&Value::Float(1.0)));
        assert!(!Value::Integer(1).loosely_equals(&Value::Float(1.5)));
        assert!(Value::from("a").loosely_equals(&Value::from("a")));
        assert!(!Value::from("1").loosely_equals(&Value::Integer(1)));
        assert_ne!(Value::Integer(1), Value::Float(1.0));
    }

    #[test]
    fn test_compare() {
        assert_eq!(Value::from(1).compare(&Value::from(2)), Some(Ordering::Less));
        assert_eq!(
            Value::from(2.5).compare(&Value::from(2)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::from("2024-01-01T00:00:00Z").compare(&Value::from("2023-12-31T23:59:59Z")),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::from("a").compare(&Value::from(1)), None);
        assert_eq!(Value::Null.compare(&Value::Null), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("EU").to_string(), "EU");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), Value::from(true));
        assert_eq!(Value::Map(map).to_string(), "{k: true}");
    }

    #[test]
    fn test_deserialize_untagged() {
        let value: Value = serde_json::from_str(r#"{"a": [1, 2.5, "x", null, false]}"#).unwrap();
        let array = value.get("a").and_then(Value::as_array).unwrap();
        assert_eq!(array[0], Value::Integer(1));
        assert_eq!(array[1], Value::Float(2.5));
        assert_eq!(array[2], Value::from("x"));
        assert_eq!(array[3], Value::Null);
        assert_eq!(array[4], Value::Bool(false));
    }

    #[test]
    fn test_from_json_value() {
        let json = serde_json::json!({"region": "EU", "level": 3});
        let value = Value::from(json);
        assert_eq!(value.get("region"), Some(&Value::from("EU")));
        assert_eq!(value.get("level"), Some(&Value::Integer(3)));
    }
}
