// Runtime value system for endow
// Represents the arguments and results flowing through wrapped callables
// (different from any host-language type; every callable speaks Value)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Vector(Vec<Value>),
    /// Unordered collection; element order is not significant for keying.
    Set(Vec<Value>),
    /// String-keyed mapping; iteration order is always sorted by key.
    Map(BTreeMap<String, Value>),
    /// Homogeneous numeric payload, potentially very large.
    NumericArray(Vec<f64>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Bytes(b) => write!(f, "#bytes({})", b.len()),
            Value::Vector(v) => {
                let items: Vec<String> = v.iter().map(|item| format!("{}", item)).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Set(s) => {
                let items: Vec<String> = s.iter().map(|item| format!("{}", item)).collect();
                write!(f, "#{{{}}}", items.join(", "))
            }
            Value::Map(m) => {
                let items: Vec<String> = m
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Value::NumericArray(xs) => {
                let items: Vec<String> = xs.iter().map(|x| format!("{}", x)).collect();
                write!(f, "array([{}])", items.join(", "))
            }
        }
    }
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Nil => false,
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Vector(_) => "vector",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::NumericArray(_) => "numeric-array",
        }
    }

    /// Build a map value from key/value pairs.
    pub fn map<K, V, I>(pairs: I) -> Value
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a vector value from any iterable of convertible items.
    pub fn vector<V, I>(items: I) -> Value
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Value::Vector(items.into_iter().map(Into::into).collect())
    }

    /// Build a set value; insertion order is kept but never significant.
    pub fn set<V, I>(items: I) -> Value
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Value::Set(items.into_iter().map(Into::into).collect())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Vector(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::Integer(-3).to_string(), "-3");
        assert_eq!(Value::String("hi".into()).to_string(), "\"hi\"");
        assert_eq!(Value::Bytes(vec![1, 2, 3]).to_string(), "#bytes(3)");
    }

    #[test]
    fn test_display_collections() {
        let v = Value::vector([1i64, 2]);
        assert_eq!(v.to_string(), "[1, 2]");

        let m = Value::map([("b", 2i64), ("a", 1)]);
        // map rendering is sorted by key
        assert_eq!(m.to_string(), "{a: 1, b: 2}");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Integer(1).type_name(), "integer");
        assert_eq!(Value::map([("k", 1i64)]).type_name(), "map");
        assert_eq!(Value::NumericArray(vec![0.0]).type_name(), "numeric-array");
    }

    #[test]
    fn test_json_round_trip() {
        let original = Value::map([
            ("nums", Value::vector([1i64, 2, 3])),
            ("label", Value::from("x")),
            ("flag", Value::from(true)),
        ]);
        let json = serde_json::to_string(&original).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }
}
