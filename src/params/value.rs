/// Generation parameter values
///
/// A parameter set is a string-keyed map of closed scalar values. It is
/// stored verbatim in every cache entry and serialized to the index
/// document as plain JSON scalars, so keys this crate does not know about
/// survive a load/save cycle untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A full generation configuration: parameter name to scalar value
pub type Parameters = BTreeMap<String, ParamValue>;

/// One scalar parameter value
///
/// Serialized untagged: `null`, `true`, `3`, `0.5` and `"text"` in JSON.
/// Variant order matters for deserialization: integers are tried before
/// floats so `4` stays an `Int` and `4.0` becomes a `Float`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(untagged)]
pub enum ParamValue {
    /// Unset / auto-estimated by the external tool
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric view of the value (integers widen to f64)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True for anything but `Null` and blank text
    pub fn is_set(&self) -> bool {
        match self {
            ParamValue::Null => false,
            ParamValue::Text(s) => !s.trim().is_empty(),
            _ => true,
        }
    }

    /// Convert a JSON value, rejecting arrays and objects
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

impl fmt::Display for ParamValue {
    /// Floats always keep a fractional part (`50.0`, `0.1`) so the
    /// rendering matches what the external tool documents.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => f.write_str("null"),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{:?}", x),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for ParamValue {
    type Err = std::convert::Infallible;

    /// Parse a value typed on a command line: `true`/`false`, `null` or
    /// empty, integers, floats, anything else is text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = match trimmed {
            "" | "null" | "none" => ParamValue::Null,
            "true" => ParamValue::Bool(true),
            "false" => ParamValue::Bool(false),
            _ => {
                if let Ok(i) = trimmed.parse::<i64>() {
                    ParamValue::Int(i)
                } else if let Ok(x) = trimmed.parse::<f64>() {
                    ParamValue::Float(x)
                } else {
                    ParamValue::Text(trimmed.to_string())
                }
            }
        };
        Ok(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

/// Split a `key=value` assignment into a named parameter
pub fn parse_assignment(s: &str) -> Result<(String, ParamValue), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{}'", s));
    }
    let value = value.parse::<ParamValue>().unwrap_or_default();
    Ok((key.to_string(), value))
}
