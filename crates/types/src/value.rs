use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single resolved item value.
///
/// Dictionaries resolve packet items into these; the wire representation is
/// produced through [`ItemValue::to_json`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemValue {
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

impl ItemValue {
    /// Plain JSON value, the shape commanders see in `json_data`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(v) => serde_json::Value::from(*v),
            Self::Uint(v) => serde_json::Value::from(*v),
            Self::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Str(v) => serde_json::Value::from(v.clone()),
            Self::Bytes(v) => serde_json::Value::from(v.clone()),
        }
    }

    /// Best-effort conversion from a JSON parameter value.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Some(Self::Int(v))
                } else if let Some(v) = n.as_u64() {
                    Some(Self::Uint(v))
                } else {
                    n.as_f64().map(Self::Float)
                }
            }
            serde_json::Value::String(s) => Some(Self::Str(s.clone())),
            serde_json::Value::Bool(b) => Some(Self::Int(*b as i64)),
            _ => None,
        }
    }
}

impl Display for ItemValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
            Self::Bytes(v) => write!(f, "{v:?}"),
        }
    }
}

/// How an item is read: raw bits, after conversion, formatted, or with units
/// appended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValueKind {
    Raw,
    #[default]
    Converted,
    Formatted,
    WithUnits,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown value type: {0}")]
pub struct ValueKindParseError(String);

impl FromStr for ValueKind {
    type Err = ValueKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RAW" => Ok(Self::Raw),
            "CONVERTED" => Ok(Self::Converted),
            "FORMATTED" => Ok(Self::Formatted),
            "WITH_UNITS" => Ok(Self::WithUnits),
            other => Err(ValueKindParseError(other.to_string())),
        }
    }
}

/// Textual boolean coercion used by lifecycle and command messages.
///
/// Accepts `true`/`false`/`yes`/`no`/`1`/`0` case-insensitively; empty or
/// unrecognized input is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1"
    )
}
