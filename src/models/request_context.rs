//! Request context: the immutable input to a single decision.

use crate::error::{DecisionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Scalar request field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Canonical text form used for fingerprinting.
    ///
    /// Every value carries a type tag so `"100"` and `100` never collide.
    /// Integral floats render as integers so `100` and `100.0` hash the same.
    pub fn canonical(&self) -> String {
        match self {
            FieldValue::Bool(b) => format!("b:{b}"),
            FieldValue::Integer(i) => format!("i:{i}"),
            FieldValue::Float(f) => match integral(*f) {
                Some(i) => format!("i:{i}"),
                None => format!("f:{f}"),
            },
            FieldValue::Text(s) => format!("s:{s}"),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

fn integral(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64)
        .then(|| value as i64)
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Symbol plus an opaque map of scalar fields.
///
/// The symbol is guaranteed non-empty; every constructor, including
/// deserialization, enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRequestContext")]
pub struct RequestContext {
    symbol: String,
    fields: HashMap<String, FieldValue>,
}

#[derive(Deserialize)]
struct RawRequestContext {
    symbol: String,
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
}

impl TryFrom<RawRequestContext> for RequestContext {
    type Error = DecisionError;

    fn try_from(raw: RawRequestContext) -> Result<Self> {
        RequestContext::with_fields(raw.symbol, raw.fields)
    }
}

impl RequestContext {
    pub fn new(symbol: impl Into<String>) -> Result<Self> {
        Self::with_fields(symbol, HashMap::new())
    }

    pub fn with_fields(
        symbol: impl Into<String>,
        fields: HashMap<String, FieldValue>,
    ) -> Result<Self> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(DecisionError::InvalidRequest(
                "request symbol must not be empty".to_string(),
            ));
        }
        Ok(Self { symbol, fields })
    }

    /// Builder-style field insertion
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn fields(&self) -> &HashMap<String, FieldValue> {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} fields)", self.symbol, self.fields.len())
    }
}
