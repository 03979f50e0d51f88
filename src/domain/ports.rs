//! Domain Ports (Port/Adapter Pattern)
//!
//! This module defines the abstraction the collection engine depends on to
//! talk to the graph database, plus the value objects that cross it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                            │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │        GraphSource (verify / run)  ResultRow         │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │      Neo4jHttpSource  │  InMemoryGraphSource         │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::Result;

/// Parameters bound to a Cypher query.
pub type QueryParams = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Value Objects
// =============================================================================

/// A single value returned by the graph database for one column of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

/// Why a field value could not be turned into a sample value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("value is null")]
    Null,

    #[error("cannot convert a {0} to a number")]
    Unsupported(&'static str),

    #[error("string {0:?} is not numeric")]
    NonNumericString(String),
}

impl FieldValue {
    /// Name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::String(_) => "string",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
        }
    }

    /// Convert to a sample value.
    ///
    /// Integers, floats, booleans and numeric strings convert; null, lists,
    /// maps and any other string fail.
    pub fn as_f64(&self) -> std::result::Result<f64, ConversionError> {
        match self {
            FieldValue::Integer(i) => Ok(*i as f64),
            FieldValue::Float(f) => Ok(*f),
            FieldValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            FieldValue::String(s) => strip_digit_separators(s.trim())
                .and_then(|digits| digits.parse::<f64>().ok())
                .ok_or_else(|| ConversionError::NonNumericString(s.clone())),
            FieldValue::Null => Err(ConversionError::Null),
            other => Err(ConversionError::Unsupported(other.kind())),
        }
    }

    /// Render as a label value.
    ///
    /// Null is `None`, booleans are `True`/`False` and floats always keep a
    /// decimal point or an exponent.
    pub fn to_label_value(&self) -> String {
        match self {
            FieldValue::Null => "None".to_string(),
            FieldValue::Boolean(true) => "True".to_string(),
            FieldValue::Boolean(false) => "False".to_string(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => float_label(*f),
            FieldValue::String(s) => s.clone(),
            FieldValue::List(_) | FieldValue::Map(_) => self.to_json().to_string(),
        }
    }

    /// Convert back into a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Boolean(b) => Value::Bool(*b),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            FieldValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Drop `_` digit separators, which are only allowed between two digits.
fn strip_digit_separators(text: &str) -> Option<String> {
    if !text.contains('_') {
        return Some(text.to_string());
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, c) in chars.iter().enumerate() {
        if *c != '_' {
            out.push(*c);
            continue;
        }
        let before = i.checked_sub(1).and_then(|j| chars.get(j));
        let after = chars.get(i + 1);
        match (before, after) {
            (Some(b), Some(a)) if b.is_ascii_digit() && a.is_ascii_digit() => {}
            _ => return None,
        }
    }
    Some(out)
}

/// Shortest round-trip form, fixed notation for exponents in `-4..16` and
/// scientific notation with a signed two-digit exponent otherwise.
fn float_label(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let scientific = format!("{:e}", f);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return f.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return f.to_string();
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    if (-4..16).contains(&exponent) {
        let (int_part, frac_part) = if exponent >= 0 {
            let int_len = exponent as usize + 1;
            if digits.len() <= int_len {
                (format!("{:0<width$}", digits, width = int_len), "0".to_string())
            } else {
                (digits[..int_len].to_string(), digits[int_len..].to_string())
            }
        } else {
            let zeros = "0".repeat((-exponent - 1) as usize);
            ("0".to_string(), format!("{}{}", zeros, digits))
        };
        format!("{}{}.{}", sign, int_part, frac_part)
    } else {
        let mantissa = if digits.len() > 1 {
            format!("{}.{}", &digits[..1], &digits[1..])
        } else {
            digits
        };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        format!("{}{}e{}{:02}", sign, mantissa, exp_sign, exponent.abs())
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => FieldValue::String(s),
            Value::Array(items) => FieldValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(entries) => {
                FieldValue::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// One row returned by a query, keyed by column name in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    fields: Vec<(String, FieldValue)>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and the in-memory source.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Zip a column list with the values of one row.
    ///
    /// Extra values without a column are dropped.
    pub fn from_columns(columns: &[String], values: Vec<serde_json::Value>) -> Self {
        Self {
            fields: columns
                .iter()
                .cloned()
                .zip(values.into_iter().map(FieldValue::from))
                .collect(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// =============================================================================
// Graph Source Port
// =============================================================================

/// Port for the graph database the exporter reads from.
///
/// Implementations must be safe to share between concurrent scrapes; the
/// engine only ever calls them through `&self`.
///
/// # Example
///
/// ```ignore
/// struct Neo4jHttpSource { /* ... */ }
///
/// #[async_trait]
/// impl GraphSource for Neo4jHttpSource {
///     async fn verify(&self) -> Result<()> {
///         // round-trip to the server
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// Perform a live round-trip against the database.
    async fn verify(&self) -> Result<()>;

    /// Run a parameterized query and return every row it produced.
    ///
    /// Rows are fully materialized before returning.
    async fn run(&self, query: &str, params: &QueryParams) -> Result<Vec<ResultRow>>;
}
