//! Data model: dynamic values, field schemas and rows.
//!
//! Shard tables are schema-checked row stores. An entity declares its field
//! layout once (`FieldSchema`), every physical shard table is created from
//! that layout, and rows move through the system as field-name → `Value`
//! maps with a storage-assigned id.

mod column;
mod row;

pub use column::{FieldDef, FieldSchema};
pub use row::Row;

use serde::{Deserialize, Serialize};

/// Data type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Int64,
    Float64,
    Bool,
    String,
    /// Unix timestamp in seconds
    Timestamp,
}

/// A dynamically typed cell value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int64(i64),
    Float64(f64),
    Bool(bool),
    String(String),
    /// Unix timestamp in seconds
    Timestamp(i64),
}

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Data type of this value, `None` for null
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float64(_) => Some(DataType::Float64),
            Value::Bool(_) => Some(DataType::Bool),
            Value::String(_) => Some(DataType::String),
            Value::Timestamp(_) => Some(DataType::Timestamp),
        }
    }

    /// Convert to a JSON value for row projections
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int64(v) => serde_json::Value::from(*v),
            Value::Float64(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(v) => serde_json::Value::from(*v),
            Value::String(v) => serde_json::Value::from(v.clone()),
            Value::Timestamp(v) => serde_json::Value::from(*v),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int64(l), Value::Int64(r)) => l == r,
            (Value::Float64(l), Value::Float64(r)) => l == r,
            // Cross-type numeric equality
            (Value::Int64(l), Value::Float64(r)) => *l as f64 == *r,
            (Value::Float64(l), Value::Int64(r)) => *l == *r as f64,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            (Value::Timestamp(l), Value::Timestamp(r)) => l == r,
            _ => false,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::Int64(l), Value::Int64(r)) => l.partial_cmp(r),
            (Value::Float64(l), Value::Float64(r)) => l.partial_cmp(r),
            // Cross-type numeric ordering
            (Value::Int64(l), Value::Float64(r)) => (*l as f64).partial_cmp(r),
            (Value::Float64(l), Value::Int64(r)) => l.partial_cmp(&(*r as f64)),
            (Value::Bool(l), Value::Bool(r)) => l.partial_cmp(r),
            (Value::String(l), Value::String(r)) => l.partial_cmp(r),
            (Value::Timestamp(l), Value::Timestamp(r)) => l.partial_cmp(r),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
