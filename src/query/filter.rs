//! Query filter implementation
//!
//! Filters are evaluated row-at-a-time by the storage backends; every count,
//! slice, get, update and delete call takes one (or `None` for "all rows").

use crate::data::{Row, Value};
use serde::{Deserialize, Serialize};

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

/// A filter condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Always true
    True,
    /// Always false
    False,
    /// Compare field to value
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// SQL LIKE pattern match (`%` any run, `_` one character)
    Like { field: String, pattern: String },
    /// IN list
    In { field: String, values: Vec<Value> },
    /// AND combination
    And(Vec<Filter>),
    /// OR combination
    Or(Vec<Filter>),
    /// NOT
    Not(Box<Filter>),
}

impl Filter {
    /// Shorthand for an equality compare
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Compare {
            field: field.into(),
            op: CompareOp::Equal,
            value: value.into(),
        }
    }

    /// Shorthand for a general compare
    pub fn cmp(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Filter::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Check if a row matches this filter
    #[inline]
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::True => true,
            Filter::False => false,
            Filter::Compare { field, op, value } => {
                if let Some(row_value) = row.get(field) {
                    Self::compare(row_value, *op, value)
                } else {
                    false
                }
            }
            Filter::Like { field, pattern } => {
                if let Some(Value::String(s)) = row.get(field) {
                    Self::like_match(s, pattern)
                } else {
                    false
                }
            }
            Filter::In { field, values } => {
                if let Some(row_value) = row.get(field) {
                    values.iter().any(|v| row_value == v)
                } else {
                    false
                }
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(row)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(row)),
            Filter::Not(filter) => !filter.matches(row),
        }
    }

    /// Compare two values; incomparable types never match
    fn compare(left: &Value, op: CompareOp, right: &Value) -> bool {
        use std::cmp::Ordering;
        match op {
            CompareOp::Equal => left == right,
            CompareOp::NotEqual => left != right,
            CompareOp::LessThan => left.partial_cmp(right) == Some(Ordering::Less),
            CompareOp::LessEqual => matches!(
                left.partial_cmp(right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            CompareOp::GreaterThan => left.partial_cmp(right) == Some(Ordering::Greater),
            CompareOp::GreaterEqual => matches!(
                left.partial_cmp(right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }

    /// SQL LIKE pattern matching
    fn like_match(s: &str, pattern: &str) -> bool {
        let pattern = regex::escape(pattern).replace("%", ".*").replace("_", ".");
        if let Ok(re) = regex::Regex::new(&format!("^{}$", pattern)) {
            re.is_match(s)
        } else {
            false
        }
    }
}
