//! Row representation

use super::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single row: storage-assigned id plus field values.
///
/// Row ids are assigned per physical shard table and define the table's
/// internal row order; they are not unique across shards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Row id within one shard table
    pub id: u64,
    /// Field name → value
    pub values: HashMap<String, Value>,
}

impl Row {
    /// Create an empty row with the given id
    pub fn new(id: u64) -> Self {
        Self {
            id,
            values: HashMap::new(),
        }
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Set a field value
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    /// Project this row as a JSON object (`id` plus every field)
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::with_capacity(self.values.len() + 1);
        obj.insert("id".to_string(), serde_json::Value::from(self.id));
        for (name, value) in &self.values {
            obj.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_get_set() {
        let mut row = Row::new(7);
        row.set("name", "alice");
        row.set("age", Value::Int64(30));

        assert_eq!(row.id, 7);
        assert_eq!(row.get("name"), Some(&Value::String("alice".into())));
        assert_eq!(row.get("age"), Some(&Value::Int64(30)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_row_to_json() {
        let mut row = Row::new(1);
        row.set("level", Value::Int64(2));
        row.set("content", "boot");

        let json = row.to_json();
        assert_eq!(json["id"], serde_json::json!(1));
        assert_eq!(json["level"], serde_json::json!(2));
        assert_eq!(json["content"], serde_json::json!("boot"));
    }
}
