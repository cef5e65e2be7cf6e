//! Shared row-table core used by every [`super::TableStore`] backend.
//!
//! One `ShardTable` holds the rows of one physical shard table: a schema,
//! a monotonically increasing row id and the rows keyed by id. Row id order
//! is the table's canonical order for counts, slices and first-match
//! operations, so all backends page identically.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::data::{FieldSchema, Row, Value};
use crate::query::Filter;
use crate::{Result, ShardError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardTable {
    schema: FieldSchema,
    next_row_id: u64,
    rows: BTreeMap<u64, Row>,
}

impl ShardTable {
    pub fn new(schema: FieldSchema) -> Self {
        Self {
            schema,
            next_row_id: 1,
            rows: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert a row after schema-checking every provided field, returning
    /// the stored row with its assigned id.
    ///
    /// Omitted fields fall back to the field's default, the current time
    /// for `auto_now` timestamp fields, or null.
    pub fn insert(&mut self, values: HashMap<String, Value>) -> Result<Row> {
        for (field, value) in &values {
            self.check_field(field, value)?;
        }

        let id = self.next_row_id;
        self.next_row_id += 1;

        let mut row = Row::new(id);
        for def in self.schema.iter() {
            let value = match values.get(&def.name) {
                Some(v) => v.clone(),
                None if def.auto_now => Value::Timestamp(Utc::now().timestamp()),
                None => def.default_value.clone().unwrap_or(Value::Null),
            };
            row.set(def.name.clone(), value);
        }
        self.rows.insert(id, row.clone());
        Ok(row)
    }

    pub fn count(&self, filter: Option<&Filter>) -> u64 {
        self.matching(filter).count() as u64
    }

    /// Rows matching the filter, skipping `offset` matches and taking at
    /// most `limit`, in row id order
    pub fn slice(&self, filter: Option<&Filter>, offset: u64, limit: u64) -> Vec<Row> {
        self.matching(filter)
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect()
    }

    pub fn first_match(&self, filter: &Filter) -> Option<Row> {
        self.matching(Some(filter)).next().cloned()
    }

    /// Apply `changes` to the first matching row, returning the updated row
    pub fn update_first(
        &mut self,
        filter: &Filter,
        changes: HashMap<String, Value>,
    ) -> Result<Option<Row>> {
        for (field, value) in &changes {
            self.check_field(field, value)?;
        }
        let id = match self.matching(Some(filter)).next() {
            Some(row) => row.id,
            None => return Ok(None),
        };
        let row = self.rows.get_mut(&id).map(|row| {
            for (field, value) in changes {
                row.set(field, value);
            }
            row.clone()
        });
        Ok(row)
    }

    /// Remove the first matching row. Returns whether a row was removed.
    pub fn delete_first(&mut self, filter: &Filter) -> bool {
        let id = match self.matching(Some(filter)).next() {
            Some(row) => row.id,
            None => return false,
        };
        self.rows.remove(&id).is_some()
    }

    fn matching<'a>(&'a self, filter: Option<&'a Filter>) -> impl Iterator<Item = &'a Row> {
        self.rows
            .values()
            .filter(move |row| filter.map_or(true, |f| f.matches(row)))
    }

    fn check_field(&self, field: &str, value: &Value) -> Result<()> {
        let def = self
            .schema
            .get(field)
            .ok_or_else(|| ShardError::FieldNotFound(field.to_string()))?;
        if let Some(actual) = value.data_type() {
            if actual != def.data_type {
                return Err(ShardError::TypeMismatch {
                    field: field.to_string(),
                    expected: def.data_type,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FieldDef;
    use crate::query::CompareOp;

    fn table() -> ShardTable {
        ShardTable::new(
            FieldSchema::new()
                .field(FieldDef::string("name"))
                .field(FieldDef::int("age").with_default(18i64))
                .field(FieldDef::timestamp("created").auto_now()),
        )
    }

    fn named(name: &str) -> HashMap<String, Value> {
        let mut values = HashMap::new();
        values.insert("name".to_string(), Value::from(name));
        values
    }

    #[test]
    fn test_insert_assigns_increasing_ids_and_defaults() {
        let mut t = table();
        assert_eq!(t.insert(named("alice")).unwrap().id, 1);
        assert_eq!(t.insert(named("bob")).unwrap().id, 2);
        assert_eq!(t.len(), 2);

        let row = t.first_match(&Filter::eq("name", "alice")).unwrap();
        assert_eq!(row.get("age"), Some(&Value::Int64(18)));
        assert!(matches!(row.get("created"), Some(Value::Timestamp(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut t = table();
        let mut values = named("alice");
        values.insert("nickname".to_string(), Value::from("al"));
        assert!(matches!(
            t.insert(values),
            Err(ShardError::FieldNotFound(f)) if f == "nickname"
        ));
        assert!(t.is_empty());
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut t = table();
        let mut values = HashMap::new();
        values.insert("age".to_string(), Value::from("old"));
        let err = t.insert(values).unwrap_err();
        assert!(matches!(
            err,
            ShardError::TypeMismatch { ref field, .. } if field == "age"
        ));
    }

    #[test]
    fn test_slice_orders_and_windows() {
        let mut t = table();
        for name in ["a", "b", "c", "d", "e"] {
            t.insert(named(name)).unwrap();
        }

        let window = t.slice(None, 1, 2);
        let names: Vec<_> = window
            .iter()
            .map(|r| r.get("name").cloned().unwrap())
            .collect();
        assert_eq!(names, vec![Value::from("b"), Value::from("c")]);
    }

    #[test]
    fn test_filtered_count_and_offset_counts_matches() {
        let mut t = table();
        for (name, age) in [("a", 10i64), ("b", 30), ("c", 40), ("d", 50)] {
            let mut values = named(name);
            values.insert("age".to_string(), Value::from(age));
            t.insert(values).unwrap();
        }
        let filter = Filter::cmp("age", CompareOp::GreaterEqual, 30i64);

        assert_eq!(t.count(Some(&filter)), 3);
        // Offset skips matching rows, not raw rows.
        let window = t.slice(Some(&filter), 1, 10);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].get("name"), Some(&Value::from("c")));
    }

    #[test]
    fn test_update_first_only_touches_first_match() {
        let mut t = table();
        t.insert(named("dup")).unwrap();
        t.insert(named("dup")).unwrap();

        let mut changes = HashMap::new();
        changes.insert("age".to_string(), Value::from(99i64));
        let updated = t
            .update_first(&Filter::eq("name", "dup"), changes)
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, 1);
        assert_eq!(updated.get("age"), Some(&Value::Int64(99)));

        let second = t.rows.get(&2).unwrap();
        assert_eq!(second.get("age"), Some(&Value::Int64(18)));
    }

    #[test]
    fn test_update_validates_changes() {
        let mut t = table();
        t.insert(named("alice")).unwrap();
        let mut changes = HashMap::new();
        changes.insert("age".to_string(), Value::from(false));
        assert!(t
            .update_first(&Filter::eq("name", "alice"), changes)
            .is_err());
    }

    #[test]
    fn test_delete_first() {
        let mut t = table();
        t.insert(named("alice")).unwrap();
        let filter = Filter::eq("name", "alice");

        assert!(t.delete_first(&filter));
        assert!(!t.delete_first(&filter));
        assert!(t.is_empty());
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let mut t = table();
        t.insert(named("alice")).unwrap();
        t.delete_first(&Filter::eq("name", "alice"));
        assert_eq!(t.insert(named("bob")).unwrap().id, 2);
    }
}
