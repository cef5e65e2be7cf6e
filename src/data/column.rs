//! Field definitions and entity field schemas

use super::{DataType, Value};
use serde::{Deserialize, Serialize};

/// Field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Data type
    pub data_type: DataType,
    /// Default value applied when an insert omits this field (optional)
    pub default_value: Option<Value>,
    /// Fill with the current time on insert (timestamp fields only)
    pub auto_now: bool,
}

impl FieldDef {
    /// Create a new field definition
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            default_value: None,
            auto_now: false,
        }
    }

    /// Shorthand for an Int64 field
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Int64)
    }

    /// Shorthand for a Float64 field
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Float64)
    }

    /// Shorthand for a Bool field
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Bool)
    }

    /// Shorthand for a String field
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, DataType::String)
    }

    /// Shorthand for a Timestamp field
    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Timestamp)
    }

    /// Set the default value
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Fill this field with the current time on insert
    pub fn auto_now(mut self) -> Self {
        self.auto_now = true;
        self
    }
}

/// Ordered field layout of one entity.
///
/// The schema is declared once per entity and used to create every physical
/// shard table, so all shards of an entity share one layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    fields: Vec<FieldDef>,
}

impl FieldSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field, builder style
    pub fn field(mut self, def: FieldDef) -> Self {
        self.fields.push(def);
        self
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Iterate fields in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate the layout: unique names, auto-now only on timestamps,
    /// defaults matching their field type.
    pub fn validate(&self) -> Result<(), String> {
        for (i, def) in self.fields.iter().enumerate() {
            if def.name.is_empty() {
                return Err("empty field name".to_string());
            }
            if self.fields[..i].iter().any(|f| f.name == def.name) {
                return Err(format!("duplicate field '{}'", def.name));
            }
            if def.auto_now && def.data_type != DataType::Timestamp {
                return Err(format!(
                    "auto-now on non-timestamp field '{}'",
                    def.name
                ));
            }
            if let Some(default) = &def.default_value {
                if let Some(dt) = default.data_type() {
                    if dt != def.data_type {
                        return Err(format!(
                            "default for field '{}' is {:?}, expected {:?}",
                            def.name, dt, def.data_type
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
