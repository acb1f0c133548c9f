//! Schema-related data models.
//!
//! These are built fresh for every introspection call and never cached.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl ColumnSchema {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            is_primary_key: false,
            default_value: None,
        }
    }

    /// Mark as primary key.
    pub fn primary_key(mut self, is_primary_key: bool) -> Self {
        self.is_primary_key = is_primary_key;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: Option<String>) -> Self {
        self.default_value = default;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub table_name: String,
    /// In physical ordinal order.
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }
}

/// A point-in-time snapshot of every base table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseSchema {
    pub database_name: String,
    pub tables: Vec<TableSchema>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_builder() {
        let col = ColumnSchema::new("id", "INTEGER", false)
            .primary_key(true)
            .with_default(Some("0".into()));
        assert!(col.is_primary_key);
        assert_eq!(col.default_value.as_deref(), Some("0"));
    }

    #[test]
    fn test_primary_key_columns() {
        let table = TableSchema {
            table_name: "t".into(),
            columns: vec![
                ColumnSchema::new("a", "int", false).primary_key(true),
                ColumnSchema::new("b", "text", true),
            ],
        };
        let pk: Vec<_> = table.primary_key_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(pk, vec!["a"]);
    }
}
