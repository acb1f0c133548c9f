//! Schema introspection.
//!
//! Catalog queries live in the `queries` submodule, one set per database.
//! They run through [`QueryExecutor`] like any other statement, so they share
//! its timeout, cancellation and value coercion. Table names are always bound
//! as parameters.

use crate::db::executor::QueryExecutor;
use crate::error::{BridgeError, BridgeResult};
use crate::models::{
    ColumnSchema, ColumnValue, DatabaseSchema, DatabaseType, QueryParam, Record, TableSchema,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Reads table and column metadata from the engine catalog.
#[derive(Debug, Clone)]
pub struct SchemaIntrospector {
    executor: QueryExecutor,
}

impl SchemaIntrospector {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    /// Base tables of the current database, views excluded, sorted
    /// case-insensitively.
    pub async fn list_tables(&self, cancel: &CancellationToken) -> BridgeResult<Vec<String>> {
        let sql = match self.executor.db_type() {
            DatabaseType::PostgreSQL => queries::postgres::LIST_TABLES,
            DatabaseType::MySQL => queries::mysql::LIST_TABLES,
            DatabaseType::SQLite => queries::sqlite::LIST_TABLES,
        };
        let mut tables = self.names(sql, "table_name", cancel).await?;
        sort_names(&mut tables);
        debug!(count = tables.len(), "Listed tables");
        Ok(tables)
    }

    /// User schemas (SQLite: attached databases), sorted.
    pub async fn list_schemas(&self, cancel: &CancellationToken) -> BridgeResult<Vec<String>> {
        let sql = match self.executor.db_type() {
            DatabaseType::PostgreSQL => queries::postgres::LIST_SCHEMAS,
            DatabaseType::MySQL => queries::mysql::LIST_SCHEMAS,
            DatabaseType::SQLite => queries::sqlite::LIST_SCHEMAS,
        };
        let mut schemas = self.names(sql, "schema_name", cancel).await?;
        sort_names(&mut schemas);
        Ok(schemas)
    }

    /// Columns of one table in ordinal order.
    pub async fn table_schema(
        &self,
        table: &str,
        cancel: &CancellationToken,
    ) -> BridgeResult<TableSchema> {
        let sql = match self.executor.db_type() {
            DatabaseType::PostgreSQL => queries::postgres::TABLE_COLUMNS,
            DatabaseType::MySQL => queries::mysql::TABLE_COLUMNS,
            DatabaseType::SQLite => queries::sqlite::TABLE_COLUMNS,
        };
        let params = [QueryParam::String(table.to_string())];
        let result = self.executor.query(sql, &params, cancel).await?;

        if result.is_empty() {
            return Err(BridgeError::schema(
                "Table not found or has no columns",
                table,
            ));
        }

        let columns = result
            .records
            .iter()
            .map(column_from_record)
            .collect::<BridgeResult<Vec<_>>>()?;

        debug!(table = %table, columns = columns.len(), "Described table");
        Ok(TableSchema {
            table_name: table.to_string(),
            columns,
        })
    }

    /// Every base table with its columns. Any failing table fails the call.
    pub async fn database_schema(
        &self,
        cancel: &CancellationToken,
    ) -> BridgeResult<DatabaseSchema> {
        let database_name = self.database_name(cancel).await?;
        let table_names = self.list_tables(cancel).await?;

        let mut tables = Vec::with_capacity(table_names.len());
        for name in &table_names {
            tables.push(self.table_schema(name, cancel).await?);
        }

        Ok(DatabaseSchema {
            database_name,
            tables,
        })
    }

    /// Name of the connected database as the engine reports it.
    pub async fn database_name(&self, cancel: &CancellationToken) -> BridgeResult<String> {
        let sql = match self.executor.db_type() {
            DatabaseType::PostgreSQL => queries::postgres::DATABASE_NAME,
            DatabaseType::MySQL => queries::mysql::DATABASE_NAME,
            DatabaseType::SQLite => return Ok("main".to_string()),
        };
        let result = self.executor.query(sql, &[], cancel).await?;
        result
            .records
            .first()
            .and_then(|record| optional_text(record, "database_name"))
            .ok_or_else(|| BridgeError::schema("No database selected", "database"))
    }

    async fn names(
        &self,
        sql: &str,
        column: &str,
        cancel: &CancellationToken,
    ) -> BridgeResult<Vec<String>> {
        let result = self.executor.query(sql, &[], cancel).await?;
        result
            .records
            .iter()
            .map(|record| required_text(record, column))
            .collect()
    }
}

/// Case-insensitive order, ties broken by the exact name so the result is
/// stable when two names differ only in case.
fn sort_names(names: &mut [String]) {
    names.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
}

fn column_from_record(record: &Record) -> BridgeResult<ColumnSchema> {
    let name = required_text(record, "column_name")?;
    let data_type = optional_text(record, "data_type").unwrap_or_default();
    let nullable = flag(record, "nullable");

    Ok(ColumnSchema::new(name, data_type, nullable)
        .primary_key(flag(record, "is_primary_key"))
        .with_default(optional_text(record, "column_default")))
}

fn optional_text(record: &Record, column: &str) -> Option<String> {
    match record.get(column)? {
        ColumnValue::Null => None,
        ColumnValue::Text(s) => Some(s.clone()),
        other => Some(other.to_display_string()),
    }
}

fn required_text(record: &Record, column: &str) -> BridgeResult<String> {
    optional_text(record, column)
        .ok_or_else(|| BridgeError::decode(format!("Catalog column '{}' is missing or NULL", column)))
}

/// Engines report flags as booleans, 0/1 integers or YES/NO text.
fn flag(record: &Record, column: &str) -> bool {
    match record.get(column) {
        Some(ColumnValue::Boolean(b)) => *b,
        Some(ColumnValue::Integer(i)) => *i != 0,
        Some(ColumnValue::Text(s)) => {
            matches!(s.to_ascii_uppercase().as_str(), "YES" | "Y" | "TRUE" | "T" | "1")
        }
        _ => false,
    }
}

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_type = 'BASE TABLE'
            "#;

        pub const LIST_SCHEMAS: &str = r#"
            SELECT schema_name::text AS schema_name
            FROM information_schema.schemata
            WHERE schema_name NOT IN ('pg_catalog', 'information_schema')
            AND schema_name NOT LIKE 'pg\_toast%'
            AND schema_name NOT LIKE 'pg\_temp\_%'
            "#;

        pub const TABLE_COLUMNS: &str = r#"
            SELECT
                c.column_name::text AS column_name,
                format_type(a.atttypid, a.atttypmod) AS data_type,
                (c.is_nullable = 'YES') AS nullable,
                c.column_default::text AS column_default,
                EXISTS (
                    SELECT 1
                    FROM information_schema.table_constraints tc
                    JOIN information_schema.key_column_usage kcu
                        ON tc.constraint_name = kcu.constraint_name
                        AND tc.table_schema = kcu.table_schema
                        AND tc.table_name = kcu.table_name
                    WHERE tc.constraint_type = 'PRIMARY KEY'
                    AND tc.table_schema = c.table_schema
                    AND tc.table_name = c.table_name
                    AND kcu.column_name = c.column_name
                ) AS is_primary_key
            FROM information_schema.columns c
            JOIN pg_namespace n ON n.nspname = c.table_schema
            JOIN pg_class t ON t.relname = c.table_name AND t.relnamespace = n.oid
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name
            WHERE c.table_schema = current_schema() AND c.table_name = $1
            ORDER BY c.ordinal_position
            "#;

        pub const DATABASE_NAME: &str = "SELECT current_database()::text AS database_name";
    }

    pub mod mysql {
        pub const LIST_TABLES: &str = r#"
            SELECT TABLE_NAME AS table_name
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            "#;

        pub const LIST_SCHEMAS: &str = r#"
            SELECT SCHEMA_NAME AS schema_name
            FROM information_schema.SCHEMATA
            WHERE SCHEMA_NAME NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys')
            "#;

        pub const TABLE_COLUMNS: &str = r#"
            SELECT
                COLUMN_NAME AS column_name,
                COLUMN_TYPE AS data_type,
                IS_NULLABLE = 'YES' AS nullable,
                COLUMN_DEFAULT AS column_default,
                COLUMN_KEY = 'PRI' AS is_primary_key
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            "#;

        pub const DATABASE_NAME: &str = "SELECT DATABASE() AS database_name";
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name AS table_name
            FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
            "#;

        pub const LIST_SCHEMAS: &str = "SELECT name AS schema_name FROM pragma_database_list";

        pub const TABLE_COLUMNS: &str = r#"
            SELECT
                name AS column_name,
                type AS data_type,
                "notnull" = 0 AS nullable,
                dflt_value AS column_default,
                pk > 0 AS is_primary_key
            FROM pragma_table_info(?)
            ORDER BY cid
            "#;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, ColumnValue)]) -> Record {
        let mut record = Record::default();
        for (name, value) in fields {
            record.push(name, value.clone());
        }
        record
    }

    #[test]
    fn test_flag_accepts_engine_spellings() {
        let r = record(&[
            ("a", ColumnValue::Boolean(true)),
            ("b", ColumnValue::Integer(1)),
            ("c", ColumnValue::Text("YES".into())),
            ("d", ColumnValue::Integer(0)),
            ("e", ColumnValue::Null),
        ]);
        assert!(flag(&r, "a"));
        assert!(flag(&r, "b"));
        assert!(flag(&r, "c"));
        assert!(!flag(&r, "d"));
        assert!(!flag(&r, "e"));
        assert!(!flag(&r, "missing"));
    }

    #[test]
    fn test_column_from_record() {
        let r = record(&[
            ("column_name", ColumnValue::Text("OrderID".into())),
            ("data_type", ColumnValue::Text("INTEGER".into())),
            ("nullable", ColumnValue::Integer(0)),
            ("column_default", ColumnValue::Null),
            ("is_primary_key", ColumnValue::Integer(1)),
        ]);
        let col = column_from_record(&r).unwrap();
        assert_eq!(col.name, "OrderID");
        assert_eq!(col.data_type, "INTEGER");
        assert!(!col.nullable);
        assert!(col.is_primary_key);
        assert_eq!(col.default_value, None);
    }

    #[test]
    fn test_column_without_name_is_decode_error() {
        let r = record(&[("column_name", ColumnValue::Null)]);
        assert!(matches!(
            column_from_record(&r),
            Err(BridgeError::Decode { .. })
        ));
    }

    #[test]
    fn test_sort_names_ignores_case() {
        let mut names: Vec<String> = ["Users", "orders", "Accounts", "users"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        sort_names(&mut names);
        assert_eq!(names, vec!["Accounts", "orders", "Users", "users"]);
    }

    #[test]
    fn test_table_names_are_bound() {
        for sql in [
            queries::postgres::TABLE_COLUMNS,
            queries::mysql::TABLE_COLUMNS,
            queries::sqlite::TABLE_COLUMNS,
        ] {
            assert!(sql.contains("$1") || sql.contains('?'));
        }
    }
}
