//! SQL tools (`sql_*`).
//!
//! Handlers close over one shared [`QueryExecutor`]; the statement tool is
//! only registered when the connection was opened writable.

use crate::db::{QueryExecutor, SchemaIntrospector};
use crate::error::BridgeResult;
use crate::models::{DatabaseType, parse_params};
use crate::tools::format::{format_result_set, format_table_schema, numbered_list};
use crate::tools::registry::{ParameterSpec, ToolDescriptor, ToolRegistry, handler};
use crate::tools::sql_guard::ensure_read_only;
use tracing::info;

fn placeholder_hint(db_type: DatabaseType) -> &'static str {
    match db_type {
        DatabaseType::PostgreSQL => "Use $1, $2, ... placeholders",
        DatabaseType::MySQL | DatabaseType::SQLite => "Use ? placeholders",
    }
}

fn params_spec(db_type: DatabaseType) -> ParameterSpec {
    ParameterSpec::string(
        "params",
        format!(
            "JSON array of positional parameters, e.g. [42, \"abc\", null]. {}",
            placeholder_hint(db_type)
        ),
    )
}

/// Register the SQL tools for one database connection.
pub fn register_sql_tools(registry: &mut ToolRegistry, executor: QueryExecutor) -> BridgeResult<()> {
    let db_type = executor.db_type();
    let introspector = SchemaIntrospector::new(executor.clone());

    let exec = executor.clone();
    registry.register(
        ToolDescriptor::new(
            "sql_execute_query",
            format!("Execute a read-only SQL query on the {} database", db_type),
        )
        .param(ParameterSpec::string("query", "The SQL query to execute").required())
        .param(params_spec(db_type)),
        handler(move |args, cancel| {
            let exec = exec.clone();
            async move {
                let sql = args.require_str("query")?;
                ensure_read_only(sql, exec.db_type())?;
                let params = parse_params(args.str("params"))?;
                let result = exec.query(sql, &params, &cancel).await?;
                Ok(format_result_set(&result))
            }
        }),
    )?;

    if executor.is_writable() {
        let exec = executor.clone();
        registry.register(
            ToolDescriptor::new(
                "sql_execute_statement",
                format!(
                    "Execute a SQL statement that changes data or schema on the {} database",
                    db_type
                ),
            )
            .param(ParameterSpec::string("statement", "The SQL statement to execute").required())
            .param(params_spec(db_type)),
            handler(move |args, cancel| {
                let exec = exec.clone();
                async move {
                    let sql = args.require_str("statement")?;
                    let params = parse_params(args.str("params"))?;
                    let outcome = exec.execute(sql, &params, &cancel).await?;
                    Ok(format!(
                        "Statement executed. Rows affected: {}",
                        outcome.rows_affected
                    ))
                }
            }),
        )?;
    } else {
        info!(db_type = %db_type, "Connection is read-only; sql_execute_statement not registered");
    }

    let intro = introspector.clone();
    registry.register(
        ToolDescriptor::new("sql_get_tables", "Get a list of all tables in the database"),
        handler(move |_args, cancel| {
            let intro = intro.clone();
            async move {
                let tables = intro.list_tables(&cancel).await?;
                Ok(numbered_list("tables", &tables))
            }
        }),
    )?;

    let intro = introspector.clone();
    registry.register(
        ToolDescriptor::new("sql_get_schemas", "Get a list of all schemas in the database"),
        handler(move |_args, cancel| {
            let intro = intro.clone();
            async move {
                let schemas = intro.list_schemas(&cancel).await?;
                Ok(numbered_list("schemas", &schemas))
            }
        }),
    )?;

    let intro = introspector.clone();
    registry.register(
        ToolDescriptor::new("sql_get_table_schema", "Get the schema of a specific table").param(
            ParameterSpec::string("table_name", "The name of the table to get the schema for")
                .required(),
        ),
        handler(move |args, cancel| {
            let intro = intro.clone();
            async move {
                let table = args.require_str("table_name")?;
                let schema = intro.table_schema(table, &cancel).await?;
                Ok(format_table_schema(&schema))
            }
        }),
    )?;

    let intro = introspector;
    registry.register(
        ToolDescriptor::new(
            "sql_get_database_schema",
            "Get the columns of every table in the database",
        ),
        handler(move |_args, cancel| {
            let intro = intro.clone();
            async move {
                let schema = intro.database_schema(&cancel).await?;
                let mut text = format!(
                    "Database {} has {} tables:\n",
                    schema.database_name,
                    schema.tables.len()
                );
                for table in &schema.tables {
                    text.push('\n');
                    text.push_str(&format_table_schema(table));
                }
                Ok(text)
            }
        }),
    )?;

    Ok(())
}
