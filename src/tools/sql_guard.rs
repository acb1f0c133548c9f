//! Read-only statement guard for `sql_execute_query`.
//!
//! The statement text is parsed with the dialect of the connected engine and
//! every statement in it must be a read. Anything that is not on the allow
//! list is refused, including statements the parser does not recognise.

use crate::error::{BridgeError, BridgeResult};
use crate::models::DatabaseType;
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

const WRITE_HINT: &str = "Only read statements are accepted here; use sql_execute_statement \
                          (available when the connection is writable)";

fn dialect_for(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// Refuse `sql` unless every statement in it only reads.
pub fn ensure_read_only(sql: &str, db_type: DatabaseType) -> BridgeResult<()> {
    let statements = Parser::parse_sql(dialect_for(db_type).as_ref(), sql)
        .map_err(|e| BridgeError::invalid_input(format!("Could not parse SQL: {}", e)))?;

    if statements.is_empty() {
        return Err(BridgeError::invalid_input("Empty SQL statement"));
    }

    for statement in &statements {
        if !is_read(statement) {
            return Err(BridgeError::permission(operation_name(statement), WRITE_HINT));
        }
    }
    Ok(())
}

fn is_read(statement: &Statement) -> bool {
    match statement {
        Statement::Query(query) => !selects_into(&query.body),
        Statement::Explain { statement, .. } => is_read(statement),
        Statement::ExplainTable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowDatabases { .. }
        | Statement::ShowSchemas { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowVariable { .. }
        | Statement::ShowVariables { .. }
        | Statement::ShowStatus { .. }
        | Statement::ShowCollation { .. } => true,
        _ => false,
    }
}

/// `SELECT ... INTO new_table` creates a table on PostgreSQL.
fn selects_into(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(select) => select.into.is_some(),
        SetExpr::Query(query) => selects_into(&query.body),
        SetExpr::SetOperation { left, right, .. } => selects_into(left) || selects_into(right),
        _ => false,
    }
}

/// Leading keywords of the statement, e.g. `INSERT` or `CREATE TABLE`.
fn operation_name(statement: &Statement) -> String {
    let text = statement.to_string();
    let mut words = text.split_whitespace();
    let first = words.next().unwrap_or("statement").to_ascii_uppercase();

    match first.as_str() {
        "CREATE" | "DROP" | "ALTER" => match words.next() {
            Some(object) => format!("{} {}", first, object.to_ascii_uppercase()),
            None => first,
        },
        "WITH" | "SELECT" => "SELECT INTO".to_string(),
        _ => first,
    }
}
