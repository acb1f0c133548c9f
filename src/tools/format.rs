//! Text rendering for tool results.
//!
//! Results go back to the model as plain text: labeled `Label: value` lines
//! for a single record, tab-separated padded columns for tables and numbered
//! lists for names.

use crate::models::{ColumnValue, Record, ResultSet, TableSchema};
use unicode_width::UnicodeWidthStr;

/// One `Label: value` line per field.
pub fn labeled_fields<L, V>(fields: impl IntoIterator<Item = (L, V)>) -> String
where
    L: AsRef<str>,
    V: AsRef<str>,
{
    let mut output = String::new();
    for (label, value) in fields {
        output.push_str(label.as_ref());
        output.push_str(": ");
        output.push_str(value.as_ref());
        output.push('\n');
    }
    output
}

/// A single record as labeled fields, in column order.
pub fn format_record(record: &Record) -> String {
    labeled_fields(
        record
            .iter()
            .map(|(name, value)| (name, value.to_display_string())),
    )
}

/// Header line, dashed separator and one line per row. Cells are padded to
/// the widest entry of their column and separated by tabs.
pub fn format_table<S: AsRef<str>>(columns: &[S], rows: &[Vec<String>]) -> String {
    if columns.is_empty() {
        return String::new();
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.as_ref().width()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }

    let mut output = String::new();
    push_line(&mut output, columns.iter().map(AsRef::as_ref), &widths);
    let dashes: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(1))).collect();
    push_line(&mut output, dashes.iter().map(String::as_str), &widths);
    for row in rows {
        push_line(&mut output, row.iter().map(String::as_str), &widths);
    }
    output
}

fn push_line<'a>(output: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let mut line = String::new();
    for (i, (cell, width)) in cells.zip(widths).enumerate() {
        if i > 0 {
            line.push('\t');
        }
        line.push_str(cell);
        let pad = width.saturating_sub(cell.width());
        line.extend(std::iter::repeat_n(' ', pad));
    }
    output.push_str(line.trim_end());
    output.push('\n');
}

/// `Query executed with N results:` followed by the rows as a table, or by
/// labeled fields when exactly one row came back.
pub fn format_result_set(result: &ResultSet) -> String {
    let mut output = format!("Query executed with {} results:\n\n", result.row_count());
    if let [record] = result.records.as_slice() {
        output.push_str(&format_record(record));
        return output;
    }
    let rows: Vec<Vec<String>> = result
        .records
        .iter()
        .map(|record| record.values().map(ColumnValue::to_display_string).collect())
        .collect();
    output.push_str(&format_table(&result.columns, &rows));
    output
}

/// `Found N <noun>:` followed by a 1-based numbered list.
pub fn numbered_list(noun: &str, items: &[String]) -> String {
    let mut output = format!("Found {} {}:\n\n", items.len(), noun);
    for (i, item) in items.iter().enumerate() {
        output.push_str(&format!("{}. {}\n", i + 1, item));
    }
    output
}

/// Column listing for one table.
pub fn format_table_schema(schema: &TableSchema) -> String {
    const HEADER: [&str; 5] = [
        "COLUMN_NAME",
        "DATA_TYPE",
        "IS_NULLABLE",
        "DEFAULT_VALUE",
        "IS_PRIMARY_KEY",
    ];

    let rows: Vec<Vec<String>> = schema
        .columns
        .iter()
        .map(|col| {
            vec![
                col.name.clone(),
                col.data_type.clone(),
                col.nullable.to_string(),
                col.default_value.clone().unwrap_or_default(),
                col.is_primary_key.to_string(),
            ]
        })
        .collect();

    let mut output = format!("Schema for table {}:\n\n", schema.table_name);
    output.push_str(&format_table(&HEADER, &rows));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnSchema;

    #[test]
    fn test_labeled_fields() {
        let text = labeled_fields([("Issue", "KP-2"), ("Status", "Open")]);
        assert_eq!(text, "Issue: KP-2\nStatus: Open\n");
    }

    #[test]
    fn test_format_record_renders_null_and_bytes() {
        let mut record = Record::default();
        record.push("id", ColumnValue::Integer(7));
        record.push("note", ColumnValue::Null);
        record.push("raw", ColumnValue::Raw(vec![0xff]));
        assert_eq!(format_record(&record), "id: 7\nnote: NULL\nraw: /w==\n");
    }

    #[test]
    fn test_format_table_pads_columns() {
        let rows = vec![
            vec!["1".to_string(), "alice".to_string()],
            vec!["22".to_string(), "bo".to_string()],
        ];
        let text = format_table(&["id", "name"], &rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id\tname");
        assert_eq!(lines[1], "--\t-----");
        assert_eq!(lines[2], "1 \talice");
        assert_eq!(lines[3], "22\tbo");
    }

    #[test]
    fn test_format_table_uses_display_width() {
        let rows = vec![vec!["日本".to_string(), "x".to_string()]];
        let text = format_table(&["a", "b"], &rows);
        assert_eq!(text.lines().nth(1), Some("----\t-"));
    }

    #[test]
    fn test_format_empty_result_set_keeps_header() {
        let result = ResultSet {
            columns: vec!["id".into()],
            records: Vec::new(),
        };
        assert_eq!(
            format_result_set(&result),
            "Query executed with 0 results:\n\nid\n--\n"
        );
    }

    #[test]
    fn test_single_row_result_uses_labeled_fields() {
        let mut record = Record::default();
        record.push("id", ColumnValue::Integer(2));
        record.push("name", ColumnValue::Text("Bob".into()));
        let result = ResultSet {
            columns: vec!["id".into(), "name".into()],
            records: vec![record.clone(), record],
        };
        assert!(format_result_set(&result).contains("id\tname"));

        let single = ResultSet {
            records: result.records[..1].to_vec(),
            ..result
        };
        assert_eq!(
            format_result_set(&single),
            "Query executed with 1 results:\n\nid: 2\nname: Bob\n"
        );
    }

    #[test]
    fn test_numbered_list() {
        let text = numbered_list("tables", &["Accounts".into(), "Orders".into()]);
        assert_eq!(text, "Found 2 tables:\n\n1. Accounts\n2. Orders\n");
    }

    #[test]
    fn test_format_table_schema() {
        let schema = TableSchema {
            table_name: "Orders".into(),
            columns: vec![ColumnSchema::new("OrderID", "INTEGER", false).primary_key(true)],
        };
        let text = format_table_schema(&schema);
        assert!(text.starts_with("Schema for table Orders:\n\n"));
        assert!(text.contains("COLUMN_NAME\tDATA_TYPE"));
        assert!(text.contains("OrderID    \tINTEGER  \tfalse"));
        assert!(text.trim_end().ends_with("true"));
    }
}
