//! Row projection.

use crate::db::types::{CoercionOptions, RawValue, coerce};
use crate::models::{ColumnValue, Record};

/// Zip column names with a row of raw cells into a [`Record`].
///
/// Field order follows `column_names`. Repeated names are suffixed by
/// [`Record::push`], so every cell survives.
///
/// # Panics
///
/// Panics if the two slices differ in length. Drivers always report one
/// value per column, so a mismatch is a bug in the caller.
pub fn project(column_names: &[String], raw_values: Vec<RawValue>, options: CoercionOptions) -> Record {
    assert_eq!(
        column_names.len(),
        raw_values.len(),
        "row has {} values for {} columns",
        raw_values.len(),
        column_names.len()
    );

    let mut record = Record::with_capacity(column_names.len());
    for (name, raw) in column_names.iter().zip(raw_values) {
        record.push(name, coerce(raw, options));
    }
    record
}

/// Names as they appear in a projected record, with duplicates suffixed.
pub fn unique_column_names(column_names: &[String]) -> Vec<String> {
    let mut seen = Record::with_capacity(column_names.len());
    column_names
        .iter()
        .map(|name| seen.push(name, ColumnValue::Null))
        .collect()
}
