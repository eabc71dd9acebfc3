//! Row-set helpers

use verdb_history::ResultSet;
use verdb_storage::Value;

/// Integer cells as `Some`, NULL as `None`
pub fn int_rows(result: &ResultSet) -> Vec<Vec<Option<i64>>> {
    result
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| match v {
                    Value::Null => None,
                    Value::Int(i) => Some(*i),
                    other => panic!("expected int or null, got {:?}", other),
                })
                .collect()
        })
        .collect()
}

/// Text cells of one column
pub fn text_column(result: &ResultSet, column: &str) -> Vec<String> {
    result
        .column(column)
        .unwrap_or_else(|| panic!("no column {}", column))
        .into_iter()
        .map(|v| match v {
            Value::Text(s) => s.clone(),
            other => panic!("expected text in {}, got {:?}", column, other),
        })
        .collect()
}

/// Assert that result rows are ordered as expected, with a readable diff
pub fn assert_rows(result: &ResultSet, expected: &[&[Option<i64>]]) {
    let expected: Vec<Vec<Option<i64>>> = expected.iter().map(|r| r.to_vec()).collect();
    pretty_assertions::assert_eq!(int_rows(result), expected);
}
