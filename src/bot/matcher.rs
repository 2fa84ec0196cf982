//! Case-insensitive substring matching over spreadsheet rows.

use std::collections::HashSet;

use crate::sheets::Record;

/// Which cells of a row are searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchScope {
    /// Every cell of the row.
    AnyCell,
    /// Only the named columns (case-insensitive names).
    Columns(Vec<String>),
}

impl MatchScope {
    /// Parse `*` or a comma-separated column list.
    pub fn parse(spec: &str) -> Self {
        let columns: Vec<String> = spec
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
        if columns.is_empty() || columns.iter().any(|c| c == "*") {
            MatchScope::AnyCell
        } else {
            MatchScope::Columns(columns)
        }
    }

    fn values<'a>(&'a self, record: &'a Record) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        match self {
            MatchScope::AnyCell => Box::new(record.values()),
            MatchScope::Columns(columns) => {
                Box::new(columns.iter().filter_map(|c| record.get(c)))
            }
        }
    }
}

/// Trim and lowercase a user query.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

fn is_match(query: &str, value: &str) -> bool {
    if query.is_empty() {
        // Empty query matches anything non-empty.
        return !value.is_empty();
    }
    value.to_lowercase().contains(query)
}

/// Rows where the normalized query is a substring of at least one scoped
/// cell. Source order is kept; nothing is truncated here.
pub fn find_matches(query: &str, rows: &[Record], scope: &MatchScope) -> Vec<Record> {
    let query = normalize_query(query);
    rows.iter()
        .filter(|row| scope.values(row).any(|value| is_match(&query, value)))
        .cloned()
        .collect()
}

/// Keep only the first row for each normalized value of `column`.
///
/// Rows without the column are always kept.
pub fn dedupe_by(rows: Vec<Record>, column: &str) -> Vec<Record> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| match row.get(column) {
            Some(value) => seen.insert(normalize_query(value)),
            None => true,
        })
        .collect()
}
