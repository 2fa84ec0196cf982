//! Row store adapter - the spreadsheet as an ordered list of records.

pub mod auth;
pub mod google;

use std::future::Future;

use crate::error::Error;

pub use auth::{Credentials, ServiceAccountKey};
pub use google::GoogleSheetsClient;

/// One spreadsheet row as an ordered column -> value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    cells: Vec<(String, String)>,
}

impl Record {
    pub fn new<K, V>(cells: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Zip a data row with the header row.
    ///
    /// Short rows are padded with empty cells. Cells past the last header
    /// are kept under an empty column name so any-cell matching still sees them.
    pub fn from_row(header: &[String], row: &[String]) -> Self {
        let width = header.len().max(row.len());
        let cells = (0..width)
            .map(|i| {
                let column = header.get(i).cloned().unwrap_or_default();
                let value = row.get(i).cloned().unwrap_or_default();
                (column, value)
            })
            .collect();
        Self { cells }
    }

    /// Look up a cell by column name, ignoring ASCII case.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| !name.is_empty() && name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value.as_str())
    }

    /// Value by position, whatever the column is called.
    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(|(_, value)| value.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Turn a raw value grid (header first) into records.
pub fn records_from_grid(mut grid: Vec<Vec<String>>) -> Vec<Record> {
    if grid.is_empty() {
        return Vec::new();
    }
    let header = grid.remove(0);
    grid.iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| Record::from_row(&header, row))
        .collect()
}

/// Source of spreadsheet rows.
///
/// Every call hits the remote sheet; nothing is cached between requests.
pub trait RowStore: Send + Sync + 'static {
    /// Fetch every data row, in sheet order.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<Record>, Error>> + Send;

    /// Append one row to the given range.
    fn append_row(
        &self,
        range: &str,
        values: Vec<String>,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}
