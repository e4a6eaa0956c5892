//! Header line → column positions.

use std::collections::HashMap;
use std::sync::Arc;

use crate::client::{ClientError, ClientResult};

use super::row::Row;

/// Separator between cells of a tab-separated line.
pub const CELL_SEPARATOR: char = '\t';

/// Ordered column names and their positions, built once from the header
/// line of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    /// Build the index from a header line. A repeated name resolves to its
    /// last position.
    pub fn parse(line: &str) -> Self {
        let names: Vec<String> = line.split(CELL_SEPARATOR).map(str::to_string).collect();
        let positions = names
            .iter()
            .enumerate()
            .map(|(position, name)| (name.clone(), position))
            .collect();
        Self { names, positions }
    }

    /// Column names in header order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of `name` in each line.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Number of cells every row must carry.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Split one data line into a [`Row`] against this header.
    ///
    /// Fails with [`ClientError::MalformedRow`] if the line has fewer cells
    /// than the header. Extra trailing cells are dropped.
    pub fn decode(self: &Arc<Self>, line: &str) -> ClientResult<Row> {
        let expected = self.len();
        let mut cells: Vec<String> = line
            .split(CELL_SEPARATOR)
            .take(expected)
            .map(str::to_string)
            .collect();

        if cells.len() < expected {
            return Err(ClientError::MalformedRow {
                expected,
                found: cells.len(),
            });
        }
        cells.shrink_to_fit();

        Ok(Row::new(Arc::clone(self), cells))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let index = ColumnIndex::parse("id\tname\tengine");
        assert_eq!(index.names(), ["id", "name", "engine"]);
        assert_eq!(index.position("name"), Some(1));
        assert_eq!(index.position("missing"), None);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_single_empty_column() {
        let index = Arc::new(ColumnIndex::parse("value"));
        let row = index.decode("").unwrap();
        assert_eq!(row.string("value").unwrap(), "");
    }

    #[test]
    fn test_short_row_is_malformed() {
        let index = Arc::new(ColumnIndex::parse("a\tb\tc"));
        let err = index.decode("1\t2").unwrap_err();
        assert_eq!(err, ClientError::MalformedRow { expected: 3, found: 2 });
    }

    #[test]
    fn test_long_row_keeps_header_cells() {
        let index = Arc::new(ColumnIndex::parse("a\tb"));
        let row = index.decode("1\t2\t3").unwrap();
        assert_eq!(row.string("b").unwrap(), "2");
        assert_eq!(row.columns(), ["a", "b"]);
    }
}
