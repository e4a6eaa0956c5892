//! Query text helpers: output format enforcement, batch insert statements
//! and log-friendly truncation.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Format every fetch is rewritten to.
pub const FETCH_FORMAT: Format = Format::TsvWithNames;

/// Longest query prefix written to logs.
pub const LOG_QUERY_LIMIT: usize = 500;

static TRAILING_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*(FORMAT\s+[A-Za-z0-9]+)?\s*;?\s*$").expect("valid format regex")
});

/// Input/output formats understood by the server's text protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "TabSeparated")]
    Tsv,
    #[serde(rename = "TabSeparatedWithNames")]
    TsvWithNames,
    #[serde(rename = "CSV")]
    Csv,
    #[serde(rename = "CSVWithNames")]
    CsvWithNames,
}

impl Format {
    /// Name used in `FORMAT` clauses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Tsv => "TabSeparated",
            Format::TsvWithNames => "TabSeparatedWithNames",
            Format::Csv => "CSV",
            Format::CsvWithNames => "CSVWithNames",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip a trailing `FORMAT <name>` and `;`, then request tab-separated
/// output with a header line.
pub fn with_fetch_format(query: &str) -> String {
    let stripped = TRAILING_FORMAT.replace(query, "");
    format!("{} FORMAT {}", stripped, FETCH_FORMAT)
}

/// Build the statement head for a batch insert. The payload follows on the
/// next line.
pub fn insert_statement(database: &str, table: &str, columns: &[&str], format: Format) -> String {
    if columns.is_empty() {
        format!("INSERT INTO {}.{} FORMAT {}\n", database, table, format)
    } else {
        format!(
            "INSERT INTO {}.{} ({}) FORMAT {}\n",
            database,
            table,
            columns.join(", "),
            format
        )
    }
}

/// Shorten a query for logging, appending ` ...` when cut.
pub fn cut_off(query: &str, limit: usize) -> String {
    if query.len() <= limit {
        return query.to_string();
    }

    let mut end = limit;
    while !query.is_char_boundary(end) {
        end -= 1;
    }
    format!("{} ...", &query[..end])
}
