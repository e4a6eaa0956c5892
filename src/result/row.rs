//! One decoded row with typed accessors.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::client::{ClientError, ClientResult};

use super::columns::ColumnIndex;

/// Layout of `Date` cells.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Layout of `DateTime` cells.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single row of a result, keyed by column name.
///
/// Every typed accessor reads the raw cell through [`Row::string`] and then
/// parses it. Failures are local to the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Arc<ColumnIndex>,
    cells: Vec<String>,
}

impl Row {
    pub(crate) fn new(columns: Arc<ColumnIndex>, cells: Vec<String>) -> Self {
        debug_assert_eq!(columns.len(), cells.len());
        Self { columns, cells }
    }

    /// Column names in header order.
    pub fn columns(&self) -> &[String] {
        self.columns.names()
    }

    /// True if the row has `column`.
    pub fn exist(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Raw cell, if present.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .position(column)
            .and_then(|position| self.cells.get(position))
            .map(String::as_str)
    }

    /// Raw cell text.
    pub fn string(&self, column: &str) -> ClientResult<&str> {
        self.get(column)
            .ok_or_else(|| ClientError::FieldNotFound(column.to_string()))
    }

    pub fn bytes(&self, column: &str) -> ClientResult<Vec<u8>> {
        self.string(column).map(|value| value.as_bytes().to_vec())
    }

    /// `1` is true, any other unsigned number is false.
    pub fn bool(&self, column: &str) -> ClientResult<bool> {
        Ok(self.u8(column)? == 1)
    }

    pub fn u8(&self, column: &str) -> ClientResult<u8> {
        self.parse_unsigned(column, "uint8")
    }

    pub fn u16(&self, column: &str) -> ClientResult<u16> {
        self.parse_unsigned(column, "uint16")
    }

    pub fn u32(&self, column: &str) -> ClientResult<u32> {
        self.parse_unsigned(column, "uint32")
    }

    pub fn u64(&self, column: &str) -> ClientResult<u64> {
        self.parse_unsigned(column, "uint64")
    }

    pub fn i8(&self, column: &str) -> ClientResult<i8> {
        self.parse(column, "int8")
    }

    pub fn i16(&self, column: &str) -> ClientResult<i16> {
        self.parse(column, "int16")
    }

    pub fn i32(&self, column: &str) -> ClientResult<i32> {
        self.parse(column, "int32")
    }

    pub fn i64(&self, column: &str) -> ClientResult<i64> {
        self.parse(column, "int64")
    }

    pub fn f32(&self, column: &str) -> ClientResult<f32> {
        self.parse(column, "float32")
    }

    pub fn f64(&self, column: &str) -> ClientResult<f64> {
        self.parse(column, "float64")
    }

    /// Cell in `YYYY-MM-DD` layout.
    pub fn date(&self, column: &str) -> ClientResult<NaiveDate> {
        let value = self.string(column)?;
        let date = NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map_err(|e| conversion_error(value, "date", e))?;
        // chrono accepts unpadded fields and signed years; the cell must be
        // in canonical layout.
        if date.format(DATE_FORMAT).to_string() != value {
            return Err(conversion_error(value, "date", "expected YYYY-MM-DD"));
        }
        Ok(date)
    }

    /// Cell in `YYYY-MM-DD HH:MM:SS` layout.
    pub fn datetime(&self, column: &str) -> ClientResult<NaiveDateTime> {
        let value = self.string(column)?;
        let datetime = NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
            .map_err(|e| conversion_error(value, "datetime", e))?;
        if datetime.format(DATETIME_FORMAT).to_string() != value {
            return Err(conversion_error(
                value,
                "datetime",
                "expected YYYY-MM-DD HH:MM:SS",
            ));
        }
        Ok(datetime)
    }

    /// Unsigned cells are plain digits; a sign is rejected.
    fn parse_unsigned<T>(&self, column: &str, kind: &'static str) -> ClientResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let value = self.string(column)?;
        if value.starts_with('+') {
            return Err(conversion_error(value, kind, "invalid digit found in string"));
        }
        self.parse(column, kind)
    }

    fn parse<T>(&self, column: &str, kind: &'static str) -> ClientResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let value = self.string(column)?;
        value
            .parse::<T>()
            .map_err(|e| conversion_error(value, kind, e))
    }
}

fn conversion_error(value: &str, kind: &'static str, reason: impl Display) -> ClientError {
    ClientError::Conversion {
        value: value.to_string(),
        kind,
        reason: reason.to_string(),
    }
}
