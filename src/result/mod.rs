//! Result decoding for chstream.
//!
//! Responses are consumed line by line: the first line becomes a
//! [`ColumnIndex`], each following line a [`Row`].

mod columns;
mod iter;
mod row;

pub use columns::{ColumnIndex, CELL_SEPARATOR};
pub use iter::RowIter;
pub use row::{Row, DATETIME_FORMAT, DATE_FORMAT};
