//! Fluent query builders for named secondary indexes.

mod gsi;
mod time;

pub use gsi::IndexQueryBuilder;
pub use time::{format_timestamp, TimeRangeQueryBuilder, TimeWindowIterator};
