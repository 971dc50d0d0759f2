//! ABOUTME: Repository modules providing typed database operations
//! ABOUTME: Each repository owns a pool handle and implements the matching store trait

pub mod activity;
pub mod authors;
pub mod posts;
pub mod schedules;
pub mod templates;
pub mod topics;
pub mod voices;

use ql_core::{Error, Result};
use std::str::FromStr;

/// Parse an enum column, naming the column in the error
pub(crate) fn parse_column<T>(column: &str, value: &str) -> Result<T>
where
    T: FromStr<Err = Error>,
{
    value
        .parse()
        .map_err(|e| Error::Database(format!("Bad value in column {}: {}", column, e)))
}

/// Non-negative integer column narrowed to u32
pub(crate) fn to_u32(column: &str, value: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::Database(format!("Column {} out of range: {}", column, value)))
}
