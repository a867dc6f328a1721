use crate::error::PersistDbError;
use chrono::NaiveDateTime;

pub fn now() -> NaiveDateTime {
    crate::util::now_naive()
}

/// SQLite and Postgres both store BIGINT as signed 64-bit.
pub fn to_i64(value: u64, column: &'static str) -> Result<i64, PersistDbError> {
    i64::try_from(value).map_err(|_| PersistDbError::OutOfRange {
        column,
        value: value.to_string(),
    })
}

pub fn to_u64(value: i64, column: &'static str) -> Result<u64, PersistDbError> {
    u64::try_from(value).map_err(|_| PersistDbError::OutOfRange {
        column,
        value: value.to_string(),
    })
}
