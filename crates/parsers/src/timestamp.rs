use chrono::{DateTime, NaiveDateTime};

use crate::model::ParseError;

/// Parse a naive log timestamp, interpreting it as UTC, into unix seconds.
///
/// Log timestamps here carry no offset; upstream servers write them in UTC.
pub fn naive_utc_epoch(value: &str, format: &str) -> Result<i64, ParseError> {
    let parsed =
        NaiveDateTime::parse_from_str(value, format).map_err(|source| ParseError::InvalidTimestamp {
            value: value.to_string(),
            source,
        })?;
    Ok(parsed.and_utc().timestamp())
}

/// Parse a timestamp that carries its own UTC offset into unix seconds.
pub fn offset_epoch(value: &str, format: &str) -> Result<i64, ParseError> {
    let parsed =
        DateTime::parse_from_str(value, format).map_err(|source| ParseError::InvalidTimestamp {
            value: value.to_string(),
            source,
        })?;
    Ok(parsed.timestamp())
}

/// Drop the `,963`-style sub-second suffix some log formats append.
pub fn strip_subseconds(value: &str) -> &str {
    value.split(',').next().unwrap_or(value)
}
