//! Serde helpers for records written by older stores
//!
//! Stored documents may carry `null` where a list is expected and the zero
//! timestamp `0001-01-01T00:00:00Z` where a date was never set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// `0001-01-01T00:00:00Z` in Unix seconds
const ZERO_TIMESTAMP_SECS: i64 = -62_135_596_800;

fn is_zero_timestamp(ts: &DateTime<Utc>) -> bool {
    ts.timestamp() == ZERO_TIMESTAMP_SECS && ts.timestamp_subsec_nanos() == 0
}

/// Read an optional timestamp, mapping the zero timestamp to `None`
pub fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<DateTime<Utc>> = Option::deserialize(deserializer)?;
    Ok(value.filter(|ts| !is_zero_timestamp(ts)))
}

/// Read a list of strings, mapping `null` to an empty list
pub fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
