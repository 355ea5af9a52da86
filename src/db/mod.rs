pub mod connection;
pub mod favorite;
pub mod listing;
pub mod migration;
pub mod recommendation;
pub mod user;

use chrono::{DateTime, Utc};

pub(crate) fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

pub(crate) fn from_timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Decodes a listing date stored as unix milliseconds.
pub(crate) fn from_timestamp_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
