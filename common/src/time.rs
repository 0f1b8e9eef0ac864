use chrono::{DateTime, Utc};

/// Wall-clock now.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn to_ms(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Inverse of [`to_ms`]; `None` when the value is outside chrono's range.
pub fn from_ms(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}
