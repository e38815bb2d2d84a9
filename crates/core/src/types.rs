/// All server-side timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Client clock reading in Unix epoch milliseconds.
pub type EpochMillis = i64;
