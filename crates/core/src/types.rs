/// History entry identifiers are millisecond creation timestamps.
pub type EntryId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
