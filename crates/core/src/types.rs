/// Job identifiers are UUIDs (v7 when generated by the registry).
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
