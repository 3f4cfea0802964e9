/// Entity identifiers are opaque strings (UUIDs for API-created tasks).
pub type EntityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
