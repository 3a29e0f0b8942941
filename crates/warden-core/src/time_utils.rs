/// Returns the current Unix timestamp in seconds.
pub fn current_unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Parses an RFC3339 / ISO-8601 timestamp into signed Unix milliseconds.
///
/// Offsets are honored, so `2024-01-01T12:00:00+02:00` and
/// `2024-01-01T10:00:00Z` parse to the same instant. Sub-millisecond
/// precision is truncated.
pub fn parse_rfc3339_to_unix_ms(raw: &str) -> Option<i64> {
    let parsed = chrono::DateTime::parse_from_rfc3339(raw.trim()).ok()?;
    Some(parsed.timestamp_millis())
}
