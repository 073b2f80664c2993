use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// SQLite's `CURRENT_TIMESTAMP` column default, always UTC.
const SQLITE_DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Naive ISO-8601 with optional fraction, written in local time by earlier
/// scanner builds.
const LEGACY_LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

/// Parses a stored timestamp: RFC 3339, the SQLite default (UTC) or a
/// legacy naive local time.
pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, SQLITE_DEFAULT_FORMAT) {
        return Ok(naive.and_utc());
    }

    NaiveDateTime::parse_from_str(value, LEGACY_LOCAL_FORMAT)
        .map(local_to_utc)
        .map_err(|_| anyhow!("failed to parse {field}: unrecognised timestamp '{value}'"))
}

/// Times skipped by a DST jump have no local reading and are taken as UTC.
fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    match naive.and_local_timezone(Local).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => naive.and_utc(),
    }
}
