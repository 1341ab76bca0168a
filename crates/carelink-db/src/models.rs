//! Database row types — these map directly to SQLite rows.
//! Distinct from carelink-types models to keep the DB layer independent.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

pub struct LinkCodeRow {
    pub user_id: String,
    pub code: String,
    pub created_at: String,
    pub expires_at: Option<String>,
}

pub struct CaregiverLinkRow {
    pub caregiver_id: String,
    pub user_id: String,
    pub created_at: String,
}

/// Fixed-width RFC 3339 so stored timestamps sort as text.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339 and SQLite's own `datetime('now')` format.
pub fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(ts) = raw.parse::<DateTime<Utc>>() {
        return Ok(ts);
    }
    // SQLite stores "YYYY-MM-DD HH:MM:SS" without timezone; treat it as UTC.
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| anyhow::anyhow!("Corrupt timestamp '{}': {}", raw, e))?;
    Ok(naive.and_utc())
}
