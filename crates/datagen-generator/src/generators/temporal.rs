//! Timestamp, date and birthdate generators.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use rand::Rng;

/// Default birthdate bounds.
pub const BIRTHDATE_MIN: (i32, u32, u32) = (1920, 1, 1);
pub const BIRTHDATE_MAX: (i32, u32, u32) = (2024, 1, 1);

/// Parse an instant written as RFC 3339, `yyyy-mm-dd[ hh:mm:ss]` or
/// `dd/mm/yyyy` (the last forms are taken as UTC).
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(ndt.and_utc());
    }
    parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|ndt| ndt.and_utc())
}

/// Parse a calendar date written `yyyy-mm-dd` or `dd/mm/yyyy`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

/// Uniform instant between `min` and `max` (inclusive, millisecond precision).
pub fn instant_between<R: Rng + ?Sized>(
    rng: &mut R,
    min: DateTime<Utc>,
    max: DateTime<Utc>,
) -> DateTime<Utc> {
    let millis = rng.gen_range(min.timestamp_millis()..=max.timestamp_millis());
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(min)
}

/// Uniform calendar date between `min` and `max` (inclusive).
pub fn date_between<R: Rng + ?Sized>(rng: &mut R, min: NaiveDate, max: NaiveDate) -> NaiveDate {
    let span = (max - min).num_days();
    let offset = rng.gen_range(0..=span);
    min.checked_add_signed(Duration::days(offset)).unwrap_or(min)
}

/// Validate a strftime pattern by formatting a fixed instant with it.
pub fn check_pattern(pattern: &str) -> Result<(), String> {
    use std::fmt::Write;
    let mut out = String::new();
    write!(out, "{}", DateTime::<Utc>::default().format(pattern))
        .map_err(|_| format!("'{pattern}' is not a valid date pattern"))
}
