use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::debug;

/// Millisecond epochs start at 10^12; anything numeric below that is taken
/// as whole seconds.
const MILLIS_THRESHOLD: f64 = 1_000_000_000_000.0;

const CUSTOM_FORMAT: &str = "%Y-%m-%d@%Hh%Mm%Ss";

const FREEFORM_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%B %e, %Y %l:%M%P",
    "%b %e, %Y %l:%M%P",
];

/// Normalizes a raw timestamp value to an absolute UTC instant.
///
/// The value may be a numeric epoch in milliseconds, a numeric epoch in
/// seconds, a free-form date string, or the fixed `YYYY-MM-DD@HHhMMmSSs`
/// format. All branches are attempted in order; an unparseable value falls
/// back to epoch zero.
pub fn normalize_timestamp(raw: &str) -> DateTime<Utc> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return epoch_zero();
    }

    if let Ok(numeric) = trimmed.parse::<f64>() {
        let millis = if numeric.abs() >= MILLIS_THRESHOLD {
            numeric as i64
        } else {
            (numeric * 1000.0) as i64
        };
        if let Some(ts) = Utc.timestamp_millis_opt(millis).single() {
            return ts;
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return ts.with_timezone(&Utc);
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(trimmed) {
        return ts.with_timezone(&Utc);
    }
    for format in FREEFORM_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Utc.from_utc_datetime(&naive);
        }
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, CUSTOM_FORMAT) {
        return Utc.from_utc_datetime(&naive);
    }

    debug!("Unparseable timestamp '{trimmed}', falling back to epoch zero");
    epoch_zero()
}

pub fn epoch_zero() -> DateTime<Utc> {
    Utc.timestamp_opt(0, 0).single().unwrap_or_default()
}

pub fn is_epoch_zero(ts: &DateTime<Utc>) -> bool {
    ts.timestamp() == 0
}
