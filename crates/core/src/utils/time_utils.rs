use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Default timezone for valuation dates.
/// This is the canonical timezone used to convert UTC instants to domain dates.
/// For a US-focused brokerage tracker, America/New_York is a sensible default.
pub const DEFAULT_VALUATION_TZ: Tz = chrono_tz::America::New_York;

/// Converts a UTC instant to a valuation date in the given timezone.
///
/// This is the single source of truth for converting instants to domain dates:
/// every day-boundary decision in the snapshot builders goes through it.
pub fn valuation_date_from_utc(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Parses an IANA timezone name such as `Europe/Madrid`.
pub fn parse_valuation_tz(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}
