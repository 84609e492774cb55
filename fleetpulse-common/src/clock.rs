//! Wall-clock helpers for wire timestamps.
//!
//! Liveness decisions never use these values; both sides track elapsed time
//! with `std::time::Instant`. These exist only to keep the wire format's
//! timestamp fields populated in the shape the dashboard expects.

use time::macros::format_description;
use time::OffsetDateTime;

/// `YYYY-MM-DDTHH:MM:SS`, second precision, no offset suffix.
pub fn wall_clock() -> String {
    let fmt = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    OffsetDateTime::now_utc().format(&fmt).unwrap_or_default()
}

/// Seconds since the Unix epoch, fractional.
pub fn epoch_secs() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9
}
