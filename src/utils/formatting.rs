use time::macros::format_description;
use time::{format_description, OffsetDateTime};

use super::{timestamp, TimestampStyle};

const DATETIME_FORMAT: &[format_description::FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

pub fn format_utc(date_time: impl Into<OffsetDateTime>) -> String {
    let offset_date_time: OffsetDateTime = date_time.into();
    offset_date_time
        .format(DATETIME_FORMAT)
        .unwrap_or_else(|_| offset_date_time.to_string())
}

/// Local time followed by how far away it is, e.g. for deadlines.
pub fn format_countdown(date_time: impl Into<OffsetDateTime>) -> String {
    let date_time = date_time.into();
    format!(
        "{} ({})",
        timestamp(date_time, TimestampStyle::ShortDateTime),
        timestamp(date_time, TimestampStyle::Relative)
    )
}

/// `m:ss` below an hour, `h:mm:ss` otherwise.
pub fn format_elapsed(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.unsigned_abs();
    let (hours, minutes, seconds) = (seconds / 3600, seconds / 60 % 60, seconds % 60);

    if hours > 0 {
        format!("{sign}{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{sign}{minutes}:{seconds:02}")
    }
}

/// Metres as kilometres, without trailing zeros.
pub fn format_distance(distance_m: f64) -> String {
    let km = format!("{:.2}", distance_m / 1000.0);
    let km = km.trim_end_matches('0').trim_end_matches('.');
    format!("{km} km")
}
