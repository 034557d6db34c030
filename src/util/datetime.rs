//! Due dates are entered and shown as local wall-clock time and stored as
//! absolute UTC instants.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Input format for due dates: `YYYY-MM-DDTHH:MM`
pub const LOCAL_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, thiserror::Error)]
pub enum DateError {
    #[error("invalid date/time '{0}': expected YYYY-MM-DDTHH:MM or YYYY-MM-DD")]
    Unparseable(String),
    #[error("'{0}' does not exist in the local time zone")]
    NonexistentLocalTime(String),
}

/// Parse a local wall-clock time in the given zone and normalize it to UTC.
///
/// A bare date means local midnight. Ambiguous times (DST fall-back) resolve
/// to the earlier instant.
pub fn parse_local_in<Tz: TimeZone>(input: &str, tz: &Tz) -> Result<DateTime<Utc>, DateError> {
    let trimmed = input.trim();
    let naive = NaiveDateTime::parse_from_str(trimmed, LOCAL_INPUT_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M"))
        .or_else(|_| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map(|d| d.and_time(chrono::NaiveTime::default()))
        })
        .map_err(|_| DateError::Unparseable(input.to_string()))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| DateError::NonexistentLocalTime(input.to_string()))
}

pub fn parse_local(input: &str) -> Result<DateTime<Utc>, DateError> {
    parse_local_in(input, &Local)
}

/// Render an instant as `YYYY-MM-DDTHH:MM` in the given zone
pub fn format_local_in<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    instant.with_timezone(tz).format(LOCAL_INPUT_FORMAT).to_string()
}

pub fn format_local(instant: &DateTime<Utc>) -> String {
    format_local_in(instant, &Local)
}

/// The local calendar day an instant falls on
pub fn local_day_in<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}
