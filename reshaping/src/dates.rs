/*!
Normalization of date cells.

Spreadsheet decoders surface date cells in two shapes: a day-count serial
(day 0 is 1899-12-30, so serial 25569 is 1970-01-01 UTC), or a string that was
already formatted as `month/day/year`. Both are brought to a zero-padded
`year-month-day` string. Anything else is kept as is.
*/

use chrono::{Datelike, Duration, FixedOffset, Local, NaiveDate, Offset, TimeZone, Utc};
use log::debug;

use crate::config::Value;

/// Serial of 1970-01-01 in the 1900 date system.
const SERIAL_UNIX_EPOCH: f64 = 25569.0;
const SECONDS_PER_DAY: f64 = 86400.0;

/// The UTC offset of the machine running the conversion.
pub fn local_offset() -> FixedOffset {
    Local::now().offset().fix()
}

/// The instant designated by a serial, as seen on a wall clock at `offset`.
fn local_view(serial: f64, offset: FixedOffset) -> Option<chrono::NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    // Fractions of a second are dropped: 23:59:59.99 is still the same day.
    let secs = ((serial - SERIAL_UNIX_EPOCH) * SECONDS_PER_DAY).floor();
    if secs.abs() > i64::MAX as f64 / 2.0 {
        return None;
    }
    let instant = Utc.timestamp_opt(secs as i64, 0).single()?;
    Some(instant.with_timezone(&offset).naive_local())
}

/// Converts a serial to its calendar date.
///
/// The wall clock view is shifted back by the offset exactly once, so the
/// result does not depend on the time zone of the machine.
pub fn serial_to_date(serial: f64, offset: FixedOffset) -> Option<NaiveDate> {
    let local = local_view(serial, offset)?;
    let corrected =
        local.checked_sub_signed(Duration::seconds(offset.local_minus_utc() as i64))?;
    Some(corrected.date())
}

fn parse_mdy(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split('/').collect();
    let [m, d, y] = parts.as_slice() else {
        return None;
    };
    let digits = |p: &str, min: usize, max: usize| {
        p.len() >= min && p.len() <= max && p.chars().all(|c| c.is_ascii_digit())
    };
    if !(digits(*m, 1, 2) && digits(*d, 1, 2) && digits(*y, 4, 4)) {
        return None;
    }
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

/// Display form: `month/day/year` becomes `yyyy-mm-dd`. Other strings,
/// including strings already in `yyyy-mm-dd` form, come back unchanged.
pub fn format_ymd(s: &str) -> String {
    match parse_mdy(s) {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => s.to_string(),
    }
}

/// Normalizes a date cell to `yyyy-mm-dd`, using `offset` as the local time
/// zone of the conversion. Never fails: unrecognized input is passed through.
///
/// Serials whose date falls outside years 0 to 9999 have no four digit form
/// and are passed through as well.
pub fn normalize_date(raw: &Value, offset: FixedOffset) -> String {
    let res = match raw {
        Value::Number(serial) => match serial_to_date(*serial, offset) {
            Some(d) if (0..=9999).contains(&d.year()) => d.format("%Y-%m-%d").to_string(),
            _ => raw.to_string(),
        },
        Value::Text(s) => format_ymd(s),
        _ => raw.to_string(),
    };
    debug!("normalize_date: {:?} -> {:?}", raw, res);
    res
}
