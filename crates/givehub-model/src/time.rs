// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::error::ValidationError;

pub const SECONDS_PER_DAY: i64 = 86_400;

#[must_use]
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// `YYYY-MM-DD` to the unix second of that day's UTC midnight.
pub fn parse_date(field: &str, raw: &str) -> Result<i64, ValidationError> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::new(field, "must be a YYYY-MM-DD date"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| ValidationError::new(field, "date out of range"))
}

#[must_use]
pub fn format_date(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "1970-01-01".to_string())
}

#[must_use]
pub fn year_of(ts: i64) -> i32 {
    DateTime::<Utc>::from_timestamp(ts, 0).map_or(1970, |dt| dt.year())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_round_trip_through_midnight_timestamps() {
        let ts = parse_date("start", "2026-04-01").expect("date");
        assert_eq!(ts % SECONDS_PER_DAY, 0);
        assert_eq!(format_date(ts), "2026-04-01");
        assert_eq!(format_date(ts + SECONDS_PER_DAY - 1), "2026-04-01");
        assert_eq!(year_of(ts), 2026);
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(parse_date("start", "2026-13-01").is_err());
        assert!(parse_date("start", "01/04/2026").is_err());
    }
}
