//! Display and form-input rendering of backend timestamps.
//!
//! Every function is total: absent or unparseable input yields a fixed
//! placeholder instead of an error. Inputs without an offset (the backend's
//! local date-times) are read in the display time zone; ISO date-only strings
//! are read as UTC midnight; RFC 3339 strings keep their own offset.

use std::fmt::Display;

use chrono::{
    DateTime, Local, NaiveDate, NaiveDateTime, Offset, SecondsFormat, TimeDelta, TimeZone, Utc,
};

/// Shown for absent or invalid dates.
pub const PLACEHOLDER: &str = "\u{2014}";

const DATE_FORMAT: &str = "%b %-d, %Y";
const DATE_TIME_FORMAT: &str = "%b %-d, %Y, %I:%M %p";
const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

// Minute precision or a colon-less offset, which RFC 3339 rejects.
const OFFSET_DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%b %d, %Y, %I:%M %p",
];

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// Parse a timestamp into the given zone, or `None` if it is not a valid date.
pub fn parse_timestamp_in<Tz: TimeZone>(input: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(tz));
    }

    for fmt in OFFSET_DATE_TIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, fmt) {
            return Some(dt.with_timezone(tz));
        }
    }

    for fmt in NAIVE_DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return from_local(&naive, tz);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&midnight).with_timezone(tz));
    }

    // Already-formatted display dates are local calendar days.
    if let Ok(date) = NaiveDate::parse_from_str(input, "%b %d, %Y") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return from_local(&midnight, tz);
    }

    None
}

/// Wall-clock time in `tz`. Ambiguous times take the earlier instant; times
/// skipped by a forward transition move forward by the size of the gap.
fn from_local<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(naive).earliest().or_else(|| {
        let day_before = naive.checked_sub_signed(TimeDelta::days(1))?;
        let offset_before = tz.offset_from_utc_datetime(&day_before).fix();
        let utc = naive.checked_sub_offset(offset_before)?;
        Some(tz.from_utc_datetime(&utc))
    })
}

// ─── Formatting ──────────────────────────────────────────────────────────────

/// "Mar 15, 2026", or the placeholder.
pub fn format_date_in<Tz>(input: Option<&str>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    input
        .and_then(|s| parse_timestamp_in(s, tz))
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// "Mar 15, 2026, 10:30 AM", or the placeholder.
pub fn format_date_time_in<Tz>(input: Option<&str>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    input
        .and_then(|s| parse_timestamp_in(s, tz))
        .map(|dt| dt.format(DATE_TIME_FORMAT).to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Fixed-width `YYYY-MM-DDTHH:MM` for date-time inputs, or an empty string.
pub fn to_input_date_time_local_in<Tz>(input: Option<&str>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    input
        .and_then(|s| parse_timestamp_in(s, tz))
        .map(|dt| dt.format(INPUT_FORMAT).to_string())
        .unwrap_or_default()
}

pub fn format_date(input: Option<&str>) -> String {
    format_date_in(input, &Local)
}

pub fn format_date_time(input: Option<&str>) -> String {
    format_date_time_in(input, &Local)
}

pub fn to_input_date_time_local(input: Option<&str>) -> String {
    to_input_date_time_local_in(input, &Local)
}

/// Current instant as an RFC 3339 UTC string with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, MappedLocalTime, NaiveDate};
    use proptest::prelude::*;

    fn utc() -> Utc {
        Utc
    }

    /// UTC-5, moving to UTC-4 at 2026-03-08 07:00 UTC (02:00 local).
    #[derive(Debug, Clone, Copy)]
    struct SpringForward;

    impl SpringForward {
        const STANDARD: i32 = -5 * 3600;
        const DAYLIGHT: i32 = -4 * 3600;

        fn switch() -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2026, 3, 8)
                .unwrap()
                .and_hms_opt(7, 0, 0)
                .unwrap()
        }

        fn offset(secs: i32) -> FixedOffset {
            FixedOffset::east_opt(secs).unwrap()
        }
    }

    impl TimeZone for SpringForward {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            SpringForward
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> MappedLocalTime<FixedOffset> {
            self.offset_from_local_datetime(&local.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> MappedLocalTime<FixedOffset> {
            let gap_start = Self::switch() + Self::offset(Self::STANDARD);
            let gap_end = Self::switch() + Self::offset(Self::DAYLIGHT);
            if *local < gap_start {
                MappedLocalTime::Single(Self::offset(Self::STANDARD))
            } else if *local < gap_end {
                MappedLocalTime::None
            } else {
                MappedLocalTime::Single(Self::offset(Self::DAYLIGHT))
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::switch() {
                Self::offset(Self::STANDARD)
            } else {
                Self::offset(Self::DAYLIGHT)
            }
        }
    }

    // ─── format_date ────────────────────────────────────────────────────

    #[test]
    fn format_date_valid_input() {
        assert_eq!(format_date_in(Some("2026-03-15T10:00:00"), &utc()), "Mar 15, 2026");
    }

    #[test]
    fn format_date_null_and_invalid() {
        assert_eq!(format_date_in(None, &utc()), PLACEHOLDER);
        assert_eq!(format_date_in(Some("not-a-date"), &utc()), PLACEHOLDER);
        assert_eq!(format_date_in(Some(""), &utc()), PLACEHOLDER);
    }

    #[test]
    fn format_date_respects_offset() {
        let plus_ten = FixedOffset::east_opt(10 * 3600).unwrap();
        assert_eq!(
            format_date_in(Some("2026-03-15T20:00:00Z"), &plus_ten),
            "Mar 16, 2026"
        );
    }

    #[test]
    fn date_only_input_is_utc_midnight() {
        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(format_date_in(Some("2026-03-15"), &minus_five), "Mar 14, 2026");
    }

    // ─── format_date_time ───────────────────────────────────────────────

    #[test]
    fn format_date_time_valid_input() {
        assert_eq!(
            format_date_time_in(Some("2026-03-15T10:30:00"), &utc()),
            "Mar 15, 2026, 10:30 AM"
        );
        assert_eq!(
            format_date_time_in(Some("2026-03-15T21:05:00.123456"), &utc()),
            "Mar 15, 2026, 09:05 PM"
        );
    }

    #[test]
    fn format_date_time_null_and_invalid() {
        assert_eq!(format_date_time_in(None, &utc()), PLACEHOLDER);
        assert_eq!(format_date_time_in(Some("2026-13-45T99:99"), &utc()), PLACEHOLDER);
    }

    // ─── to_input_date_time_local ───────────────────────────────────────

    #[test]
    fn to_input_converts_iso_string() {
        assert_eq!(
            to_input_date_time_local_in(Some("2026-03-15T10:30:00"), &utc()),
            "2026-03-15T10:30"
        );
    }

    #[test]
    fn to_input_zero_pads_and_converts_zone() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            to_input_date_time_local_in(Some("2026-01-05T01:07:00Z"), &plus_two),
            "2026-01-05T03:07"
        );
    }

    #[test]
    fn to_input_null_and_invalid_are_empty() {
        assert_eq!(to_input_date_time_local_in(None, &utc()), "");
        assert_eq!(to_input_date_time_local_in(Some("invalid"), &utc()), "");
    }

    #[test]
    fn time_skipped_by_dst_moves_forward() {
        let input = Some("2026-03-08T02:30:00");
        assert_eq!(format_date_in(input, &SpringForward), "Mar 8, 2026");
        assert_eq!(
            format_date_time_in(input, &SpringForward),
            "Mar 8, 2026, 03:30 AM"
        );
        assert_eq!(
            to_input_date_time_local_in(input, &SpringForward),
            "2026-03-08T03:30"
        );
    }

    #[test]
    fn times_around_dst_switch_are_unchanged() {
        assert_eq!(
            to_input_date_time_local_in(Some("2026-03-08T01:59"), &SpringForward),
            "2026-03-08T01:59"
        );
        assert_eq!(
            to_input_date_time_local_in(Some("2026-03-08T03:00"), &SpringForward),
            "2026-03-08T03:00"
        );
    }

    #[test]
    fn minute_precision_with_offset() {
        assert_eq!(format_date_in(Some("2026-03-15T10:30Z"), &utc()), "Mar 15, 2026");
        assert_eq!(
            format_date_time_in(Some("2026-03-15T10:30Z"), &utc()),
            "Mar 15, 2026, 10:30 AM"
        );
        assert_eq!(
            format_date_time_in(Some("2026-03-15T10:30+02:00"), &utc()),
            "Mar 15, 2026, 08:30 AM"
        );
        assert_eq!(
            to_input_date_time_local_in(Some("2026-03-15T10:30+0200"), &utc()),
            "2026-03-15T08:30"
        );
    }

    #[test]
    fn now_timestamp_is_parseable() {
        assert!(parse_timestamp_in(&now_timestamp(), &utc()).is_some());
    }

    // ─── Properties ─────────────────────────────────────────────────────

    fn iso_input() -> impl Strategy<Value = String> {
        (1970i32..2100, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60).prop_map(
            |(y, mo, d, h, mi, s)| format!("{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}"),
        )
    }

    fn offset() -> impl Strategy<Value = FixedOffset> {
        (-12i32..=14).prop_map(|h| FixedOffset::east_opt(h * 3600).unwrap())
    }

    proptest! {
        #[test]
        fn format_date_is_idempotent(input in iso_input(), tz in offset()) {
            let once = format_date_in(Some(&input), &tz);
            prop_assert_eq!(format_date_in(Some(&once), &tz), once);
        }

        #[test]
        fn format_date_time_is_idempotent(input in iso_input(), tz in offset()) {
            let once = format_date_time_in(Some(&input), &tz);
            prop_assert_eq!(format_date_time_in(Some(&once), &tz), once);
        }

        #[test]
        fn to_input_reaches_fixed_point(input in iso_input(), tz in offset()) {
            let once = to_input_date_time_local_in(Some(&input), &tz);
            prop_assert_eq!(once.len(), 16);
            prop_assert_eq!(to_input_date_time_local_in(Some(&once), &tz), once);
        }

        #[test]
        fn garbage_yields_placeholders(input in "[a-z ]{0,12}") {
            prop_assert_eq!(format_date_in(Some(&input), &Utc), PLACEHOLDER);
            prop_assert_eq!(format_date_time_in(Some(&input), &Utc), PLACEHOLDER);
            prop_assert_eq!(to_input_date_time_local_in(Some(&input), &Utc), "");
        }
    }
}
