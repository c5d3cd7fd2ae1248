//! Row normalization: one raw CSV record in, zero or one typed observation
//! out, with an explicit outcome per row.
//!
//! Date parsing tries a fixed precedence of formats and the first success
//! wins, with no cross-validation between formats. An ambiguous value like
//! `01/02/2024` therefore always reads as month/day/year, even when the
//! rest of the file suggests otherwise. Known limitation, kept on purpose.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use csv::StringRecord;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{DropCounts, Granularity, Observation};
use crate::pipeline::ingestion::mapping::ResolvedMapping;

/// Why a row failed to materialize into an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    BadDate,
    EmptyItem,
    BadQuantity,
}

/// Per-row outcome. Dropped rows are absorbed by the batch; only the
/// aggregate counts leave the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Parsed(Observation),
    Dropped(DropReason),
}

/// Calendar formats tried before the ISO-8601 fallback, in precedence order.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%m-%d-%Y"];

/// Loose `M/D/Y H:MM[:SS] [AM|PM]` timestamps accepted in hourly mode,
/// with `-` as an alternative date separator and the time part optional.
/// Both separators are captured and compared after the match; mixed
/// separators like `1/14-2026` are rejected.
static LOOSE_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{1,2})([/-])(\d{1,2})([/-])(\d{4})(?:\s+(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([AaPp][Mm])?)?$",
    )
    .unwrap()
});

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
}

/// Parses a date or timestamp cell using the fixed precedence order, then
/// the ISO-8601 fallback (trailing time component allowed, `Z` normalized
/// to an explicit UTC offset).
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(v, fmt) {
            return Some(midnight_utc(date));
        }
    }

    let normalized = if let Some(stripped) = v.strip_suffix(['Z', 'z']) {
        format!("{stripped}+00:00")
    } else {
        v.to_string()
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(v, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }

    None
}

/// Hourly-mode extension: loose month/day/year timestamps with an optional
/// 12-hour clock suffix, e.g. `1/14/2026 9:13 AM` or `1-14-2026 21:05`.
fn parse_timestamp_loose(value: &str) -> Option<DateTime<Utc>> {
    let v = value.trim();
    if let Some(ts) = parse_timestamp(v) {
        return Some(ts);
    }

    let caps = LOOSE_TIMESTAMP.captures(v)?;
    if caps[2] != caps[4] {
        return None;
    }
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    let year: i32 = caps[5].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let (mut hour, minute, second) = match caps.get(6) {
        Some(h) => (
            h.as_str().parse::<u32>().ok()?,
            caps[7].parse::<u32>().ok()?,
            caps.get(8).map_or(Some(0), |s| s.as_str().parse().ok())?,
        ),
        None => (0, 0, 0),
    };
    if let Some(ampm) = caps.get(9) {
        if hour == 12 {
            hour = 0;
        }
        if ampm.as_str().eq_ignore_ascii_case("pm") {
            hour += 12;
        }
    }

    let time = date.and_hms_opt(hour, minute, second)?;
    Some(Utc.from_utc_datetime(&time))
}

/// Truncates a timestamp to the requested bucket: midnight for daily,
/// top of the hour for hourly.
fn truncate(ts: DateTime<Utc>, granularity: Granularity) -> DateTime<Utc> {
    match granularity {
        Granularity::Daily => midnight_utc(ts.date_naive()),
        Granularity::Hourly => ts
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(ts),
    }
}

/// Normalizes one raw record against a resolved mapping.
pub fn normalize_row(
    record: &StringRecord,
    mapping: &ResolvedMapping,
    granularity: Granularity,
) -> RowOutcome {
    let cell = |idx: usize| record.get(idx).unwrap_or("");

    let raw_ts = cell(mapping.date_idx);
    let ts = match granularity {
        Granularity::Daily => parse_timestamp(raw_ts),
        Granularity::Hourly => parse_timestamp_loose(raw_ts),
    };
    let ts = match ts {
        Some(ts) => truncate(ts, granularity),
        None => return RowOutcome::Dropped(DropReason::BadDate),
    };

    let item = cell(mapping.item_idx).trim();
    if item.is_empty() {
        return RowOutcome::Dropped(DropReason::EmptyItem);
    }

    let raw_qty = cell(mapping.quantity_idx).trim();
    let quantity = if raw_qty.is_empty() {
        0.0
    } else {
        match raw_qty.parse::<f64>() {
            Ok(q) if q.is_finite() => q,
            _ => return RowOutcome::Dropped(DropReason::BadQuantity),
        }
    };

    RowOutcome::Parsed(Observation {
        ts,
        item: item.to_string(),
        quantity,
    })
}

/// Normalizes a whole batch, absorbing per-row failures into counts.
pub fn normalize_batch(
    records: &[StringRecord],
    mapping: &ResolvedMapping,
    granularity: Granularity,
) -> (Vec<Observation>, DropCounts) {
    let mut observations = Vec::with_capacity(records.len());
    let mut dropped = DropCounts::default();

    for record in records {
        match normalize_row(record, mapping, granularity) {
            RowOutcome::Parsed(obs) => observations.push(obs),
            RowOutcome::Dropped(DropReason::BadDate) => dropped.bad_date += 1,
            RowOutcome::Dropped(DropReason::EmptyItem) => dropped.empty_item += 1,
            RowOutcome::Dropped(DropReason::BadQuantity) => dropped.bad_quantity += 1,
        }
    }

    (observations, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> ResolvedMapping {
        ResolvedMapping {
            date_idx: 0,
            item_idx: 1,
            quantity_idx: 2,
        }
    }

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    fn parsed(outcome: RowOutcome) -> Observation {
        match outcome {
            RowOutcome::Parsed(obs) => obs,
            RowOutcome::Dropped(reason) => panic!("row dropped: {reason:?}"),
        }
    }

    #[test]
    fn accepts_each_calendar_format() {
        for raw in ["2024-01-05", "01/05/2024", "2024/01/05", "01-05-2024"] {
            let obs = parsed(normalize_row(
                &record(&[raw, "Widget", "3"]),
                &mapping(),
                Granularity::Daily,
            ));
            assert_eq!(obs.ts.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        }
    }

    #[test]
    fn ambiguous_dates_read_as_month_day_year() {
        // `%m/%d/%Y` sits before `%Y/%m/%d` in the precedence order.
        let obs = parsed(normalize_row(
            &record(&["01/02/2024", "Widget", "1"]),
            &mapping(),
            Granularity::Daily,
        ));
        assert_eq!(obs.ts.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn iso_fallback_accepts_time_and_zulu_marker() {
        let obs = parsed(normalize_row(
            &record(&["2024-03-01T15:42:10Z", "Widget", "2"]),
            &mapping(),
            Granularity::Daily,
        ));
        // Daily mode discards the time of day.
        assert_eq!(obs.ts, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn hourly_mode_truncates_to_the_hour() {
        let obs = parsed(normalize_row(
            &record(&["2024-03-01T15:42:10Z", "Widget", "2"]),
            &mapping(),
            Granularity::Hourly,
        ));
        assert_eq!(obs.ts, Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap());
    }

    #[test]
    fn hourly_mode_accepts_loose_twelve_hour_timestamps() {
        let cases = [
            ("1/14/2026 9:13", 9),
            ("1/14/2026 9:13 AM", 9),
            ("1/14/2026 9:13 PM", 21),
            ("1-14-2026 12:05 AM", 0),
            ("1/14/2026 12:05 PM", 12),
        ];
        for (raw, hour) in cases {
            let obs = parsed(normalize_row(
                &record(&[raw, "Widget", "1"]),
                &mapping(),
                Granularity::Hourly,
            ));
            assert_eq!(obs.ts, Utc.with_ymd_and_hms(2026, 1, 14, hour, 0, 0).unwrap(), "{raw}");
        }
    }

    #[test]
    fn loose_timestamps_with_seconds_truncate_to_the_hour() {
        let obs = parsed(normalize_row(
            &record(&["1-14-2026 21:05:59", "Widget", "1"]),
            &mapping(),
            Granularity::Hourly,
        ));
        assert_eq!(obs.ts, Utc.with_ymd_and_hms(2026, 1, 14, 21, 0, 0).unwrap());
    }

    #[test]
    fn mixed_date_separators_drop_the_row() {
        for raw in ["1/14-2026 9:13", "1-14/2026"] {
            assert_eq!(
                normalize_row(&record(&[raw, "Widget", "1"]), &mapping(), Granularity::Hourly),
                RowOutcome::Dropped(DropReason::BadDate),
                "{raw}"
            );
        }
    }

    #[test]
    fn hourly_mode_buckets_date_only_rows_at_midnight() {
        let obs = parsed(normalize_row(
            &record(&["1/14/2026", "Widget", "1"]),
            &mapping(),
            Granularity::Hourly,
        ));
        assert_eq!(obs.ts, Utc.with_ymd_and_hms(2026, 1, 14, 0, 0, 0).unwrap());
    }

    #[test]
    fn item_is_trimmed_and_empty_items_drop() {
        let obs = parsed(normalize_row(
            &record(&["2024-01-01", "  Widget  ", "1"]),
            &mapping(),
            Granularity::Daily,
        ));
        assert_eq!(obs.item, "Widget");

        assert_eq!(
            normalize_row(&record(&["2024-01-01", "   ", "1"]), &mapping(), Granularity::Daily),
            RowOutcome::Dropped(DropReason::EmptyItem)
        );
    }

    #[test]
    fn empty_quantity_reads_as_zero() {
        let obs = parsed(normalize_row(
            &record(&["2024-01-01", "Widget", ""]),
            &mapping(),
            Granularity::Daily,
        ));
        assert_eq!(obs.quantity, 0.0);
    }

    #[test]
    fn non_numeric_and_non_finite_quantities_drop() {
        for raw in ["abc", "1.2.3", "inf", "NaN"] {
            assert_eq!(
                normalize_row(
                    &record(&["2024-01-01", "Widget", raw]),
                    &mapping(),
                    Granularity::Daily
                ),
                RowOutcome::Dropped(DropReason::BadQuantity),
                "{raw}"
            );
        }
    }

    #[test]
    fn unparsable_date_drops_the_row() {
        assert_eq!(
            normalize_row(
                &record(&["next tuesday", "Widget", "1"]),
                &mapping(),
                Granularity::Daily
            ),
            RowOutcome::Dropped(DropReason::BadDate)
        );
    }

    #[test]
    fn batch_keeps_good_rows_and_counts_the_rest() {
        let records = vec![
            record(&["2024-01-01", "Widget", "3"]),
            record(&["bogus", "Widget", "1"]),
            record(&["2024-01-02", "", "1"]),
            record(&["2024-01-03", "Widget", "x"]),
            record(&["2024-01-04", "Widget", "5"]),
        ];
        let (observations, dropped) =
            normalize_batch(&records, &mapping(), Granularity::Daily);
        assert_eq!(observations.len(), 2);
        assert_eq!(dropped.bad_date, 1);
        assert_eq!(dropped.empty_item, 1);
        assert_eq!(dropped.bad_quantity, 1);
        assert_eq!(dropped.total(), 3);
    }
}
