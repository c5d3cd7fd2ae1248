//! Series aggregation: observations grouped per item, bucket duplicates
//! summed, entries sorted ascending by timestamp.

use std::collections::BTreeMap;

use crate::domain::{ItemSeriesMap, Observation, SeriesPoint};

/// Groups observations by item (case-sensitive exact match on the trimmed
/// item string) into ascending per-item series.
///
/// With `bucket` set, observations sharing a bucket timestamp are summed
/// into one entry, so no tie-break is needed afterwards. Without it, the
/// sort is stable and equal timestamps keep input order. An empty result
/// map is the definitive no-usable-data signal for callers; it is not an
/// error here.
pub fn group_series(observations: &[Observation], bucket: bool) -> ItemSeriesMap {
    if bucket {
        let mut grouped: BTreeMap<String, BTreeMap<chrono::DateTime<chrono::Utc>, f64>> =
            BTreeMap::new();
        for obs in observations {
            *grouped
                .entry(obs.item.clone())
                .or_default()
                .entry(obs.ts)
                .or_insert(0.0) += obs.quantity;
        }
        grouped
            .into_iter()
            .map(|(item, series)| {
                let points = series
                    .into_iter()
                    .map(|(ts, y)| SeriesPoint { ts, y })
                    .collect();
                (item, points)
            })
            .collect()
    } else {
        let mut grouped: ItemSeriesMap = BTreeMap::new();
        for obs in observations {
            grouped.entry(obs.item.clone()).or_default().push(SeriesPoint {
                ts: obs.ts,
                y: obs.quantity,
            });
        }
        for series in grouped.values_mut() {
            series.sort_by_key(|p| p.ts);
        }
        grouped
    }
}

/// Longest daily history span across items, measured inclusive between the
/// first and last bucket of each series. A single-bucket series spans one
/// day. Used by the model router.
pub fn max_history_span_days(items: &ItemSeriesMap) -> i64 {
    items
        .values()
        .filter_map(|series| match (series.first(), series.last()) {
            (Some(first), Some(last)) => {
                Some((last.ts.date_naive() - first.ts.date_naive()).num_days() + 1)
            }
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn obs(ts: &str, item: &str, quantity: f64) -> Observation {
        Observation {
            ts: Utc
                .from_utc_datetime(&format!("{ts}T00:00:00").parse().unwrap()),
            item: item.to_string(),
            quantity,
        }
    }

    #[test]
    fn same_day_duplicates_sum_under_bucketing() {
        let series = group_series(
            &[obs("2024-01-01", "Widget", 3.0), obs("2024-01-01", "Widget", 5.0)],
            true,
        );
        let widget = &series["Widget"];
        assert_eq!(widget.len(), 1);
        assert_eq!(widget[0].y, 8.0);
    }

    #[test]
    fn series_sort_ascending_with_gaps_left_alone() {
        let series = group_series(
            &[
                obs("2024-01-09", "Widget", 2.0),
                obs("2024-01-01", "Widget", 1.0),
                obs("2024-01-04", "Widget", 3.0),
            ],
            true,
        );
        let days: Vec<u32> = series["Widget"]
            .iter()
            .map(|p| p.ts.date_naive().format("%d").to_string().parse().unwrap())
            .collect();
        assert_eq!(days, vec![1, 4, 9]);
    }

    #[test]
    fn grouping_is_case_sensitive() {
        let series = group_series(
            &[obs("2024-01-01", "Widget", 1.0), obs("2024-01-01", "widget", 2.0)],
            true,
        );
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn without_bucketing_duplicates_stay_separate_in_input_order() {
        let series = group_series(
            &[obs("2024-01-01", "Widget", 3.0), obs("2024-01-01", "Widget", 5.0)],
            false,
        );
        let ys: Vec<f64> = series["Widget"].iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![3.0, 5.0]);
    }

    #[test]
    fn empty_input_yields_an_empty_map() {
        assert!(group_series(&[], true).is_empty());
    }

    #[test]
    fn history_span_is_inclusive_and_maximized_across_items() {
        let series = group_series(
            &[
                obs("2024-01-01", "A", 1.0),
                obs("2024-01-28", "A", 1.0),
                obs("2024-01-10", "B", 1.0),
            ],
            true,
        );
        assert_eq!(max_history_span_days(&series), 28);
        assert_eq!(max_history_span_days(&BTreeMap::new()), 0);
    }
}
