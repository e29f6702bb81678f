//! Global trips-per-day series and its moving average.

use std::collections::BTreeMap;

use churnfeat_math::{first_gap, rolling_mean};
use churnfeat_primitives::{DailyTripCount, Date, TripEvent};

use crate::window::day_key;
use crate::{DayConvention, PipelineError, Result, TrendConfig};

/// Number of events per calendar day, ascending by day.
///
/// Days without events are not present.
#[must_use]
pub fn daily_trip_counts(events: &[TripEvent], day: &DayConvention) -> BTreeMap<Date, usize> {
    let mut counts = BTreeMap::new();
    for event in events {
        *counts.entry(day.day_of(&event.pickup_at)).or_insert(0) += 1;
    }
    counts
}

fn fill_missing(counts: BTreeMap<Date, usize>) -> Vec<(Date, usize)> {
    let (Some(first), Some(last)) =
        (counts.first_key_value().map(|(d, _)| *d), counts.last_key_value().map(|(d, _)| *d))
    else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|d| (d, counts.get(&d).copied().unwrap_or(0)))
        .collect()
}

/// Daily trip counts with a row-window moving average.
///
/// The moving average is a row window, so the daily series must not skip a
/// day unless `fill_missing_days` inserts zero-count days. With
/// `drop_incomplete` the leading `window - 1` days are left out.
///
/// # Errors
/// Returns `PipelineError::WindowModeMismatch` when the series has a gap and
/// filling is disabled, and `PipelineError::Math` for a zero window.
pub fn trip_trend(
    events: &[TripEvent],
    day: &DayConvention,
    config: &TrendConfig,
) -> Result<Vec<DailyTripCount>> {
    let counts = daily_trip_counts(events, day);
    let series: Vec<(Date, usize)> = if config.fill_missing_days {
        fill_missing(counts)
    } else {
        counts.into_iter().collect()
    };

    let keys: Vec<i64> = series.iter().map(|(d, _)| day_key(*d)).collect();
    if let Some(index) = first_gap(&keys) {
        return Err(PipelineError::WindowModeMismatch {
            series: "daily trip counts".to_string(),
            previous: series[index - 1].0,
            day: series[index].0,
        });
    }

    let values: Vec<f64> = series.iter().map(|(_, n)| *n as f64).collect();
    let averages = rolling_mean(&values, config.window, config.window)?;

    Ok(series
        .into_iter()
        .zip(averages)
        .map(|((day, trips), moving_average)| DailyTripCount { day, trips, moving_average })
        .filter(|row| !config.drop_incomplete || row.moving_average.is_some())
        .collect())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use churnfeat_primitives::EventId;

    use super::*;

    fn events_on(days: &[(u32, usize)]) -> Vec<TripEvent> {
        let mut events = Vec::new();
        for &(d, n) in days {
            for i in 0..n {
                let ts = Utc.with_ymd_and_hms(2015, 7, d, 10, 0, 0).unwrap();
                events.push(TripEvent::new(EventId::new(format!("{d}-{i}")), ts, None, None, 1.0));
            }
        }
        events
    }

    fn config(window: usize, drop_incomplete: bool, fill_missing_days: bool) -> TrendConfig {
        TrendConfig { enabled: true, window, drop_incomplete, fill_missing_days }
    }

    #[test]
    fn seven_day_average_drops_leading_days() {
        let days: Vec<(u32, usize)> = (1..=10).map(|d| (d, d as usize)).collect();
        let trend = trip_trend(&events_on(&days), &DayConvention::UTC, &config(7, true, false))
            .unwrap();

        assert_eq!(trend.len(), 4);
        assert_eq!(trend[0].day, Date::from_ymd_opt(2015, 7, 7).unwrap());
        // mean of 1..=7
        assert_relative_eq!(trend[0].moving_average.unwrap(), 4.0);
        assert_relative_eq!(trend[3].moving_average.unwrap(), 7.0);
    }

    #[test]
    fn incomplete_rows_kept_when_asked() {
        let trend = trip_trend(
            &events_on(&[(1, 2), (2, 4), (3, 6)]),
            &DayConvention::UTC,
            &config(2, false, false),
        )
        .unwrap();

        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0].moving_average, None);
        assert_relative_eq!(trend[2].moving_average.unwrap(), 5.0);
    }

    #[test]
    fn gap_is_rejected() {
        let err = trip_trend(
            &events_on(&[(1, 1), (2, 1), (5, 1)]),
            &DayConvention::UTC,
            &config(2, true, false),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::WindowModeMismatch { .. }));
    }

    #[test]
    fn gap_filled_with_zero_days() {
        let trend = trip_trend(
            &events_on(&[(1, 4), (3, 2)]),
            &DayConvention::UTC,
            &config(2, false, true),
        )
        .unwrap();

        let trips: Vec<usize> = trend.iter().map(|r| r.trips).collect();
        assert_eq!(trips, vec![4, 0, 2]);
        assert_relative_eq!(trend[1].moving_average.unwrap(), 2.0);
    }

    #[test]
    fn no_events_no_rows() {
        let trend = trip_trend(&[], &DayConvention::UTC, &config(7, true, true)).unwrap();
        assert!(trend.is_empty());
    }
}
