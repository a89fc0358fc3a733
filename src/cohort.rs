//! Rolling cohort bands
//!
//! This module computes per-sex mean ± deviation bands over a trailing time
//! window, in 5-minute buckets, with an optional single-subject overlay.
//!
//! The `std_dev` of each bucket is compressed for display: temperature
//! deviations are scaled to 60%, activity deviations to 50% with anything
//! above 30 replaced by 20. This is cosmetic and not a robust statistic; the
//! undamped sample deviation is kept in `raw_std_dev`.

use crate::error::ComputeError;
use crate::stats::{mean, sample_std_dev};
use crate::types::{max_elapsed_minute, CohortComparison, CohortTimeBucket, Event, Metric, Sex};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Width of one cohort bucket in minutes
pub const BUCKET_MINUTES: u32 = 5;

/// Temperature deviation display scale
const TEMPERATURE_SD_SCALE: f64 = 0.6;

/// Activity deviation display scale
const ACTIVITY_SD_SCALE: f64 = 0.5;

/// Activity deviations above this are replaced by `ACTIVITY_SD_CAP`
const ACTIVITY_SD_LIMIT: f64 = 30.0;
const ACTIVITY_SD_CAP: f64 = 20.0;

/// Aggregator for trailing-window cohort bands
#[derive(Debug, Clone, Copy)]
pub struct CohortAggregator {
    metric: Metric,
    window_hours: u32,
    recording_start: DateTime<Utc>,
}

impl CohortAggregator {
    /// Create an aggregator; a zero-hour window is rejected
    pub fn new(metric: Metric, window_hours: u32) -> Result<Self, ComputeError> {
        if window_hours == 0 {
            return Err(ComputeError::InvalidConfig(
                "time window must be at least 1 hour".to_string(),
            ));
        }
        Ok(Self {
            metric,
            window_hours,
            recording_start: DateTime::<Utc>::UNIX_EPOCH,
        })
    }

    /// Anchor bucket timestamps to the wall-clock start of the recording
    pub fn with_recording_start(mut self, start: DateTime<Utc>) -> Self {
        self.recording_start = start;
        self
    }

    /// First elapsed minute inside the window for a given stream
    pub fn cutoff_minute(&self, events: &[Event]) -> i64 {
        let latest = max_elapsed_minute(events).map_or(0, i64::from);
        latest - i64::from(self.window_hours) * 60
    }

    /// Per-sex bands over the window, plus the selected subject's events
    pub fn aggregate(&self, events: &[Event], selected_subject: Option<&str>) -> CohortComparison {
        let cutoff = self.cutoff_minute(events);
        let in_window = |e: &&Event| i64::from(e.elapsed_minute) >= cutoff;

        let mut grouped: BTreeMap<(Sex, u32), Vec<f64>> = BTreeMap::new();
        for event in events.iter().filter(in_window) {
            let bucket = event.elapsed_minute / BUCKET_MINUTES * BUCKET_MINUTES;
            grouped
                .entry((event.sex, bucket))
                .or_default()
                .push(self.metric.value(event));
        }

        // BTreeMap order gives each sex's buckets in ascending time
        let mut male = Vec::new();
        let mut female = Vec::new();
        for ((sex, bucket_minute), values) in grouped {
            let Some(bucket) = self.bucket(sex, bucket_minute, &values) else {
                continue;
            };
            match sex {
                Sex::Male => male.push(bucket),
                Sex::Female => female.push(bucket),
            }
        }

        let selected_subject_series = selected_subject.map(|id| {
            let mut series: Vec<Event> = events
                .iter()
                .filter(|e| e.subject_id == id)
                .filter(in_window)
                .cloned()
                .collect();
            series.sort_by_key(|e| e.elapsed_minute);
            series
        });

        tracing::debug!(
            metric = %self.metric,
            window_hours = self.window_hours,
            cutoff,
            male_buckets = male.len(),
            female_buckets = female.len(),
            "cohort bands aggregated"
        );

        CohortComparison {
            metric: self.metric,
            window_hours: self.window_hours,
            cutoff_minute: cutoff,
            male,
            female,
            selected_subject_series,
        }
    }

    fn bucket(&self, sex: Sex, bucket_minute: u32, values: &[f64]) -> Option<CohortTimeBucket> {
        let mean = mean(values)?;
        // A lone sample has no spread
        let raw_std_dev = sample_std_dev(values).unwrap_or(0.0);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(CohortTimeBucket {
            timestamp: self.recording_start + Duration::minutes(i64::from(bucket_minute)),
            bucket_minute,
            mean,
            std_dev: damp_std_dev(self.metric, raw_std_dev),
            raw_std_dev,
            min,
            max,
            count: values.len(),
            sex,
        })
    }
}

/// Display damping applied to a bucket's standard deviation
pub fn damp_std_dev(metric: Metric, std_dev: f64) -> f64 {
    match metric {
        Metric::Temperature => std_dev * TEMPERATURE_SD_SCALE,
        Metric::Activity if std_dev > ACTIVITY_SD_LIMIT => ACTIVITY_SD_CAP,
        Metric::Activity => std_dev * ACTIVITY_SD_SCALE,
    }
}

/// Cohort bands with timestamps anchored at the Unix epoch
pub fn rolling_cohort(
    events: &[Event],
    metric: Metric,
    window_hours: u32,
    selected_subject: Option<&str>,
) -> Result<CohortComparison, ComputeError> {
    Ok(CohortAggregator::new(metric, window_hours)?.aggregate(events, selected_subject))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LightPhaseConvention;
    use chrono::TimeZone;

    fn event(id: &str, sex: Sex, activity: f64, temperature: f64, minute: u32) -> Event {
        Event::new(id, sex, activity, temperature, minute, LightPhaseConvention::HalfDay)
    }

    /// Three males and two females sampled every minute for `minutes`
    fn stream(minutes: u32) -> Vec<Event> {
        let mut events = Vec::new();
        for minute in 0..minutes {
            for (i, id) in ["m1", "m2", "m3"].iter().enumerate() {
                let activity = 10.0 * (i as f64 + 1.0);
                events.push(event(id, Sex::Male, activity, 36.0 + i as f64, minute));
            }
            for (i, id) in ["f1", "f2"].iter().enumerate() {
                events.push(event(id, Sex::Female, 5.0 + i as f64, 37.0, minute));
            }
        }
        events
    }

    #[test]
    fn test_damping_policy() {
        assert!((damp_std_dev(Metric::Temperature, 1.0) - 0.6).abs() < 1e-12);
        assert_eq!(damp_std_dev(Metric::Activity, 31.0), 20.0);
        assert_eq!(damp_std_dev(Metric::Activity, 30.0), 15.0);
        assert_eq!(damp_std_dev(Metric::Activity, 10.0), 5.0);
    }

    #[test]
    fn test_window_bounds() {
        let events = stream(3 * 60);
        let result = rolling_cohort(&events, Metric::Activity, 1, None).unwrap();

        // max minute 179, cutoff 119: buckets start at 115 (holding 119) onward
        assert_eq!(result.cutoff_minute, 119);
        let max_ts = result.male.last().unwrap().timestamp;
        for bucket in result.male.iter().chain(result.female.iter()) {
            let bucket_end = i64::from(bucket.bucket_minute) + i64::from(BUCKET_MINUTES);
            assert!(bucket_end > result.cutoff_minute);
            assert!(bucket.timestamp >= max_ts - Duration::hours(1));
        }
        assert_eq!(result.male.first().unwrap().bucket_minute, 115);
        assert_eq!(result.male.first().unwrap().count, 3);
    }

    #[test]
    fn test_bucket_statistics() {
        let events = stream(10);
        let result = rolling_cohort(&events, Metric::Activity, 24, None).unwrap();

        assert_eq!(result.male.len(), 2);
        let first = &result.male[0];
        assert_eq!(first.bucket_minute, 0);
        assert_eq!(first.count, 15);
        assert!((first.mean - 20.0).abs() < 1e-12);
        assert_eq!(first.min, 10.0);
        assert_eq!(first.max, 30.0);
        // values 10/20/30 five times each
        let expected_sd = (1000.0f64 / 14.0).sqrt();
        assert!((first.raw_std_dev - expected_sd).abs() < 1e-9);
        assert!((first.std_dev - expected_sd * 0.5).abs() < 1e-9);
        assert_eq!(first.sex, Sex::Male);
        assert_eq!(first.timestamp, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(result.male[1].timestamp, DateTime::<Utc>::UNIX_EPOCH + Duration::minutes(5));
    }

    #[test]
    fn test_series_time_ordered_and_split_by_sex() {
        let mut events = stream(30);
        events.reverse();
        let result = rolling_cohort(&events, Metric::Temperature, 24, None).unwrap();

        assert_eq!(result.male.len(), 6);
        assert_eq!(result.female.len(), 6);
        assert!(result.male.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(result.female.iter().all(|b| b.sex == Sex::Female));
        assert!(result.female.iter().all(|b| b.raw_std_dev == 0.0));
    }

    #[test]
    fn test_selected_subject_overlay() {
        let mut events = stream(120);
        events.reverse();
        let result = rolling_cohort(&events, Metric::Activity, 1, Some("f2")).unwrap();

        let series = result.selected_subject_series.unwrap();
        assert_eq!(series.len(), 61);
        assert!(series.iter().all(|e| e.subject_id == "f2"));
        assert!(series.windows(2).all(|w| w[0].elapsed_minute < w[1].elapsed_minute));
        assert_eq!(series[0].elapsed_minute, 59);

        let missing = rolling_cohort(&events, Metric::Activity, 1, Some("zz")).unwrap();
        assert_eq!(missing.selected_subject_series, Some(Vec::new()));
    }

    #[test]
    fn test_recording_start_offsets_timestamps() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let aggregator = CohortAggregator::new(Metric::Activity, 24)
            .unwrap()
            .with_recording_start(start);
        let result = aggregator.aggregate(&stream(6), None);
        assert_eq!(result.male[1].timestamp, start + Duration::minutes(5));
    }

    #[test]
    fn test_empty_stream_and_invalid_window() {
        let result = rolling_cohort(&[], Metric::Activity, 24, None).unwrap();
        assert!(result.male.is_empty());
        assert!(result.female.is_empty());
        assert!(result.selected_subject_series.is_none());

        assert!(matches!(
            rolling_cohort(&[], Metric::Activity, 0, None),
            Err(ComputeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let events = stream(45);
        let a = rolling_cohort(&events, Metric::Temperature, 2, Some("m1")).unwrap();
        let b = rolling_cohort(&events, Metric::Temperature, 2, Some("m1")).unwrap();
        assert_eq!(a, b);
    }
}
