//! Descriptive statistics
//!
//! Small helpers shared by the aggregation views, plus whole-dataset summaries.

use crate::types::{Event, Sex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Arithmetic mean; `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator); `None` below two values
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - avg).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Min, max and mean of one metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Number of values summarized; all fields are 0 when this is 0
    pub count: usize,
}

impl MetricSummary {
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut summary = MetricSummary::default();
        let mut sum = 0.0;
        for value in values {
            if summary.count == 0 {
                summary.min = value;
                summary.max = value;
            } else {
                summary.min = summary.min.min(value);
                summary.max = summary.max.max(value);
            }
            sum += value;
            summary.count += 1;
        }
        if summary.count > 0 {
            summary.mean = sum / summary.count as f64;
        }
        summary
    }
}

/// Overview statistics for a set of events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub event_count: usize,
    pub female_subjects: usize,
    pub male_subjects: usize,
    pub activity: MetricSummary,
    pub temperature: MetricSummary,
}

/// Summarize activity and temperature over a set of events
pub fn summarize<'a, I>(events: I) -> DatasetSummary
where
    I: IntoIterator<Item = &'a Event>,
{
    let events: Vec<&Event> = events.into_iter().collect();

    let mut subjects: HashSet<(Sex, &str)> = HashSet::new();
    for event in &events {
        subjects.insert((event.sex, event.subject_id.as_str()));
    }

    DatasetSummary {
        event_count: events.len(),
        female_subjects: subjects.iter().filter(|(s, _)| *s == Sex::Female).count(),
        male_subjects: subjects.iter().filter(|(s, _)| *s == Sex::Male).count(),
        activity: MetricSummary::from_values(events.iter().map(|e| e.activity)),
        temperature: MetricSummary::from_values(events.iter().map(|e| e.temperature)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LightPhaseConvention;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mean_and_sample_std_dev() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));

        assert_eq!(sample_std_dev(&[5.0]), None);
        // 2, 4, 4, 4, 5, 5, 7, 9: sum of squares 32, n - 1 = 7
        let sd = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_summarize() {
        let c = LightPhaseConvention::HalfDay;
        let events = vec![
            Event::new("f1", Sex::Female, 10.0, 37.0, 0, c),
            Event::new("f1", Sex::Female, 30.0, 38.0, 60, c),
            Event::new("m1", Sex::Male, 20.0, 36.0, 0, c),
        ];
        let summary = summarize(&events);

        assert_eq!(summary.event_count, 3);
        assert_eq!(summary.female_subjects, 1);
        assert_eq!(summary.male_subjects, 1);
        assert_eq!(
            summary.activity,
            MetricSummary {
                min: 10.0,
                max: 30.0,
                mean: 20.0,
                count: 3
            }
        );
        assert_eq!(summary.temperature.min, 36.0);
        assert_eq!(summary.temperature.max, 38.0);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&Vec::<Event>::new());
        assert_eq!(summary, DatasetSummary::default());
    }
}
