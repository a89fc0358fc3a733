//! Per-subject outlier ranking
//!
//! Each subject is reduced to its mean metric value and compared with the
//! other subjects of the same sex. Ranking uses the absolute z-score of the
//! subject mean against the cohort of subject means.

use crate::stats::{mean, sample_std_dev};
use crate::types::{Direction, Event, Metric, OutlierReport, Sex, SubjectOutlier};
use std::collections::HashMap;

/// z-score above which a subject counts as an outlier
pub const OUTLIER_Z_THRESHOLD: f64 = 1.0;

/// Subjects always reported per cohort when enough exist
pub const MIN_OUTLIERS: usize = 3;

/// Most subjects reported per cohort
pub const MAX_OUTLIERS: usize = 5;

/// Rank subjects of each sex by distance from their cohort mean
pub fn identify_outliers(events: &[Event], metric: Metric) -> OutlierReport {
    let subjects = subject_means(events, metric);

    let rank = |sex: Sex| {
        let cohort: Vec<&SubjectMean> = subjects.iter().filter(|s| s.sex == sex).collect();
        rank_cohort(&cohort)
    };

    let report = OutlierReport {
        metric,
        male: rank(Sex::Male),
        female: rank(Sex::Female),
    };

    tracing::debug!(
        metric = %metric,
        subjects = subjects.len(),
        male = report.male.len(),
        female = report.female.len(),
        "outliers ranked"
    );
    report
}

struct SubjectMean<'a> {
    subject_id: &'a str,
    sex: Sex,
    mean: f64,
}

/// Mean metric per subject, in order of first appearance
fn subject_means(events: &[Event], metric: Metric) -> Vec<SubjectMean<'_>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Sex, Vec<f64>)> = Vec::new();

    for event in events {
        let slot = *index.entry(event.subject_id.as_str()).or_insert_with(|| {
            groups.push((event.subject_id.as_str(), event.sex, Vec::new()));
            groups.len() - 1
        });
        groups[slot].2.push(metric.value(event));
    }

    groups
        .into_iter()
        .filter_map(|(subject_id, sex, values)| {
            mean(&values).map(|mean| SubjectMean {
                subject_id,
                sex,
                mean,
            })
        })
        .collect()
}

fn rank_cohort(cohort: &[&SubjectMean<'_>]) -> Vec<SubjectOutlier> {
    let means: Vec<f64> = cohort.iter().map(|s| s.mean).collect();
    let Some(cohort_mean) = mean(&means) else {
        return Vec::new();
    };
    // Fewer than two subjects has no spread
    let cohort_sd = sample_std_dev(&means).unwrap_or(0.0);

    let mut scored: Vec<SubjectOutlier> = cohort
        .iter()
        .map(|s| {
            let z_score = if cohort_sd > 0.0 {
                ((s.mean - cohort_mean) / cohort_sd).abs()
            } else {
                0.0
            };
            SubjectOutlier {
                subject_id: s.subject_id.to_string(),
                sex: s.sex,
                mean_metric: s.mean,
                z_score,
                direction: if s.mean > cohort_mean {
                    Direction::High
                } else {
                    Direction::Low
                },
            }
        })
        .collect();

    // Stable: equal scores keep first-appearance order
    scored.sort_by(|a, b| b.z_score.total_cmp(&a.z_score));

    let above = scored
        .iter()
        .take_while(|s| s.z_score > OUTLIER_Z_THRESHOLD)
        .count();
    let keep = if above < MIN_OUTLIERS { MIN_OUTLIERS } else { above };
    scored.truncate(keep.min(MAX_OUTLIERS));
    scored
}
