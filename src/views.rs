//! Renderer inputs
//!
//! Shapes consumed by the scatter and per-subject line views. They carry no
//! presentation details; axis ranges and colours are left to the renderer.

use crate::types::{Event, Metric, Sex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One point of the activity/temperature scatter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub subject_id: String,
    pub sex: Sex,
    pub activity: f64,
    pub temperature: f64,
    pub elapsed_minute: u32,
}

/// One sample of a subject's time series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub elapsed_minute: u32,
    pub value: f64,
}

/// Time series of one metric for one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSeries {
    pub subject_id: String,
    pub sex: Sex,
    pub metric: Metric,
    pub points: Vec<SeriesPoint>,
}

pub fn scatter_points<'a, I>(events: I) -> Vec<ScatterPoint>
where
    I: IntoIterator<Item = &'a Event>,
{
    events
        .into_iter()
        .map(|e| ScatterPoint {
            subject_id: e.subject_id.clone(),
            sex: e.sex,
            activity: e.activity,
            temperature: e.temperature,
            elapsed_minute: e.elapsed_minute,
        })
        .collect()
}

/// One series per subject in order of first appearance, points sorted by time
pub fn subject_series<'a, I>(events: I, metric: Metric) -> Vec<SubjectSeries>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut series: Vec<SubjectSeries> = Vec::new();

    for event in events {
        let slot = *index.entry(event.subject_id.as_str()).or_insert_with(|| {
            series.push(SubjectSeries {
                subject_id: event.subject_id.clone(),
                sex: event.sex,
                metric,
                points: Vec::new(),
            });
            series.len() - 1
        });
        series[slot].points.push(SeriesPoint {
            elapsed_minute: event.elapsed_minute,
            value: metric.value(event),
        });
    }

    for s in &mut series {
        s.points.sort_by_key(|p| p.elapsed_minute);
    }
    series
}
