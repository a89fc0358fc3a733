//! Pipeline orchestration
//!
//! This module provides the stateful entry point for Murine Flux. An
//! `AnalysisSession` owns the current event stream and the configuration, and
//! runs the views against them:
//!
//! 1. TableSource - Load the four raw tables
//! 2. Normalizer - Build the event stream
//! 3. EventFilter - Select events for filtered views
//! 4. Aggregation - Hourly grid, outlier ranking, cohort bands, summaries

use crate::adapters::TableSource;
use crate::cohort::CohortAggregator;
use crate::config::AnalysisConfig;
use crate::error::ComputeError;
use crate::heatmap::aggregate_hourly;
use crate::outliers::identify_outliers;
use crate::schema::TableSet;
use crate::stats::{summarize, DatasetSummary};
use crate::types::{CohortComparison, Event, EventStream, HourlyBucket, Metric, OutlierReport};
use crate::views::{scatter_points, subject_series, ScatterPoint, SubjectSeries};

/// Load a source and normalize it with the given configuration (stateless, one-shot)
pub fn load_stream(
    source: &dyn TableSource,
    config: &AnalysisConfig,
) -> Result<EventStream, ComputeError> {
    config.validate()?;
    let normalizer = config.normalizer()?;
    let tables = source.load()?;
    Ok(normalizer.normalize(&tables))
}

/// Owner of the current event stream.
///
/// A failed load leaves the previous stream in place; a successful load
/// replaces it wholesale. All views are recomputed from the stream on each
/// call and never modify it.
#[derive(Debug, Clone, Default)]
pub struct AnalysisSession {
    config: AnalysisConfig,
    stream: Option<EventStream>,
}

impl AnalysisSession {
    /// Create a session with default settings and no data
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with a specific configuration
    pub fn with_config(config: AnalysisConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            stream: None,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Replace the configuration.
    ///
    /// Filter, metric and window changes apply to the next view; stride and
    /// light convention changes apply to the next load.
    pub fn set_config(&mut self, config: AnalysisConfig) -> Result<(), ComputeError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Load tables from a source and replace the current stream
    pub fn load(&mut self, source: &dyn TableSource) -> Result<&EventStream, ComputeError> {
        let stream = load_stream(source, &self.config).map_err(|e| {
            tracing::warn!(error = %e, "load failed; keeping previous dataset");
            e
        })?;
        Ok(self.replace(stream))
    }

    /// Normalize already-parsed tables and replace the current stream
    pub fn load_tables(&mut self, tables: &TableSet) -> Result<&EventStream, ComputeError> {
        self.load(tables)
    }

    fn replace(&mut self, stream: EventStream) -> &EventStream {
        let quality = stream.quality();
        tracing::info!(
            load_id = %stream.load_id(),
            events = stream.len(),
            skipped = quality.skipped(),
            female_subjects = quality.female_subjects,
            male_subjects = quality.male_subjects,
            stride = stream.stride_minutes(),
            "dataset loaded"
        );
        self.stream.insert(stream)
    }

    /// Current stream; fails when nothing has been loaded
    pub fn stream(&self) -> Result<&EventStream, ComputeError> {
        self.stream.as_ref().ok_or(ComputeError::NoDataset)
    }

    pub fn is_loaded(&self) -> bool {
        self.stream.is_some()
    }

    /// Events matching the configured sex, estrus and light filters
    pub fn filtered(&self) -> Result<Vec<&Event>, ComputeError> {
        let stream = self.stream()?;
        Ok(self.config.event_filter().apply(stream.events()))
    }

    /// Day × hour activity grid over the filtered events
    pub fn hourly(&self) -> Result<Vec<HourlyBucket>, ComputeError> {
        Ok(aggregate_hourly(self.filtered()?))
    }

    /// Outlier ranking for the configured metric over the full stream
    pub fn outliers(&self) -> Result<OutlierReport, ComputeError> {
        self.outliers_for(self.config.metric)
    }

    /// Outlier ranking for an explicit metric over the full stream
    pub fn outliers_for(&self, metric: Metric) -> Result<OutlierReport, ComputeError> {
        Ok(identify_outliers(self.stream()?.events(), metric))
    }

    /// Cohort bands for the configured metric, window and selected subject
    pub fn cohort(&self) -> Result<CohortComparison, ComputeError> {
        let stream = self.stream()?;
        let aggregator = CohortAggregator::new(self.config.metric, self.config.time_window_hours)?
            .with_recording_start(self.config.recording_start);
        Ok(aggregator.aggregate(
            stream.events(),
            self.config.selected_subject_id.as_deref(),
        ))
    }

    /// Summary statistics over the full stream
    pub fn summary(&self) -> Result<DatasetSummary, ComputeError> {
        Ok(summarize(self.stream()?.events()))
    }

    /// Scatter points over the filtered events
    pub fn scatter(&self) -> Result<Vec<ScatterPoint>, ComputeError> {
        Ok(scatter_points(self.filtered()?))
    }

    /// Per-subject series of the configured metric over the filtered events
    pub fn series(&self) -> Result<Vec<SubjectSeries>, ComputeError> {
        Ok(subject_series(self.filtered()?, self.config.metric))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{EstrusFilter, SexFilter};
    use crate::schema::RawTable;
    use crate::types::Sex;

    /// Two days at full resolution, three subjects per sex
    fn sample_tables() -> TableSet {
        let rows = 2 * 1440;
        let column = |id: &str, f: &dyn Fn(usize) -> f64| -> (String, Vec<f64>) {
            (id.to_string(), (0..rows).map(f).collect())
        };
        TableSet {
            female_activity: RawTable::from_columns(vec![
                column("f1", &|r| (r % 50) as f64),
                column("f2", &|r| (r % 30) as f64),
                column("f3", &|_| 90.0),
            ]),
            female_temperature: RawTable::from_columns(vec![
                column("f1", &|_| 37.0),
                column("f2", &|_| 37.4),
                column("f3", &|_| 38.5),
            ]),
            male_activity: RawTable::from_columns(vec![
                column("m1", &|r| (r % 20) as f64),
                column("m2", &|_| 5.0),
                column("m3", &|_| 6.0),
            ]),
            male_temperature: RawTable::from_columns(vec![
                column("m1", &|_| 36.0),
                column("m2", &|_| 36.2),
                column("m3", &|_| 36.1),
            ]),
        }
    }

    struct FailingSource;

    impl TableSource for FailingSource {
        fn load(&self) -> Result<TableSet, ComputeError> {
            Err(ComputeError::load("female_activity", "connection reset"))
        }
    }

    #[test]
    fn test_views_require_dataset() {
        let session = AnalysisSession::new();
        assert!(!session.is_loaded());
        assert!(matches!(session.hourly(), Err(ComputeError::NoDataset)));
        assert!(matches!(session.cohort(), Err(ComputeError::NoDataset)));
    }

    #[test]
    fn test_load_and_views() {
        let mut session = AnalysisSession::new();
        let stream = session.load_tables(&sample_tables()).unwrap();
        // 48 sampled minutes × 6 subjects
        assert_eq!(stream.len(), 48 * 6);

        let grid = session.hourly().unwrap();
        assert_eq!(grid.len(), 14 * 24);
        assert_eq!(grid.iter().filter(|b| b.event_count > 0).count(), 48);

        let outliers = session.outliers_for(Metric::Temperature).unwrap();
        assert_eq!(outliers.female[0].subject_id, "f3");
        assert_eq!(outliers.male.len(), 3);

        let summary = session.summary().unwrap();
        assert_eq!(summary.female_subjects, 3);
        assert_eq!(summary.male_subjects, 3);

        let series = session.series().unwrap();
        assert_eq!(series.len(), 6);
        assert_eq!(session.scatter().unwrap().len(), 48 * 6);
    }

    #[test]
    fn test_failed_load_keeps_previous_stream() {
        let mut session = AnalysisSession::new();
        let first_id = session.load_tables(&sample_tables()).unwrap().load_id();

        let err = session.load(&FailingSource).unwrap_err();
        assert!(matches!(err, ComputeError::LoadError { .. }));
        assert_eq!(session.stream().unwrap().load_id(), first_id);
    }

    #[test]
    fn test_reload_replaces_stream() {
        let mut session = AnalysisSession::new();
        let first_id = session.load_tables(&sample_tables()).unwrap().load_id();

        let mut config = session.config().clone();
        config.sampling_stride_minutes = 720;
        session.set_config(config).unwrap();
        let stream = session.load_tables(&sample_tables()).unwrap();

        assert_ne!(stream.load_id(), first_id);
        assert_eq!(stream.len(), 4 * 6);
    }

    #[test]
    fn test_filters_from_config() {
        let config = AnalysisConfig {
            sex_filter: SexFilter::Female,
            estrus_filter: EstrusFilter::Estrus,
            ..Default::default()
        };
        let mut session = AnalysisSession::with_config(config).unwrap();
        session.load_tables(&sample_tables()).unwrap();

        let filtered = session.filtered().unwrap();
        assert_eq!(filtered.len(), 24 * 3);
        assert!(filtered.iter().all(|e| e.sex == Sex::Female && e.day == 2));
    }

    #[test]
    fn test_cohort_with_selected_subject() {
        let config = AnalysisConfig {
            metric: Metric::Temperature,
            time_window_hours: 12,
            selected_subject_id: Some("m1".to_string()),
            ..Default::default()
        };
        let mut session = AnalysisSession::with_config(config).unwrap();
        session.load_tables(&sample_tables()).unwrap();

        let comparison = session.cohort().unwrap();
        // max minute 2820, cutoff 2100: hours 35..=47
        assert_eq!(comparison.cutoff_minute, 2100);
        assert_eq!(comparison.male.len(), 13);
        assert_eq!(comparison.female.len(), 13);
        let overlay = comparison.selected_subject_series.unwrap();
        assert_eq!(overlay.len(), 13);
        assert!(overlay.iter().all(|e| e.subject_id == "m1"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig {
            time_window_hours: 0,
            ..Default::default()
        };
        assert!(matches!(
            AnalysisSession::with_config(config),
            Err(ComputeError::InvalidConfig(_))
        ));
    }
}
