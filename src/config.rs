//! Analysis configuration
//!
//! The settings a front end supplies to the core: sampling stride, event
//! filters, metric, trailing window and selected subject. Values are checked
//! up front so an invalid setting fails at the call instead of producing a
//! silently defaulted view.

use crate::error::ComputeError;
use crate::filter::{EstrusFilter, EventFilter, LightFilter, SexFilter};
use crate::normalizer::{Normalizer, DEFAULT_STRIDE_MINUTES};
use crate::types::{LightPhaseConvention, Metric};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default trailing window for cohort bands, in hours
pub const DEFAULT_WINDOW_HOURS: u32 = 24;

/// Settings consumed by the normalizer and the aggregation views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minutes between sampled rows
    pub sampling_stride_minutes: u32,
    pub sex_filter: SexFilter,
    /// Applies to female events only
    pub estrus_filter: EstrusFilter,
    pub light_filter: LightFilter,
    pub metric: Metric,
    /// Trailing window for cohort bands
    pub time_window_hours: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_subject_id: Option<String>,
    pub light_convention: LightPhaseConvention,
    /// Wall-clock time of elapsed minute 0
    pub recording_start: DateTime<Utc>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sampling_stride_minutes: DEFAULT_STRIDE_MINUTES,
            sex_filter: SexFilter::default(),
            estrus_filter: EstrusFilter::default(),
            light_filter: LightFilter::default(),
            metric: Metric::default(),
            time_window_hours: DEFAULT_WINDOW_HOURS,
            selected_subject_id: None,
            light_convention: LightPhaseConvention::default(),
            recording_start: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings that cannot produce a meaningful view
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.sampling_stride_minutes == 0 {
            return Err(ComputeError::InvalidConfig(
                "sampling_stride_minutes must be greater than 0".to_string(),
            ));
        }
        if self.time_window_hours == 0 {
            return Err(ComputeError::InvalidConfig(
                "time_window_hours must be greater than 0".to_string(),
            ));
        }
        if let Some(id) = &self.selected_subject_id {
            if id.trim().is_empty() {
                return Err(ComputeError::InvalidConfig(
                    "selected_subject_id must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Normalizer built from the stride and light convention
    pub fn normalizer(&self) -> Result<Normalizer, ComputeError> {
        Normalizer::new(self.sampling_stride_minutes, self.light_convention)
    }

    /// Event filter for the heatmap and filtered views.
    ///
    /// The selected subject is not part of it; it only drives the cohort overlay.
    pub fn event_filter(&self) -> EventFilter {
        EventFilter {
            sex: self.sex_filter,
            estrus: self.estrus_filter,
            light: self.light_filter,
            subject_id: None,
        }
    }
}
