//! Core types for the Murine Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: normalized events, the event stream that owns them, and the
//! aggregation outputs handed to renderers.

use crate::error::ComputeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Minutes in one recorded day
pub const MINUTES_PER_DAY: u32 = 1440;

/// Minutes in one hour
pub const MINUTES_PER_HOUR: u32 = 60;

/// Length of the estrus cycle in days
pub const ESTRUS_CYCLE_DAYS: i64 = 4;

/// First day (1-based) on which females are in estrus
pub const ESTRUS_FIRST_DAY: i64 = 2;

/// Sex of a subject, taken from the table pair the sample came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Female => "female",
            Sex::Male => "male",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the room lights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightPhase {
    Off,
    On,
}

/// Rule used to decide whether lights are on at a given minute of day.
///
/// The two conventions disagree for minutes 360-719 and 1080-1439; only one
/// should be used for a given dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightPhaseConvention {
    /// Off for minutes [0, 720), on for [720, 1440)
    #[default]
    HalfDay,
    /// On for minutes [360, 1080), i.e. 6am to 6pm on the wall clock
    ClockSixToSix,
}

impl LightPhaseConvention {
    /// Light phase for a minute of day (0..1440)
    pub fn phase_at(&self, minute_of_day: u32) -> LightPhase {
        let on = match self {
            LightPhaseConvention::HalfDay => minute_of_day >= MINUTES_PER_DAY / 2,
            LightPhaseConvention::ClockSixToSix => (360..1080).contains(&minute_of_day),
        };
        if on {
            LightPhase::On
        } else {
            LightPhase::Off
        }
    }
}

impl FromStr for LightPhaseConvention {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "half_day" | "half-day" => Ok(LightPhaseConvention::HalfDay),
            "clock_six_to_six" | "clock-six-to-six" | "clock" => {
                Ok(LightPhaseConvention::ClockSixToSix)
            }
            other => Err(ComputeError::UnknownFilter(other.to_string())),
        }
    }
}

/// Metric selectable for outlier ranking and cohort bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Activity,
    Temperature,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Activity => "activity",
            Metric::Temperature => "temperature",
        }
    }

    /// Read this metric from an event
    pub fn value(&self, event: &Event) -> f64 {
        match self {
            Metric::Activity => event.activity,
            Metric::Temperature => event.temperature,
        }
    }
}

impl FromStr for Metric {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "activity" => Ok(Metric::Activity),
            "temperature" => Ok(Metric::Temperature),
            other => Err(ComputeError::UnknownMetric(other.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated (subject, minute) sample with its temporal and biological context.
///
/// Events are only produced by the normalizer and are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Column header of the source tables
    pub subject_id: String,
    pub sex: Sex,
    /// Activity count (finite, >= 0)
    pub activity: f64,
    /// Core temperature (finite, > 0)
    pub temperature: f64,
    /// Row index in the source tables at 1-minute resolution
    pub elapsed_minute: u32,
    /// 1-based day number
    pub day: u32,
    /// Minute within the day (0..1440)
    pub minute_of_day: u32,
    pub light_phase: LightPhase,
    /// Female-only estrus flag; always false for males
    pub estrus: bool,
}

impl Event {
    /// Build an event, deriving day, minute of day, light phase and estrus
    pub fn new(
        subject_id: impl Into<String>,
        sex: Sex,
        activity: f64,
        temperature: f64,
        elapsed_minute: u32,
        convention: LightPhaseConvention,
    ) -> Self {
        let day = day_of(elapsed_minute);
        let minute_of_day = elapsed_minute % MINUTES_PER_DAY;
        Self {
            subject_id: subject_id.into(),
            sex,
            activity,
            temperature,
            elapsed_minute,
            day,
            minute_of_day,
            light_phase: convention.phase_at(minute_of_day),
            estrus: sex == Sex::Female && is_estrus_day(day),
        }
    }

    /// Hour of the day (0..24)
    pub fn hour(&self) -> u32 {
        self.minute_of_day / MINUTES_PER_HOUR
    }
}

/// 1-based day containing an elapsed minute
pub fn day_of(elapsed_minute: u32) -> u32 {
    elapsed_minute / MINUTES_PER_DAY + 1
}

/// Whether a 1-based day falls on the estrus cycle (every 4 days from day 2)
pub fn is_estrus_day(day: u32) -> bool {
    (i64::from(day) - ESTRUS_FIRST_DAY).rem_euclid(ESTRUS_CYCLE_DAYS) == 0
}

/// Why a (subject, minute) pair did not produce an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingReading,
    UnparseableReading,
    NonPositiveTemperature,
    NegativeActivity,
}

/// Ingest accounting for one load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestQuality {
    /// Events emitted
    pub emitted: usize,
    /// Pairs skipped because a row, column or cell was absent
    pub missing_reading: usize,
    /// Pairs skipped because a reading was not a finite number
    pub unparseable_reading: usize,
    /// Pairs skipped because temperature was zero or negative
    pub non_positive_temperature: usize,
    /// Pairs skipped because activity was negative
    pub negative_activity: usize,
    /// Subjects found in the female activity table
    pub female_subjects: usize,
    /// Subjects found in the male activity table
    pub male_subjects: usize,
    /// Rows usable for females (shorter of the two tables)
    pub female_rows: usize,
    /// Rows usable for males (shorter of the two tables)
    pub male_rows: usize,
}

impl IngestQuality {
    pub fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MissingReading => self.missing_reading += 1,
            SkipReason::UnparseableReading => self.unparseable_reading += 1,
            SkipReason::NonPositiveTemperature => self.non_positive_temperature += 1,
            SkipReason::NegativeActivity => self.negative_activity += 1,
        }
    }

    /// Total pairs skipped for any reason
    pub fn skipped(&self) -> usize {
        self.missing_reading
            + self.unparseable_reading
            + self.non_positive_temperature
            + self.negative_activity
    }

    /// Fraction of visited pairs that produced an event (0-1)
    pub fn coverage(&self) -> f64 {
        let visited = self.emitted + self.skipped();
        if visited == 0 {
            return 0.0;
        }
        self.emitted as f64 / visited as f64
    }
}

/// The normalized event stream for one data load.
///
/// Built once by the normalizer; read-only afterwards. A new load produces a
/// new stream rather than modifying this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStream {
    load_id: Uuid,
    loaded_at: DateTime<Utc>,
    stride_minutes: u32,
    quality: IngestQuality,
    events: Vec<Event>,
}

impl EventStream {
    pub(crate) fn new(events: Vec<Event>, stride_minutes: u32, quality: IngestQuality) -> Self {
        Self {
            load_id: Uuid::new_v4(),
            loaded_at: Utc::now(),
            stride_minutes,
            quality,
            events,
        }
    }

    pub fn load_id(&self) -> Uuid {
        self.load_id
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn stride_minutes(&self) -> u32 {
        self.stride_minutes
    }

    pub fn quality(&self) -> &IngestQuality {
        &self.quality
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Latest elapsed minute in the stream, if any
    pub fn max_elapsed_minute(&self) -> Option<u32> {
        max_elapsed_minute(&self.events)
    }

    /// Distinct subject ids in first-seen order
    pub fn subjects(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.events
            .iter()
            .filter(|e| seen.insert(e.subject_id.as_str()))
            .map(|e| e.subject_id.as_str())
            .collect()
    }
}

/// Latest elapsed minute over a slice of events
pub fn max_elapsed_minute(events: &[Event]) -> Option<u32> {
    events.iter().map(|e| e.elapsed_minute).max()
}

/// One cell of the day × hour heatmap grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    /// 1-based day
    pub day: u32,
    /// Hour of day (0-23)
    pub hour: u32,
    /// Mean activity, 0 when the bucket is empty
    pub mean_activity: f64,
    /// Number of events in the bucket
    pub event_count: usize,
}

/// Whether a subject sits above or below its cohort mean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    High,
    Low,
}

/// A subject ranked by distance from its cohort mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectOutlier {
    pub subject_id: String,
    pub sex: Sex,
    /// Subject's mean of the ranked metric
    pub mean_metric: f64,
    /// Absolute z-score against the cohort of subject means
    pub z_score: f64,
    pub direction: Direction,
}

/// Ranked outliers per sex for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub metric: Metric,
    pub male: Vec<SubjectOutlier>,
    pub female: Vec<SubjectOutlier>,
}

/// Cohort statistics for one 5-minute bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortTimeBucket {
    /// Absolute time of the bucket start
    pub timestamp: DateTime<Utc>,
    /// Bucket start as elapsed minute (multiple of 5)
    pub bucket_minute: u32,
    pub mean: f64,
    /// Display-damped standard deviation
    pub std_dev: f64,
    /// Sample standard deviation before damping
    pub raw_std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Number of events in the bucket
    pub count: usize,
    pub sex: Sex,
}

/// Per-sex rolling cohort series with an optional single-subject overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortComparison {
    pub metric: Metric,
    pub window_hours: u32,
    /// Earliest elapsed minute retained (may be negative when the window
    /// reaches past the start of the recording)
    pub cutoff_minute: i64,
    pub male: Vec<CohortTimeBucket>,
    pub female: Vec<CohortTimeBucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_subject_series: Option<Vec<Event>>,
}
