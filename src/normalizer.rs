//! Event normalization
//!
//! This module walks the four raw tables at a sampling stride and emits one
//! validated `Event` per (subject, sampled minute).
//! - Subjects come from each sex's activity table headers
//! - Readings are parsed or skipped, never defaulted
//! - Skipped pairs are counted by reason in `IngestQuality`

use crate::error::ComputeError;
use crate::schema::{RawTable, TableSet};
use crate::types::{Event, EventStream, IngestQuality, LightPhaseConvention, Sex, SkipReason};

/// Default sampling stride in minutes
pub const DEFAULT_STRIDE_MINUTES: u32 = 60;

/// Normalizer for converting raw tables into an event stream
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    stride_minutes: u32,
    convention: LightPhaseConvention,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            stride_minutes: DEFAULT_STRIDE_MINUTES,
            convention: LightPhaseConvention::default(),
        }
    }
}

impl Normalizer {
    /// Create a normalizer; a zero stride is rejected
    pub fn new(
        stride_minutes: u32,
        convention: LightPhaseConvention,
    ) -> Result<Self, ComputeError> {
        if stride_minutes == 0 {
            return Err(ComputeError::InvalidConfig(
                "sampling stride must be at least 1 minute".to_string(),
            ));
        }
        Ok(Self {
            stride_minutes,
            convention,
        })
    }

    pub fn stride_minutes(&self) -> u32 {
        self.stride_minutes
    }

    pub fn convention(&self) -> LightPhaseConvention {
        self.convention
    }

    /// Normalize all four tables into a fresh event stream.
    ///
    /// Female events come first, then male; within a sex events are ordered
    /// by elapsed minute, then by subject header order.
    pub fn normalize(&self, tables: &TableSet) -> EventStream {
        let mut events = Vec::new();
        let mut quality = IngestQuality::default();

        for sex in [Sex::Female, Sex::Male] {
            let (activity, temperature) = tables.pair(sex);
            let (subjects, rows) =
                self.normalize_sex(sex, activity, temperature, &mut events, &mut quality);
            match sex {
                Sex::Female => {
                    quality.female_subjects = subjects;
                    quality.female_rows = rows;
                }
                Sex::Male => {
                    quality.male_subjects = subjects;
                    quality.male_rows = rows;
                }
            }
        }

        quality.emitted = events.len();
        EventStream::new(events, self.stride_minutes, quality)
    }

    /// Returns (subject count, usable row count) for the sex
    fn normalize_sex(
        &self,
        sex: Sex,
        activity: &RawTable,
        temperature: &RawTable,
        events: &mut Vec<Event>,
        quality: &mut IngestQuality,
    ) -> (usize, usize) {
        let subjects = activity.subject_ids();
        // Unequal tables are bounded by the shorter one
        let rows = activity.row_count().min(temperature.row_count());

        for row in (0..rows).step_by(self.stride_minutes as usize) {
            let Ok(elapsed_minute) = u32::try_from(row) else {
                break;
            };
            for subject in &subjects {
                match read_pair(activity, temperature, row, subject) {
                    Ok((act, temp)) => events.push(Event::new(
                        *subject,
                        sex,
                        act,
                        temp,
                        elapsed_minute,
                        self.convention,
                    )),
                    Err(reason) => quality.record_skip(reason),
                }
            }
        }

        (subjects.len(), rows)
    }
}

/// Parse the (activity, temperature) readings for one subject at one row
fn read_pair(
    activity: &RawTable,
    temperature: &RawTable,
    row: usize,
    subject: &str,
) -> Result<(f64, f64), SkipReason> {
    let (Some(act_cell), Some(temp_cell)) = (
        activity.cell(row, subject),
        temperature.cell(row, subject),
    ) else {
        return Err(SkipReason::MissingReading);
    };

    let act = parse_reading(act_cell)?;
    let temp = parse_reading(temp_cell)?;

    if temp <= 0.0 {
        return Err(SkipReason::NonPositiveTemperature);
    }
    if act < 0.0 {
        return Err(SkipReason::NegativeActivity);
    }

    Ok((act, temp))
}

/// Parse a cell as a finite real number
pub fn parse_reading(cell: &str) -> Result<f64, SkipReason> {
    match cell.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(SkipReason::UnparseableReading),
    }
}

/// Normalize tables with a given stride using the default light convention
pub fn normalize_tables(
    tables: &TableSet,
    stride_minutes: u32,
) -> Result<EventStream, ComputeError> {
    Ok(Normalizer::new(stride_minutes, LightPhaseConvention::default())?.normalize(tables))
}
