//! Event selection
//!
//! Filters are applied to a borrowed stream before it is handed to an
//! aggregation or a renderer. They never modify the stream.

use crate::error::ComputeError;
use crate::types::{Event, LightPhase, Sex};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Cohort selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SexFilter {
    #[default]
    All,
    Male,
    Female,
}

impl SexFilter {
    pub fn matches(&self, sex: Sex) -> bool {
        match self {
            SexFilter::All => true,
            SexFilter::Male => sex == Sex::Male,
            SexFilter::Female => sex == Sex::Female,
        }
    }
}

impl FromStr for SexFilter {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(SexFilter::All),
            "male" => Ok(SexFilter::Male),
            "female" => Ok(SexFilter::Female),
            other => Err(ComputeError::UnknownFilter(other.to_string())),
        }
    }
}

/// Estrus selection; only meaningful for females
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstrusFilter {
    #[default]
    All,
    Estrus,
    NonEstrus,
}

impl EstrusFilter {
    pub fn matches(&self, estrus: bool) -> bool {
        match self {
            EstrusFilter::All => true,
            EstrusFilter::Estrus => estrus,
            EstrusFilter::NonEstrus => !estrus,
        }
    }
}

impl FromStr for EstrusFilter {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(EstrusFilter::All),
            "estrus" => Ok(EstrusFilter::Estrus),
            "non_estrus" | "non-estrus" => Ok(EstrusFilter::NonEstrus),
            other => Err(ComputeError::UnknownFilter(other.to_string())),
        }
    }
}

/// Light phase selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightFilter {
    #[default]
    All,
    On,
    Off,
}

impl LightFilter {
    pub fn matches(&self, phase: LightPhase) -> bool {
        match self {
            LightFilter::All => true,
            LightFilter::On => phase == LightPhase::On,
            LightFilter::Off => phase == LightPhase::Off,
        }
    }
}

impl FromStr for LightFilter {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(LightFilter::All),
            "on" => Ok(LightFilter::On),
            "off" => Ok(LightFilter::Off),
            other => Err(ComputeError::UnknownFilter(other.to_string())),
        }
    }
}

/// Combined selection over sex, estrus, light phase and subject
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventFilter {
    pub sex: SexFilter,
    pub estrus: EstrusFilter,
    pub light: LightFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
}

impl EventFilter {
    pub fn by_sex(sex: SexFilter) -> Self {
        Self {
            sex,
            ..Default::default()
        }
    }

    /// The estrus selection only takes effect when the sex filter is `Female`
    pub fn matches(&self, event: &Event) -> bool {
        self.sex.matches(event.sex)
            && (self.sex != SexFilter::Female || self.estrus.matches(event.estrus))
            && self.light.matches(event.light_phase)
            && self
                .subject_id
                .as_deref()
                .map_or(true, |id| event.subject_id == id)
    }

    /// Borrow the matching events in stream order
    pub fn apply<'a>(&self, events: &'a [Event]) -> Vec<&'a Event> {
        events.iter().filter(|e| self.matches(e)).collect()
    }
}
