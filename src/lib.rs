//! Murine Flux - Deterministic compute core for mouse cohort telemetry
//!
//! Flux turns four minute-resolution tables (female/male × activity/temperature)
//! into a normalized event stream annotated with day, light phase and estrus
//! phase, then derives the views a visualization shell renders: an hour-by-day
//! activity grid, per-sex outlier rankings and rolling cohort bands.
//!
//! Pipeline: table source → normalization → event stream → filters →
//! aggregation. Every stage after loading is a pure, synchronous function.

pub mod adapters;
pub mod cohort;
pub mod config;
pub mod error;
pub mod filter;
pub mod heatmap;
pub mod normalizer;
pub mod outliers;
pub mod pipeline;
pub mod schema;
pub mod stats;
pub mod types;
pub mod views;

pub use adapters::{CsvTableSource, TableFiles, TableSource};
pub use cohort::{rolling_cohort, CohortAggregator};
pub use config::AnalysisConfig;
pub use error::ComputeError;
pub use filter::{EstrusFilter, EventFilter, LightFilter, SexFilter};
pub use heatmap::aggregate_hourly;
pub use normalizer::{normalize_tables, Normalizer};
pub use outliers::identify_outliers;
pub use pipeline::{load_stream, AnalysisSession};
pub use schema::{RawTable, TableKind, TableSet};
pub use types::{Event, EventStream, Metric, Sex};

/// Flux version reported by the CLI
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "murine-flux";
