//! Raw table schema
//!
//! This module defines the tabular input the normalizer consumes: four
//! minute-resolution tables (one column per subject) for each sex and metric.

mod table;

pub use table::*;
