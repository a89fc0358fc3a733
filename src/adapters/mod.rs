//! Raw table sources
//!
//! This module provides sources that supply the four subject tables the
//! normalizer consumes. A source either returns all four tables or fails the
//! whole load.

mod csv;

pub use self::csv::{CsvTableSource, TableFiles};

use crate::error::ComputeError;
use crate::schema::TableSet;

/// Trait for anything that can supply the four raw tables of a recording
pub trait TableSource {
    /// Load all four tables; any failure aborts the load
    fn load(&self) -> Result<TableSet, ComputeError>;
}

/// Already-parsed tables act as their own source
impl TableSource for TableSet {
    fn load(&self) -> Result<TableSet, ComputeError> {
        Ok(self.clone())
    }
}
