//! CSV table source
//!
//! Reads the four spreadsheet exports of a recording from one directory.

use crate::error::ComputeError;
use crate::schema::{RawTable, TableKind, TableSet};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

use super::TableSource;

/// File names of the four exports within a data directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableFiles {
    pub female_activity: String,
    pub female_temperature: String,
    pub male_activity: String,
    pub male_temperature: String,
}

impl Default for TableFiles {
    fn default() -> Self {
        Self {
            female_activity: "Mouse_Data_Student_Copy.xlsx - Fem Act.csv".to_string(),
            female_temperature: "Mouse_Data_Student_Copy.xlsx - Fem Temp.csv".to_string(),
            male_activity: "Mouse_Data_Student_Copy.xlsx - Male Act.csv".to_string(),
            male_temperature: "Mouse_Data_Student_Copy.xlsx - Male Temp.csv".to_string(),
        }
    }
}

impl TableFiles {
    pub fn name(&self, kind: TableKind) -> &str {
        match kind {
            TableKind::FemaleActivity => &self.female_activity,
            TableKind::FemaleTemperature => &self.female_temperature,
            TableKind::MaleActivity => &self.male_activity,
            TableKind::MaleTemperature => &self.male_temperature,
        }
    }
}

/// Loads the four tables from CSV files in a directory
#[derive(Debug, Clone)]
pub struct CsvTableSource {
    dir: PathBuf,
    files: TableFiles,
}

impl CsvTableSource {
    /// Source reading the default export names from `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_files(dir, TableFiles::default())
    }

    pub fn with_files(dir: impl Into<PathBuf>, files: TableFiles) -> Self {
        Self {
            dir: dir.into(),
            files,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of one table's file
    pub fn path(&self, kind: TableKind) -> PathBuf {
        self.dir.join(self.files.name(kind))
    }

    /// Read and parse a single table
    pub fn load_table(&self, kind: TableKind) -> Result<RawTable, ComputeError> {
        let path = self.path(kind);
        let file = File::open(&path)
            .map_err(|e| ComputeError::load(kind.as_str(), format!("{}: {}", path.display(), e)))?;
        RawTable::from_csv_reader(file)
            .map_err(|e| ComputeError::load(kind.as_str(), format!("{}: {}", path.display(), e)))
    }
}

impl TableSource for CsvTableSource {
    fn load(&self) -> Result<TableSet, ComputeError> {
        let mut tables = TableSet::default();
        for kind in TableKind::ALL {
            let table = self.load_table(kind)?;
            tracing::debug!(
                table = %kind,
                rows = table.row_count(),
                columns = table.headers().len(),
                "table loaded"
            );
            tables.set(kind, table);
        }
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_tables(dir: &Path, files: &TableFiles) {
        fs::write(dir.join(&files.female_activity), "f1,f2\n10,20\n11,21\n").unwrap();
        fs::write(dir.join(&files.female_temperature), "f1,f2\n37.1,36.9\n37.2,37.0\n").unwrap();
        fs::write(dir.join(&files.male_activity), "m1\n5\n").unwrap();
        fs::write(dir.join(&files.male_temperature), "m1\n36.5\n").unwrap();
    }

    #[test]
    fn test_load_default_file_names() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(dir.path(), &TableFiles::default());

        let tables = CsvTableSource::new(dir.path()).load().unwrap();
        assert_eq!(tables.female_activity.subject_ids(), vec!["f1", "f2"]);
        assert_eq!(tables.female_temperature.cell(1, "f2"), Some("37.0"));
        assert_eq!(tables.male_activity.row_count(), 1);
    }

    #[test]
    fn test_load_custom_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let files = TableFiles {
            female_activity: "fa.csv".into(),
            female_temperature: "ft.csv".into(),
            male_activity: "ma.csv".into(),
            male_temperature: "mt.csv".into(),
        };
        write_tables(dir.path(), &files);

        let tables = CsvTableSource::with_files(dir.path(), files).load().unwrap();
        assert_eq!(tables.male_temperature.cell(0, "m1"), Some("36.5"));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let files = TableFiles::default();
        write_tables(dir.path(), &files);
        fs::remove_file(dir.path().join(&files.male_temperature)).unwrap();

        let err = CsvTableSource::new(dir.path()).load().unwrap_err();
        match err {
            ComputeError::LoadError { table, .. } => assert_eq!(table, "male_temperature"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_csv_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let files = TableFiles::default();
        write_tables(dir.path(), &files);
        // Row cells must be valid UTF-8
        let path = dir.path().join(&files.female_temperature);
        fs::write(&path, b"f1,f2\n37.1,36.9\n\xff\xfe,37.0\n").unwrap();

        let source = CsvTableSource::new(dir.path());
        match source.load_table(TableKind::FemaleTemperature) {
            Err(ComputeError::LoadError { table, reason }) => {
                assert_eq!(table, "female_temperature");
                assert!(reason.contains(&files.female_temperature));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            source.load(),
            Err(ComputeError::LoadError { table, .. }) if table == "female_temperature"
        ));
    }

    #[test]
    fn test_in_memory_source() {
        let tables = TableSet {
            female_activity: RawTable::from_columns(vec![("f1", vec![1.0])]),
            ..Default::default()
        };
        let loaded = tables.load().unwrap();
        assert_eq!(loaded, tables);
    }
}
