//! Minute-resolution subject tables
//!
//! A `RawTable` is a header row of subject identifiers followed by one row per
//! elapsed minute. Cells are kept as the strings the reader produced; numeric
//! parsing happens in the normalizer so malformed readings can be skipped
//! rather than coerced.

use crate::types::Sex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io;

/// Header names that mark a row-index column rather than a subject
const INDEX_HEADERS: [&str; 1] = ["index"];

/// Which of the four input tables a `RawTable` holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    FemaleActivity,
    FemaleTemperature,
    MaleActivity,
    MaleTemperature,
}

impl TableKind {
    pub const ALL: [TableKind; 4] = [
        TableKind::FemaleActivity,
        TableKind::FemaleTemperature,
        TableKind::MaleActivity,
        TableKind::MaleTemperature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::FemaleActivity => "female_activity",
            TableKind::FemaleTemperature => "female_temperature",
            TableKind::MaleActivity => "male_activity",
            TableKind::MaleTemperature => "male_temperature",
        }
    }

    pub fn sex(&self) -> Sex {
        match self {
            TableKind::FemaleActivity | TableKind::FemaleTemperature => Sex::Female,
            TableKind::MaleActivity | TableKind::MaleTemperature => Sex::Male,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed table: subject headers and string cells indexed by elapsed minute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    columns: HashMap<String, usize>,
}

impl RawTable {
    /// Build a table from a header row and data rows.
    ///
    /// Rows may be shorter than the header; absent cells read as missing.
    /// When a header repeats, the first column wins.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut columns = HashMap::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            columns.entry(header.trim().to_string()).or_insert(idx);
        }
        Self {
            headers,
            rows,
            columns,
        }
    }

    /// Build a table column by column, padding short columns with empty cells
    pub fn from_columns<I, K, V>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: Into<String>,
        V: ToString,
    {
        let (headers, cells): (Vec<String>, Vec<Vec<String>>) = columns
            .into_iter()
            .map(|(name, values)| (name.into(), values.iter().map(|v| v.to_string()).collect()))
            .unzip();

        let row_count = cells.iter().map(Vec::len).max().unwrap_or(0);
        let rows = (0..row_count)
            .map(|row| {
                cells
                    .iter()
                    .map(|col| col.get(row).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        Self::new(headers, rows)
    }

    /// Parse CSV text whose first line is the subject header row
    pub fn from_csv_reader<R: io::Read>(reader: R) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self::new(headers, rows))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows (elapsed minutes)
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Subject identifiers in header order, without blank or index columns
    pub fn subject_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::with_capacity(self.headers.len());
        for header in &self.headers {
            let id = header.trim();
            if id.is_empty()
                || INDEX_HEADERS.iter().any(|h| id.eq_ignore_ascii_case(h))
                || ids.contains(&id)
            {
                continue;
            }
            ids.push(id);
        }
        ids
    }

    pub fn has_subject(&self, subject_id: &str) -> bool {
        self.columns.contains_key(subject_id)
    }

    /// Cell for a subject at a row; `None` when the row, column or value is absent
    pub fn cell(&self, row: usize, subject_id: &str) -> Option<&str> {
        let col = *self.columns.get(subject_id)?;
        let value = self.rows.get(row)?.get(col)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// The four tables of one recording
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet {
    pub female_activity: RawTable,
    pub female_temperature: RawTable,
    pub male_activity: RawTable,
    pub male_temperature: RawTable,
}

impl TableSet {
    pub fn get(&self, kind: TableKind) -> &RawTable {
        match kind {
            TableKind::FemaleActivity => &self.female_activity,
            TableKind::FemaleTemperature => &self.female_temperature,
            TableKind::MaleActivity => &self.male_activity,
            TableKind::MaleTemperature => &self.male_temperature,
        }
    }

    pub fn set(&mut self, kind: TableKind, table: RawTable) {
        match kind {
            TableKind::FemaleActivity => self.female_activity = table,
            TableKind::FemaleTemperature => self.female_temperature = table,
            TableKind::MaleActivity => self.male_activity = table,
            TableKind::MaleTemperature => self.male_temperature = table,
        }
    }

    /// (activity, temperature) tables for a sex
    pub fn pair(&self, sex: Sex) -> (&RawTable, &RawTable) {
        match sex {
            Sex::Female => (&self.female_activity, &self.female_temperature),
            Sex::Male => (&self.male_activity, &self.male_temperature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_ids_skip_blank_and_index() {
        let table = RawTable::new(
            vec!["".into(), "index".into(), "f1".into(), "f2".into(), "f1".into()],
            vec![],
        );
        assert_eq!(table.subject_ids(), vec!["f1", "f2"]);
    }

    #[test]
    fn test_cell_lookup_tolerates_ragged_rows() {
        let table = RawTable::new(
            vec!["f1".into(), "f2".into()],
            vec![vec!["1".into(), "2".into()], vec!["3".into()], vec!["".into(), " ".into()]],
        );
        assert_eq!(table.cell(0, "f2"), Some("2"));
        assert_eq!(table.cell(1, "f2"), None);
        assert_eq!(table.cell(2, "f1"), None);
        assert_eq!(table.cell(2, "f2"), None);
        assert_eq!(table.cell(9, "f1"), None);
        assert_eq!(table.cell(0, "m1"), None);
    }

    #[test]
    fn test_from_columns_pads_short_columns() {
        let table = RawTable::from_columns(vec![("f1", vec![1.0, 2.0, 3.0]), ("f2", vec![4.0])]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.cell(2, "f1"), Some("3"));
        assert_eq!(table.cell(1, "f2"), None);
    }

    #[test]
    fn test_from_csv_reader() {
        let csv = "f1,f2,f3\n10,20,30\n11,,31\n12,22\n";
        let table = RawTable::from_csv_reader(csv.as_bytes()).unwrap();

        assert_eq!(table.subject_ids(), vec!["f1", "f2", "f3"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.cell(1, "f2"), None);
        assert_eq!(table.cell(2, "f2"), Some("22"));
        assert_eq!(table.cell(2, "f3"), None);
    }

    #[test]
    fn test_header_only_csv_is_empty() {
        let table = RawTable::from_csv_reader("m1,m2\n".as_bytes()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.subject_ids(), vec!["m1", "m2"]);
    }

    #[test]
    fn test_table_set_pairs_by_sex() {
        let mut tables = TableSet::default();
        tables.set(
            TableKind::MaleTemperature,
            RawTable::from_columns(vec![("m1", vec![37.0])]),
        );
        let (activity, temperature) = tables.pair(Sex::Male);
        assert!(activity.is_empty());
        assert_eq!(temperature.cell(0, "m1"), Some("37"));
        assert_eq!(TableKind::MaleTemperature.sex(), Sex::Male);
    }
}
