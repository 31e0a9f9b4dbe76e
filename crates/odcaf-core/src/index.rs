//! Immutable in-memory dataset index.
//!
//! Built once from the full text of the source file. Holds the records in
//! file order (so pagination and truncation are deterministic) alongside an
//! identifier map for O(1) point lookups. There is no mutation API: share
//! the index behind an `Arc` and read it from as many tasks as needed.

use std::collections::HashMap;

use crate::error::LoadError;
use crate::models::FacilityRecord;
use crate::parse::{self, HeaderMap};

#[derive(Debug, Clone, Default)]
pub struct DatasetIndex {
    records: Vec<FacilityRecord>,
    by_id: HashMap<i64, usize>,
    skipped_rows: usize,
}

impl DatasetIndex {
    /// Parse an entire CSV export.
    ///
    /// Blank lines are ignored. The first non-blank line is the header and
    /// must name the `Index` column. Data rows are skipped (and counted)
    /// when they have fewer fields than the header, when their identifier
    /// is not an integer, or when their identifier repeats an earlier row.
    pub fn from_csv_str(text: &str) -> Result<Self, LoadError> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());

        let header_line = lines.next().ok_or(LoadError::MissingHeader)?;
        let header = HeaderMap::from_line(header_line.trim_start_matches('\u{feff}'));
        if !header.contains(parse::COL_INDEX) {
            return Err(LoadError::MissingColumn(parse::COL_INDEX));
        }

        let mut index = DatasetIndex::default();
        for line in lines {
            let values = parse::split_line(line);
            if values.len() < header.width() {
                index.skipped_rows += 1;
                continue;
            }
            match parse::parse_record(&values, &header) {
                Some(record) => {
                    if !index.insert(record) {
                        index.skipped_rows += 1;
                    }
                }
                None => index.skipped_rows += 1,
            }
        }

        Ok(index)
    }

    /// Build an index from already-constructed records, keeping the first
    /// record for any repeated identifier.
    pub fn from_records(records: impl IntoIterator<Item = FacilityRecord>) -> Self {
        let mut index = DatasetIndex::default();
        for record in records {
            if !index.insert(record) {
                index.skipped_rows += 1;
            }
        }
        index
    }

    fn insert(&mut self, record: FacilityRecord) -> bool {
        if self.by_id.contains_key(&record.id) {
            return false;
        }
        self.by_id.insert(record.id, self.records.len());
        self.records.push(record);
        true
    }

    /// All records in source order.
    pub fn records(&self) -> &[FacilityRecord] {
        &self.records
    }

    pub fn get(&self, id: i64) -> Option<&FacilityRecord> {
        self.by_id.get(&id).map(|&pos| &self.records[pos])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows dropped during [`from_csv_str`](Self::from_csv_str).
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}
