//! Record parser for the ODCAF CSV export.
//!
//! The dialect is deliberately small: a double quote toggles "inside a
//! quoted field", a comma separates fields only outside quotes, and every
//! field is trimmed after extraction. A doubled quote (`""`) inside a
//! quoted field is read as one literal quote; the reference export never
//! contains one, so this only widens what is accepted.
//!
//! Columns are looked up by header name, so reordered exports still parse.
//! A column missing from the header reads as the empty string.

use std::collections::HashMap;

use crate::models::FacilityRecord;

pub const COL_INDEX: &str = "Index";
pub const COL_NAME: &str = "Facility_Name";
pub const COL_SOURCE_TYPE: &str = "Source_Facility_Type";
pub const COL_TYPE: &str = "ODCAF_Facility_Type";
pub const COL_PROVIDER: &str = "Provider";
pub const COL_UNIT: &str = "Unit";
pub const COL_STREET_NO: &str = "Street_No";
pub const COL_STREET_NAME: &str = "Street_Name";
pub const COL_POSTAL_CODE: &str = "Postal_Code";
pub const COL_CITY: &str = "City";
pub const COL_PROVINCE: &str = "Prov_Terr";
pub const COL_SOURCE_ADDRESS: &str = "Source_Format_Address";
pub const COL_CSD_NAME: &str = "CSD_Name";
pub const COL_CSDUID: &str = "CSDUID";
pub const COL_PRUID: &str = "PRUID";
pub const COL_LATITUDE: &str = "Latitude";
pub const COL_LONGITUDE: &str = "Longitude";

/// Postal code value the dataset uses for "unknown".
pub const UNKNOWN_MARKER: &str = "..";

/// Split one line into trimmed fields.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    fields.push(current.trim().to_string());
    fields
}

/// Column name → position, built from the header line.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    positions: HashMap<String, usize>,
    width: usize,
}

impl HeaderMap {
    pub fn from_fields(fields: &[String]) -> Self {
        let positions = fields
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();
        Self {
            positions,
            width: fields.len(),
        }
    }

    pub fn from_line(line: &str) -> Self {
        Self::from_fields(&split_line(line))
    }

    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Number of columns in the header.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Value of `column` in `values`, or `""` when the column is unknown
    /// or the row is too short to hold it.
    pub fn get<'a>(&self, values: &'a [String], column: &str) -> &'a str {
        self.positions
            .get(column)
            .and_then(|&idx| values.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Parse a leading integer the way the export's `Index` column is read:
/// optional sign, then digits, ignoring anything after them.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let digits_start = usize::from(s.starts_with(['-', '+']));
    let digits_len = s[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    s[..digits_start + digits_len].parse().ok()
}

/// Parse a coordinate. Anything that is not a finite number is absent.
fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn optional_postal_code(raw: &str) -> Option<String> {
    if raw.is_empty() || raw == UNKNOWN_MARKER {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Build a record from already-split fields.
///
/// Returns `None` when the identifier column does not hold an integer;
/// such rows are dropped by the loader without failing the load.
pub fn parse_record(values: &[String], header: &HeaderMap) -> Option<FacilityRecord> {
    let get = |column: &str| header.get(values, column);

    let id = parse_leading_int(get(COL_INDEX))?;

    Some(FacilityRecord {
        id,
        name: get(COL_NAME).to_string(),
        source_facility_type: get(COL_SOURCE_TYPE).to_string(),
        facility_type: get(COL_TYPE).to_lowercase(),
        provider: get(COL_PROVIDER).to_string(),
        unit: get(COL_UNIT).to_string(),
        street_no: get(COL_STREET_NO).to_string(),
        street_name: get(COL_STREET_NAME).to_string(),
        postal_code: optional_postal_code(get(COL_POSTAL_CODE)),
        city: get(COL_CITY).to_string(),
        province: get(COL_PROVINCE).to_uppercase(),
        source_format_address: get(COL_SOURCE_ADDRESS).to_string(),
        csd_name: get(COL_CSD_NAME).to_string(),
        csduid: get(COL_CSDUID).to_string(),
        pruid: get(COL_PRUID).to_string(),
        latitude: parse_coordinate(get(COL_LATITUDE)),
        longitude: parse_coordinate(get(COL_LONGITUDE)),
    })
}

/// Split and parse a single data line.
pub fn parse_line(line: &str, header: &HeaderMap) -> Option<FacilityRecord> {
    parse_record(&split_line(line), header)
}
