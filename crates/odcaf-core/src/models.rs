//! Data types shared by the index, the query engine, and the formatter.
//!
//! Field names serialize in camelCase so the JSON shapes match what widget
//! and REST consumers of the dataset expect.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the ODCAF dataset.
///
/// Records are built once by [`crate::parse::parse_record`] and never
/// mutated afterwards. `province` is always upper-case and `facility_type`
/// always lower-case, so matching never has to re-normalize them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityRecord {
    /// Value of the dataset's own `Index` column. Unique.
    pub id: i64,
    pub name: String,
    /// Type string exactly as the contributing source wrote it.
    pub source_facility_type: String,
    /// Normalized ODCAF type, lower-cased.
    pub facility_type: String,
    pub provider: String,
    pub unit: String,
    pub street_no: String,
    pub street_name: String,
    /// `None` when the column was empty or held the `..` unknown marker.
    pub postal_code: Option<String>,
    pub city: String,
    /// Two-letter province/territory code, upper-cased.
    pub province: String,
    pub source_format_address: String,
    pub csd_name: String,
    pub csduid: String,
    pub pruid: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl FacilityRecord {
    /// Street number and name joined by a space, skipping empty parts.
    ///
    /// Falls back to the source-formatted address when both are empty.
    pub fn street_address(&self) -> Option<String> {
        let joined = [self.street_no.as_str(), self.street_name.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if !joined.is_empty() {
            Some(joined)
        } else if !self.source_format_address.is_empty() {
            Some(self.source_format_address.clone())
        } else {
            None
        }
    }

    /// Both coordinates, when the record has both.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Lightweight projection used in result previews.
    pub fn preview(&self) -> FacilityPreview {
        FacilityPreview {
            id: self.id,
            name: self.name.clone(),
            facility_type: self.facility_type.clone(),
            city: self.city.clone(),
            province: self.province.clone(),
        }
    }
}

/// Preview row: identifier, name, normalized type, city, province.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityPreview {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub facility_type: String,
    pub city: String,
    pub province: String,
}

/// Output of `search` and `filter`.
///
/// `ids` holds the full match set in dataset order; `preview` is its
/// first `limit` entries. `preview.len() <= total_count` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub ids: Vec<i64>,
    pub total_count: usize,
    pub preview: Vec<FacilityPreview>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// True when the preview was cut short of the full match set.
    pub fn is_truncated(&self) -> bool {
        self.preview.len() < self.total_count
    }
}

/// A single record plus its rendered markdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub id: i64,
    pub facility: FacilityRecord,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvinceCount {
    pub code: String,
    pub count: usize,
}

/// `city` is the `"City, PR"` display key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityCount {
    pub city: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResult {
    pub total_facilities: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_province: BTreeMap<String, usize>,
    pub top_cities: Vec<CityCount>,
}
