//! Query engine over a [`DatasetIndex`].
//!
//! Every function here is a synchronous, read-only scan that allocates
//! only its own result. Results always follow dataset order; nothing is
//! ranked by relevance.
//!
//! | Function | Result |
//! |----------|--------|
//! | [`search`] | multi-term AND substring match over name/city/type/province/subdivision |
//! | [`filter`] | structured province / city / type match |
//! | [`fetch`] | point lookup by identifier |
//! | [`list_types`] | distinct normalized types, ascending |
//! | [`list_provinces`] | province codes with counts, descending |
//! | [`stats`] | totals, per-type, per-province, top cities |

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::format;
use crate::index::DatasetIndex;
use crate::models::{
    CityCount, FacilityRecord, FetchResult, ProvinceCount, QueryResult, StatsResult,
};

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const DEFAULT_FILTER_LIMIT: usize = 50;
pub const TOP_CITIES: usize = 10;

/// Structured filter criteria. Absent criteria do not constrain the match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_type: Option<String>,
}

impl FilterCriteria {
    /// Drop criteria that are empty or whitespace-only and trim the rest.
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Self {
            province: clean(self.province),
            city: clean(self.city),
            facility_type: clean(self.facility_type),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.province.is_none() && self.city.is_none() && self.facility_type.is_none()
    }
}

fn collect_matches<'a>(
    matches: impl Iterator<Item = &'a FacilityRecord>,
    limit: usize,
) -> QueryResult {
    let mut result = QueryResult::default();
    for record in matches {
        if result.preview.len() < limit {
            result.preview.push(record.preview());
        }
        result.ids.push(record.id);
    }
    result.total_count = result.ids.len();
    result
}

fn searchable_text(record: &FacilityRecord) -> String {
    format!(
        "{} {} {} {} {}",
        record.name, record.city, record.facility_type, record.province, record.csd_name
    )
    .to_lowercase()
}

/// Free-text search.
///
/// The query is lower-cased and split on whitespace; a record matches when
/// every term is a substring of its searchable text. An empty query
/// matches nothing.
pub fn search(index: &DatasetIndex, query: &str, max_results: usize) -> QueryResult {
    let query = query.trim().to_lowercase();
    let terms: Vec<&str> = query.split_whitespace().collect();
    if terms.is_empty() {
        return QueryResult::default();
    }

    let matches = index.records().iter().filter(|record| {
        let text = searchable_text(record);
        terms.iter().all(|term| text.contains(term))
    });
    collect_matches(matches, max_results)
}

/// Structured filter, criteria combined with AND.
///
/// Province is an exact match after upper-casing; city and type are
/// case-insensitive substring matches. With no criteria at all every record
/// matches: callers that must reject that case do so before calling.
pub fn filter(index: &DatasetIndex, criteria: &FilterCriteria, limit: usize) -> QueryResult {
    let province = criteria.province.as_deref().map(str::to_uppercase);
    let city = criteria.city.as_deref().map(str::to_lowercase);
    let facility_type = criteria.facility_type.as_deref().map(str::to_lowercase);

    let matches = index.records().iter().filter(|record| {
        province.as_deref().is_none_or(|p| record.province == p)
            && city
                .as_deref()
                .is_none_or(|c| record.city.to_lowercase().contains(c))
            && facility_type
                .as_deref()
                .is_none_or(|t| record.facility_type.contains(t))
    });
    collect_matches(matches, limit)
}

/// Point lookup. `None` is the "no such record" outcome.
pub fn fetch(index: &DatasetIndex, id: i64) -> Option<FetchResult> {
    index.get(id).map(|facility| FetchResult {
        id: facility.id,
        content: format::facility_markdown(facility),
        facility: facility.clone(),
    })
}

/// Distinct non-empty normalized types, sorted ascending.
pub fn list_types(index: &DatasetIndex) -> Vec<String> {
    index
        .records()
        .iter()
        .filter(|record| !record.facility_type.is_empty())
        .map(|record| record.facility_type.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Counts keys in first-seen order so a later stable sort breaks ties by
/// first appearance.
#[derive(Default)]
struct OrderedCounter {
    positions: HashMap<String, usize>,
    entries: Vec<(String, usize)>,
}

impl OrderedCounter {
    fn add(&mut self, key: &str) {
        match self.positions.get(key) {
            Some(&pos) => self.entries[pos].1 += 1,
            None => {
                self.positions.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), 1));
            }
        }
    }

    /// Entries by descending count; ties keep first-seen order.
    fn into_ranked(mut self) -> Vec<(String, usize)> {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries
    }
}

/// Every province code present, with its record count, descending by
/// count. Ties keep the order in which codes first appear in the dataset.
pub fn list_provinces(index: &DatasetIndex) -> Vec<ProvinceCount> {
    let mut counter = OrderedCounter::default();
    for record in index.records() {
        counter.add(&record.province);
    }
    counter
        .into_ranked()
        .into_iter()
        .map(|(code, count)| ProvinceCount { code, count })
        .collect()
}

/// Dataset statistics in one pass.
pub fn stats(index: &DatasetIndex) -> StatsResult {
    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_province: BTreeMap<String, usize> = BTreeMap::new();
    let mut cities = OrderedCounter::default();

    for record in index.records() {
        *by_type.entry(record.facility_type.clone()).or_default() += 1;
        *by_province.entry(record.province.clone()).or_default() += 1;
        cities.add(&format!("{}, {}", record.city, record.province));
    }

    let top_cities = cities
        .into_ranked()
        .into_iter()
        .take(TOP_CITIES)
        .map(|(city, count)| CityCount { city, count })
        .collect();

    StatsResult {
        total_facilities: index.len(),
        by_type,
        by_province,
        top_cities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, name: &str, kind: &str, city: &str, province: &str) -> FacilityRecord {
        FacilityRecord {
            id,
            name: name.to_string(),
            source_facility_type: kind.to_string(),
            facility_type: kind.to_lowercase(),
            provider: String::new(),
            unit: String::new(),
            street_no: String::new(),
            street_name: String::new(),
            postal_code: None,
            city: city.to_string(),
            province: province.to_uppercase(),
            source_format_address: String::new(),
            csd_name: city.to_string(),
            csduid: String::new(),
            pruid: String::new(),
            latitude: None,
            longitude: None,
        }
    }

    fn sample() -> DatasetIndex {
        DatasetIndex::from_records(vec![
            record(1, "Royal Ontario Museum", "museum", "Toronto", "ON"),
            record(2, "Art Gallery of Ontario", "gallery", "Toronto", "ON"),
            record(3, "Vancouver Art Gallery", "gallery", "Vancouver", "BC"),
            record(4, "Museum of Vancouver", "museum", "Vancouver", "BC"),
            record(5, "Toronto Public Library", "library or archives", "Toronto", "ON"),
            record(6, "Musée des beaux-arts", "museum", "Montréal", "QC"),
            record(7, "Unknown Site", "", "Whitehorse", "YT"),
        ])
    }

    #[test]
    fn test_search_multi_term_and() {
        let index = sample();
        let result = search(&index, "toronto museum", 20);
        assert_eq!(result.ids, vec![1]);
        assert_eq!(result.preview[0].name, "Royal Ontario Museum");

        let result = search(&index, "vancouver museum", 20);
        assert!(!result.ids.contains(&1));
        assert_eq!(result.ids, vec![4]);
    }

    #[test]
    fn test_search_substring_not_token() {
        let index = sample();
        let result = search(&index, "galler", 20);
        assert_eq!(result.ids, vec![2, 3]);
    }

    #[test]
    fn test_search_matches_province_code() {
        let index = sample();
        let result = search(&index, "  BC  ", 20);
        assert_eq!(result.ids, vec![3, 4]);
    }

    #[test]
    fn test_search_empty_query_matches_nothing() {
        let index = sample();
        for q in ["", "   ", "\t\n"] {
            let result = search(&index, q, 20);
            assert_eq!(result, QueryResult::default());
        }
    }

    #[test]
    fn test_search_truncates_in_dataset_order() {
        let index = sample();
        let result = search(&index, "o", 2);
        assert_eq!(result.total_count, result.ids.len());
        assert_eq!(result.preview.len(), 2);
        assert_eq!(result.preview[0].id, result.ids[0]);
        assert_eq!(result.preview[1].id, result.ids[1]);
        assert!(result.is_truncated());
    }

    #[test]
    fn test_preview_len_is_min_of_limit_and_total() {
        let index = sample();
        for limit in [0, 1, 3, 50] {
            let result = search(&index, "a", limit);
            assert_eq!(result.preview.len(), limit.min(result.total_count));
        }
    }

    #[test]
    fn test_preview_is_prefix_of_full_match_set() {
        let index = sample();
        let small = search(&index, "art", 1);
        let full = search(&index, "art", small.total_count);
        for item in &small.preview {
            assert!(full.preview.iter().any(|p| p.id == item.id));
        }
    }

    #[test]
    fn test_filter_province_case_insensitive() {
        let index = sample();
        let upper = FilterCriteria {
            province: Some("ON".to_string()),
            ..Default::default()
        };
        let lower = FilterCriteria {
            province: Some("on".to_string()),
            ..Default::default()
        };
        let a = filter(&index, &upper, 50);
        let b = filter(&index, &lower, 50);
        assert!(a.ids.contains(&1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_filter_province_is_exact() {
        let index = sample();
        let criteria = FilterCriteria {
            province: Some("O".to_string()),
            ..Default::default()
        };
        assert!(filter(&index, &criteria, 50).is_empty());
    }

    #[test]
    fn test_filter_combines_with_and() {
        let index = sample();
        let criteria = FilterCriteria {
            city: Some("VANC".to_string()),
            facility_type: Some("Museum".to_string()),
            ..Default::default()
        };
        let result = filter(&index, &criteria, 50);
        assert_eq!(result.ids, vec![4]);
    }

    #[test]
    fn test_filter_without_criteria_returns_all() {
        let index = sample();
        let result = filter(&index, &FilterCriteria::default(), 3);
        assert_eq!(result.total_count, index.len());
        assert_eq!(result.preview.len(), 3);
    }

    #[test]
    fn test_criteria_normalized_drops_blank() {
        let criteria = FilterCriteria {
            province: Some("  ".to_string()),
            city: Some(" Toronto ".to_string()),
            facility_type: None,
        }
        .normalized();
        assert_eq!(criteria.province, None);
        assert_eq!(criteria.city.as_deref(), Some("Toronto"));
        assert!(!criteria.is_empty());
        assert!(FilterCriteria::default().normalized().is_empty());
    }

    #[test]
    fn test_fetch_roundtrip_and_idempotent() {
        let index = sample();
        for record in index.records() {
            let first = fetch(&index, record.id).unwrap();
            let second = fetch(&index, record.id).unwrap();
            assert_eq!(&first.facility, record);
            assert_eq!(first, second);
        }
        assert!(fetch(&index, 999_999).is_none());
    }

    #[test]
    fn test_list_types_sorted_unique_non_empty() {
        let index = sample();
        let types = list_types(&index);
        assert_eq!(types, vec!["gallery", "library or archives", "museum"]);
    }

    #[test]
    fn test_list_provinces_counts_sum_to_total() {
        let index = sample();
        let provinces = list_provinces(&index);
        let total: usize = provinces.iter().map(|p| p.count).sum();
        assert_eq!(total, index.len());
        assert_eq!(provinces[0].code, "ON");
        assert_eq!(provinces[0].count, 3);
        // QC and YT tie at 1; QC appears first in the dataset
        let tail: Vec<&str> = provinces[2..].iter().map(|p| p.code.as_str()).collect();
        assert_eq!(tail, vec!["QC", "YT"]);
    }

    #[test]
    fn test_stats_breakdowns_sum_to_total() {
        let index = sample();
        let stats = stats(&index);
        assert_eq!(stats.total_facilities, 7);
        assert_eq!(stats.by_type.values().sum::<usize>(), 7);
        assert_eq!(stats.by_province.values().sum::<usize>(), 7);
        assert_eq!(stats.by_type.get(""), Some(&1));
    }

    #[test]
    fn test_stats_top_cities_ranked_stably() {
        let index = sample();
        let stats = stats(&index);
        let cities: Vec<(&str, usize)> = stats
            .top_cities
            .iter()
            .map(|c| (c.city.as_str(), c.count))
            .collect();
        assert_eq!(
            cities,
            vec![
                ("Toronto, ON", 3),
                ("Vancouver, BC", 2),
                ("Montréal, QC", 1),
                ("Whitehorse, YT", 1),
            ]
        );
    }

    #[test]
    fn test_stats_caps_top_cities() {
        let records = (0..15).map(|i| record(i, "Site", "museum", &format!("City{}", i), "ON"));
        let index = DatasetIndex::from_records(records);
        assert_eq!(stats(&index).top_cities.len(), TOP_CITIES);
    }
}
