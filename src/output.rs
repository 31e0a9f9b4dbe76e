//! Tagged tool output.
//!
//! Every tool produces exactly one [`ToolOutput`] variant. The JSON form
//! carries a `kind` discriminant so the widget and other consumers can
//! switch on it instead of probing for optional keys:
//!
//! ```json
//! { "kind": "search", "query": "museum", "ids": [1, 2], "totalCount": 2, "preview": [...] }
//! { "kind": "stats", "totalFacilities": 8000, "byType": {...}, ... }
//! ```

use serde::Serialize;
use serde_json::Value;

use odcaf_core::format;
use odcaf_core::query::FilterCriteria;
use odcaf_core::{FetchResult, ProvinceCount, QueryResult, StatsResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolOutput {
    Search {
        query: String,
        #[serde(flatten)]
        result: QueryResult,
    },
    Fetch(FetchResult),
    Filter {
        criteria: FilterCriteria,
        #[serde(flatten)]
        result: QueryResult,
    },
    ListTypes {
        types: Vec<String>,
    },
    ListProvinces {
        provinces: Vec<ProvinceCount>,
    },
    Stats(StatsResult),
}

impl ToolOutput {
    /// The discriminant as it appears in JSON.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolOutput::Search { .. } => "search",
            ToolOutput::Fetch(_) => "fetch",
            ToolOutput::Filter { .. } => "filter",
            ToolOutput::ListTypes { .. } => "list_types",
            ToolOutput::ListProvinces { .. } => "list_provinces",
            ToolOutput::Stats(_) => "stats",
        }
    }

    /// Human-readable markdown for chat clients and the CLI.
    pub fn render_markdown(&self) -> String {
        match self {
            ToolOutput::Search { query, result } => format::search_cards(result, Some(query.as_str())),
            ToolOutput::Fetch(fetched) => format::facility_card(&fetched.facility),
            ToolOutput::Filter { criteria, result } => format::filter_table(result, criteria),
            ToolOutput::ListTypes { types } => format::types_list(types),
            ToolOutput::ListProvinces { provinces } => format::provinces_list(provinces),
            ToolOutput::Stats(stats) => format::stats_dashboard(stats),
        }
    }

    /// Plain markdown table for search and filter results, used by the REST
    /// API's `table` field.
    pub fn table(&self) -> Option<String> {
        match self {
            ToolOutput::Search { result, .. } | ToolOutput::Filter { result, .. } => {
                Some(format::results_table(result))
            }
            _ => None,
        }
    }

    /// Structured JSON payload, `kind` included.
    pub fn structured(&self) -> Value {
        // Coordinates are always finite and map keys are strings.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
