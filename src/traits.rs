//! Tool trait, query boundary, and tool registry.
//!
//! Every way of reaching the dataset (REST handlers, the JSON tool API, MCP
//! tool calls, and the CLI) goes through [`ToolContext`], which owns the
//! input rules: limit resolution, the "at least one filter" check, and
//! identifier parsing. The engine in `odcaf_core::query` stays policy-free.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 ToolRegistry                 │
//! │  search  fetch  filter  list_types           │
//! │  list_provinces  stats  (+ custom tools)     │
//! └──────────────────────┬───────────────────────┘
//!                        ▼
//!        ToolContext ── Arc<DatasetIndex> (immutable)
//!                        ▼
//!                   ToolOutput (tagged)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use odcaf_server::config::LimitsConfig;
//! use odcaf_server::traits::ToolRegistry;
//!
//! let tools = ToolRegistry::with_builtins(&LimitsConfig::default());
//! assert!(tools.find("search").is_some());
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use odcaf_core::query::{self, FilterCriteria};
use odcaf_core::{DatasetIndex, FetchResult, ProvinceCount, QueryError, QueryResult, StatsResult};

use crate::config::LimitsConfig;
use crate::output::ToolOutput;

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// A named operation that agents can discover and call.
///
/// Tools are exposed through `GET /tools/list` / `POST /tools/{name}` and
/// as MCP tools. Parameters are checked against
/// [`parameters_schema`](Tool::parameters_schema) with [`validate_params`]
/// before [`execute`](Tool::execute) runs, so `execute` sees defaults
/// already filled in.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use serde_json::{json, Value};
/// use odcaf_server::output::ToolOutput;
/// use odcaf_server::traits::{Tool, ToolContext};
///
/// pub struct MuseumsTool;
///
/// #[async_trait]
/// impl Tool for MuseumsTool {
///     fn name(&self) -> &str { "museums" }
///     fn title(&self) -> &str { "List Museums" }
///     fn description(&self) -> &str { "Every museum in the dataset" }
///
///     fn parameters_schema(&self) -> Value {
///         json!({ "type": "object", "properties": {} })
///     }
///
///     async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
///         let criteria = odcaf_core::query::FilterCriteria {
///             facility_type: Some("museum".to_string()),
///             ..Default::default()
///         };
///         let result = ctx.filter(&criteria, None)?;
///         Ok(ToolOutput::Filter { criteria, result })
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Identifier used in routes and MCP `tools/call`.
    fn name(&self) -> &str;

    /// Display title.
    fn title(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// Whether this tool ships with the server. Defaults to `false`.
    fn is_builtin(&self) -> bool {
        false
    }

    /// JSON Schema for the parameters object.
    fn parameters_schema(&self) -> Value;

    /// JSON Schema for the structured output, if the tool publishes one.
    fn output_schema(&self) -> Option<Value> {
        None
    }

    /// Run the tool with validated parameters.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput>;
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// Query boundary over the shared, immutable dataset.
///
/// Cheap to clone; clones share the same index.
#[derive(Debug, Clone)]
pub struct ToolContext {
    index: Arc<DatasetIndex>,
    limits: LimitsConfig,
}

impl ToolContext {
    pub fn new(index: Arc<DatasetIndex>, limits: LimitsConfig) -> Self {
        Self { index, limits }
    }

    pub fn index(&self) -> &DatasetIndex {
        &self.index
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// `None` picks `default`; values below 1 are rejected; values above
    /// the configured maximum are clamped.
    fn resolve_limit(&self, requested: Option<i64>, default: usize) -> Result<usize, QueryError> {
        match requested {
            None => Ok(default.min(self.limits.max_results)),
            Some(n) if n < 1 => Err(QueryError::invalid(format!(
                "limit must be at least 1, got {}",
                n
            ))),
            Some(n) => Ok(usize::try_from(n)
                .unwrap_or(usize::MAX)
                .min(self.limits.max_results)),
        }
    }

    /// Free-text search. A blank query is an empty result, not an error.
    pub fn search(&self, query: &str, max_results: Option<i64>) -> Result<QueryResult, QueryError> {
        let limit = self.resolve_limit(max_results, self.limits.default_search)?;
        Ok(query::search(&self.index, query, limit))
    }

    /// Structured filter. At least one non-blank criterion is required.
    pub fn filter(
        &self,
        criteria: &FilterCriteria,
        limit: Option<i64>,
    ) -> Result<QueryResult, QueryError> {
        let criteria = criteria.clone().normalized();
        if criteria.is_empty() {
            return Err(QueryError::invalid(
                "At least one filter (province, city, or facilityType) must be provided",
            ));
        }
        let limit = self.resolve_limit(limit, self.limits.default_filter)?;
        Ok(query::filter(&self.index, &criteria, limit))
    }

    pub fn fetch(&self, id: i64) -> Result<FetchResult, QueryError> {
        query::fetch(&self.index, id).ok_or(QueryError::NotFound(id))
    }

    /// [`fetch`](Self::fetch) for an identifier that arrived as text.
    pub fn fetch_str(&self, raw: &str) -> Result<FetchResult, QueryError> {
        self.fetch(parse_id(raw)?)
    }

    pub fn list_types(&self) -> Vec<String> {
        query::list_types(&self.index)
    }

    pub fn list_provinces(&self) -> Vec<ProvinceCount> {
        query::list_provinces(&self.index)
    }

    pub fn stats(&self) -> StatsResult {
        query::stats(&self.index)
    }
}

/// Parse a facility identifier supplied as text.
pub fn parse_id(raw: &str) -> Result<i64, QueryError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| QueryError::invalid(format!("Invalid facility ID: '{}'", raw)))
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter helpers
// ═══════════════════════════════════════════════════════════════════════

fn string_param(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Read an integer parameter that may also arrive as a numeric string.
/// Anything else is invalid input, not an execution failure.
fn integer_param(params: &Value, key: &str) -> Result<Option<i64>, QueryError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| {
            QueryError::invalid(format!("parameter '{}' must be an integer, got {}", key, n))
        }),
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| {
            QueryError::invalid(format!("parameter '{}' must be a number, got '{}'", key, s))
        }),
        Some(other) => Err(QueryError::invalid(format!(
            "parameter '{}' must be a number, got {}",
            key,
            json_type_name(other)
        ))),
    }
}

fn preview_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "id": { "type": "integer" },
                "name": { "type": "string" },
                "type": { "type": "string" },
                "city": { "type": "string" },
                "province": { "type": "string" }
            }
        }
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Tool Implementations
// ═══════════════════════════════════════════════════════════════════════

/// Free-text search over name, city, type, province, and subdivision.
pub struct SearchTool {
    default_limit: usize,
}

impl SearchTool {
    pub fn new(default_limit: usize) -> Self {
        Self { default_limit }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn title(&self) -> &str {
        "Search Cultural Facilities"
    }

    fn description(&self) -> &str {
        "Search for cultural and art facilities in Canada by name, type, city, or province. \
         Returns a list of matching facilities that can be fetched for full details."
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query - can include facility name, type (museum, gallery, library, theatre, heritage), city, or province code (ON, QC, BC, AB, etc.)"
                },
                "maxResults": {
                    "type": "integer",
                    "description": format!("Maximum number of results to return (default: {})", self.default_limit),
                    "default": self.default_limit
                }
            },
            "required": ["query"]
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "kind": { "type": "string", "const": "search" },
                "query": { "type": "string" },
                "ids": { "type": "array", "items": { "type": "integer" } },
                "totalCount": { "type": "integer" },
                "preview": preview_schema()
            }
        }))
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let query = string_param(&params, "query").unwrap_or_default();
        let max_results = integer_param(&params, "maxResults")?;
        let result = ctx.search(&query, max_results)?;
        Ok(ToolOutput::Search { query, result })
    }
}

/// Full record for one facility identifier.
pub struct FetchTool;

#[async_trait]
impl Tool for FetchTool {
    fn name(&self) -> &str {
        "fetch"
    }

    fn title(&self) -> &str {
        "Fetch Facility Details"
    }

    fn description(&self) -> &str {
        "Fetch the complete details of a cultural facility by its ID. Returns full \
         information including address, coordinates, and data source."
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": ["integer", "string"],
                    "description": "The facility ID returned from a search"
                }
            },
            "required": ["id"]
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "kind": { "type": "string", "const": "fetch" },
                "id": { "type": "integer" },
                "facility": { "type": "object" },
                "content": { "type": "string" }
            }
        }))
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let fetched = match params.get("id") {
            Some(Value::String(raw)) => ctx.fetch_str(raw)?,
            _ => match integer_param(&params, "id")? {
                Some(id) => ctx.fetch(id)?,
                None => return Err(QueryError::invalid("missing required parameter: id").into()),
            },
        };
        Ok(ToolOutput::Fetch(fetched))
    }
}

/// Structured province / city / type filter.
pub struct FilterTool {
    default_limit: usize,
}

impl FilterTool {
    pub fn new(default_limit: usize) -> Self {
        Self { default_limit }
    }
}

#[async_trait]
impl Tool for FilterTool {
    fn name(&self) -> &str {
        "filter"
    }

    fn title(&self) -> &str {
        "Filter Cultural Facilities"
    }

    fn description(&self) -> &str {
        "Filter cultural facilities by province, city, and/or facility type. Use this for \
         precise filtering when you know the exact criteria."
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "province": {
                    "type": "string",
                    "description": "Province/territory code (AB, BC, MB, NB, NL, NS, NT, NU, ON, PE, QC, SK, YT)"
                },
                "city": {
                    "type": "string",
                    "description": "City name (partial match supported)"
                },
                "facilityType": {
                    "type": "string",
                    "description": "Facility type (museum, gallery, library, theatre, heritage or historic site, community cultural centre, performing arts facility, archive)"
                },
                "limit": {
                    "type": ["integer", "string"],
                    "description": format!("Maximum number of results (default: {})", self.default_limit),
                    "default": self.default_limit
                }
            }
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "kind": { "type": "string", "const": "filter" },
                "criteria": { "type": "object" },
                "ids": { "type": "array", "items": { "type": "integer" } },
                "totalCount": { "type": "integer" },
                "preview": preview_schema()
            }
        }))
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let criteria = FilterCriteria {
            province: string_param(&params, "province"),
            city: string_param(&params, "city"),
            facility_type: string_param(&params, "facilityType"),
        }
        .normalized();
        let limit = integer_param(&params, "limit")?;
        let result = ctx.filter(&criteria, limit)?;
        Ok(ToolOutput::Filter { criteria, result })
    }
}

/// Distinct facility types.
pub struct ListTypesTool;

#[async_trait]
impl Tool for ListTypesTool {
    fn name(&self) -> &str {
        "list_types"
    }

    fn title(&self) -> &str {
        "List Facility Types"
    }

    fn description(&self) -> &str {
        "List all available cultural facility types in the database."
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "kind": { "type": "string", "const": "list_types" },
                "types": { "type": "array", "items": { "type": "string" } }
            }
        }))
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        Ok(ToolOutput::ListTypes {
            types: ctx.list_types(),
        })
    }
}

/// Province codes with facility counts.
pub struct ListProvincesTool;

#[async_trait]
impl Tool for ListProvincesTool {
    fn name(&self) -> &str {
        "list_provinces"
    }

    fn title(&self) -> &str {
        "List Provinces"
    }

    fn description(&self) -> &str {
        "List all Canadian provinces and territories with their facility counts."
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "kind": { "type": "string", "const": "list_provinces" },
                "provinces": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "code": { "type": "string" },
                            "count": { "type": "integer" }
                        }
                    }
                }
            }
        }))
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        Ok(ToolOutput::ListProvinces {
            provinces: ctx.list_provinces(),
        })
    }
}

/// Dataset-wide statistics.
pub struct StatsTool;

#[async_trait]
impl Tool for StatsTool {
    fn name(&self) -> &str {
        "stats"
    }

    fn title(&self) -> &str {
        "Get Dataset Statistics"
    }

    fn description(&self) -> &str {
        "Get statistics about the cultural facilities database including total count, \
         breakdown by type and province, and top cities."
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "kind": { "type": "string", "const": "stats" },
                "totalFacilities": { "type": "integer" },
                "byType": { "type": "object", "additionalProperties": { "type": "integer" } },
                "byProvince": { "type": "object", "additionalProperties": { "type": "integer" } },
                "topCities": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "city": { "type": "string" },
                            "count": { "type": "integer" }
                        }
                    }
                }
            }
        }))
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        Ok(ToolOutput::Stats(ctx.stats()))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Registry of callable tools, in registration order.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry with the six built-in tools, their limit defaults taken
    /// from `limits`.
    pub fn with_builtins(limits: &LimitsConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchTool::new(limits.default_search)));
        registry.register(Box::new(FetchTool));
        registry.register(Box::new(FilterTool::new(limits.default_filter)));
        registry.register(Box::new(ListTypesTool));
        registry.register(Box::new(ListProvincesTool));
        registry.register(Box::new(StatsTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Serializable descriptors for `GET /tools/list`.
    pub fn infos(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                title: t.title().to_string(),
                description: t.description().to_string(),
                builtin: t.is_builtin(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable tool info for the `/tools/list` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub title: String,
    pub description: String,
    pub builtin: bool,
    /// JSON Schema of the parameters object.
    pub parameters: Value,
}

// ═══════════════════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════════════════

/// Validate `params` against a tool's JSON Schema and fill in defaults.
///
/// Checks required keys, JSON types (a `type` may be a single name or a
/// list of accepted names), and `enum` membership. Absent properties that
/// declare a `default` receive it. Unknown keys pass through untouched.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let params_obj = match params {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => bail!("parameters must be an object, got {}", json_type_name(other)),
    };

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    for field in &required {
        if !params_obj.contains_key(*field) {
            bail!("missing required parameter: {}", field);
        }
    }

    let mut result = params_obj.clone();

    for (prop_name, prop_schema) in &properties {
        match params_obj.get(prop_name) {
            Some(value) => {
                let accepted: Vec<&str> = match prop_schema.get("type") {
                    Some(Value::String(t)) => vec![t.as_str()],
                    Some(Value::Array(ts)) => ts.iter().filter_map(|t| t.as_str()).collect(),
                    _ => Vec::new(),
                };
                if !accepted.is_empty() && !accepted.iter().any(|t| type_matches(t, value)) {
                    bail!(
                        "parameter '{}' must be of type '{}', got {}",
                        prop_name,
                        accepted.join(" | "),
                        json_type_name(value)
                    );
                }

                if let Some(enum_values) = prop_schema.get("enum").and_then(|e| e.as_array()) {
                    if !enum_values.contains(value) {
                        let allowed: Vec<String> =
                            enum_values.iter().map(|v| v.to_string()).collect();
                        bail!(
                            "parameter '{}' must be one of [{}], got {}",
                            prop_name,
                            allowed.join(", "),
                            value
                        );
                    }
                }
            }
            None => {
                if let Some(default) = prop_schema.get("default") {
                    result.insert(prop_name.clone(), default.clone());
                }
            }
        }
    }

    Ok(Value::Object(result))
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

/// Return a human-readable name for a JSON value's type.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odcaf_core::FacilityRecord;

    fn record(id: i64, name: &str, facility_type: &str, city: &str, province: &str) -> FacilityRecord {
        FacilityRecord {
            id,
            name: name.to_string(),
            facility_type: facility_type.to_string(),
            city: city.to_string(),
            province: province.to_string(),
            ..Default::default()
        }
    }

    fn ctx() -> ToolContext {
        let index = DatasetIndex::from_records(vec![
            record(1, "Royal Ontario Museum", "museum", "Toronto", "ON"),
            record(2, "Art Gallery of Ontario", "gallery", "Toronto", "ON"),
            record(3, "Musée des beaux-arts", "museum", "Montréal", "QC"),
            record(4, "Vancouver Art Gallery", "gallery", "Vancouver", "BC"),
        ]);
        ToolContext::new(Arc::new(index), LimitsConfig::default())
    }

    fn small_limits_ctx(max_results: usize) -> ToolContext {
        let mut limits = LimitsConfig::default();
        limits.max_results = max_results;
        limits.default_search = max_results;
        limits.default_filter = max_results;
        let base = ctx();
        ToolContext::new(Arc::new(base.index().clone()), limits)
    }

    #[test]
    fn test_search_blank_query_is_empty() {
        let result = ctx().search("   ", None).unwrap();
        assert_eq!(result.total_count, 0);
        assert!(result.preview.is_empty());
    }

    #[test]
    fn test_search_rejects_zero_limit() {
        let err = ctx().search("museum", Some(0)).unwrap_err();
        assert!(matches!(err, QueryError::InvalidInput(_)));
    }

    #[test]
    fn test_search_clamps_to_max() {
        let ctx = small_limits_ctx(1);
        let result = ctx.search("toronto", Some(100)).unwrap();
        assert_eq!(result.total_count, 2);
        assert_eq!(result.preview.len(), 1);
    }

    #[test]
    fn test_filter_requires_a_criterion() {
        let err = ctx().filter(&FilterCriteria::default(), None).unwrap_err();
        assert!(err.to_string().contains("At least one filter"));

        let blank = FilterCriteria {
            city: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(ctx().filter(&blank, None).is_err());
    }

    #[test]
    fn test_filter_lowercase_province() {
        let criteria = FilterCriteria {
            province: Some("on".to_string()),
            ..Default::default()
        };
        let result = ctx().filter(&criteria, None).unwrap();
        assert_eq!(result.ids, vec![1, 2]);
    }

    #[test]
    fn test_fetch_not_found() {
        assert_eq!(ctx().fetch(999_999).unwrap_err(), QueryError::NotFound(999_999));
    }

    #[test]
    fn test_fetch_str_rejects_non_numeric() {
        let err = ctx().fetch_str("abc").unwrap_err();
        assert!(matches!(err, QueryError::InvalidInput(_)));
        assert_eq!(ctx().fetch_str(" 3 ").unwrap().id, 3);
    }

    #[test]
    fn test_registry_builtins() {
        let registry = ToolRegistry::with_builtins(&LimitsConfig::default());
        let names: Vec<&str> = registry.tools().iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec!["search", "fetch", "filter", "list_types", "list_provinces", "stats"]
        );
        assert!(registry.find("nope").is_none());
        assert!(registry.infos().iter().all(|i| i.builtin));
    }

    #[tokio::test]
    async fn test_search_tool_injects_default_limit() {
        let tool = SearchTool::new(1);
        let params = validate_params(&tool.parameters_schema(), &json!({ "query": "toronto" })).unwrap();
        assert_eq!(params["maxResults"], 1);

        let output = tool.execute(params, &ctx()).await.unwrap();
        match output {
            ToolOutput::Search { query, result } => {
                assert_eq!(query, "toronto");
                assert_eq!(result.total_count, 2);
                assert_eq!(result.preview.len(), 1);
            }
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_filter_tool_accepts_string_limit() {
        let tool = FilterTool::new(50);
        let params = validate_params(
            &tool.parameters_schema(),
            &json!({ "facilityType": "Gallery", "limit": "1" }),
        )
        .unwrap();
        let output = tool.execute(params, &ctx()).await.unwrap();
        let json = output.structured();
        assert_eq!(json["kind"], "filter");
        assert_eq!(json["totalCount"], 2);
        assert_eq!(json["preview"].as_array().unwrap().len(), 1);
        assert_eq!(json["criteria"]["facilityType"], "Gallery");
    }

    #[tokio::test]
    async fn test_filter_tool_rejects_bad_string_limit() {
        let tool = FilterTool::new(50);
        let err = tool
            .execute(json!({ "city": "Toronto", "limit": "lots" }), &ctx())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("limit"));
        assert!(matches!(
            err.downcast_ref::<QueryError>(),
            Some(QueryError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_tool_not_found_downcasts() {
        let err = FetchTool.execute(json!({ "id": 42 }), &ctx()).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<QueryError>(),
            Some(&QueryError::NotFound(42))
        );
    }

    #[tokio::test]
    async fn test_fetch_tool_string_id() {
        let output = FetchTool.execute(json!({ "id": "1" }), &ctx()).await.unwrap();
        match output {
            ToolOutput::Fetch(fetched) => {
                assert_eq!(fetched.facility.name, "Royal Ontario Museum");
                assert!(fetched.content.contains("Royal Ontario Museum"));
            }
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[test]
    fn test_validate_missing_required() {
        let schema = SearchTool::new(20).parameters_schema();
        let err = validate_params(&schema, &json!({})).unwrap_err();
        assert!(err.to_string().contains("missing required parameter: query"));
    }

    #[test]
    fn test_validate_type_mismatch() {
        let schema = SearchTool::new(20).parameters_schema();
        let err = validate_params(&schema, &json!({ "query": 5 })).unwrap_err();
        assert!(err.to_string().contains("must be of type 'string'"));
    }

    #[test]
    fn test_validate_enum() {
        let schema = json!({
            "type": "object",
            "properties": { "mode": { "type": "string", "enum": ["a", "b"] } }
        });
        assert!(validate_params(&schema, &json!({ "mode": "a" })).is_ok());
        assert!(validate_params(&schema, &json!({ "mode": "c" })).is_err());
    }

    #[test]
    fn test_validate_rejects_non_object() {
        let schema = json!({ "type": "object", "properties": {} });
        assert!(validate_params(&schema, &json!([1, 2])).is_err());
        assert_eq!(validate_params(&schema, &Value::Null).unwrap(), json!({}));
    }
}
