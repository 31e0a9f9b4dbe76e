//! Markdown rendering for query results.
//!
//! Pure functions, no state. Two families:
//!
//! * plain output ([`results_table`], [`facility_markdown`]) used by the
//!   REST API and the CLI;
//! * card-style output ([`search_cards`], [`filter_table`],
//!   [`facility_card`], [`stats_dashboard`], [`types_list`],
//!   [`provinces_list`]) used as the text content of MCP tool results.
//!
//! Empty results always render a dedicated "no results" message rather
//! than an empty table, and truncated previews always carry a
//! "Showing N of M" footer.

use crate::models::{FacilityRecord, ProvinceCount, QueryResult, StatsResult};
use crate::query::FilterCriteria;

const RULE: &str = "---";

/// Full province / territory name for a two-letter code.
pub fn province_name(code: &str) -> &str {
    match code {
        "AB" => "Alberta",
        "BC" => "British Columbia",
        "MB" => "Manitoba",
        "NB" => "New Brunswick",
        "NL" => "Newfoundland & Labrador",
        "NS" => "Nova Scotia",
        "NT" => "Northwest Territories",
        "NU" => "Nunavut",
        "ON" => "Ontario",
        "PE" => "Prince Edward Island",
        "QC" => "Québec",
        "SK" => "Saskatchewan",
        "YT" => "Yukon",
        other => other,
    }
}

fn type_icon(facility_type: &str) -> &'static str {
    match facility_type {
        "museum" => "🏛️",
        "gallery" => "🖼️",
        "library or archives" => "📚",
        "theatre/performance and concert hall" => "🎭",
        "heritage or historic site" => "🏰",
        "festival site" => "🎪",
        "art or cultural centre" => "🎨",
        "artist" => "👨‍🎨",
        _ => "📍",
    }
}

/// `1234567` → `"1,234,567"`.
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn percent(part: usize, total: usize) -> String {
    if total == 0 {
        "0.0".to_string()
    } else {
        format!("{:.1}", part as f64 * 100.0 / total as f64)
    }
}

fn progress_bar(value: usize, max: usize, width: usize) -> String {
    let filled = if max == 0 {
        0
    } else {
        ((value as f64 / max as f64) * width as f64).round() as usize
    }
    .min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Markdown table of a result preview.
pub fn results_table(result: &QueryResult) -> String {
    if result.preview.is_empty() {
        return "No results found.".to_string();
    }

    let mut lines = vec![
        "| ID | Name | Type | City | Province |".to_string(),
        "| --- | --- | --- | --- | --- |".to_string(),
    ];
    for p in &result.preview {
        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            p.id, p.name, p.facility_type, p.city, p.province
        ));
    }

    let table = lines.join("\n");
    if result.is_truncated() {
        format!(
            "{}\n\n*Showing {} of {} results*",
            table,
            result.preview.len(),
            result.total_count
        )
    } else {
        table
    }
}

/// Short markdown description of one facility.
pub fn facility_markdown(f: &FacilityRecord) -> String {
    let mut lines = vec![
        format!("## {}", f.name),
        String::new(),
        format!("**Type:** {}", f.facility_type),
        format!("**City:** {}, {}", f.city, f.province),
    ];
    if let Some(address) = f.street_address() {
        lines.push(format!("**Address:** {}", address));
    }
    if let Some(ref postal) = f.postal_code {
        lines.push(format!("**Postal Code:** {}", postal));
    }
    if let Some((lat, lng)) = f.coordinates() {
        lines.push(format!("**Coordinates:** {}, {}", lat, lng));
    }
    if !f.provider.is_empty() {
        lines.push(format!("**Data Source:** {}", f.provider));
    }
    lines.join("\n")
}

/// Card-style rendering of one facility, with a map link when located.
pub fn facility_card(f: &FacilityRecord) -> String {
    let mut lines = vec![
        RULE.to_string(),
        String::new(),
        format!("## {} {}", type_icon(&f.facility_type), f.name),
        String::new(),
        format!("> **{}**", f.facility_type.to_uppercase()),
        String::new(),
        "| 📍 Location | 📋 Details |".to_string(),
        "|:--|:--|".to_string(),
        format!("| **City** | {} |", f.city),
        format!(
            "| **Province** | {} ({}) |",
            province_name(&f.province),
            f.province
        ),
    ];

    if let Some(address) = f.street_address() {
        lines.push(format!("| **Address** | {} |", address));
    }
    if let Some(ref postal) = f.postal_code {
        lines.push(format!("| **Postal Code** | {} |", postal));
    }
    if let Some((lat, lng)) = f.coordinates() {
        lines.push(format!("| **Coordinates** | {:.4}, {:.4} |", lat, lng));
        lines.push(format!(
            "| **Map** | [📍 View on Map](https://www.google.com/maps?q={},{}) |",
            lat, lng
        ));
    }
    if !f.provider.is_empty() {
        lines.push(format!("| **Source** | {} |", f.provider));
    }

    lines.push(String::new());
    lines.push(format!("`ID: {}`", f.id));
    lines.push(String::new());
    lines.push(RULE.to_string());
    lines.join("\n")
}

fn no_results(query: Option<&str>) -> String {
    let detail = match query {
        Some(q) => format!("> No facilities found matching **\"{}\"**", q),
        None => "> No facilities match your criteria".to_string(),
    };
    [
        RULE,
        "",
        "## 🔍 No Results Found",
        "",
        detail.as_str(),
        "",
        "💡 **Try:**",
        "- Using broader search terms",
        "- Checking spelling",
        "- Searching by city or province code (ON, QC, BC...)",
        "",
        RULE,
    ]
    .join("\n")
}

/// Compact card list for search results.
pub fn search_cards(result: &QueryResult, query: Option<&str>) -> String {
    if result.preview.is_empty() {
        return no_results(query);
    }

    let total = group_thousands(result.total_count);
    let mut lines = vec![
        RULE.to_string(),
        String::new(),
        "## 🔍 Search Results".to_string(),
        String::new(),
        match query {
            Some(q) => format!("> Found **{}** facilities matching **\"{}\"**", total, q),
            None => format!("> Found **{}** facilities", total),
        },
        String::new(),
    ];

    for item in &result.preview {
        lines.push(format!("### {} {}", type_icon(&item.facility_type), item.name));
        lines.push(format!(
            "📍 {}, {} • `{}` • ID: `{}`",
            item.city, item.province, item.facility_type, item.id
        ));
        lines.push(String::new());
    }

    if result.is_truncated() {
        lines.push(RULE.to_string());
        lines.push(format!(
            "*📊 Showing {} of {} results*",
            result.preview.len(),
            total
        ));
        lines.push(String::new());
        lines.push("💡 Use **filter** tool for more specific results".to_string());
    }

    lines.push(String::new());
    lines.push(RULE.to_string());
    lines.join("\n")
}

/// Numbered table for filter results, headed by the criteria used.
pub fn filter_table(result: &QueryResult, criteria: &FilterCriteria) -> String {
    if result.preview.is_empty() {
        return no_results(None);
    }

    let mut described = Vec::new();
    if let Some(ref p) = criteria.province {
        described.push(format!("Province: **{}**", province_name(&p.to_uppercase())));
    }
    if let Some(ref c) = criteria.city {
        described.push(format!("City: **{}**", c));
    }
    if let Some(ref t) = criteria.facility_type {
        described.push(format!("Type: **{}**", t));
    }

    let total = group_thousands(result.total_count);
    let mut lines = vec![
        RULE.to_string(),
        String::new(),
        "## 🎯 Filtered Results".to_string(),
        String::new(),
    ];
    if !described.is_empty() {
        lines.push(format!("> {}", described.join(" • ")));
        lines.push(String::new());
    }
    lines.push(format!("**{}** facilities found", total));
    lines.push(String::new());
    lines.push("| # | 🏛️ Facility | 🏷️ Type | 📍 Location | ID |".to_string());
    lines.push("|:--:|:--|:--|:--|:--:|".to_string());

    for (idx, item) in result.preview.iter().enumerate() {
        lines.push(format!(
            "| {} | {} {} | {} | {}, {} | `{}` |",
            idx + 1,
            type_icon(&item.facility_type),
            item.name,
            item.facility_type,
            item.city,
            item.province,
            item.id
        ));
    }

    if result.is_truncated() {
        lines.push(String::new());
        lines.push(format!(
            "*Showing {} of {} • Increase `limit` for more*",
            result.preview.len(),
            total
        ));
    }

    lines.push(String::new());
    lines.push(RULE.to_string());
    lines.join("\n")
}

fn ranked(map: &std::collections::BTreeMap<String, usize>) -> Vec<(&str, usize)> {
    let mut entries: Vec<(&str, usize)> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries
}

/// Dashboard with per-type bars, a province table, and the top cities.
pub fn stats_dashboard(stats: &StatsResult) -> String {
    let total = stats.total_facilities;
    let max_by_type = stats.by_type.values().copied().max().unwrap_or(0);

    let mut lines = vec![
        RULE.to_string(),
        String::new(),
        "# 📊 ODCAF Cultural Facilities Dashboard".to_string(),
        String::new(),
        "> 🇨🇦 **Open Database of Cultural and Art Facilities - Canada**".to_string(),
        String::new(),
        RULE.to_string(),
        String::new(),
        format!("## 📈 Total Facilities: **{}**", group_thousands(total)),
        String::new(),
        RULE.to_string(),
        String::new(),
        "## 🏷️ By Facility Type".to_string(),
        String::new(),
    ];

    for (facility_type, count) in ranked(&stats.by_type) {
        lines.push(format!("{} **{}**", type_icon(facility_type), facility_type));
        lines.push(format!(
            "`{}` {} ({}%)",
            progress_bar(count, max_by_type, 15),
            group_thousands(count),
            percent(count, total)
        ));
        lines.push(String::new());
    }

    lines.push(RULE.to_string());
    lines.push(String::new());
    lines.push("## 🗺️ By Province/Territory".to_string());
    lines.push(String::new());
    lines.push("| Province | Count | % |".to_string());
    lines.push("|:--|--:|--:|".to_string());

    for (code, count) in ranked(&stats.by_province) {
        if code == crate::parse::UNKNOWN_MARKER {
            continue;
        }
        lines.push(format!(
            "| 🍁 {} ({}) | {} | {}% |",
            province_name(code),
            code,
            group_thousands(count),
            percent(count, total)
        ));
    }

    lines.push(String::new());
    lines.push(RULE.to_string());
    lines.push(String::new());
    lines.push("## 🏙️ Top 10 Cities".to_string());
    lines.push(String::new());

    for (idx, item) in stats.top_cities.iter().enumerate() {
        let rank = match idx {
            0 => "🥇".to_string(),
            1 => "🥈".to_string(),
            2 => "🥉".to_string(),
            n => format!("{}.", n + 1),
        };
        lines.push(format!(
            "{} **{}**: {} facilities",
            rank,
            item.city,
            group_thousands(item.count)
        ));
    }

    lines.push(String::new());
    lines.push(RULE.to_string());
    lines.join("\n")
}

/// Bulleted list of facility types.
pub fn types_list(types: &[String]) -> String {
    let mut lines = vec![
        RULE.to_string(),
        String::new(),
        "## 🏷️ Cultural Facility Types".to_string(),
        String::new(),
        "> Available categories in the ODCAF database".to_string(),
        String::new(),
    ];
    for t in types {
        lines.push(format!("- {} **{}**", type_icon(t), t));
    }
    lines.extend([
        String::new(),
        RULE.to_string(),
        String::new(),
        format!("*{} facility types available*", types.len()),
        String::new(),
        "💡 Use these in the **filter** tool with `facilityType` parameter".to_string(),
        String::new(),
        RULE.to_string(),
    ]);
    lines.join("\n")
}

/// Provinces with bars and share of the total.
pub fn provinces_list(provinces: &[ProvinceCount]) -> String {
    let total: usize = provinces.iter().map(|p| p.count).sum();
    let max_count = provinces.iter().map(|p| p.count).max().unwrap_or(0);

    let mut lines = vec![
        RULE.to_string(),
        String::new(),
        "## 🗺️ Provinces & Territories".to_string(),
        String::new(),
        "> Cultural facilities across Canada".to_string(),
        String::new(),
    ];

    for p in provinces {
        if p.code == crate::parse::UNKNOWN_MARKER {
            continue;
        }
        lines.push(format!("🍁 **{}** (`{}`)", province_name(&p.code), p.code));
        lines.push(format!(
            "   `{}` {} facilities ({}%)",
            progress_bar(p.count, max_count, 12),
            group_thousands(p.count),
            percent(p.count, total)
        ));
        lines.push(String::new());
    }

    lines.extend([
        RULE.to_string(),
        String::new(),
        format!(
            "*Total: **{}** facilities across **{}** provinces/territories*",
            group_thousands(total),
            provinces.len()
        ),
        String::new(),
        "💡 Use province codes in **filter** tool: `province: \"ON\"`, `province: \"QC\"`, etc."
            .to_string(),
        String::new(),
        RULE.to_string(),
    ]);
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CityCount, FacilityPreview};
    use std::collections::BTreeMap;

    fn preview(id: i64, name: &str) -> FacilityPreview {
        FacilityPreview {
            id,
            name: name.to_string(),
            facility_type: "museum".to_string(),
            city: "Toronto".to_string(),
            province: "ON".to_string(),
        }
    }

    fn facility() -> FacilityRecord {
        FacilityRecord {
            id: 1,
            name: "Royal Ontario Museum".to_string(),
            source_facility_type: "Museum".to_string(),
            facility_type: "museum".to_string(),
            provider: "Ontario".to_string(),
            unit: String::new(),
            street_no: "100".to_string(),
            street_name: "Queen's Park".to_string(),
            postal_code: Some("M5S 2C6".to_string()),
            city: "Toronto".to_string(),
            province: "ON".to_string(),
            source_format_address: String::new(),
            csd_name: "Toronto".to_string(),
            csduid: "3520005".to_string(),
            pruid: "35".to_string(),
            latitude: Some(43.6677),
            longitude: Some(-79.3948),
        }
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(8009), "8,009");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_results_table_empty() {
        assert_eq!(results_table(&QueryResult::default()), "No results found.");
    }

    #[test]
    fn test_results_table_footer_only_when_truncated() {
        let full = QueryResult {
            ids: vec![1],
            total_count: 1,
            preview: vec![preview(1, "A")],
        };
        assert!(!results_table(&full).contains("Showing"));

        let truncated = QueryResult {
            ids: vec![1, 2, 3],
            total_count: 3,
            preview: vec![preview(1, "A")],
        };
        let out = results_table(&truncated);
        assert!(out.contains("| 1 | A | museum | Toronto | ON |"));
        assert!(out.ends_with("*Showing 1 of 3 results*"));
    }

    #[test]
    fn test_facility_markdown_fields() {
        let md = facility_markdown(&facility());
        assert!(md.starts_with("## Royal Ontario Museum"));
        assert!(md.contains("**Address:** 100 Queen's Park"));
        assert!(md.contains("**Postal Code:** M5S 2C6"));
        assert!(md.contains("**Coordinates:** 43.6677, -79.3948"));
        assert!(md.contains("**Data Source:** Ontario"));
    }

    #[test]
    fn test_facility_markdown_omits_absent_fields() {
        let mut f = facility();
        f.street_no.clear();
        f.street_name.clear();
        f.postal_code = None;
        f.longitude = None;
        f.provider.clear();
        let md = facility_markdown(&f);
        assert!(!md.contains("Address"));
        assert!(!md.contains("Postal Code"));
        assert!(!md.contains("Coordinates"));
        assert!(!md.contains("Data Source"));
    }

    #[test]
    fn test_facility_markdown_zero_coordinates_shown() {
        let mut f = facility();
        f.latitude = Some(0.0);
        f.longitude = Some(0.0);
        assert!(facility_markdown(&f).contains("**Coordinates:** 0, 0"));
    }

    #[test]
    fn test_facility_card_has_map_link_and_id() {
        let card = facility_card(&facility());
        assert!(card.contains("Ontario (ON)"));
        assert!(card.contains("43.6677, -79.3948"));
        assert!(card.contains("google.com/maps?q=43.6677,-79.3948"));
        assert!(card.contains("`ID: 1`"));
    }

    #[test]
    fn test_search_cards_no_results_mentions_query() {
        let out = search_cards(&QueryResult::default(), Some("xyz"));
        assert!(out.contains("No Results Found"));
        assert!(out.contains("\"xyz\""));
    }

    #[test]
    fn test_search_cards_truncated_footer() {
        let result = QueryResult {
            ids: (1..=1500).collect(),
            total_count: 1500,
            preview: vec![preview(1, "A"), preview(2, "B")],
        };
        let out = search_cards(&result, Some("museum"));
        assert!(out.contains("Found **1,500** facilities"));
        assert!(out.contains("Showing 2 of 1,500 results"));
    }

    #[test]
    fn test_filter_table_describes_criteria() {
        let result = QueryResult {
            ids: vec![1],
            total_count: 1,
            preview: vec![preview(1, "A")],
        };
        let criteria = FilterCriteria {
            province: Some("on".to_string()),
            city: Some("Toronto".to_string()),
            facility_type: None,
        };
        let out = filter_table(&result, &criteria);
        assert!(out.contains("Province: **Ontario**"));
        assert!(out.contains("City: **Toronto**"));
        assert!(!out.contains("Type: **"));
        assert!(out.contains("| 1 | 🏛️ A | museum | Toronto, ON | `1` |"));
    }

    #[test]
    fn test_stats_dashboard_sections() {
        let mut by_type = BTreeMap::new();
        by_type.insert("museum".to_string(), 3);
        by_type.insert("gallery".to_string(), 1);
        let mut by_province = BTreeMap::new();
        by_province.insert("ON".to_string(), 4);
        let stats = StatsResult {
            total_facilities: 4,
            by_type,
            by_province,
            top_cities: vec![CityCount {
                city: "Toronto, ON".to_string(),
                count: 4,
            }],
        };
        let out = stats_dashboard(&stats);
        assert!(out.contains("Total Facilities: **4**"));
        assert!(out.contains("3 (75.0%)"));
        assert!(out.contains("| 🍁 Ontario (ON) | 4 | 100.0% |"));
        assert!(out.contains("🥇 **Toronto, ON**: 4 facilities"));
        let museum = out.find("**museum**").unwrap();
        let gallery = out.find("**gallery**").unwrap();
        assert!(museum < gallery);
    }

    #[test]
    fn test_provinces_list_skips_unknown_marker() {
        let provinces = vec![
            ProvinceCount {
                code: "ON".to_string(),
                count: 3,
            },
            ProvinceCount {
                code: "..".to_string(),
                count: 1,
            },
        ];
        let out = provinces_list(&provinces);
        assert!(out.contains("**Ontario** (`ON`)"));
        assert!(!out.contains("(`..`)"));
        assert!(out.contains("(75.0%)"));
    }

    #[test]
    fn test_progress_bar_bounds() {
        assert_eq!(progress_bar(0, 0, 4), "░░░░");
        assert_eq!(progress_bar(5, 5, 4), "████");
        assert_eq!(progress_bar(1, 2, 4), "██░░");
    }
}
