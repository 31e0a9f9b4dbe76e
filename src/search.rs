//! `odcaf search` and `odcaf filter`.

use anyhow::Result;

use odcaf_core::format;
use odcaf_core::query::FilterCriteria;

use crate::traits::ToolContext;

pub fn run_search(ctx: &ToolContext, query: &str, limit: Option<i64>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let result = ctx.search(query, limit)?;
    if result.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!("{}", format::results_table(&result));
    Ok(())
}

pub fn run_filter(ctx: &ToolContext, criteria: FilterCriteria, limit: Option<i64>) -> Result<()> {
    let result = ctx.filter(&criteria, limit)?;
    if result.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!("{}", format::results_table(&result));
    Ok(())
}
