//! Dataset overview commands: `odcaf stats`, `odcaf types`, `odcaf provinces`.

use anyhow::Result;

use odcaf_core::format::{group_thousands, province_name};

use crate::traits::ToolContext;

pub fn run_stats(ctx: &ToolContext) -> Result<()> {
    let stats = ctx.stats();

    println!("ODCAF Dataset Stats");
    println!("===================");
    println!();
    println!("  Facilities:  {}", group_thousands(stats.total_facilities));
    println!("  Skipped:     {} rows", ctx.index().skipped_rows());
    println!();

    let mut by_type: Vec<(&String, &usize)> = stats.by_type.iter().collect();
    by_type.sort_by(|a, b| b.1.cmp(a.1));
    println!("  By type:");
    for (facility_type, count) in by_type {
        println!("    {:<40} {:>7}", facility_type, group_thousands(*count));
    }
    println!();

    let mut by_province: Vec<(&String, &usize)> = stats.by_province.iter().collect();
    by_province.sort_by(|a, b| b.1.cmp(a.1));
    println!("  By province:");
    for (code, count) in by_province {
        println!("    {:<4} {:<30} {:>7}", code, province_name(code), group_thousands(*count));
    }
    println!();

    println!("  Top cities:");
    for (i, city) in stats.top_cities.iter().enumerate() {
        println!("    {:>2}. {:<35} {:>7}", i + 1, city.city, group_thousands(city.count));
    }

    Ok(())
}

pub fn run_types(ctx: &ToolContext) -> Result<()> {
    let types = ctx.list_types();
    if types.is_empty() {
        println!("No facility types.");
        return Ok(());
    }
    for t in &types {
        println!("{}", t);
    }
    Ok(())
}

pub fn run_provinces(ctx: &ToolContext) -> Result<()> {
    let provinces = ctx.list_provinces();
    if provinces.is_empty() {
        println!("No provinces.");
        return Ok(());
    }
    for p in &provinces {
        println!("{:<4} {:<30} {:>7}", p.code, province_name(&p.code), group_thousands(p.count));
    }
    Ok(())
}
