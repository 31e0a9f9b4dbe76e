//! `odcaf get`: print one facility.

use anyhow::Result;

use crate::traits::ToolContext;

/// Print the facility's markdown, then its raw identifiers.
pub fn run_get(ctx: &ToolContext, id: &str) -> Result<()> {
    let fetched = ctx.fetch_str(id)?;
    let f = &fetched.facility;

    println!("{}", fetched.content);
    println!();
    println!("--- Source ---");
    println!("id:            {}", f.id);
    if !f.source_facility_type.is_empty() {
        println!("source type:   {}", f.source_facility_type);
    }
    if !f.csd_name.is_empty() {
        println!("subdivision:   {} ({})", f.csd_name, f.csduid);
    }
    if !f.pruid.is_empty() {
        println!("pruid:         {}", f.pruid);
    }
    Ok(())
}
