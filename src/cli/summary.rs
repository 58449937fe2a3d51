use super::Context;
use crate::format::{self, OutputFormat};
use crate::report::{self, RepoDetail};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct FullSummary {
    summary: report::PoolSummary,
    details: Vec<RepoDetail>,
}

/// Summary table for all repositories followed by the detail of each one.
pub fn execute(ctx: &Context, pool: Option<&Path>, brief: bool) -> Result<()> {
    let records = ctx.select_records(pool, None)?;
    if records.is_empty() {
        println!("No repositories found.");
        return Ok(());
    }

    // Cached per-repository sizes stand in for walking the whole pool
    let pool_disk_usage: u64 = records.iter().map(|r| r.disk_usage).sum();
    let summary = report::summarize(&ctx.db, &records, Some(pool_disk_usage))?;

    let mut details = Vec::new();
    if !brief {
        for record in &records {
            details.push(report::detail(&ctx.db, record)?);
        }
    }

    match ctx.format {
        OutputFormat::Json => format::print_json(&FullSummary { summary, details })?,
        OutputFormat::Table => {
            print!("{}", report::render_summary(&summary));
            for detail in details.iter().filter(|d| !d.backups.is_empty()) {
                println!();
                print!("{}", report::render_detail(detail));
            }
        }
    }

    Ok(())
}
