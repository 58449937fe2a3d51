use super::Context;
use crate::format::{self, OutputFormat};
use crate::report::{self, start_times};
use anyhow::Result;

pub fn execute(ctx: &Context, days: u32) -> Result<()> {
    if days == 0 {
        anyhow::bail!("--days must be at least 1");
    }

    let today = ctx.now().date();
    let first = start_times::first_day(today, days)?;
    let since = first.and_hms_opt(0, 0, 0).unwrap_or_default();

    let repos = ctx.db.list_repos()?;
    let backups = ctx.db.backups_since(since)?;
    let table = start_times::build(&repos, &backups, today, days)?;

    match ctx.format {
        OutputFormat::Json => format::print_json(&table)?,
        OutputFormat::Table => print!("{}", report::render_start_times(&table)),
    }

    Ok(())
}
