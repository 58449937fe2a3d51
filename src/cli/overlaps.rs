use super::Context;
use crate::format::{self, OutputFormat};
use crate::report::{self, Span};
use anyhow::Result;

pub fn execute(ctx: &Context, days: u32) -> Result<()> {
    if days == 0 {
        anyhow::bail!("--days must be at least 1");
    }

    let since = report::window_start(ctx.now(), days)?;
    let spans: Vec<Span> = ctx
        .db
        .backups_since(since)?
        .iter()
        .map(|(repo, backup)| Span::new(repo, backup))
        .collect();

    tracing::debug!(archives = spans.len(), days = days, "Looking for overlapping backups");
    let overlaps = report::find_overlaps(spans);

    match ctx.format {
        OutputFormat::Json => format::print_json(&overlaps)?,
        OutputFormat::Table => print!("{}", report::render_overlaps(&overlaps, days)),
    }

    Ok(())
}
