use super::Context;
use crate::format::{self, OutputFormat};
use crate::{pool::RepoRef, report};
use anyhow::Result;
use std::path::Path;

pub fn execute(ctx: &Context, repo_path: &Path) -> Result<()> {
    let repo = RepoRef::from_path(repo_path)?;
    let record = ctx.db.get_repo_by_path(&repo.path).map_err(|_| {
        anyhow::anyhow!(
            "No summary data for {}. Run:\n  borg-summary update --repo {}",
            repo.label(),
            repo_path.display()
        )
    })?;

    let detail = report::detail(&ctx.db, &record)?;

    match ctx.format {
        OutputFormat::Json => format::print_json(&detail)?,
        OutputFormat::Table => print!("{}", report::render_detail(&detail)),
    }

    Ok(())
}
