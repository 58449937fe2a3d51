use super::Context;
use crate::pool::RepoRef;
use anyhow::Result;
use std::path::Path;

/// Remove a repository and its archives from the summary store.
pub fn execute(ctx: &Context, repo_path: &Path) -> Result<()> {
    // The repository may already be gone from disk
    let path = match RepoRef::from_path(repo_path) {
        Ok(repo) => repo.path,
        Err(_) => repo_path.to_path_buf(),
    };

    ctx.db.delete_repo(&path)?;
    tracing::info!(path = %path.display(), "Repository removed from summary store");
    println!("Removed {} from the summary store", path.display());

    Ok(())
}
