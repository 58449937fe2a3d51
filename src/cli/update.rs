use super::Context;
use crate::format::{self, OutputFormat};
use crate::sync::{UpdateOutcome, Updater};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct UpdateReport {
    repo: String,
    #[serde(flatten)]
    outcome: Option<UpdateOutcome>,
    error: Option<String>,
}

pub async fn execute(
    ctx: &Context,
    pool: Option<&Path>,
    repo: Option<&Path>,
    auto: bool,
    jobs: Option<usize>,
) -> Result<()> {
    let repos = ctx.resolve_repos(pool, repo)?;
    let jobs = jobs.unwrap_or(ctx.config.jobs).max(1);
    let refresh_after = if auto {
        Some(ctx.config.refresh_after()?)
    } else {
        None
    };

    tracing::info!(repos = repos.len(), jobs = jobs, auto = auto, "Updating repositories");

    let updater = Updater::new(ctx.runner.clone(), ctx.db.clone());
    let results = updater
        .update_pool(repos, jobs, refresh_after, ctx.now())
        .await;

    let mut failures = 0;
    let mut reports = Vec::new();
    for (repo, result) in results {
        match result {
            Ok(outcome) => {
                if ctx.format == OutputFormat::Table {
                    if outcome == UpdateOutcome::Locked {
                        println!(
                            "Warning: Could not update {}; perhaps it is locked by borgbackup?",
                            repo.label()
                        );
                    } else {
                        println!("{}: {}", repo.label(), outcome);
                    }
                }
                reports.push(UpdateReport {
                    repo: repo.label(),
                    outcome: Some(outcome),
                    error: None,
                });
            }
            Err(e) => {
                failures += 1;
                tracing::error!(repo = %repo.label(), "Update failed: {}", e);
                if ctx.format == OutputFormat::Table {
                    println!("Error updating {}: {}", repo.label(), e);
                }
                reports.push(UpdateReport {
                    repo: repo.label(),
                    outcome: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    if ctx.format == OutputFormat::Json {
        format::print_json(&reports)?;
    }

    if failures > 0 {
        anyhow::bail!("{} repository update(s) failed", failures);
    }

    Ok(())
}
