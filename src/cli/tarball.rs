use super::Context;
use crate::format::{self, format_storage, format_time, new_table, OutputFormat};
use crate::tarball::{self, ExportOutcome, TarballInfo, TarballStats};
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

fn tarball_dir(ctx: &Context, dir: Option<&Path>) -> Result<PathBuf> {
    dir.map(Path::to_path_buf)
        .or_else(|| ctx.config.tarball.dir.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("No tarball directory; pass --dir or set [tarball] dir in the config file")
        })
}

#[derive(Serialize)]
struct ExportReport {
    repo: String,
    #[serde(flatten)]
    outcome: Option<ExportOutcome>,
    error: Option<String>,
}

pub async fn export(
    ctx: &Context,
    pool: Option<&Path>,
    repo: Option<&Path>,
    dir: Option<&Path>,
    keep: Option<usize>,
) -> Result<()> {
    let dir = tarball_dir(ctx, dir)?;
    let keep = keep.unwrap_or(ctx.config.tarball.keep);
    let repos = ctx.resolve_repos(pool, repo)?;

    let mut failures = 0;
    let mut reports = Vec::new();
    for repo in repos {
        let result = tarball::export_latest(&ctx.runner, &repo, &dir, keep).await;
        if ctx.format == OutputFormat::Table {
            match &result {
                Ok(outcome) => println!("{}: {}", repo.label(), outcome),
                Err(e) => println!("Error exporting {}: {}", repo.label(), e),
            }
        }
        match result {
            Ok(outcome) => reports.push(ExportReport {
                repo: repo.label(),
                outcome: Some(outcome),
                error: None,
            }),
            Err(e) => {
                failures += 1;
                tracing::error!(repo = %repo.label(), "Export failed: {}", e);
                reports.push(ExportReport {
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
        anyhow::bail!("{} tarball export(s) failed", failures);
    }

    Ok(())
}

#[derive(Serialize)]
struct ListedTarball {
    #[serde(flatten)]
    info: TarballInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<TarballStats>,
}

pub fn list(ctx: &Context, dir: Option<&Path>, inspect: bool) -> Result<()> {
    let dir = tarball_dir(ctx, dir)?;

    let mut listed = Vec::new();
    for info in tarball::list_tarballs(&dir)? {
        let stats = if inspect {
            match tarball::inspect(&info.file) {
                Ok(stats) => Some(stats),
                Err(e) => {
                    tracing::warn!(file = %info.file.display(), "Cannot read tarball: {}", e);
                    None
                }
            }
        } else {
            None
        };
        listed.push(ListedTarball { info, stats });
    }

    match ctx.format {
        OutputFormat::Json => format::print_json(&listed)?,
        OutputFormat::Table => {
            if listed.is_empty() {
                println!("No tarballs found in {}.", dir.display());
                return Ok(());
            }

            let mut header = vec!["host", "repo", "file", "size", "created"];
            if inspect {
                header.extend(["entries", "content"]);
            }
            let mut table = new_table(header);
            for item in &listed {
                let mut row = vec![
                    item.info.host.clone(),
                    item.info.repo.clone(),
                    item.info
                        .file
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    format_storage(item.info.size),
                    format_time(&item.info.modified),
                ];
                if inspect {
                    match &item.stats {
                        Some(stats) => {
                            row.push(stats.entries.to_string());
                            row.push(format_storage(stats.payload_bytes));
                        }
                        None => {
                            row.push("unreadable".to_string());
                            row.push("-".to_string());
                        }
                    }
                }
                table.add_row(row);
            }
            println!("{table}");
        }
    }

    Ok(())
}
