// Tarball snapshots of the newest archive of each repository
use crate::{borg::BorgRunner, pool::RepoRef, Result, SummaryError};
use chrono::{DateTime, Local, NaiveDateTime};
use flate2::read::GzDecoder;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};


pub const TARBALL_SUFFIX: &str = ".tar.gz";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TarballInfo {
    pub host: String,
    pub repo: String,
    pub file: PathBuf,
    pub size: u64,
    pub modified: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TarballStats {
    pub entries: u64,
    pub payload_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExportOutcome {
    Exported { path: PathBuf, removed: Vec<PathBuf> },
    AlreadyExported { path: PathBuf, removed: Vec<PathBuf> },
    Locked,
    Empty,
}

impl std::fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportOutcome::Exported { path, removed } => write!(
                f,
                "exported {} ({} old tarball(s) removed)",
                path.display(),
                removed.len()
            ),
            ExportOutcome::AlreadyExported { path, .. } => {
                write!(f, "already exported {}", path.display())
            }
            ExportOutcome::Locked => write!(f, "skipped, locked by borg"),
            ExportOutcome::Empty => write!(f, "skipped, no archives"),
        }
    }
}

/// Directory holding the tarballs of one repository.
pub fn repo_dir(dir: &Path, repo: &RepoRef) -> PathBuf {
    dir.join(&repo.host).join(&repo.name)
}

/// File name for an archive's tarball; path separators are replaced.
pub fn tarball_name(archive: &str) -> String {
    let safe: String = archive
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}{}", safe, TARBALL_SUFFIX)
}

fn is_tarball(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| !n.starts_with('.') && n.ends_with(TARBALL_SUFFIX))
        .unwrap_or(false)
}

fn modified(path: &Path) -> Result<NaiveDateTime> {
    let mtime = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(mtime).naive_local())
}

/// Tarballs in one repository directory, oldest first.
fn repo_tarballs(dir: &Path) -> Result<Vec<(NaiveDateTime, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut tarballs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_tarball(&path) {
            tarballs.push((modified(&path)?, path));
        }
    }
    tarballs.sort();
    Ok(tarballs)
}

/// Delete the oldest tarballs beyond `keep`; `keep == 0` keeps everything.
pub fn prune(dir: &Path, keep: usize) -> Result<Vec<PathBuf>> {
    if keep == 0 {
        return Ok(Vec::new());
    }

    let tarballs = repo_tarballs(dir)?;
    let excess = tarballs.len().saturating_sub(keep);

    let mut removed = Vec::new();
    for (_, path) in tarballs.into_iter().take(excess) {
        tracing::info!(path = %path.display(), "Removing old tarball");
        fs::remove_file(&path)?;
        removed.push(path);
    }
    Ok(removed)
}

/// Export the newest archive of `repo` below `dir` and prune old tarballs.
pub async fn export_latest(
    runner: &BorgRunner,
    repo: &RepoRef,
    dir: &Path,
    keep: usize,
) -> Result<ExportOutcome> {
    if repo.is_locked() {
        tracing::warn!(repo = %repo.label(), "Repository is locked by borg, skipping export");
        return Ok(ExportOutcome::Locked);
    }

    let archives = runner.list_archives(&repo.path).await?;
    let Some(latest) = archives.iter().max_by(|a, b| a.start.cmp(&b.start)) else {
        tracing::warn!(repo = %repo.label(), "Repository has no archives, skipping export");
        return Ok(ExportOutcome::Empty);
    };

    let target_dir = repo_dir(dir, repo);
    let name = tarball_name(&latest.name);
    let target = target_dir.join(&name);

    if target.exists() {
        tracing::debug!(path = %target.display(), "Tarball already present");
        let removed = prune(&target_dir, keep)?;
        return Ok(ExportOutcome::AlreadyExported {
            path: target,
            removed,
        });
    }

    fs::create_dir_all(&target_dir)?;

    // Hidden while borg writes it; the suffix still selects gzip
    let partial = target_dir.join(format!(".{}", name));
    tracing::info!(
        repo = %repo.label(),
        archive = %latest.name,
        path = %target.display(),
        "Exporting archive"
    );

    if let Err(e) = runner.export_tar(&repo.path, &latest.name, &partial).await {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    if !partial.is_file() {
        return Err(SummaryError::Tarball(format!(
            "borg export-tar did not create {}",
            partial.display()
        )));
    }
    fs::rename(&partial, &target)?;

    let removed = prune(&target_dir, keep)?;
    Ok(ExportOutcome::Exported {
        path: target,
        removed,
    })
}

/// Every tarball below `dir`, ordered by host, repository and age.
pub fn list_tarballs(dir: &Path) -> Result<Vec<TarballInfo>> {
    if !dir.is_dir() {
        return Err(SummaryError::PoolNotFound(dir.to_path_buf()));
    }

    let mut result = Vec::new();
    for host in sorted_dirs(dir)? {
        for repo in sorted_dirs(&host)? {
            for (modified, file) in repo_tarballs(&repo)? {
                result.push(TarballInfo {
                    host: dir_name(&host),
                    repo: dir_name(&repo),
                    size: fs::metadata(&file)?.len(),
                    file,
                    modified,
                });
            }
        }
    }
    Ok(result)
}

fn sorted_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Count the entries of a gzip tarball and sum their sizes.
pub fn inspect(path: &Path) -> Result<TarballStats> {
    let file = File::open(path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    let mut stats = TarballStats::default();
    let entries = archive
        .entries()
        .map_err(|e| SummaryError::Tarball(format!("{}: {}", path.display(), e)))?;
    for entry in entries {
        let entry = entry.map_err(|e| SummaryError::Tarball(format!("{}: {}", path.display(), e)))?;
        stats.entries += 1;
        stats.payload_bytes += entry.header().size().unwrap_or(0);
    }
    Ok(stats)
}
