// Discovery of repositories laid out as <pool>/<host>/<repo>
use crate::{Result, SummaryError};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;


/// File borg keeps in a repository while it holds the exclusive lock.
pub const LOCK_FILE: &str = "lock.exclusive";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoRef {
    pub host: String,
    pub name: String,
    pub path: PathBuf,
}

impl RepoRef {
    /// Describe the repository at `path`; host is the parent directory name.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(SummaryError::PoolNotFound(path.to_path_buf()));
        }

        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let name = file_name(&path)?;
        let host = path
            .parent()
            .map(file_name)
            .transpose()?
            .unwrap_or_else(|| name.clone());

        Ok(Self { host, name, path })
    }

    /// `"<host> - <repo>"`, used in every report.
    pub fn label(&self) -> String {
        format!("{} - {}", self.host, self.name)
    }

    pub fn is_locked(&self) -> bool {
        self.path.join(LOCK_FILE).exists()
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            SummaryError::InvalidConfig(format!("not a repository path: {}", path.display()))
        })
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
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

/// List every repository in a pool, sorted by host then repository name.
pub fn discover(pool: &Path) -> Result<Vec<RepoRef>> {
    if !pool.is_dir() {
        return Err(SummaryError::PoolNotFound(pool.to_path_buf()));
    }

    let mut repos = Vec::new();
    for host_dir in sorted_subdirs(pool)? {
        for repo_dir in sorted_subdirs(&host_dir)? {
            repos.push(RepoRef::from_path(&repo_dir)?);
        }
    }

    tracing::debug!(pool = %pool.display(), count = repos.len(), "Discovered repositories");
    Ok(repos)
}

/// Apparent size in bytes of all regular files below `path`.
///
/// Entries that cannot be read are skipped, so the result is a lower bound
/// when borg's umask hides parts of the repository from this user.
pub fn disk_usage(path: &Path) -> u64 {
    let mut total = 0u64;
    let mut skipped = 0usize;
    for entry in WalkDir::new(path).follow_links(false) {
        let metadata = match entry.and_then(|e| e.metadata()) {
            Ok(metadata) => metadata,
            Err(e) => {
                // A missing root is simply empty
                if e.depth() > 0 || path.exists() {
                    tracing::debug!(path = ?e.path(), "Skipping unreadable entry: {}", e);
                    skipped += 1;
                }
                continue;
            }
        };
        if metadata.is_file() {
            total += metadata.len();
        }
    }

    if skipped > 0 {
        tracing::warn!(
            path = %path.display(),
            skipped = skipped,
            "Disk usage is incomplete, some entries could not be read"
        );
    }
    total
}
