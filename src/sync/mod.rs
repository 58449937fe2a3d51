// Refreshes the summary store from borg
use crate::{
    borg::BorgRunner,
    pool::{self, RepoRef},
    state::{BackupRecord, RepoStats, SummaryDatabase},
    Result, SummaryError,
};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    Updated {
        added: usize,
        pruned: usize,
        total: usize,
    },
    /// borg holds the exclusive lock, a backup is probably running.
    Locked,
    /// Stored data is newer than the refresh threshold.
    Fresh,
}

impl std::fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateOutcome::Updated {
                added,
                pruned,
                total,
            } => write!(f, "updated ({} new, {} pruned, {} total)", added, pruned, total),
            UpdateOutcome::Locked => write!(f, "skipped, locked by borg"),
            UpdateOutcome::Fresh => write!(f, "up to date"),
        }
    }
}

#[derive(Clone)]
pub struct Updater {
    runner: BorgRunner,
    db: SummaryDatabase,
}

impl Updater {
    pub fn new(runner: BorgRunner, db: SummaryDatabase) -> Self {
        Self { runner, db }
    }

    /// Bring the stored archives of one repository in line with borg.
    ///
    /// Only archives not stored yet are queried with `borg info`.
    pub async fn update_repo(&self, repo: &RepoRef, now: NaiveDateTime) -> Result<UpdateOutcome> {
        if repo.is_locked() {
            tracing::warn!(repo = %repo.label(), "Repository is locked by borg, skipping");
            return Ok(UpdateOutcome::Locked);
        }

        let record = self.db.get_or_create_repo(repo)?;
        let listing = self.runner.list_archives(&repo.path).await?;
        let known = self.db.archive_names(record.id)?;

        let mut added = 0;
        for archive in listing.iter().filter(|a| !known.contains(&a.name)) {
            tracing::debug!(repo = %repo.label(), archive = %archive.name, "Fetching archive info");
            let info = self.runner.archive_info(&repo.path, &archive.name).await?;
            self.db.upsert_backup(record.id, &BackupRecord::from(&info))?;
            added += 1;
        }

        let present: HashSet<String> = listing.iter().map(|a| a.name.clone()).collect();
        let pruned = self.db.prune_backups(record.id, &present)?;

        let info = self.runner.repo_info(&repo.path).await?;
        let path = repo.path.clone();
        let disk_usage = match tokio::task::spawn_blocking(move || pool::disk_usage(&path)).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    repo = %repo.label(),
                    "Disk usage unavailable, keeping previous value: {}",
                    e
                );
                record.disk_usage
            }
        };

        self.db.update_repo_stats(
            record.id,
            &RepoStats {
                borg_id: Some(info.repository.id),
                total_size: info.stats.total_size,
                total_csize: info.stats.total_csize,
                unique_csize: info.stats.unique_csize,
                disk_usage,
                updated_at: now,
            },
        )?;

        tracing::info!(
            repo = %repo.label(),
            added = added,
            pruned = pruned,
            total = present.len(),
            "Repository updated"
        );

        Ok(UpdateOutcome::Updated {
            added,
            pruned,
            total: present.len(),
        })
    }

    /// Update only when the stored data is missing or older than `refresh_after`.
    pub async fn update_repo_if_stale(
        &self,
        repo: &RepoRef,
        refresh_after: chrono::Duration,
        now: NaiveDateTime,
    ) -> Result<UpdateOutcome> {
        let record = self.db.get_or_create_repo(repo)?;
        if let Some(updated) = record.last_updated {
            if now - updated <= refresh_after {
                tracing::debug!(repo = %repo.label(), "Stored data is fresh");
                return Ok(UpdateOutcome::Fresh);
            }
        }
        self.update_repo(repo, now).await
    }

    /// Update many repositories, at most `jobs` at a time.
    ///
    /// Results keep the order of `repos`; a failure in one repository does
    /// not stop the others.
    pub async fn update_pool(
        &self,
        repos: Vec<RepoRef>,
        jobs: usize,
        refresh_after: Option<chrono::Duration>,
        now: NaiveDateTime,
    ) -> Vec<(RepoRef, Result<UpdateOutcome>)> {
        let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
        let mut tasks = JoinSet::new();

        for (index, repo) in repos.iter().cloned().enumerate() {
            let updater = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let outcome = match refresh_after {
                    Some(threshold) => updater.update_repo_if_stale(&repo, threshold, now).await,
                    None => updater.update_repo(&repo, now).await,
                };
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<Result<UpdateOutcome>>> = repos.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => tracing::error!("Update task failed: {}", e),
            }
        }

        repos
            .into_iter()
            .zip(outcomes)
            .map(|(repo, outcome)| {
                let outcome = outcome.unwrap_or_else(|| {
                    Err(SummaryError::Io(std::io::Error::other("update task aborted")))
                });
                (repo, outcome)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_json_shape() {
        let updated = UpdateOutcome::Updated {
            added: 2,
            pruned: 1,
            total: 5,
        };
        assert_eq!(
            serde_json::to_value(&updated).unwrap(),
            serde_json::json!({"outcome": "updated", "added": 2, "pruned": 1, "total": 5})
        );
        assert_eq!(
            serde_json::to_value(UpdateOutcome::Locked).unwrap(),
            serde_json::json!({"outcome": "locked"})
        );
        assert_eq!(updated.to_string(), "updated (2 new, 1 pruned, 5 total)");
    }
}
