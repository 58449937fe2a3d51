// CLI module - command handlers
pub mod check;
pub mod detail;
pub mod forget;
pub mod overlaps;
pub mod start_times;
pub mod summary;
pub mod tarball;
pub mod update;

use crate::{
    borg::BorgRunner,
    config::Config,
    format::OutputFormat,
    pool::{self, RepoRef},
    state::{RepoRecord, SummaryDatabase},
};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Everything a command handler needs.
pub struct Context {
    pub config: Config,
    pub db: SummaryDatabase,
    pub runner: BorgRunner,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(config: Config, db: SummaryDatabase, format: OutputFormat) -> Self {
        let runner = BorgRunner::new(config.borg_command.clone(), config.borg_env());
        Self {
            config,
            db,
            runner,
            format,
        }
    }

    pub fn now(&self) -> chrono::NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    /// Repositories selected by `--repo` or `--pool`, falling back to the
    /// configured pool.
    pub fn resolve_repos(&self, pool: Option<&Path>, repo: Option<&Path>) -> Result<Vec<RepoRef>> {
        if let Some(repo) = repo {
            return Ok(vec![RepoRef::from_path(repo)?]);
        }

        let pool = self.pool(pool)?;
        Ok(pool::discover(&pool)?)
    }

    pub fn pool(&self, pool: Option<&Path>) -> Result<PathBuf> {
        pool.map(Path::to_path_buf)
            .or_else(|| self.config.pool.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("No pool given; pass --pool or set `pool` in the config file")
            })
    }

    /// Stored records for the selected repositories.
    ///
    /// Without `--pool`/`--repo` and no configured pool, every stored
    /// repository is used.
    pub fn select_records(
        &self,
        pool: Option<&Path>,
        repo: Option<&Path>,
    ) -> Result<Vec<RepoRecord>> {
        if repo.is_none() && pool.is_none() && self.config.pool.is_none() {
            return Ok(self.db.list_repos()?);
        }

        let mut records = Vec::new();
        for repo in self.resolve_repos(pool, repo)? {
            records.push(self.db.get_or_create_repo(&repo)?);
        }
        Ok(records)
    }
}
