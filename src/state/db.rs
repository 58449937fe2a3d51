use super::records::{from_epoch, to_epoch, BackupRecord, RepoRecord, RepoStats};
use crate::{pool::RepoRef, Result, SummaryError};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const SCHEMA_SQL: &str = include_str!("schema.sql");

const REPO_COLUMNS: &str = "r.id, r.host, r.name, r.path, r.borg_id, r.total_size, r.total_csize,
     r.unique_csize, r.disk_usage, r.last_updated";

const BACKUP_COLUMNS: &str = "b.archive_name, b.archive_id, b.start_time, b.end_time,
     b.duration_secs, b.nfiles, b.original_size, b.compressed_size, b.dedup_size,
     b.command_line, b.hostname, b.username";

/// Number of columns in `REPO_COLUMNS`; backup columns follow in joins.
const REPO_COLUMN_COUNT: usize = 10;

fn repo_from_row(row: &Row<'_>) -> rusqlite::Result<RepoRecord> {
    let path: String = row.get(3)?;
    let last_updated: Option<i64> = row.get(9)?;
    Ok(RepoRecord {
        id: row.get(0)?,
        host: row.get(1)?,
        name: row.get(2)?,
        path: PathBuf::from(path),
        borg_id: row.get(4)?,
        total_size: row.get::<_, i64>(5)? as u64,
        total_csize: row.get::<_, i64>(6)? as u64,
        unique_csize: row.get::<_, i64>(7)? as u64,
        disk_usage: row.get::<_, i64>(8)? as u64,
        last_updated: last_updated.map(from_epoch),
    })
}

fn backup_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<BackupRecord> {
    Ok(BackupRecord {
        archive_name: row.get(offset)?,
        archive_id: row.get(offset + 1)?,
        start: from_epoch(row.get(offset + 2)?),
        end: from_epoch(row.get(offset + 3)?),
        duration_secs: row.get(offset + 4)?,
        nfiles: row.get::<_, i64>(offset + 5)? as u64,
        original_size: row.get::<_, i64>(offset + 6)? as u64,
        compressed_size: row.get::<_, i64>(offset + 7)? as u64,
        dedup_size: row.get::<_, i64>(offset + 8)? as u64,
        command_line: row.get(offset + 9)?,
        hostname: row.get(offset + 10)?,
        username: row.get(offset + 11)?,
    })
}

/// SQLite cache of repository and archive metadata.
#[derive(Clone)]
pub struct SummaryDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SummaryDatabase {
    pub fn new(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get_or_create_repo(&self, repo: &RepoRef) -> Result<RepoRecord> {
        let path = repo.path.to_string_lossy().to_string();
        {
            let conn = self.conn();
            conn.execute(
                "INSERT INTO repos (host, name, path) VALUES (?1, ?2, ?3)
                 ON CONFLICT(path) DO UPDATE SET host = excluded.host, name = excluded.name",
                params![repo.host, repo.name, path],
            )?;
        }
        self.get_repo_by_path(&repo.path)
    }

    pub fn get_repo_by_path(&self, path: &Path) -> Result<RepoRecord> {
        let conn = self.conn();
        let sql = format!("SELECT {REPO_COLUMNS} FROM repos r WHERE r.path = ?1");

        conn.query_row(&sql, [path.to_string_lossy().to_string()], repo_from_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    SummaryError::RepoNotFound(path.to_path_buf())
                }
                e => SummaryError::Database(e),
            })
    }

    pub fn list_repos(&self) -> Result<Vec<RepoRecord>> {
        let conn = self.conn();
        let sql = format!("SELECT {REPO_COLUMNS} FROM repos r ORDER BY r.host, r.name");

        let mut stmt = conn.prepare(&sql)?;
        let repos = stmt.query_map([], repo_from_row)?;

        let mut result = Vec::new();
        for repo in repos {
            result.push(repo?);
        }

        Ok(result)
    }

    pub fn update_repo_stats(&self, repo_id: i64, stats: &RepoStats) -> Result<()> {
        let conn = self.conn();

        let rows_affected = conn.execute(
            "UPDATE repos
             SET borg_id = ?2, total_size = ?3, total_csize = ?4, unique_csize = ?5,
                 disk_usage = ?6, last_updated = ?7
             WHERE id = ?1",
            params![
                repo_id,
                stats.borg_id,
                stats.total_size as i64,
                stats.total_csize as i64,
                stats.unique_csize as i64,
                stats.disk_usage as i64,
                to_epoch(stats.updated_at),
            ],
        )?;

        if rows_affected == 0 {
            return Err(SummaryError::InvalidConfig(format!(
                "no repository with id {}",
                repo_id
            )));
        }

        Ok(())
    }

    /// Insert an archive or refresh the stored copy of it.
    pub fn upsert_backup(&self, repo_id: i64, backup: &BackupRecord) -> Result<()> {
        let conn = self.conn();

        conn.execute(
            "INSERT INTO backups
             (repo_id, archive_name, archive_id, start_time, end_time, duration_secs, nfiles,
              original_size, compressed_size, dedup_size, command_line, hostname, username)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(repo_id, archive_name) DO UPDATE SET
                archive_id = excluded.archive_id,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                duration_secs = excluded.duration_secs,
                nfiles = excluded.nfiles,
                original_size = excluded.original_size,
                compressed_size = excluded.compressed_size,
                dedup_size = excluded.dedup_size,
                command_line = excluded.command_line,
                hostname = excluded.hostname,
                username = excluded.username",
            params![
                repo_id,
                backup.archive_name,
                backup.archive_id,
                to_epoch(backup.start),
                to_epoch(backup.end),
                backup.duration_secs,
                backup.nfiles as i64,
                backup.original_size as i64,
                backup.compressed_size as i64,
                backup.dedup_size as i64,
                backup.command_line,
                backup.hostname,
                backup.username,
            ],
        )?;

        Ok(())
    }

    pub fn archive_names(&self, repo_id: i64) -> Result<HashSet<String>> {
        let conn = self.conn();

        let mut stmt = conn.prepare("SELECT archive_name FROM backups WHERE repo_id = ?1")?;
        let names = stmt.query_map([repo_id], |row| row.get(0))?;

        let mut result = HashSet::new();
        for name in names {
            result.insert(name?);
        }

        Ok(result)
    }

    /// Drop archives that are no longer present in the repository.
    pub fn prune_backups(&self, repo_id: i64, keep: &HashSet<String>) -> Result<usize> {
        let stored = self.archive_names(repo_id)?;
        let conn = self.conn();

        let mut removed = 0;
        for name in stored.difference(keep) {
            removed += conn.execute(
                "DELETE FROM backups WHERE repo_id = ?1 AND archive_name = ?2",
                params![repo_id, name],
            )?;
        }

        Ok(removed)
    }

    pub fn list_backups(&self, repo_id: i64) -> Result<Vec<BackupRecord>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {BACKUP_COLUMNS} FROM backups b WHERE b.repo_id = ?1
             ORDER BY b.start_time, b.archive_name"
        );

        let mut stmt = conn.prepare(&sql)?;
        let backups = stmt.query_map([repo_id], |row| backup_from_row(row, 0))?;

        let mut result = Vec::new();
        for backup in backups {
            result.push(backup?);
        }

        Ok(result)
    }

    pub fn last_backup(&self, repo_id: i64) -> Result<Option<BackupRecord>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {BACKUP_COLUMNS} FROM backups b WHERE b.repo_id = ?1
             ORDER BY b.start_time DESC, b.archive_name DESC LIMIT 1"
        );

        let backup = conn
            .query_row(&sql, [repo_id], |row| backup_from_row(row, 0))
            .optional()?;

        Ok(backup)
    }

    pub fn count_backups(&self, repo_id: i64) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM backups WHERE repo_id = ?1",
            [repo_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Every archive started at or after `since`, with its repository.
    pub fn backups_since(&self, since: NaiveDateTime) -> Result<Vec<(RepoRecord, BackupRecord)>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {REPO_COLUMNS}, {BACKUP_COLUMNS}
             FROM backups b JOIN repos r ON r.id = b.repo_id
             WHERE b.start_time >= ?1
             ORDER BY b.start_time, r.host, r.name"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([to_epoch(since)], |row| {
            Ok((repo_from_row(row)?, backup_from_row(row, REPO_COLUMN_COUNT)?))
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }

        Ok(result)
    }

    pub fn delete_repo(&self, path: &Path) -> Result<()> {
        let conn = self.conn();

        let rows_affected =
            conn.execute("DELETE FROM repos WHERE path = ?1", [path.to_string_lossy().to_string()])?;

        if rows_affected == 0 {
            return Err(SummaryError::RepoNotFound(path.to_path_buf()));
        }

        Ok(())
    }
}
