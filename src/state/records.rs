use crate::borg::ArchiveInfo;
use crate::pool::RepoRef;
use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use std::path::PathBuf;

/// Seconds since the epoch of a naive local timestamp, as stored in SQLite.
pub fn to_epoch(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp()
}

pub fn from_epoch(secs: i64) -> NaiveDateTime {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoRecord {
    pub id: i64,
    pub host: String,
    pub name: String,
    pub path: PathBuf,
    pub borg_id: Option<String>,
    pub total_size: u64,
    pub total_csize: u64,
    pub unique_csize: u64,
    pub disk_usage: u64,
    pub last_updated: Option<NaiveDateTime>,
}

impl RepoRecord {
    pub fn label(&self) -> String {
        format!("{} - {}", self.host, self.name)
    }

    pub fn repo_ref(&self) -> RepoRef {
        RepoRef {
            host: self.host.clone(),
            name: self.name.clone(),
            path: self.path.clone(),
        }
    }
}

/// Repository-wide figures recorded after an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoStats {
    pub borg_id: Option<String>,
    pub total_size: u64,
    pub total_csize: u64,
    pub unique_csize: u64,
    pub disk_usage: u64,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupRecord {
    pub archive_name: String,
    pub archive_id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_secs: f64,
    pub nfiles: u64,
    pub original_size: u64,
    pub compressed_size: u64,
    pub dedup_size: u64,
    pub command_line: String,
    pub hostname: Option<String>,
    pub username: Option<String>,
}

impl BackupRecord {
    /// Wall-clock duration, falling back to borg's figure when end precedes start.
    pub fn duration(&self) -> chrono::Duration {
        let span = self.end - self.start;
        if span < chrono::Duration::zero() {
            chrono::Duration::milliseconds((self.duration_secs * 1000.0) as i64)
        } else {
            span
        }
    }
}

impl From<&ArchiveInfo> for BackupRecord {
    fn from(info: &ArchiveInfo) -> Self {
        Self {
            archive_name: info.name.clone(),
            archive_id: info.id.clone(),
            start: info.start,
            end: info.end,
            duration_secs: info.duration,
            nfiles: info.stats.nfiles,
            original_size: info.stats.original_size,
            compressed_size: info.stats.compressed_size,
            dedup_size: info.stats.deduplicated_size,
            command_line: info.command_line(),
            hostname: info.hostname.clone(),
            username: info.username.clone(),
        }
    }
}
