use crate::{Result, SummaryError};
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Parse a borg timestamp.
///
/// borg 1.x prints naive local time with microseconds
/// (`2019-07-21T03:00:02.000000`); newer releases append an offset, which is
/// converted to local time.
pub fn parse_borg_time(value: &str) -> Result<NaiveDateTime> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Local).naive_local());
    }
    // Plain `borg info` output uses "Sun, 2019-07-21 03:00:02"
    let trimmed = value.split_once(", ").map(|(_, rest)| rest).unwrap_or(value);
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .map_err(|_| SummaryError::InvalidTimestamp(value.to_string()))
}

fn borg_time<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_borg_time(&raw).map_err(serde::de::Error::custom)
}

fn optional_borg_time<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_borg_time(&s).map_err(serde::de::Error::custom))
        .transpose()
}

/// One entry of `borg list --json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveListing {
    pub name: String,
    pub id: String,
    #[serde(deserialize_with = "borg_time")]
    pub start: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveStats {
    pub original_size: u64,
    pub compressed_size: u64,
    pub deduplicated_size: u64,
    pub nfiles: u64,
}

/// Archive metadata from `borg info --json REPO::ARCHIVE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveInfo {
    pub name: String,
    pub id: String,
    #[serde(deserialize_with = "borg_time")]
    pub start: NaiveDateTime,
    #[serde(deserialize_with = "borg_time")]
    pub end: NaiveDateTime,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub stats: ArchiveStats,
    #[serde(default)]
    pub command_line: Vec<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl ArchiveInfo {
    pub fn command_line(&self) -> String {
        self.command_line.join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    #[serde(default)]
    pub total_size: u64,
    #[serde(default)]
    pub total_csize: u64,
    #[serde(default)]
    pub unique_csize: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, deserialize_with = "optional_borg_time")]
    pub last_modified: Option<NaiveDateTime>,
}

/// Repository-wide data from `borg info --json REPO`.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoInfo {
    pub repository: Repository,
    pub stats: CacheStats,
}

#[derive(Deserialize)]
struct ListOutput {
    #[serde(default)]
    archives: Vec<ArchiveListing>,
}

#[derive(Deserialize)]
struct CacheOutput {
    #[serde(default)]
    stats: CacheStats,
}

#[derive(Deserialize)]
struct InfoOutput {
    #[serde(default)]
    archives: Vec<ArchiveInfo>,
    #[serde(default)]
    cache: Option<CacheOutput>,
    repository: Repository,
}

pub fn parse_list(output: &str) -> Result<Vec<ArchiveListing>> {
    let parsed: ListOutput = serde_json::from_str(output)?;
    Ok(parsed.archives)
}

pub fn parse_archive_info(output: &str) -> Result<ArchiveInfo> {
    let parsed: InfoOutput = serde_json::from_str(output)?;
    parsed
        .archives
        .into_iter()
        .next()
        .ok_or_else(|| SummaryError::BorgOutput("borg info returned no archive".into()))
}

pub fn parse_repo_info(output: &str) -> Result<RepoInfo> {
    let parsed: InfoOutput = serde_json::from_str(output)?;
    Ok(RepoInfo {
        repository: parsed.repository,
        stats: parsed.cache.map(|c| c.stats).unwrap_or_default(),
    })
}
