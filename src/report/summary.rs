use crate::format::{format_duration, format_storage, format_time, gb, new_table, underlined};
use crate::state::{BackupRecord, RepoRecord, SummaryDatabase};
use crate::Result;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt::Write;

/// The newest archive of a repository plus repository-wide totals.
#[derive(Debug, Clone, Serialize)]
pub struct RepoSummary {
    pub host: String,
    pub repo: String,
    pub label: String,
    pub num_backups: usize,
    pub last_start: NaiveDateTime,
    pub last_end: NaiveDateTime,
    pub duration_secs: i64,
    pub num_files: u64,
    pub original_size: u64,
    pub dedup_size: u64,
    pub all_original_size: u64,
    pub all_dedup_size: u64,
    pub command_line: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolSummary {
    pub pool_disk_usage: Option<u64>,
    pub repos: Vec<RepoSummary>,
    /// Labels of repositories without any archive.
    pub empty: Vec<String>,
}

impl PoolSummary {
    /// True when every repository is named after its host.
    pub fn host_equals_repo(&self) -> bool {
        self.repos.iter().all(|r| r.host == r.repo)
    }
}

pub fn summarize(
    db: &SummaryDatabase,
    repos: &[RepoRecord],
    pool_disk_usage: Option<u64>,
) -> Result<PoolSummary> {
    let mut summaries = Vec::new();
    let mut empty = Vec::new();

    for repo in repos {
        let Some(last) = db.last_backup(repo.id)? else {
            empty.push(repo.label());
            continue;
        };

        summaries.push(RepoSummary {
            host: repo.host.clone(),
            repo: repo.name.clone(),
            label: repo.label(),
            num_backups: db.count_backups(repo.id)?,
            last_start: last.start,
            last_end: last.end,
            duration_secs: last.duration().num_seconds(),
            num_files: last.nfiles,
            original_size: last.original_size,
            dedup_size: last.dedup_size,
            all_original_size: repo.total_size,
            all_dedup_size: repo.unique_csize,
            command_line: last.command_line.clone(),
        });
    }

    Ok(PoolSummary {
        pool_disk_usage,
        repos: summaries,
        empty,
    })
}

pub fn render_summary(summary: &PoolSummary) -> String {
    let mut out = String::new();

    if let Some(bytes) = summary.pool_disk_usage {
        let _ = writeln!(out, "Size of all backups: {} GB\n", gb(bytes));
    }

    for label in &summary.empty {
        let _ = writeln!(out, "Warning: No backups for {}", label);
    }

    if summary.repos.is_empty() {
        out.push_str("No backups found.\n");
        return out;
    }

    let with_repo = !summary.host_equals_repo();
    let mut header = vec!["host"];
    if with_repo {
        header.push("repo");
    }
    header.extend(["last backup", "duration", "# files", "# backups", "size (GB)"]);

    let mut table = new_table(header);
    for repo in &summary.repos {
        let mut row = vec![repo.host.clone()];
        if with_repo {
            row.push(repo.repo.clone());
        }
        row.extend([
            format_time(&repo.last_start),
            format_duration(chrono::Duration::seconds(repo.duration_secs)),
            repo.num_files.to_string(),
            repo.num_backups.to_string(),
            gb(repo.all_dedup_size),
        ]);
        table.add_row(row);
    }

    let _ = writeln!(out, "{table}");
    out
}

/// Everything known about one repository.
#[derive(Debug, Clone, Serialize)]
pub struct RepoDetail {
    pub label: String,
    pub path: String,
    pub command_line: Option<String>,
    pub all_original_size: u64,
    pub all_dedup_size: u64,
    pub disk_usage: u64,
    pub last_updated: Option<NaiveDateTime>,
    pub backups: Vec<BackupRecord>,
}

pub fn detail(db: &SummaryDatabase, repo: &RepoRecord) -> Result<RepoDetail> {
    let backups = db.list_backups(repo.id)?;
    Ok(RepoDetail {
        label: repo.label(),
        path: repo.path.display().to_string(),
        command_line: backups.last().map(|b| b.command_line.clone()),
        all_original_size: repo.total_size,
        all_dedup_size: repo.unique_csize,
        disk_usage: repo.disk_usage,
        last_updated: repo.last_updated,
        backups,
    })
}

pub fn render_detail(detail: &RepoDetail) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", underlined(&detail.label));

    if detail.backups.is_empty() {
        let _ = writeln!(out, "\nWarning: No backups for {}", detail.label);
        return out;
    }

    if let Some(command_line) = &detail.command_line {
        let _ = writeln!(out, "\nCommand line: {}\n", command_line);
    }

    let _ = writeln!(
        out,
        "Size of all backups (GB):              {:>8}",
        gb(detail.all_original_size)
    );
    let _ = writeln!(
        out,
        "Deduplicated size of all backups (GB): {:>8}",
        gb(detail.all_dedup_size)
    );
    let _ = writeln!(
        out,
        "Actual size on disk (GB):              {:>8}",
        gb(detail.disk_usage)
    );
    if let Some(updated) = &detail.last_updated {
        let _ = writeln!(out, "Last updated:                   {}", format_time(updated));
    }
    out.push('\n');

    let mut table = new_table(vec!["Start time", "End time", "# files", "Orig size", "Dedup size"]);
    for backup in &detail.backups {
        table.add_row(vec![
            format_time(&backup.start),
            format_time(&backup.end),
            backup.nfiles.to_string(),
            format_storage(backup.original_size),
            format_storage(backup.dedup_size),
        ]);
    }
    let _ = writeln!(out, "{table}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::RepoRef;
    use crate::state::RepoStats;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn backup(name: &str, start: NaiveDateTime) -> BackupRecord {
        BackupRecord {
            archive_name: name.to_string(),
            archive_id: name.to_string(),
            start,
            end: start + chrono::Duration::minutes(90),
            duration_secs: 5400.0,
            nfiles: 4242,
            original_size: 2 * 1024 * 1024 * 1024,
            compressed_size: 1024 * 1024 * 1024,
            dedup_size: 1024 * 1024,
            command_line: format!("borg create ::{}", name),
            hostname: None,
            username: None,
        }
    }

    fn add_repo(db: &SummaryDatabase, host: &str, name: &str) -> RepoRecord {
        let repo = db
            .get_or_create_repo(&RepoRef {
                host: host.to_string(),
                name: name.to_string(),
                path: PathBuf::from(format!("/pool/{}/{}", host, name)),
            })
            .unwrap();
        db.update_repo_stats(
            repo.id,
            &RepoStats {
                borg_id: None,
                total_size: 10 * 1024 * 1024 * 1024,
                total_csize: 0,
                unique_csize: 3 * 1024 * 1024 * 1024,
                disk_usage: 4 * 1024 * 1024 * 1024,
                updated_at: ts(5, 0),
            },
        )
        .unwrap();
        db.get_repo_by_path(&repo.path).unwrap()
    }

    #[test]
    fn test_summarize_skips_empty_repos() {
        let db = SummaryDatabase::in_memory().unwrap();
        let web = add_repo(&db, "web", "web");
        let mail = add_repo(&db, "mail", "mail");
        db.upsert_backup(web.id, &backup("w1", ts(1, 3))).unwrap();
        db.upsert_backup(web.id, &backup("w2", ts(2, 3))).unwrap();

        let summary = summarize(&db, &[mail, web], Some(0)).unwrap();

        assert_eq!(summary.empty, vec!["mail - mail"]);
        assert_eq!(summary.repos.len(), 1);
        let web = &summary.repos[0];
        assert_eq!(web.num_backups, 2);
        assert_eq!(web.last_start, ts(2, 3));
        assert_eq!(web.duration_secs, 5400);
        assert_eq!(web.all_dedup_size, 3 * 1024 * 1024 * 1024);
        assert_eq!(web.command_line, "borg create ::w2");
    }

    #[test]
    fn test_render_summary_drops_repo_column() {
        let db = SummaryDatabase::in_memory().unwrap();
        let web = add_repo(&db, "web", "web");
        db.upsert_backup(web.id, &backup("w1", ts(1, 3))).unwrap();

        let rendered = render_summary(&summarize(&db, &[web], None).unwrap());
        assert!(rendered.contains("host"));
        assert!(!rendered.contains("repo"));
        assert!(rendered.contains("2024-03-01 03:00"));
        assert!(rendered.contains("1:30:00"));
        assert!(rendered.contains("3.0"));
    }

    #[test]
    fn test_render_summary_keeps_repo_column() {
        let db = SummaryDatabase::in_memory().unwrap();
        let etc = add_repo(&db, "db", "etc");
        db.upsert_backup(etc.id, &backup("e1", ts(1, 3))).unwrap();
        let empty = add_repo(&db, "web", "web");

        let rendered = render_summary(&summarize(&db, &[etc, empty], Some(0)).unwrap());
        assert!(rendered.starts_with("Size of all backups: 0.0 GB"));
        assert!(rendered.contains("Warning: No backups for web - web"));
        assert!(rendered.contains("repo"));
        assert!(rendered.contains("etc"));
    }

    #[test]
    fn test_detail() {
        let db = SummaryDatabase::in_memory().unwrap();
        let web = add_repo(&db, "web", "web");
        db.upsert_backup(web.id, &backup("w2", ts(2, 3))).unwrap();
        db.upsert_backup(web.id, &backup("w1", ts(1, 3))).unwrap();

        let detail = detail(&db, &web).unwrap();
        assert_eq!(detail.backups.len(), 2);
        assert_eq!(detail.command_line.as_deref(), Some("borg create ::w2"));

        let rendered = render_detail(&detail);
        assert!(rendered.starts_with("web - web\n---------\n"));
        assert!(rendered.contains("Command line: borg create ::w2"));
        assert!(rendered.contains("Size of all backups (GB):                  10.0"));
        assert!(rendered.contains("Actual size on disk (GB):                   4.0"));
        assert!(rendered.contains("2024-03-02 04:30"));
    }

    #[test]
    fn test_detail_without_backups() {
        let db = SummaryDatabase::in_memory().unwrap();
        let web = add_repo(&db, "web", "web");

        let rendered = render_detail(&detail(&db, &web).unwrap());
        assert!(rendered.contains("Warning: No backups for web - web"));
    }
}
