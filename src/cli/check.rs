use super::Context;
use crate::format::{self, OutputFormat};
use crate::report::check_repo;
use anyhow::Result;
use std::path::Path;

/// Print staleness warnings; returns how many were issued.
pub fn execute(
    ctx: &Context,
    pool: Option<&Path>,
    repo: Option<&Path>,
    hours: Option<u64>,
) -> Result<usize> {
    let threshold = match hours {
        Some(0) => anyhow::bail!("--hours must be at least 1"),
        Some(h) => crate::config::hours(h)?,
        None => ctx.config.stale_after()?,
    };
    let now = ctx.now();

    let mut warnings = Vec::new();
    for record in ctx.select_records(pool, repo)? {
        let last = ctx.db.last_backup(record.id)?;
        warnings.extend(check_repo(&record, last.as_ref(), threshold, now));
    }

    match ctx.format {
        OutputFormat::Json => format::print_json(&warnings)?,
        OutputFormat::Table => {
            for warning in &warnings {
                println!("{}", warning);
            }
        }
    }

    Ok(warnings.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pool::RepoRef;
    use crate::state::{BackupRecord, RepoStats, SummaryDatabase};
    use chrono::NaiveDateTime;
    use std::path::PathBuf;

    fn seed(db: &SummaryDatabase, host: &str, last_start: NaiveDateTime, now: NaiveDateTime) {
        let repo = db
            .get_or_create_repo(&RepoRef {
                host: host.to_string(),
                name: host.to_string(),
                path: PathBuf::from(format!("/srv/borg/{}/{}", host, host)),
            })
            .unwrap();
        db.update_repo_stats(
            repo.id,
            &RepoStats {
                updated_at: now,
                ..RepoStats::default()
            },
        )
        .unwrap();
        db.upsert_backup(
            repo.id,
            &BackupRecord {
                archive_name: format!("{}-1", host),
                archive_id: "id".to_string(),
                start: last_start,
                end: last_start + chrono::Duration::minutes(10),
                duration_secs: 600.0,
                nfiles: 1,
                original_size: 1,
                compressed_size: 1,
                dedup_size: 1,
                command_line: String::new(),
                hostname: None,
                username: None,
            },
        )
        .unwrap();
    }

    fn context() -> Context {
        let db = SummaryDatabase::in_memory().unwrap();
        Context::new(Config::default(), db, OutputFormat::Json)
    }

    #[test]
    fn test_check_counts_stale_repositories() {
        let ctx = context();
        let now = ctx.now();
        seed(&ctx.db, "web", now - chrono::Duration::days(3), now);
        seed(&ctx.db, "mail", now - chrono::Duration::hours(2), now);

        assert_eq!(execute(&ctx, None, None, None).unwrap(), 1);
        assert_eq!(execute(&ctx, None, None, Some(1)).unwrap(), 2);
        assert_eq!(execute(&ctx, None, None, Some(24 * 7)).unwrap(), 0);
    }

    #[test]
    fn test_check_rejects_bad_hours() {
        let ctx = context();
        assert!(execute(&ctx, None, None, Some(0)).is_err());
        assert!(execute(&ctx, None, None, Some(u64::MAX)).is_err());
    }
}
