use crate::format::format_age;
use crate::state::{BackupRecord, RepoRecord};
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StaleReason {
    NoBackups,
    BackupTooOld { age_secs: i64 },
    NeverUpdated,
    DataTooOld { age_secs: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaleWarning {
    pub label: String,
    #[serde(flatten)]
    pub reason: StaleReason,
}

impl std::fmt::Display for StaleWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            StaleReason::NoBackups => write!(f, "Warning: No backups for {}", self.label),
            StaleReason::BackupTooOld { age_secs } => write!(
                f,
                "Warning: last backup of {} is {} old",
                self.label,
                format_age(chrono::Duration::seconds(*age_secs))
            ),
            StaleReason::NeverUpdated => write!(
                f,
                "Warning: no summary data for {}; run `borg-summary update`",
                self.label
            ),
            StaleReason::DataTooOld { age_secs } => write!(
                f,
                "Warning: summary data for {} is {} old",
                self.label,
                format_age(chrono::Duration::seconds(*age_secs))
            ),
        }
    }
}

/// Warnings for one repository; empty when everything is recent.
pub fn check_repo(
    repo: &RepoRecord,
    last: Option<&BackupRecord>,
    threshold: chrono::Duration,
    now: NaiveDateTime,
) -> Vec<StaleWarning> {
    let warn = |reason| StaleWarning {
        label: repo.label(),
        reason,
    };
    let mut warnings = Vec::new();

    match repo.last_updated {
        None => warnings.push(warn(StaleReason::NeverUpdated)),
        Some(updated) if now - updated > threshold => warnings.push(warn(StaleReason::DataTooOld {
            age_secs: (now - updated).num_seconds(),
        })),
        Some(_) => {}
    }

    // Without stored data there is nothing to say about the archives yet
    if repo.last_updated.is_none() {
        return warnings;
    }

    match last {
        None => warnings.push(warn(StaleReason::NoBackups)),
        Some(backup) if now - backup.start > threshold => {
            warnings.push(warn(StaleReason::BackupTooOld {
                age_secs: (now - backup.start).num_seconds(),
            }))
        }
        Some(_) => {}
    }

    warnings
}
