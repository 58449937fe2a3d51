use crate::format::{format_duration, format_time, new_table};
use crate::state::{BackupRecord, RepoRecord};
use crate::{Result, SummaryError};
use chrono::NaiveDateTime;
use serde::Serialize;

/// The time an archive was being written, as `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub label: String,
    pub archive: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Span {
    pub fn new(repo: &RepoRecord, backup: &BackupRecord) -> Self {
        Self {
            label: repo.label(),
            archive: backup.archive_name.clone(),
            start: backup.start,
            end: backup.start + backup.duration(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlap {
    pub first: Span,
    pub second: Span,
    pub overlap_start: NaiveDateTime,
    pub overlap_secs: i64,
}

/// Find every pair of spans that run at the same time.
///
/// Spans are swept in start order while keeping the ones still running; each
/// pair is reported once with the earlier span first.
pub fn find_overlaps(mut spans: Vec<Span>) -> Vec<Overlap> {
    spans.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.end.cmp(&b.end)));

    let mut active: Vec<Span> = Vec::new();
    let mut overlaps = Vec::new();

    for span in spans {
        active.retain(|a| a.end > span.start);

        for running in &active {
            let overlap_end = running.end.min(span.end);
            let overlap_secs = (overlap_end - span.start).num_seconds();
            if overlap_secs > 0 {
                overlaps.push(Overlap {
                    first: running.clone(),
                    second: span.clone(),
                    overlap_start: span.start,
                    overlap_secs,
                });
            }
        }

        if span.end > span.start {
            active.push(span);
        }
    }

    overlaps
}

/// Start of a look-back window of `days` days ending at `now`.
pub fn window_start(now: NaiveDateTime, days: u32) -> Result<NaiveDateTime> {
    chrono::Duration::try_days(days as i64)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| SummaryError::OutOfRange(format!("{} days before {}", days, now)))
}

pub fn render_overlaps(overlaps: &[Overlap], days: u32) -> String {
    if overlaps.is_empty() {
        return format!("No overlapping backups in the last {} days.\n", days);
    }

    let mut table = new_table(vec!["repository", "archive", "overlaps with", "archive", "from", "for"]);
    for overlap in overlaps {
        table.add_row(vec![
            overlap.first.label.clone(),
            overlap.first.archive.clone(),
            overlap.second.label.clone(),
            overlap.second.archive.clone(),
            format_time(&overlap.overlap_start),
            format_duration(chrono::Duration::seconds(overlap.overlap_secs)),
        ]);
    }
    format!("{table}\n")
}
