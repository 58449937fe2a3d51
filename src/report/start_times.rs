use crate::format::new_table;
use crate::state::{BackupRecord, RepoRecord};
use crate::{Result, SummaryError};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct StartTimeRow {
    pub label: String,
    /// One entry per day, each holding `HH:MM` start times.
    pub cells: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartTimeTable {
    pub days: Vec<NaiveDate>,
    pub rows: Vec<StartTimeRow>,
}

/// First day shown when the table ends on `today` and spans `days` days.
pub fn first_day(today: NaiveDate, days: u32) -> Result<NaiveDate> {
    today
        .checked_sub_days(Days::new(days.saturating_sub(1) as u64))
        .ok_or_else(|| SummaryError::OutOfRange(format!("{} days before {}", days, today)))
}

pub fn build(
    repos: &[RepoRecord],
    backups: &[(RepoRecord, BackupRecord)],
    today: NaiveDate,
    days: u32,
) -> Result<StartTimeTable> {
    let first = first_day(today, days)?;
    let columns: Vec<NaiveDate> = first.iter_days().take(days as usize).collect();

    let mut rows: BTreeMap<i64, StartTimeRow> = BTreeMap::new();
    let mut order = Vec::new();
    for repo in repos {
        order.push(repo.id);
        rows.insert(
            repo.id,
            StartTimeRow {
                label: repo.label(),
                cells: vec![Vec::new(); columns.len()],
            },
        );
    }

    for (repo, backup) in backups {
        let day = backup.start.date();
        if day < first || day > today {
            continue;
        }
        let column = (day - first).num_days() as usize;
        let row = rows.entry(repo.id).or_insert_with(|| {
            order.push(repo.id);
            StartTimeRow {
                label: repo.label(),
                cells: vec![Vec::new(); columns.len()],
            }
        });
        row.cells[column].push(backup.start.format("%H:%M").to_string());
    }

    for row in rows.values_mut() {
        for cell in &mut row.cells {
            cell.sort();
        }
    }

    Ok(StartTimeTable {
        days: columns,
        rows: order.iter().filter_map(|id| rows.remove(id)).collect(),
    })
}

pub fn render_start_times(table: &StartTimeTable) -> String {
    if table.rows.is_empty() {
        return "No repositories found.\n".to_string();
    }

    let mut header = vec!["repository".to_string()];
    header.extend(table.days.iter().map(|d| d.format("%a %m-%d").to_string()));

    let mut out = new_table(header);
    for row in &table.rows {
        let mut cells = vec![row.label.clone()];
        cells.extend(row.cells.iter().map(|times| {
            if times.is_empty() {
                "-".to_string()
            } else {
                times.join(", ")
            }
        }));
        out.add_row(cells);
    }
    format!("{out}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use std::path::PathBuf;

    fn repo(id: i64, host: &str) -> RepoRecord {
        RepoRecord {
            id,
            host: host.to_string(),
            name: host.to_string(),
            path: PathBuf::from(format!("/pool/{}/{}", host, host)),
            borg_id: None,
            total_size: 0,
            total_csize: 0,
            unique_csize: 0,
            disk_usage: 0,
            last_updated: None,
        }
    }

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn backup(start: NaiveDateTime) -> BackupRecord {
        BackupRecord {
            archive_name: start.to_string(),
            archive_id: String::new(),
            start,
            end: start,
            duration_secs: 0.0,
            nfiles: 0,
            original_size: 0,
            compressed_size: 0,
            dedup_size: 0,
            command_line: String::new(),
            hostname: None,
            username: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn test_first_day() {
        assert_eq!(first_day(today(), 7).unwrap(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(first_day(today(), 1).unwrap(), today());
        assert_eq!(first_day(today(), 0).unwrap(), today());
    }

    #[test]
    fn test_first_day_out_of_range() {
        assert!(matches!(
            first_day(today(), 1_000_000_000),
            Err(SummaryError::OutOfRange(_))
        ));
        assert!(build(&[repo(1, "web")], &[], today(), u32::MAX).is_err());
    }

    #[test]
    fn test_build_places_start_times() {
        let web = repo(1, "web");
        let mail = repo(2, "mail");
        let backups = vec![
            (web.clone(), backup(at(1, 3, 0))),
            (web.clone(), backup(at(7, 15, 30))),
            (web.clone(), backup(at(7, 3, 5))),
            (web.clone(), backup(at(8, 3, 0))),
            (web.clone(), backup(at(2, 23, 59) - chrono::Duration::days(5))),
        ];

        let table = build(&[web, mail], &backups, today(), 7).unwrap();

        assert_eq!(table.days.len(), 7);
        assert_eq!(table.days[0], NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(table.rows.len(), 2);

        let web_row = &table.rows[0];
        assert_eq!(web_row.label, "web - web");
        assert_eq!(web_row.cells[0], vec!["03:00"]);
        assert_eq!(web_row.cells[6], vec!["03:05", "15:30"]);
        assert!(web_row.cells[1..6].iter().all(|c| c.is_empty()));

        assert!(table.rows[1].cells.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_render() {
        let web = repo(1, "web");
        let backups = vec![(web.clone(), backup(at(6, 2, 0)))];
        let rendered = render_start_times(&build(&[web], &backups, today(), 3).unwrap());

        assert!(rendered.contains("Wed 03-06"));
        assert!(rendered.contains("Thu 03-07"));
        assert!(rendered.contains("02:00"));
        assert!(rendered.contains('-'));
    }
}
