#[cfg(test)]
mod tests {
    use super::super::json::{parse_archive_info, parse_borg_time, parse_list, parse_repo_info};
    use chrono::{NaiveDate, Timelike};

    const LIST_OUTPUT: &str = r#"{
        "archives": [
            {
                "archive": "web-2019-07-20T03:00",
                "barchive": "web-2019-07-20T03:00",
                "id": "0a1b2c",
                "name": "web-2019-07-20T03:00",
                "start": "2019-07-20T03:00:01.000000",
                "time": "2019-07-20T03:00:01.000000"
            },
            {
                "archive": "web-2019-07-21T03:00",
                "barchive": "web-2019-07-21T03:00",
                "id": "3d4e5f",
                "name": "web-2019-07-21T03:00",
                "start": "2019-07-21T03:00:02.123456",
                "time": "2019-07-21T03:00:02.123456"
            }
        ],
        "encryption": {"mode": "repokey"},
        "repository": {
            "id": "feedface",
            "last_modified": "2019-07-21T03:12:40.000000",
            "location": "/srv/borg/web/web"
        }
    }"#;

    const ARCHIVE_INFO_OUTPUT: &str = r#"{
        "archives": [
            {
                "chunker_params": [19, 23, 21, 4095],
                "command_line": ["/usr/bin/borg", "create", "--stats", "/srv/borg/web/web::{hostname}-{now}", "/etc", "/home"],
                "comment": "",
                "duration": 742.518,
                "end": "2019-07-21T03:12:24.518000",
                "hostname": "web",
                "id": "3d4e5f",
                "limits": {"max_archive_size": 0.0001},
                "name": "web-2019-07-21T03:00",
                "start": "2019-07-21T03:00:02.000000",
                "stats": {
                    "compressed_size": 30000000000,
                    "deduplicated_size": 120000000,
                    "nfiles": 184211,
                    "original_size": 46000000000
                },
                "username": "root"
            }
        ],
        "cache": {
            "path": "/root/.cache/borg/feedface",
            "stats": {
                "total_chunks": 2000000,
                "total_csize": 900000000000,
                "total_size": 1400000000000,
                "total_unique_chunks": 300000,
                "unique_csize": 70000000000,
                "unique_size": 90000000000
            }
        },
        "encryption": {"mode": "repokey"},
        "repository": {
            "id": "feedface",
            "last_modified": "2019-07-21T03:12:40.000000",
            "location": "/srv/borg/web/web"
        }
    }"#;

    #[test]
    fn test_parse_list() {
        let archives = parse_list(LIST_OUTPUT).unwrap();
        assert_eq!(archives.len(), 2);
        assert_eq!(archives[0].name, "web-2019-07-20T03:00");
        assert_eq!(archives[1].id, "3d4e5f");
        assert_eq!(
            archives[1].start.date(),
            NaiveDate::from_ymd_opt(2019, 7, 21).unwrap()
        );
        assert_eq!(archives[1].start.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_parse_empty_list() {
        let archives = parse_list(r#"{"archives": [], "repository": {"id": "x"}}"#).unwrap();
        assert!(archives.is_empty());
    }

    #[test]
    fn test_parse_archive_info() {
        let info = parse_archive_info(ARCHIVE_INFO_OUTPUT).unwrap();
        assert_eq!(info.name, "web-2019-07-21T03:00");
        assert_eq!(info.stats.nfiles, 184_211);
        assert_eq!(info.stats.original_size, 46_000_000_000);
        assert_eq!(info.stats.deduplicated_size, 120_000_000);
        assert_eq!(info.hostname.as_deref(), Some("web"));
        assert_eq!(info.username.as_deref(), Some("root"));
        assert!((info.duration - 742.518).abs() < 1e-9);
        assert_eq!(
            info.command_line(),
            "/usr/bin/borg create --stats /srv/borg/web/web::{hostname}-{now} /etc /home"
        );
        assert!(info.end > info.start);
    }

    #[test]
    fn test_parse_archive_info_without_archives() {
        let result = parse_archive_info(r#"{"archives": [], "repository": {"id": "x"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_repo_info() {
        let info = parse_repo_info(ARCHIVE_INFO_OUTPUT).unwrap();
        assert_eq!(info.repository.id, "feedface");
        assert_eq!(info.repository.location, "/srv/borg/web/web");
        assert!(info.repository.last_modified.is_some());
        assert_eq!(info.stats.total_size, 1_400_000_000_000);
        assert_eq!(info.stats.unique_csize, 70_000_000_000);
    }

    #[test]
    fn test_parse_repo_info_without_cache() {
        let info = parse_repo_info(r#"{"repository": {"id": "x", "location": "/r"}}"#).unwrap();
        assert_eq!(info.stats.total_size, 0);
        assert!(info.repository.last_modified.is_none());
    }

    #[test]
    fn test_parse_malformed_json() {
        assert!(parse_list("Repository /srv/borg does not exist.").is_err());
    }

    #[test]
    fn test_parse_borg_time_variants() {
        let plain = parse_borg_time("2019-07-21T03:00:02").unwrap();
        let micros = parse_borg_time("2019-07-21T03:00:02.000000").unwrap();
        assert_eq!(plain, micros);

        let text = parse_borg_time("Sun, 2019-07-21 03:00:02").unwrap();
        assert_eq!(text, plain);

        assert!(parse_borg_time("2019-07-21T03:00:02+00:00").is_ok());
        assert!(parse_borg_time("yesterday").is_err());
    }
}
