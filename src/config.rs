use crate::{Result, SummaryError};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment always handed to borg unless overridden in `[env]`.
pub const DEFAULT_BORG_ENV: &[(&str, &str)] = &[
    ("BORG_RELOCATED_REPO_ACCESS_IS_OK", "yes"),
    ("BORG_UNKNOWN_UNENCRYPTED_REPO_ACCESS_IS_OK", "yes"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // Locations
    pub pool: Option<PathBuf>,
    pub database: Option<PathBuf>,

    // Backup engine
    pub borg_command: Vec<String>,
    pub env: BTreeMap<String, String>,

    // Thresholds
    pub stale_after_hours: u64,
    pub refresh_after_minutes: u64,
    pub jobs: usize,

    pub tarball: TarballConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TarballConfig {
    pub dir: Option<PathBuf>,
    pub keep: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool: None,
            database: None,
            borg_command: vec!["borg".to_string()],
            env: BTreeMap::new(),
            stale_after_hours: 24,
            refresh_after_minutes: 24 * 60,
            jobs: 4,
            tarball: TarballConfig::default(),
        }
    }
}

impl Default for TarballConfig {
    fn default() -> Self {
        Self { dir: None, keep: 3 }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "borg-summary", "borg-summary")
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Without one, the per-user config file is
    /// read when present and defaults are used otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(SummaryError::InvalidConfig(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(path)?
            }
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading configuration");
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.borg_command.is_empty() || self.borg_command[0].is_empty() {
            return Err(SummaryError::InvalidConfig(
                "borg_command must name a program".into(),
            ));
        }
        if self.jobs == 0 {
            return Err(SummaryError::InvalidConfig("jobs must be at least 1".into()));
        }
        if self.stale_after_hours == 0 {
            return Err(SummaryError::InvalidConfig(
                "stale_after_hours must be at least 1".into(),
            ));
        }
        self.stale_after()?;
        self.refresh_after()?;
        Ok(())
    }

    /// Path of the SQLite summary store.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().join("summary.db"))
            .ok_or_else(|| {
                SummaryError::InvalidConfig(
                    "cannot determine a data directory; pass --database".into(),
                )
            })
    }

    /// Environment for borg: the defaults overlaid with `[env]`.
    pub fn borg_env(&self) -> BTreeMap<String, String> {
        let mut env: BTreeMap<String, String> = DEFAULT_BORG_ENV
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env.extend(self.env.clone());
        env
    }

    pub fn stale_after(&self) -> Result<chrono::Duration> {
        hours(self.stale_after_hours)
    }

    pub fn refresh_after(&self) -> Result<chrono::Duration> {
        minutes(self.refresh_after_minutes)
    }
}

pub fn hours(value: u64) -> Result<chrono::Duration> {
    i64::try_from(value)
        .ok()
        .and_then(chrono::Duration::try_hours)
        .ok_or_else(|| SummaryError::OutOfRange(format!("{} hours", value)))
}

pub fn minutes(value: u64) -> Result<chrono::Duration> {
    i64::try_from(value)
        .ok()
        .and_then(chrono::Duration::try_minutes)
        .ok_or_else(|| SummaryError::OutOfRange(format!("{} minutes", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.borg_command, vec!["borg"]);
        assert_eq!(config.stale_after_hours, 24);
        assert_eq!(config.refresh_after_minutes, 1440);
        assert_eq!(config.tarball.keep, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_file() {
        let config = Config::from_toml(
            r#"
            pool = "/srv/borg"
            database = "/var/lib/borg-summary/summary.db"
            borg_command = ["sudo", "-u", "backup", "borg"]
            stale_after_hours = 36
            jobs = 2

            [env]
            BORG_PASSCOMMAND = "cat /etc/borg/pass"

            [tarball]
            dir = "/srv/tarballs"
            keep = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.pool, Some(PathBuf::from("/srv/borg")));
        assert_eq!(config.borg_command.len(), 4);
        assert_eq!(config.stale_after_hours, 36);
        assert_eq!(config.refresh_after_minutes, 1440);
        assert_eq!(config.jobs, 2);
        assert_eq!(config.tarball.keep, 5);
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/var/lib/borg-summary/summary.db")
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(Config::from_toml("pol = \"/srv\"").is_err());
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = Config::from_toml(
            r#"
            [env]
            BORG_RELOCATED_REPO_ACCESS_IS_OK = "no"
            BORG_RSH = "ssh -i /root/.ssh/backup"
            "#,
        )
        .unwrap();

        let env = config.borg_env();
        assert_eq!(env["BORG_RELOCATED_REPO_ACCESS_IS_OK"], "no");
        assert_eq!(env["BORG_UNKNOWN_UNENCRYPTED_REPO_ACCESS_IS_OK"], "yes");
        assert_eq!(env["BORG_RSH"], "ssh -i /root/.ssh/backup");
    }

    #[test]
    fn test_validate_rejects_zero_jobs() {
        let config = Config {
            jobs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let config = Config {
            borg_command: vec![],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(Some(&temp.path().join("missing.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "jobs = 8\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.jobs, 8);
    }

    #[test]
    fn test_threshold_out_of_range() {
        assert_eq!(hours(24).unwrap(), chrono::Duration::hours(24));
        assert!(hours(u64::MAX).is_err());
        assert!(minutes(u64::MAX).is_err());

        let config = Config::from_toml("stale_after_hours = 10000000000000").unwrap();
        assert!(matches!(
            config.validate(),
            Err(SummaryError::OutOfRange(_))
        ));

        let config = Config {
            refresh_after_minutes: u64::MAX,
            ..Config::default()
        };
        assert!(config.refresh_after().is_err());
        assert!(config.validate().is_err());
    }
}
