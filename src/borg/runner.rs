use super::json::{self, ArchiveInfo, ArchiveListing, RepoInfo};
use crate::{Result, SummaryError};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Invokes the borg binary and decodes its `--json` output.
#[derive(Debug, Clone)]
pub struct BorgRunner {
    command: Vec<String>,
    env: BTreeMap<String, String>,
}

impl BorgRunner {
    pub fn new(command: Vec<String>, env: BTreeMap<String, String>) -> Self {
        Self { command, env }
    }

    /// `borg list --json REPO`
    pub async fn list_archives(&self, repo: &Path) -> Result<Vec<ArchiveListing>> {
        let stdout = self
            .run(vec!["list".into(), "--json".into(), repo.into()])
            .await?;
        json::parse_list(&stdout)
    }

    /// `borg info --json REPO`
    pub async fn repo_info(&self, repo: &Path) -> Result<RepoInfo> {
        let stdout = self
            .run(vec!["info".into(), "--json".into(), repo.into()])
            .await?;
        json::parse_repo_info(&stdout)
    }

    /// `borg info --json REPO::ARCHIVE`
    pub async fn archive_info(&self, repo: &Path, archive: &str) -> Result<ArchiveInfo> {
        let stdout = self
            .run(vec![
                "info".into(),
                "--json".into(),
                archive_spec(repo, archive),
            ])
            .await?;
        json::parse_archive_info(&stdout)
    }

    /// `borg export-tar REPO::ARCHIVE DEST`
    ///
    /// borg picks the compression from the file extension of `dest`.
    pub async fn export_tar(&self, repo: &Path, archive: &str, dest: &Path) -> Result<()> {
        self.run(vec![
            "export-tar".into(),
            archive_spec(repo, archive),
            dest.into(),
        ])
        .await?;
        Ok(())
    }

    async fn run(&self, args: Vec<OsString>) -> Result<String> {
        let (program, leading) = self
            .command
            .split_first()
            .ok_or_else(|| SummaryError::InvalidConfig("borg_command is empty".into()))?;

        let shown = self.display_command(&args);
        tracing::debug!(command = %shown, "Running borg");

        let output = Command::new(program)
            .args(leading)
            .args(&args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(SummaryError::Borg {
                command: shown,
                status: output.status.to_string(),
                stderr,
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|e| SummaryError::BorgOutput(format!("borg output is not UTF-8: {}", e)))
    }

    fn display_command(&self, args: &[OsString]) -> String {
        self.command
            .iter()
            .cloned()
            .chain(args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn archive_spec(repo: &Path, archive: &str) -> OsString {
    let mut spec = OsString::from(repo.as_os_str());
    spec.push("::");
    spec.push(archive);
    spec
}
