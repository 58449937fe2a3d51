use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("borg failed ({status}) running `{command}`: {stderr}")]
    Borg {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Unexpected borg output: {0}")]
    BorgOutput(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid timestamp from borg: {0}")]
    InvalidTimestamp(String),

    #[error("{} not found!", .0.display())]
    PoolNotFound(PathBuf),

    #[error("Repository not found: {}", .0.display())]
    RepoNotFound(PathBuf),

    #[error("Tarball error: {0}")]
    Tarball(String),
}

pub type Result<T> = std::result::Result<T, SummaryError>;
