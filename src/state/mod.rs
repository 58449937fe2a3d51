// Summary store
pub mod db;
pub mod records;


pub use db::SummaryDatabase;
pub use records::{BackupRecord, RepoRecord, RepoStats};
