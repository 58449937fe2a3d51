// Adapter for the borg command line
pub mod json;
pub mod runner;

#[cfg(test)]
mod json_tests;

pub use json::{ArchiveInfo, ArchiveListing, ArchiveStats, CacheStats, RepoInfo, Repository};
pub use runner::BorgRunner;
