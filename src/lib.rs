pub mod borg;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod pool;
pub mod report;
pub mod state;
pub mod sync;
pub mod tarball;

pub use error::{Result, SummaryError};
