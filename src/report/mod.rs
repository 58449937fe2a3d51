// Read-only reports over the summary store
pub mod overlap;
pub mod staleness;
pub mod start_times;
pub mod summary;

pub use overlap::{find_overlaps, render_overlaps, window_start, Overlap, Span};
pub use staleness::{check_repo, StaleReason, StaleWarning};
pub use start_times::{render_start_times, StartTimeTable};
pub use summary::{detail, render_detail, render_summary, summarize, PoolSummary, RepoDetail};
