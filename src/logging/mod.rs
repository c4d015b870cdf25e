//! Console and run-log output, plus per-item outcomes for the summary.
//!
//! Engines report through [`Log`]. The binary uses [`Logger`], which feeds
//! the global subscriber installed by [`init_subscriber`]; library callers
//! and tests can capture into a [`MemoryLog`] instead.

mod logger;
mod memory;
mod subscriber;
mod types;
mod utils;

pub use logger::Logger;
pub use memory::{Level, LogEntry, MemoryLog};
pub use subscriber::init_subscriber;
pub use types::{Log, OutcomeEntry, OutcomeStatus};

/// A [`Logger`] whose run log lives in a temp dir, with a thread-local
/// subscriber writing to it. Keep the guard alive for the whole test.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::Layer as _;
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::layer::SubscriberExt as _;

    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("test.log");
    let run_log = subscriber::RunLog::create(&path, "test").expect("run log");
    let dispatch = tracing::Dispatch::new(
        tracing_subscriber::registry().with(run_log.with_filter(LevelFilter::DEBUG)),
    );
    let guard = tracing::dispatcher::set_default(&dispatch);
    (Logger::with_log_file(Some(path)), tmp, guard)
}
