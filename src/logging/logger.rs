//! Structured logger with outcome recording and an end-of-run summary.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::STAGE_TARGET;
use super::types::{Log, OutcomeEntry, OutcomeStatus};
use super::utils;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
///
/// The `record` method is **not** included because its signature differs
/// from the `fn(&self, &str)` pattern shared by the display methods.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with summary collection.
///
/// All messages are always written to a persistent log file at
/// `$XDG_CACHE_HOME/dotfiles-sync/<command>.log` (default
/// `~/.cache/dotfiles-sync/<command>.log`) with timestamps and ANSI codes
/// stripped, regardless of the verbose flag.
#[derive(Debug)]
pub struct Logger {
    outcomes: Mutex<Vec<OutcomeEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary. The log file
    /// itself is created by [`init_subscriber`](super::subscriber::init_subscriber);
    /// this constructor does not write to it.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(utils::log_path(command))
    }

    pub(crate) const fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            outcomes: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Return the log file path, if available.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded outcomes (test-only).
    #[cfg(test)]
    pub(crate) fn outcomes(&self) -> Vec<OutcomeEntry> {
        self.outcomes.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Record an item outcome for the summary.
    pub fn record(&self, name: &str, status: OutcomeStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.outcomes.lock() {
            guard.push(OutcomeEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the number of failed items.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.outcomes.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|t| t.status == OutcomeStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded outcomes.
    pub fn print_summary(&self) {
        let outcomes = match self.outcomes.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        if outcomes.is_empty() {
            return;
        }

        self.stage("Summary");

        let mut ok = 0u32;
        let mut unchanged = 0u32;
        let mut skipped = 0u32;
        let mut failed = 0u32;

        for entry in &outcomes {
            let (icon, color) = match entry.status {
                OutcomeStatus::Ok => {
                    ok += 1;
                    ("✓", "\x1b[32m")
                }
                OutcomeStatus::Unchanged => {
                    unchanged += 1;
                    ("·", "\x1b[2m")
                }
                OutcomeStatus::Skipped => {
                    skipped += 1;
                    ("○", "\x1b[33m")
                }
                OutcomeStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = entry
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", entry.name));
        }

        let total = ok + unchanged + skipped + failed;
        self.info(&format!(
            "{total} items: \x1b[32m{ok} ok\x1b[0m, \x1b[2m{unchanged} unchanged\x1b[0m, \x1b[33m{skipped} skipped\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error);

    fn record(&self, name: &str, status: OutcomeStatus, message: Option<&str>) {
        self.record(name, status, message);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use std::fs;

    #[test]
    fn logger_new_has_no_outcomes() {
        let (log, _tmp, _guard) = isolated_logger();
        assert!(log.outcomes().is_empty());
    }

    #[test]
    fn record_with_message() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record(".bashrc", OutcomeStatus::Skipped, Some("kept local copy"));
        let outcomes = log.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].name, ".bashrc");
        assert_eq!(outcomes[0].message.as_deref(), Some("kept local copy"));
    }

    #[test]
    fn failure_count_returns_correct_count() {
        let (log, _tmp, _guard) = isolated_logger();
        assert_eq!(log.failure_count(), 0);
        log.record("a", OutcomeStatus::Ok, None);
        log.record("b", OutcomeStatus::Failed, Some("error 1"));
        log.record("c", OutcomeStatus::Failed, Some("error 2"));
        log.record("d", OutcomeStatus::Unchanged, None);
        assert_eq!(log.failure_count(), 2);
    }

    #[test]
    fn log_trait_delegates_to_logger() {
        let (log, _tmp, _guard) = isolated_logger();
        let log_ref: &dyn Log = &log;
        log_ref.record("via-trait", OutcomeStatus::Ok, None);
        assert_eq!(log.outcomes().len(), 1);
    }

    #[test]
    fn debug_always_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("debug-marker-{}", std::process::id());
        log.debug(&marker);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("[debug]"));
        assert!(contents.contains(&marker));
    }

    #[test]
    fn warn_and_error_tagged_in_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.warn("unsafe env file");
        log.error("apply failed");
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("[warn] unsafe env file"));
        assert!(contents.contains("[error] apply failed"));
    }

    #[test]
    fn stage_written_to_file_with_arrow() {
        let (log, _tmp, _guard) = isolated_logger();
        log.stage("Analyzing changes");
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("==> Analyzing changes"));
    }

    #[test]
    fn summary_counts_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record(".bashrc", OutcomeStatus::Ok, None);
        log.record(".vimrc", OutcomeStatus::Failed, Some("source missing"));
        log.print_summary();
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("2 items: 1 ok, 0 unchanged, 0 skipped, 1 failed"));
        assert!(contents.contains(".vimrc (source missing)"));
    }
}
