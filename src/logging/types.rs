//! Core logging types: outcome records, status, and the [`Log`] trait.

/// Outcome of one managed item (sync entry or template file), kept for the
/// end-of-run summary.
#[derive(Debug, Clone)]
pub struct OutcomeEntry {
    /// Item name, usually the destination path relative to home.
    pub name: String,
    /// Final status of the item.
    pub status: OutcomeStatus,
    /// Optional detail message (e.g., skip reason or error description).
    pub message: Option<String>,
}

/// Status of a processed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// The item was written (synced, collected or substituted).
    Ok,
    /// The item already matched and nothing was done.
    Unchanged,
    /// The item was deliberately left alone (operator kept it, no env source).
    Skipped,
    /// The item could not be processed.
    Failed,
}

/// Abstraction over logging backends.
///
/// Both [`Logger`](super::logger::Logger) (console and log file) and
/// [`MemoryLog`](super::memory::MemoryLog) (in-memory capture) implement this
/// trait, so the sync and template engines log without knowing where the
/// output goes.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Record an item outcome for the summary.
    fn record(&self, name: &str, status: OutcomeStatus, message: Option<&str>);
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn outcome_status_equality() {
        assert_eq!(OutcomeStatus::Ok, OutcomeStatus::Ok);
        assert_ne!(OutcomeStatus::Ok, OutcomeStatus::Failed);
        assert_ne!(OutcomeStatus::Skipped, OutcomeStatus::Unchanged);
    }

    #[test]
    fn outcome_entry_clone() {
        let entry = OutcomeEntry {
            name: ".bashrc".to_string(),
            status: OutcomeStatus::Ok,
            message: Some("backed up".to_string()),
        };
        let cloned = entry.clone();
        assert_eq!(cloned.name, entry.name);
        assert_eq!(cloned.status, entry.status);
        assert_eq!(cloned.message, entry.message);
    }
}
