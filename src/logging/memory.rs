//! In-memory logger that captures messages and outcomes.
use std::sync::Mutex;

use super::subscriber::STAGE_TARGET;
use super::types::{Log, OutcomeEntry, OutcomeStatus};

/// Severity of a captured message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Stage header.
    Stage,
    /// Informational message.
    Info,
    /// Debug message.
    Debug,
    /// Warning.
    Warn,
    /// Error.
    Error,
}

/// A single captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Severity.
    pub level: Level,
    /// Message text as passed by the caller.
    pub message: String,
}

impl LogEntry {
    /// Replay this entry through [`tracing`].
    fn replay(&self) {
        let msg = &self.message;
        match self.level {
            Level::Stage => tracing::info!(target: STAGE_TARGET, "{msg}"),
            Level::Info => tracing::info!("{msg}"),
            Level::Debug => tracing::debug!("{msg}"),
            Level::Warn => tracing::warn!("{msg}"),
            Level::Error => tracing::error!("{msg}"),
        }
    }
}

/// Implement the display methods of [`Log`] by pushing each message into
/// `self.entries` with the matching [`Level`].
macro_rules! capture_log_methods {
    ($($method:ident => $level:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                if let Ok(mut guard) = self.entries.lock() {
                    guard.push(LogEntry {
                        level: Level::$level,
                        message: msg.to_string(),
                    });
                }
            }
        )+
    };
}

/// Logger that keeps everything in memory.
///
/// Used when library callers want to inspect what the engine reported (for
/// example, which env files were rejected) without writing to the console.
/// Captured entries can be forwarded to the global subscriber later with
/// [`replay`](Self::replay).
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
    outcomes: Mutex<Vec<OutcomeEntry>>,
}

impl MemoryLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured messages, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Messages captured at `level`.
    #[must_use]
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    /// Captured warnings.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.messages(Level::Warn)
    }

    /// All recorded outcomes, in order.
    #[must_use]
    pub fn outcomes(&self) -> Vec<OutcomeEntry> {
        self.outcomes.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Forward every captured message to the global subscriber.
    pub fn replay(&self) {
        for entry in &self.entries() {
            entry.replay();
        }
    }
}

impl Log for MemoryLog {
    capture_log_methods! {
        stage => Stage,
        info  => Info,
        debug => Debug,
        warn  => Warn,
        error => Error,
    }

    fn record(&self, name: &str, status: OutcomeStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.outcomes.lock() {
            guard.push(OutcomeEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }
}
