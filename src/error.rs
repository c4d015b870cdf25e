//! Domain-specific error types for the sync engine.
//!
//! Internal modules return typed errors (e.g., [`ConfigError`],
//! [`SubstitutionError`]) while command handlers at the CLI boundary convert
//! them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! DotsyncError
//! ├── Config(ConfigError)            : mapping file format and path safety
//! ├── Settings(SettingsError)        : settings file values
//! ├── Validation(ValidationErrors)   : pre-flight checks before any sync
//! ├── Sync(SyncError)                : per-entry apply failures
//! ├── Substitution(SubstitutionError): per-file template failures
//! └── Exec(ExecError)                : subprocess spawn and timeout
//! ```
//!
//! Format errors, missing sources and substitution failures are recoverable:
//! callers log them and carry on with the rest of the batch. Safety and
//! validation errors are fatal and are raised before anything is written.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the sync engine.
#[derive(Error, Debug)]
pub enum DotsyncError {
    /// Mapping file error (format, safety, I/O).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Settings file error.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// One or more pre-flight validation checks failed.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// A sync entry could not be applied.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// A template file could not be substituted.
    #[error("Template error: {0}")]
    Substitution(#[from] SubstitutionError),

    /// A subprocess could not be run to completion.
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),
}

/// Errors that arise while reading the mapping file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A line could not be parsed; the line is skipped.
    #[error("invalid entry on line {line}: {content} ({reason})")]
    Format {
        /// 1-based line number.
        line: usize,
        /// The offending line, trimmed.
        content: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A line names a dangerous destination or escapes its root.
    #[error("unsafe entry on line {line}: {reason}")]
    Safety {
        /// 1-based line number (0 when raised outside the parser).
        line: usize,
        /// Human-readable reason.
        reason: String,
    },

    /// The mapping file could not be read.
    #[error("IO error reading mapping file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise from the settings file.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The settings file is not valid TOML or has unknown keys.
    #[error("invalid settings file {path}: {message}")]
    Parse {
        /// Settings file path.
        path: String,
        /// Parser message.
        message: String,
    },

    /// A value is out of its permitted range.
    #[error("invalid value for '{key}': {message}")]
    InvalidValue {
        /// Setting name.
        key: String,
        /// Why the value was rejected.
        message: String,
    },

    /// The home directory could not be determined.
    #[error("cannot determine home directory: set HOME or pass --home")]
    NoHome,

    /// The repository directory could not be determined.
    #[error("cannot determine dotfiles repository: pass --repo or set DOTFILES_REPO")]
    NoRepo,
}

/// A single pre-flight validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The mapping file declares no entries at all.
    #[error("no entries found in mapping file")]
    Empty,

    /// A repository source does not exist.
    #[error("source file/directory not found: {repo_path}")]
    SourceNotFound {
        /// Path relative to the repository.
        repo_path: String,
    },

    /// An overlay source does not exist.
    #[error("overlay file/directory not found: {name} (expected at {expected})")]
    OverlayNotFound {
        /// Overlay name relative to the overlay directory.
        name: String,
        /// Absolute path that was checked.
        expected: String,
    },

    /// The same repository path is mapped more than once.
    #[error("duplicate entry: {repo_path}")]
    Duplicate {
        /// The duplicated repository path.
        repo_path: String,
    },
}

/// All validation failures found in one pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} problem(s): {}", .0.len(), join_errors(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that arise while applying a single sync entry.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The effective source for an entry does not exist.
    #[error("source not found for {dest}: {source_path}")]
    SourceMissing {
        /// Destination relative to home.
        dest: String,
        /// The source path that was checked.
        source_path: PathBuf,
    },

    /// Backing up or overwriting the destination failed.
    #[error("failed to apply {dest}: {reason}")]
    ApplyFailed {
        /// Destination relative to home.
        dest: String,
        /// Underlying failure, with context.
        reason: String,
    },
}

/// Errors that arise while substituting a template file.
///
/// The original file is never modified when one of these is returned.
#[derive(Error, Debug)]
pub enum SubstitutionError {
    /// The template path does not name a regular file.
    #[error("template not found or not a file: {0}")]
    NotFound(PathBuf),

    /// The substitution program is not installed.
    #[error("substitution program '{0}' is not available")]
    Unavailable(String),

    /// The substitution step failed.
    #[error("substitution failed for {path}: {reason}")]
    Failed {
        /// Template path.
        path: PathBuf,
        /// Why the step failed.
        reason: String,
        /// Retained pre-substitution snapshot, if one was taken.
        rollback: Option<PathBuf>,
    },
}

impl SubstitutionError {
    /// The rollback snapshot retained for this failure, if any.
    #[must_use]
    pub fn rollback(&self) -> Option<&PathBuf> {
        match self {
            Self::Failed { rollback, .. } => rollback.as_ref(),
            Self::NotFound(_) | Self::Unavailable(_) => None,
        }
    }
}

/// Errors that arise from running an external program.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The program could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The program did not finish within its time limit and was killed.
    #[error("'{program}' timed out after {}s", .timeout.as_secs_f32())]
    Timeout {
        /// Program name.
        program: String,
        /// The limit that was exceeded.
        timeout: Duration,
    },

    /// Waiting for the program failed.
    #[error("failed waiting for '{program}': {source}")]
    Wait {
        /// Program name.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
