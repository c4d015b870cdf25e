//! Executes planned sync decisions: optional backup, then atomic replace.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::diff::SyncStatus;
use super::planner::{SyncAction, SyncDecision};
use crate::error::SyncError;
use crate::fs;
use crate::logging::{Log, OutcomeStatus};

/// An overwritten destination and where its previous content went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// Destination that was overwritten.
    pub dest: PathBuf,
    /// Copy of its previous content.
    pub backup: PathBuf,
}

/// A destination that was written, forwarded to template processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEntry {
    /// Display label.
    pub label: String,
    /// Destination relative to home.
    pub dest_rel: String,
    /// Absolute destination.
    pub dest: PathBuf,
}

/// Tally of one apply pass.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Destinations written, in order.
    pub applied: Vec<AppliedEntry>,
    /// Destinations left alone by a Keep decision.
    pub skipped: Vec<String>,
    /// Destinations that failed, with the error.
    pub failed: Vec<SyncError>,
    /// Backups taken.
    pub backups: Vec<BackupRecord>,
}

/// Whether the current destination must be copied aside before overwriting.
fn needs_backup(decision: &SyncDecision, force: bool) -> bool {
    decision.dest.symlink_metadata().is_ok()
        && match decision.action {
            SyncAction::BackupReplace => true,
            SyncAction::Replace => decision.status == SyncStatus::Modified && !force,
            SyncAction::Keep => false,
        }
}

/// Copy the current destination into `backup_root` at the same relative path,
/// replacing any older backup there.
fn back_up(decision: &SyncDecision, backup_root: &Path) -> Result<BackupRecord> {
    let backup = backup_root.join(&decision.dest_rel);
    fs::copy_into_place(&decision.dest, &backup)
        .with_context(|| format!("backing up {}", decision.dest.display()))?;
    Ok(BackupRecord {
        dest: decision.dest.clone(),
        backup,
    })
}

/// Apply one decision. Returns the backup taken, if any.
fn apply_one(
    decision: &SyncDecision,
    backup_root: &Path,
    force: bool,
) -> Result<Option<BackupRecord>, SyncError> {
    if !decision.source.exists() {
        return Err(SyncError::SourceMissing {
            dest: decision.dest_rel.clone(),
            source_path: decision.source.clone(),
        });
    }
    let failed = |e: anyhow::Error| SyncError::ApplyFailed {
        dest: decision.dest_rel.clone(),
        reason: format!("{e:#}"),
    };

    let backup = if needs_backup(decision, force) {
        Some(back_up(decision, backup_root).map_err(failed)?)
    } else {
        None
    };
    fs::copy_into_place(&decision.source, &decision.dest).map_err(failed)?;
    Ok(backup)
}

/// Apply every decision. A failing entry is recorded and the rest continue.
pub fn apply(
    decisions: &[SyncDecision],
    backup_root: &Path,
    force: bool,
    log: &dyn Log,
) -> ApplyReport {
    let mut report = ApplyReport::default();

    for decision in decisions {
        if decision.action == SyncAction::Keep {
            log.debug(&format!("keeping {}", decision.dest_rel));
            log.record(&decision.dest_rel, OutcomeStatus::Skipped, Some("kept"));
            report.skipped.push(decision.dest_rel.clone());
            continue;
        }

        match apply_one(decision, backup_root, force) {
            Ok(backup) => {
                if let Some(b) = &backup {
                    log.info(&format!("backed up {} to {}", decision.dest_rel, b.backup.display()));
                }
                let note = backup.as_ref().map(|_| "backed up");
                log.info(&format!("synced {} -> {}", decision.label, decision.dest_rel));
                log.record(&decision.dest_rel, OutcomeStatus::Ok, note);
                report.backups.extend(backup);
                report.applied.push(AppliedEntry {
                    label: decision.label.clone(),
                    dest_rel: decision.dest_rel.clone(),
                    dest: decision.dest.clone(),
                });
            }
            Err(e) => {
                log.error(&e.to_string());
                log.record(&decision.dest_rel, OutcomeStatus::Failed, Some(&e.to_string()));
                report.failed.push(e);
            }
        }
    }

    report
}
