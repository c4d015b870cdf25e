//! Two-way sync between the repository (plus overlays) and home.
//!
//! `sync_in` runs analyze, plan, apply and optional template processing in
//! that order; nothing is written before the plan is settled. `sync_out`
//! copies live files back into whichever source each one came from.
pub mod apply;
pub mod collect;
pub mod diff;
pub mod overlay;
pub mod planner;

use anyhow::Result;

use crate::config::{Mapping, Settings};
use crate::logging::{Log, OutcomeStatus};
use crate::template::{self, BatchReport};
use apply::ApplyReport;
use collect::CollectReport;
use diff::{DiffStats, SyncStatus};
use overlay::{Origin, OverlayResolver, Target};
use planner::{Plan, PlanOptions, Prompter, SyncAction, SyncDecision};

/// Options for one `sync_in` run.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Planner options.
    pub plan: PlanOptions,
    /// Substitute templates in applied files.
    pub templates: bool,
}

/// Everything one `sync_in` run did.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Destinations already up to date.
    pub identical: usize,
    /// Destinations whose source does not exist.
    pub missing_sources: Vec<String>,
    /// Destinations that could not be compared with their source.
    pub unreadable: Vec<String>,
    /// The operator cancelled before anything was written.
    pub aborted: bool,
    /// Apply results.
    pub apply: ApplyReport,
    /// Template results, when template processing ran.
    pub templates: Option<BatchReport>,
}

impl SyncReport {
    /// Number of entries that failed anywhere in the run.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.missing_sources.len()
            + self.unreadable.len()
            + self.apply.failed.len()
            + self.templates.as_ref().map_or(0, |t| t.failed.len())
    }
}

/// Display label for `target`: overlay-backed entries show the overlay name.
fn display_label(target: &Target) -> String {
    match (&target.resolved.origin, &target.overlay) {
        (Origin::Overlay, Some(name)) => format!("custom:{name}"),
        _ => target.label.clone(),
    }
}

/// Short note shown next to a modified entry.
fn change_note(target: &Target) -> Option<String> {
    let current = std::fs::read_to_string(&target.dest).ok()?;
    let new = std::fs::read_to_string(&target.resolved.source).ok()?;
    Some(DiffStats::between(&current, &new).to_string())
}

/// Classify every target. Identical and missing-source entries are settled
/// here; the rest come back as pending decisions.
fn analyze(targets: &[Target], report: &mut SyncReport, log: &dyn Log) -> Vec<SyncDecision> {
    let mut pending = Vec::new();

    for target in targets {
        if let Origin::FallbackFromMissingOverlay(path) = &target.resolved.origin {
            log.warn(&format!(
                "overlay not found: {}, using repository version",
                path.display()
            ));
        }
        let source = &target.resolved.source;
        if !source.exists() {
            log.error(&format!("source not found: {}", source.display()));
            log.record(&target.dest_rel, OutcomeStatus::Failed, Some("source not found"));
            report.missing_sources.push(target.dest_rel.clone());
            continue;
        }

        let status = match diff::classify(source, &target.dest) {
            Ok(status) => status,
            Err(e) => {
                log.error(&format!("cannot compare {}: {e}", target.dest_rel));
                log.record(&target.dest_rel, OutcomeStatus::Failed, Some(&e.to_string()));
                report.unreadable.push(target.dest_rel.clone());
                continue;
            }
        };

        let label = display_label(target);
        if status == SyncStatus::Identical {
            log.debug(&format!("{label} -> {} [identical]", target.dest_rel));
            log.record(&target.dest_rel, OutcomeStatus::Unchanged, None);
            report.identical += 1;
            continue;
        }

        match change_note(target).filter(|_| status == SyncStatus::Modified) {
            Some(note) => log.info(&format!("{label} -> {} [{status}, {note}]", target.dest_rel)),
            None => log.info(&format!("{label} -> {} [{status}]", target.dest_rel)),
        }
        pending.push(SyncDecision {
            label,
            dest_rel: target.dest_rel.clone(),
            source: source.clone(),
            dest: target.dest.clone(),
            status,
            action: SyncAction::Keep,
        });
    }

    pending
}

/// Bring home in line with the repository and overlays.
///
/// # Errors
///
/// Returns an error if a destination lies outside home (before anything is
/// written) or the prompter fails. Per-entry failures are collected in the
/// report instead.
pub fn sync_in(
    settings: &Settings,
    mapping: &Mapping,
    opts: SyncOptions,
    prompter: &dyn Prompter,
    log: &dyn Log,
) -> Result<SyncReport> {
    let targets = OverlayResolver::new(mapping, settings).targets()?;
    let mut report = SyncReport::default();

    log.stage("Analyzing dotfiles");
    let pending = analyze(&targets, &mut report, log);
    log.info(&format!(
        "{} up to date, {} to sync, {} missing",
        report.identical,
        pending.len(),
        report.missing_sources.len()
    ));
    if pending.is_empty() {
        log.info("All files are already up-to-date");
        return Ok(report);
    }

    let decisions = match planner::plan(pending, opts.plan, prompter, log)? {
        Plan::Proceed(decisions) => decisions,
        Plan::Aborted => {
            report.aborted = true;
            return Ok(report);
        }
    };

    log.stage("Applying changes");
    report.apply = apply::apply(&decisions, &settings.backup_dir, opts.plan.force, log);
    if !report.apply.backups.is_empty() {
        log.info(&format!(
            "{} backups saved under {}",
            report.apply.backups.len(),
            settings.backup_dir.display()
        ));
    }

    if opts.templates && !report.apply.applied.is_empty() {
        report.templates = Some(template::process_applied(&report.apply.applied, settings, log));
    }
    Ok(report)
}

/// Copy live files back into their effective sources.
///
/// # Errors
///
/// Returns an error if a destination lies outside home.
pub fn sync_out(settings: &Settings, mapping: &Mapping, log: &dyn Log) -> Result<CollectReport> {
    let targets = OverlayResolver::new(mapping, settings).targets()?;
    log.stage("Collecting dotfiles");
    let report = collect::collect(&targets, log);
    log.info(&format!(
        "{} collected, {} not found, {} failed",
        report.collected, report.missing, report.failed
    ));
    Ok(report)
}
