//! Reverse sync: copy live files back into their effective source.
use super::overlay::Target;
use crate::fs;
use crate::logging::{Log, OutcomeStatus};

/// Tally of one collect pass.
#[derive(Debug, Default)]
pub struct CollectReport {
    /// Destinations copied back.
    pub collected: usize,
    /// Destinations with no live file.
    pub missing: usize,
    /// Destinations that could not be copied.
    pub failed: usize,
}

/// Copy every live destination into its collect target.
///
/// A missing live file is a warning, not a failure.
pub fn collect(targets: &[Target], log: &dyn Log) -> CollectReport {
    let mut report = CollectReport::default();
    for target in targets {
        if target.dest.symlink_metadata().is_err() {
            log.warn(&format!("system file not found: {}", target.dest_rel));
            log.record(&target.dest_rel, OutcomeStatus::Skipped, Some("not found"));
            report.missing += 1;
            continue;
        }
        match fs::copy_into_place(&target.dest, &target.collect_to) {
            Ok(()) => {
                log.info(&format!(
                    "collected {} -> {}",
                    target.dest_rel,
                    target.collect_to.display()
                ));
                log.record(&target.dest_rel, OutcomeStatus::Ok, None);
                report.collected += 1;
            }
            Err(e) => {
                log.error(&format!("failed to collect {}: {e:#}", target.dest_rel));
                log.record(&target.dest_rel, OutcomeStatus::Failed, Some(&format!("{e:#}")));
                report.failed += 1;
            }
        }
    }
    report
}
