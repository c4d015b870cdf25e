//! Command: sync files from the repository into home.
use anyhow::Result;

use super::CommandSetup;
use crate::cli::{GlobalOpts, SyncInOpts};
use crate::logging::Logger;
use crate::sync::planner::{PlanOptions, Prompter, StdinPrompter};
use crate::sync::{self, SyncOptions};

/// Planner and template options from the command line.
#[must_use]
pub const fn options(opts: &SyncInOpts) -> SyncOptions {
    SyncOptions {
        plan: PlanOptions {
            strategy: opts.strategy,
            force: opts.force,
            preview: !opts.no_preview,
        },
        templates: !opts.no_templates,
    }
}

/// Run the sync-in command with an explicit prompter.
///
/// # Errors
///
/// Returns an error if setup or validation fails, a destination is unsafe,
/// or any entry failed.
pub fn run_with(
    global: &GlobalOpts,
    opts: &SyncInOpts,
    prompter: &dyn Prompter,
    log: &Logger,
) -> Result<()> {
    let mut overrides = global.overrides();
    overrides.backup_dir.clone_from(&opts.backup_dir);
    let setup = CommandSetup::init(&overrides, log)?;

    let report = sync::sync_in(&setup.settings, &setup.mapping, options(opts), prompter, log)?;
    if report.aborted {
        return Ok(());
    }
    for rollback in report.templates.iter().flat_map(|t| t.rollbacks()) {
        log.warn(&format!("rollback kept: {}", rollback.display()));
    }
    super::finish(log)
}

/// Run the sync-in command, prompting on the terminal.
///
/// # Errors
///
/// See [`run_with`].
pub fn run(global: &GlobalOpts, opts: &SyncInOpts, log: &Logger) -> Result<()> {
    run_with(global, opts, &StdinPrompter, log)
}
