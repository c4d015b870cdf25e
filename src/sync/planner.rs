//! Turns drift classifications into per-entry actions.
use anyhow::{Context as _, Result};
use std::io::{self, BufRead as _, Write as _};
use std::path::PathBuf;

use super::diff::{self, SyncStatus};
use crate::logging::Log;

/// How non-identical entries are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    /// Prompt per modified file.
    #[default]
    Ask,
    /// Replace everything.
    Replace,
    /// Keep everything.
    Skip,
}

/// Operator response to a per-file prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Leave the live file alone.
    Keep,
    /// Overwrite with the source.
    Replace,
    /// Back up the live file, then overwrite.
    BackupReplace,
    /// Show the diff again and re-prompt.
    ViewAgain,
    /// Abandon the whole sync.
    Quit,
}

/// Parse a prompt response. Empty input means [`Choice::Keep`].
#[must_use]
pub fn parse_choice(input: &str) -> Option<Choice> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" | "k" | "keep" => Some(Choice::Keep),
        "r" | "replace" => Some(Choice::Replace),
        "b" | "backup" => Some(Choice::BackupReplace),
        "v" | "view" => Some(Choice::ViewAgain),
        "q" | "quit" => Some(Choice::Quit),
        _ => None,
    }
}

/// What apply will do with one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Leave the destination untouched.
    Keep,
    /// Overwrite, backing up modified files unless forced.
    Replace,
    /// Always back up, then overwrite.
    BackupReplace,
}

/// A planned action for one destination.
#[derive(Debug, Clone)]
pub struct SyncDecision {
    /// Display label (repository path or `custom:<name>`).
    pub label: String,
    /// Destination relative to home.
    pub dest_rel: String,
    /// Source to copy from.
    pub source: PathBuf,
    /// Absolute destination.
    pub dest: PathBuf,
    /// Drift classification.
    pub status: SyncStatus,
    /// Chosen action.
    pub action: SyncAction,
}

/// Outcome of planning.
#[derive(Debug)]
pub enum Plan {
    /// Apply these decisions.
    Proceed(Vec<SyncDecision>),
    /// The operator quit or declined; nothing may be changed.
    Aborted,
}

/// Planner inputs taken from the command line.
#[derive(Debug, Clone, Copy)]
pub struct PlanOptions {
    /// Entry strategy.
    pub strategy: Strategy,
    /// Skip preview and prompts; implies replace unless the strategy is skip.
    pub force: bool,
    /// Show diffs and prompt.
    pub preview: bool,
}

impl PlanOptions {
    /// Whether the planner should prompt.
    #[must_use]
    pub fn interactive(&self) -> bool {
        self.preview && !self.force && self.strategy == Strategy::Ask
    }
}

/// Operator interaction used by the interactive planner.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter {
    /// Display a rendered diff for `dest`.
    fn show_diff(&self, dest: &str, diff: &str);

    /// Ask what to do with `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if input cannot be read.
    fn choose(&self, dest: &str) -> Result<Choice>;

    /// Ask a yes/no question; the default is no.
    ///
    /// # Errors
    ///
    /// Returns an error if input cannot be read.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Prompter reading from stdin and writing to stderr.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl StdinPrompter {
    fn read_line() -> Result<String> {
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("reading from stdin")?;
        Ok(line)
    }

    fn rule() -> String {
        let width = terminal_size::terminal_size().map_or(60, |(w, _)| usize::from(w.0).min(80));
        "─".repeat(width)
    }
}

impl Prompter for StdinPrompter {
    fn show_diff(&self, dest: &str, diff: &str) {
        let mut err = io::stderr().lock();
        writeln!(err, "\n\x1b[1m{dest}\x1b[0m\n{}", Self::rule()).ok();
        write!(err, "{}", diff::colorize(diff)).ok();
    }

    fn choose(&self, dest: &str) -> Result<Choice> {
        let mut err = io::stderr();
        writeln!(
            err,
            "{dest}: [K]eep current, [r]eplace, [b]ackup and replace, [v]iew diff again, [q]uit"
        )?;
        loop {
            write!(err, "Your choice [K/r/b/v/q]: ")?;
            err.flush()?;
            let line = Self::read_line()?;
            if let Some(choice) = parse_choice(&line) {
                return Ok(choice);
            }
            writeln!(err, "Invalid choice. Please try again.")?;
        }
    }

    fn confirm(&self, question: &str) -> Result<bool> {
        let mut err = io::stderr();
        write!(err, "{}\n{question} [y/N]: ", Self::rule())?;
        err.flush()?;
        let line = Self::read_line()?;
        Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

/// Read both sides and render the diff shown to the operator.
fn render_for(decision: &SyncDecision) -> Option<String> {
    let current = std::fs::read_to_string(&decision.dest).ok()?;
    let new = std::fs::read_to_string(&decision.source).ok()?;
    Some(diff::render(&decision.dest_rel, &current, &new))
}

/// Ask about one modified entry until the operator picks an action.
///
/// Returns `None` when the operator quits.
fn ask(decision: &SyncDecision, prompter: &dyn Prompter) -> Result<Option<SyncAction>> {
    let Some(rendered) = render_for(decision) else {
        return Ok(Some(SyncAction::Replace));
    };
    prompter.show_diff(&decision.dest_rel, &rendered);
    loop {
        match prompter.choose(&decision.dest_rel)? {
            Choice::Keep => return Ok(Some(SyncAction::Keep)),
            Choice::Replace => return Ok(Some(SyncAction::Replace)),
            Choice::BackupReplace => return Ok(Some(SyncAction::BackupReplace)),
            Choice::ViewAgain => prompter.show_diff(&decision.dest_rel, &rendered),
            Choice::Quit => return Ok(None),
        }
    }
}

/// Decide an action for every pending (non-identical) entry.
///
/// `pending` arrives with [`SyncAction::Keep`] placeholders which are
/// overwritten here.
///
/// # Errors
///
/// Returns an error if the prompter fails to read input.
pub fn plan(
    mut pending: Vec<SyncDecision>,
    opts: PlanOptions,
    prompter: &dyn Prompter,
    log: &dyn Log,
) -> Result<Plan> {
    if !opts.interactive() {
        let action = if opts.strategy == Strategy::Skip {
            SyncAction::Keep
        } else {
            SyncAction::Replace
        };
        for decision in &mut pending {
            decision.action = action;
        }
        return Ok(Plan::Proceed(pending));
    }

    for decision in &mut pending {
        log.info(&format!("{} [{}]", decision.dest_rel, decision.status));
        decision.action = if decision.status == SyncStatus::Modified {
            match ask(decision, prompter)? {
                Some(action) => action,
                None => {
                    log.info("sync cancelled");
                    return Ok(Plan::Aborted);
                }
            }
        } else {
            SyncAction::Replace
        };
    }

    if !prompter.confirm("Proceed?")? {
        log.info("sync cancelled");
        return Ok(Plan::Aborted);
    }
    Ok(Plan::Proceed(pending))
}
