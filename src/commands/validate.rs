//! Command: check the mapping file without touching anything.
use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::logging::Logger;

/// Run every pre-flight check and report.
///
/// # Errors
///
/// Returns an error if the mapping is unsafe or any check fails.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(&global.overrides(), log)?;
    log.info(&format!(
        "configuration valid: {} entries",
        setup.mapping.entries.len()
    ));
    Ok(())
}
