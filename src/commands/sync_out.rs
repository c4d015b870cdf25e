//! Command: copy live files back into the repository and overlays.
use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::logging::Logger;
use crate::sync;

/// Run the sync-out command.
///
/// # Errors
///
/// Returns an error if setup or validation fails, a destination is unsafe,
/// or any file could not be copied.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(&global.overrides(), log)?;
    sync::sync_out(&setup.settings, &setup.mapping, log)?;
    super::finish(log)
}
