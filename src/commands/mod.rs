//! One module per subcommand, plus the setup and reporting they share.
pub mod analyze_template;
pub mod env_files;
pub mod list;
pub mod process_template;
pub mod sync_in;
pub mod sync_out;
pub mod validate;
pub mod version;

use anyhow::Result;
use std::io::Write as _;

use crate::config::{Mapping, Overrides, Settings, validation};
use crate::error::DotsyncError;
use crate::logging::Logger;

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates settings resolution and mapping loading so that each command
/// does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Resolved paths and substitution settings.
    pub settings: Settings,
    /// Parsed mapping file.
    pub mapping: Mapping,
}

impl CommandSetup {
    /// Resolve settings and load the mapping file. Malformed lines are
    /// logged as warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if settings cannot be resolved, the mapping file
    /// cannot be read, or any mapping line is unsafe.
    pub fn load(overrides: &Overrides, log: &Logger) -> Result<Self, DotsyncError> {
        let settings = Settings::load(overrides)?;
        log.debug(&format!("repository: {}", settings.repo_dir.display()));
        log.debug(&format!("home: {}", settings.home.display()));

        log.stage("Loading configuration");
        let mapping = Mapping::load(&settings.mapping_file)?;
        for warning in &mapping.warnings {
            log.warn(&warning.to_string());
        }
        log.info(&format!(
            "loaded {} entries from {}",
            mapping.entries.len(),
            settings.mapping_file.display()
        ));

        Ok(Self { settings, mapping })
    }

    /// [`CommandSetup::load`], then run every pre-flight check.
    ///
    /// # Errors
    ///
    /// As [`CommandSetup::load`], plus [`DotsyncError::Validation`] listing
    /// every failed check. Each failure is also logged.
    pub fn init(overrides: &Overrides, log: &Logger) -> Result<Self, DotsyncError> {
        let setup = Self::load(overrides, log)?;
        if let Err(errors) = validation::validate_all(&setup.mapping, &setup.settings) {
            for error in &errors.0 {
                log.error(&error.to_string());
            }
            return Err(errors.into());
        }
        Ok(setup)
    }
}

/// Print the summary and bail if any entry failed.
///
/// # Errors
///
/// Returns an error if one or more entries recorded a failure.
pub fn finish(log: &Logger) -> Result<()> {
    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} entries failed");
    }
    Ok(())
}

/// Write command output to stdout.
///
/// # Errors
///
/// Returns an error if stdout is closed.
pub fn emit(text: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}
