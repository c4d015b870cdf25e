//! Command: show which variables a template needs and where each comes from.
use anyhow::{Result, bail};

use crate::cli::{AnalyzeTemplateOpts, GlobalOpts};
use crate::config::Settings;
use crate::logging::Logger;
use crate::template::{self, analyze};

/// Run the analyze-template command.
///
/// # Errors
///
/// Returns an error if the template does not exist or any variable it uses
/// has no value.
pub fn run(global: &GlobalOpts, opts: &AnalyzeTemplateOpts, log: &Logger) -> Result<()> {
    let settings = Settings::load(&global.overrides())?;
    if !opts.path.is_file() {
        bail!("template not found: {}", opts.path.display());
    }

    let (sources, vars) = template::load_variables(&settings, log);
    let analysis = analyze::analyze(&opts.path, &vars);
    analyze::report(&opts.path, &analysis, &sources, log);

    if !analysis.is_complete() {
        bail!("{} variable(s) missing", analysis.missing.len());
    }
    Ok(())
}
