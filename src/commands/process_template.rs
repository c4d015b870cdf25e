//! Command: substitute one template into a new file.
use anyhow::{Context as _, Result, bail};

use crate::cli::{GlobalOpts, ProcessTemplateOpts};
use crate::config::Settings;
use crate::fs;
use crate::logging::Logger;
use crate::template::substitute::{self, TemplateSubstitutor};
use crate::template::{self, analyze};

/// Run the process-template command.
///
/// The input is copied to the output first and the output is substituted in
/// place, so the input is never modified. With no safe env file the output
/// is left as a plain copy.
///
/// # Errors
///
/// Returns an error if the input does not exist, the copy fails, or
/// substitution fails.
pub fn run(global: &GlobalOpts, opts: &ProcessTemplateOpts, log: &Logger) -> Result<()> {
    let settings = Settings::load(&global.overrides())?;
    if !opts.input.is_file() {
        bail!("input template not found: {}", opts.input.display());
    }

    let (sources, vars) = template::load_variables(&settings, log);
    let analysis = analyze::analyze(&opts.input, &vars);
    analyze::report(&opts.input, &analysis, &sources, log);

    fs::copy_file_atomic(&opts.input, &opts.output)
        .with_context(|| format!("copying template to {}", opts.output.display()))?;

    if !template::has_values(&settings, &sources) {
        log.warn("no safe env file found, output left unprocessed");
        return Ok(());
    }

    TemplateSubstitutor::new(substitute::from_settings(&settings))
        .process(&opts.output, &analysis.values())?;
    log.info(&format!("template processed: {}", opts.output.display()));
    Ok(())
}
