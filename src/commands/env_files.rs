//! Command: print the env files consulted for templates.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Settings;
use crate::logging::Logger;
use crate::template::env;

/// Print env file paths, lowest precedence first. Their classification is
/// logged at debug level.
///
/// # Errors
///
/// Returns an error if settings cannot be resolved.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let settings = Settings::load(&global.overrides())?;
    let mut out = String::new();
    for path in &settings.env_files {
        let status = env::validate_env_file(path, settings.env_valid_line_ratio);
        log.debug(&format!("{}: {status:?}", path.display()));
        out.push_str(&path.display().to_string());
        out.push('\n');
    }
    super::emit(&out)
}
