//! Command: list managed files and their overlay state.
use anyhow::Result;
use std::fmt::Write as _;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::config::{Mapping, Settings};
use crate::logging::Logger;

/// Render the listing shown by `list`.
#[must_use]
pub fn render(settings: &Settings, mapping: &Mapping) -> String {
    let mut out = String::new();
    let overlay_only = mapping.overlay_only();
    let overlays = mapping.entries.len() - mapping.regular().count();

    let _ = writeln!(out, "Repository: {}", settings.repo_dir.display());
    let _ = writeln!(out, "Overlay directory: {}", settings.overlay_dir.display());
    let _ = writeln!(out, "Total files: {}", mapping.regular().count());
    if overlays > 0 {
        let _ = writeln!(out, "Overlays: {overlays}");
    }

    let _ = writeln!(out, "\nMappings:");
    for (repo_path, dest_path) in mapping.regular() {
        match mapping.overlay_for(dest_path) {
            Some(name) if settings.overlay_dir.join(name).exists() => {
                let _ = writeln!(out, "  {repo_path} -> {dest_path} [OVERLAY: {name}]");
            }
            Some(name) => {
                let _ = writeln!(out, "  {repo_path} -> {dest_path} [OVERLAY NOT FOUND: {name}]");
            }
            None => {
                let _ = writeln!(out, "  {repo_path} -> {dest_path}");
            }
        }
    }
    for (name, dest_path) in overlay_only {
        let _ = writeln!(out, "  custom:{name} -> {dest_path} [OVERLAY ONLY]");
    }
    out
}

/// Print every mapping entry. Missing overlays are shown, not rejected.
///
/// # Errors
///
/// Returns an error if settings or the mapping file cannot be loaded.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::load(&global.overrides(), log)?;
    super::emit(&render(&setup.settings, &setup.mapping))
}
