//! Command: print version information.
use anyhow::Result;

/// Version string, preferring the one stamped in at build time.
#[must_use]
pub const fn version() -> &'static str {
    match option_env!("DOTFILES_SYNC_VERSION") {
        Some(v) => v,
        None => env!("CARGO_PKG_VERSION"),
    }
}

/// Print the version to stdout.
///
/// # Errors
///
/// Returns an error if stdout is closed.
pub fn run() -> Result<()> {
    super::emit(&format!("dotfiles-sync {}\n", version()))
}
