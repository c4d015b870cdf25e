//! Build script that embeds the version string into the binary.

use std::process::Command;

fn main() {
    // Prefer DOTFILES_SYNC_VERSION if set (release builds), otherwise fall
    // back to git describe for local development builds.
    if let Ok(version) = std::env::var("DOTFILES_SYNC_VERSION") {
        println!("cargo:rustc-env=DOTFILES_SYNC_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=DOTFILES_SYNC_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=DOTFILES_SYNC_VERSION");
}
