//! Run-log location, clock stamps and ANSI removal.
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]").expect("ANSI escape pattern is valid")
});

/// `text` without terminal escape sequences.
pub(super) fn plain(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

fn cache_root() -> Option<PathBuf> {
    std::env::var_os("XDG_CACHE_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
}

/// Run log for `command`, e.g. `~/.cache/dotfiles-sync/sync-in.log`.
///
/// The directory is created on demand; `None` when there is no usable
/// cache root.
pub(super) fn log_path(command: &str) -> Option<PathBuf> {
    let dir = cache_root()?.join(env!("CARGO_PKG_NAME"));
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// Wall-clock time prefixed to each run-log line.
pub(super) fn clock() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}

/// Timestamp written once in the run-log header.
pub(super) fn started_at() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn plain_drops_colour_and_cursor_sequences() {
        assert_eq!(plain("\x1b[31mERROR\x1b[0m apply failed"), "ERROR apply failed");
        assert_eq!(plain("\x1b[1;34m==>\x1b[0m \x1b[1mSummary\x1b[0m"), "==> Summary");
        assert_eq!(plain("\x1b[2K\x1b[1Gdone"), "done");
    }

    #[test]
    fn plain_keeps_diff_markers() {
        assert_eq!(plain("\x1b[32m+export A=1\x1b[0m"), "+export A=1");
        assert_eq!(plain("@@ -1 +1 @@ [x]"), "@@ -1 +1 @@ [x]");
        assert_eq!(plain(""), "");
    }

    #[test]
    fn clock_is_hours_minutes_seconds() {
        let stamp = clock();
        let parts: Vec<&str> = stamp.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.len() == 2 && p.parse::<u8>().is_ok()));
    }

    #[test]
    fn started_at_is_marked_utc() {
        let stamp = started_at();
        assert!(stamp.ends_with(" UTC"));
        assert_eq!(stamp.len(), "2026-01-01 00:00:00 UTC".len());
    }
}
