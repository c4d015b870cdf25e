//! Drift detection and unified diff rendering.
use std::fmt;
use std::io;
use std::path::Path;

use similar::{ChangeTag, TextDiff};

/// Lines of context around each hunk.
const CONTEXT_LINES: usize = 3;

/// How a destination compares with its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Byte-for-byte equal text.
    Identical,
    /// Destination does not exist yet.
    New,
    /// Both are text and differ.
    Modified,
    /// At least one side is not valid UTF-8.
    Binary,
    /// At least one side is a directory.
    Directory,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Identical => "identical",
            Self::New => "new",
            Self::Modified => "modified",
            Self::Binary => "binary",
            Self::Directory => "directory",
        })
    }
}

/// Read a file as UTF-8, mapping a decode failure to `None`.
fn read_text(path: &Path) -> io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => Ok(None),
        Err(e) => Err(e),
    }
}

/// Classify `dest` against `source` without modifying either.
///
/// # Errors
///
/// Propagates I/O errors other than a UTF-8 decode failure.
pub fn classify(source: &Path, dest: &Path) -> io::Result<SyncStatus> {
    if dest.symlink_metadata().is_err() {
        return Ok(SyncStatus::New);
    }
    if source.is_dir() || dest.is_dir() {
        return Ok(SyncStatus::Directory);
    }
    let Some(new) = read_text(source)? else {
        return Ok(SyncStatus::Binary);
    };
    let Some(current) = read_text(dest)? else {
        return Ok(SyncStatus::Binary);
    };
    Ok(if new == current {
        SyncStatus::Identical
    } else {
        SyncStatus::Modified
    })
}

/// Render a unified diff from `current` (the live file) to `new` (the source).
///
/// Identical inputs yield the literal `no changes`.
#[must_use]
pub fn render(label: &str, current: &str, new: &str) -> String {
    if current == new {
        return "no changes".to_string();
    }
    TextDiff::from_lines(current, new)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&format!("{label} (current)"), &format!("{label} (new)"))
        .to_string()
}

/// Add ANSI colours to a rendered diff for terminal display.
#[must_use]
pub fn colorize(diff: &str) -> String {
    let mut out = String::with_capacity(diff.len() + diff.len() / 4);
    for line in diff.lines() {
        let color = if line.starts_with("+++") || line.starts_with("---") {
            "\x1b[1m"
        } else if line.starts_with("@@") {
            "\x1b[36m"
        } else if line.starts_with('+') {
            "\x1b[32m"
        } else if line.starts_with('-') {
            "\x1b[31m"
        } else {
            ""
        };
        if color.is_empty() {
            out.push_str(line);
        } else {
            out.push_str(color);
            out.push_str(line);
            out.push_str("\x1b[0m");
        }
        out.push('\n');
    }
    out
}

/// Added and removed line counts between two texts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    /// Lines only in the new text.
    pub additions: usize,
    /// Lines only in the current text.
    pub deletions: usize,
}

impl DiffStats {
    /// Count changed lines from `current` to `new`.
    #[must_use]
    pub fn between(current: &str, new: &str) -> Self {
        TextDiff::from_lines(current, new)
            .iter_all_changes()
            .fold(Self::default(), |mut acc, change| {
                match change.tag() {
                    ChangeTag::Insert => acc.additions += 1,
                    ChangeTag::Delete => acc.deletions += 1,
                    ChangeTag::Equal => {}
                }
                acc
            })
    }
}

impl fmt::Display for DiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{} -{}", self.additions, self.deletions)
    }
}
