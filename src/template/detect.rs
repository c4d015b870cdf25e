//! Placeholder detection.
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

/// `${NAME}` where NAME is a shell-style identifier.
#[allow(clippy::expect_used)]
pub(crate) static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Placeholder names used in `content`.
#[must_use]
pub fn variables_in(content: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Placeholder names used in the file at `path`.
///
/// Unreadable or non-UTF-8 files have no placeholders.
#[must_use]
pub fn detect(path: &Path) -> BTreeSet<String> {
    std::fs::read_to_string(path)
        .map(|content| variables_in(&content))
        .unwrap_or_default()
}
