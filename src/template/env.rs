//! Env file safety classification and variable lookup.
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::config::Settings;
use crate::logging::Log;

/// Content that could do harm if the file were ever sourced by a shell.
#[allow(clippy::expect_used)]
static DANGEROUS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"[;&|`$(){}]", "shell metacharacter"),
        (r"eval\s", "eval"),
        (r"exec\s", "exec"),
        (r"\|\s*sh", "pipe to sh"),
        (r">\s*/dev/", "redirection to /dev"),
        (r"rm\s+-rf", "rm -rf"),
    ]
    .into_iter()
    .map(|(p, why)| (Regex::new(p).expect("dangerous pattern is valid"), why))
    .collect()
});

#[allow(clippy::expect_used)]
static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:export\s+)?[A-Za-z_][A-Za-z0-9_]*=.*$").expect("assignment pattern is valid")
});

/// Trust level of one candidate env file.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvStatus {
    /// Plain `KEY=VALUE` content; values may be read.
    Safe,
    /// Present but rejected.
    Unsafe {
        /// What tripped the check.
        reason: String,
    },
    /// Absent, or not a regular file.
    Missing,
}

/// A candidate env file and its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvSource {
    /// File path.
    pub path: PathBuf,
    /// Classification.
    pub status: EnvStatus,
}

impl EnvSource {
    /// Whether values may be read from this source.
    #[must_use]
    pub fn is_safe(&self) -> bool {
        self.status == EnvStatus::Safe
    }
}

/// Classify `content` against the dangerous patterns and the minimum share
/// of assignment lines.
#[must_use]
pub fn classify_content(content: &str, min_ratio: f64) -> EnvStatus {
    if let Some((_, why)) = DANGEROUS.iter().find(|(re, _)| re.is_match(content)) {
        return EnvStatus::Unsafe {
            reason: format!("contains {why}"),
        };
    }

    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();
    if lines.is_empty() {
        return EnvStatus::Safe;
    }

    let valid = lines.iter().filter(|l| ASSIGNMENT.is_match(l)).count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = valid as f64 / lines.len() as f64;
    if ratio < min_ratio {
        return EnvStatus::Unsafe {
            reason: format!(
                "only {valid} of {} lines are KEY=VALUE assignments",
                lines.len()
            ),
        };
    }
    EnvStatus::Safe
}

/// Classify the env file at `path`.
#[must_use]
pub fn validate_env_file(path: &Path, min_ratio: f64) -> EnvStatus {
    if !path.is_file() {
        return EnvStatus::Missing;
    }
    match std::fs::read_to_string(path) {
        Ok(content) => classify_content(&content, min_ratio),
        Err(e) => EnvStatus::Unsafe {
            reason: format!("unreadable: {e}"),
        },
    }
}

/// Classify every configured env file, lowest precedence first. Unsafe and
/// missing files are logged.
pub fn resolve_sources(settings: &Settings, log: &dyn Log) -> Vec<EnvSource> {
    settings
        .env_files
        .iter()
        .map(|path| {
            let status = validate_env_file(path, settings.env_valid_line_ratio);
            match &status {
                EnvStatus::Safe => log.debug(&format!("env file: {}", path.display())),
                EnvStatus::Unsafe { reason } => log.warn(&format!(
                    "skipping unsafe env file {}: {reason}",
                    path.display()
                )),
                EnvStatus::Missing => {
                    log.warn(&format!("env file not found: {}", path.display()));
                }
            }
            EnvSource {
                path: path.clone(),
                status,
            }
        })
        .collect()
}

/// Parse `KEY=VALUE` assignments without any shell evaluation.
///
/// An optional `export ` prefix is accepted and surrounding quotes are
/// stripped. Later assignments of the same key replace earlier
/// ones; empty values are dropped.
#[must_use]
pub fn parse_env(content: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line
            .strip_prefix("export")
            .filter(|rest| rest.starts_with(char::is_whitespace))
            .map_or(line, str::trim_start);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = unquote(value.trim());
        if !value.is_empty() {
            vars.insert(key.to_string(), value.to_string());
        }
    }
    vars
}

fn unquote(value: &str) -> &str {
    value
        .trim_start_matches(['"', '\''])
        .trim_end_matches(['"', '\''])
}

/// Where a resolved variable came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarOrigin {
    /// A Safe env file.
    File(PathBuf),
    /// The process environment.
    Process,
}

impl std::fmt::Display for VarOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(p) => write!(f, "{}", p.display()),
            Self::Process => write!(f, "process environment"),
        }
    }
}

/// A variable value with the sources that define it, lowest precedence
/// first. The last one supplied `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVar {
    /// Winning value.
    pub value: String,
    /// Every source that defines the variable.
    pub defined_in: Vec<VarOrigin>,
}

impl ResolvedVar {
    /// Source of the winning value.
    #[must_use]
    pub fn origin(&self) -> Option<&VarOrigin> {
        self.defined_in.last()
    }
}

/// Merge variables from `sources` in ascending precedence. Only Safe
/// sources are read; `process_env` seeds the lowest level when given.
#[must_use]
pub fn resolve_variables(
    sources: &[EnvSource],
    process_env: Option<&BTreeMap<String, String>>,
) -> BTreeMap<String, ResolvedVar> {
    let mut merged = BTreeMap::new();
    let mut layer = |vars: BTreeMap<String, String>, origin: &VarOrigin| {
        for (key, value) in vars {
            let entry = merged.entry(key).or_insert_with(|| ResolvedVar {
                value: String::new(),
                defined_in: Vec::new(),
            });
            entry.value = value;
            entry.defined_in.push(origin.clone());
        }
    };

    if let Some(env) = process_env {
        let vars = env
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        layer(vars, &VarOrigin::Process);
    }
    for source in sources.iter().filter(|s| s.is_safe()) {
        let Ok(content) = std::fs::read_to_string(&source.path) else {
            continue;
        };
        layer(parse_env(&content), &VarOrigin::File(source.path.clone()));
    }
    merged
}

/// Snapshot of the process environment, for `include_process_env`.
#[must_use]
pub fn process_env() -> BTreeMap<String, String> {
    std::env::vars().collect()
}
