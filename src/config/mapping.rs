//! Mapping file (`dotfiles.conf`) parsing.
//!
//! Each non-blank, non-comment line maps one source to one destination:
//!
//! ```text
//! # repository file      -> destination relative to home
//! bashrc:~/.bashrc
//! config/nvim:.config/nvim
//! # user-local overlay   -> destination it supersedes
//! custom:work/gitconfig:.gitconfig
//! ```
use std::path::{Component, Path};

use crate::error::ConfigError;

/// Prefix marking an overlay line.
const OVERLAY_PREFIX: &str = "custom:";

/// A single declared mapping, classified once at parse time.
///
/// # Examples
///
/// ```
/// use dotfiles_sync::config::mapping::{Mapping, MappingEntry};
///
/// let mapping = Mapping::parse_str("bashrc:.bashrc\ncustom:work.sh:.bashrc\n").unwrap();
/// assert_eq!(mapping.entries.len(), 2);
/// assert_eq!(mapping.overlay_for(".bashrc"), Some("work.sh"));
/// assert!(matches!(mapping.entries[0], MappingEntry::Regular { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingEntry {
    /// A versioned file or directory inside the repository.
    Regular {
        /// Path relative to the repository root.
        repo_path: String,
        /// Destination relative to home (a leading `~/` is allowed).
        dest_path: String,
    },
    /// A user-local overlay that supersedes the repository source.
    Overlay {
        /// Path relative to the overlay directory; may contain colons.
        name: String,
        /// Destination relative to home.
        dest_path: String,
    },
}

impl MappingEntry {
    /// Destination path as written in the mapping file.
    #[must_use]
    pub fn dest_path(&self) -> &str {
        match self {
            Self::Regular { dest_path, .. } | Self::Overlay { dest_path, .. } => dest_path,
        }
    }
}

/// Parsed mapping file: ordered entries plus the recoverable format warnings
/// collected along the way.
#[derive(Debug, Default)]
pub struct Mapping {
    /// Entries in declaration order.
    pub entries: Vec<MappingEntry>,
    /// Lines that were skipped as malformed.
    pub warnings: Vec<ConfigError>,
}

impl Mapping {
    /// Load and parse a mapping file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Safety`] if any line is unsafe.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_str(&content)
    }

    /// Parse mapping content from a string.
    ///
    /// Malformed lines are skipped and reported in [`Mapping::warnings`].
    /// A single unsafe line aborts the whole parse.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Safety`] for a `/` or `~` destination or a `..`
    /// path segment.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let mut mapping = Self::default();
        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_line(line, line_no) {
                Ok(entry) => {
                    check_safety(&entry, line_no)?;
                    mapping.entries.push(entry);
                }
                Err(warning) => mapping.warnings.push(warning),
            }
        }
        Ok(mapping)
    }

    /// Overlay name declared for `dest`, if any. The last declaration wins.
    ///
    /// Destinations are compared after [`normalize_dest`], so `~/.bashrc`
    /// and `.bashrc` name the same file.
    #[must_use]
    pub fn overlay_for(&self, dest: &str) -> Option<&str> {
        let wanted = normalize_dest(dest);
        self.entries.iter().rev().find_map(|e| match e {
            MappingEntry::Overlay { name, dest_path } if normalize_dest(dest_path) == wanted => {
                Some(name.as_str())
            }
            _ => None,
        })
    }

    /// Regular entries as `(repo_path, dest_path)` pairs, in order.
    pub fn regular(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|e| match e {
            MappingEntry::Regular {
                repo_path,
                dest_path,
            } => Some((repo_path.as_str(), dest_path.as_str())),
            MappingEntry::Overlay { .. } => None,
        })
    }

    /// Overlay entries whose destination has no regular entry, as
    /// `(name, dest_path)` pairs. Each destination appears once, with the
    /// winning overlay name.
    #[must_use]
    pub fn overlay_only(&self) -> Vec<(&str, &str)> {
        let mut out: Vec<(&str, &str)> = Vec::new();
        for entry in &self.entries {
            let MappingEntry::Overlay { dest_path, .. } = entry else {
                continue;
            };
            let dest = dest_path.as_str();
            let key = normalize_dest(dest);
            if self.regular().any(|(_, d)| normalize_dest(d) == key)
                || out.iter().any(|(_, d)| normalize_dest(d) == key)
            {
                continue;
            }
            if let Some(name) = self.overlay_for(dest) {
                out.push((name, dest));
            }
        }
        out
    }
}

fn format_error(line: usize, content: &str, reason: &str) -> ConfigError {
    ConfigError::Format {
        line,
        content: content.to_string(),
        reason: reason.to_string(),
    }
}

/// Split one trimmed line into an entry, or explain why it is malformed.
fn parse_line(line: &str, line_no: usize) -> Result<MappingEntry, ConfigError> {
    if !line.contains(':') {
        return Err(format_error(line_no, line, "expected repo_path:dest_path"));
    }

    if let Some(rest) = line.strip_prefix(OVERLAY_PREFIX) {
        let Some((name, dest)) = rest.rsplit_once(':') else {
            return Err(format_error(
                line_no,
                line,
                "expected custom:name:dest_path",
            ));
        };
        let (name, dest) = (name.trim(), dest.trim());
        if name.is_empty() {
            return Err(format_error(line_no, line, "empty overlay name"));
        }
        if dest.is_empty() {
            return Err(format_error(line_no, line, "empty destination"));
        }
        return Ok(MappingEntry::Overlay {
            name: name.to_string(),
            dest_path: dest.to_string(),
        });
    }

    let (repo, dest) = line
        .split_once(':')
        .map(|(r, d)| (r.trim(), d.trim()))
        .unwrap_or_default();
    if repo.is_empty() || dest.is_empty() {
        return Err(format_error(line_no, line, "empty repo_path or dest_path"));
    }
    Ok(MappingEntry::Regular {
        repo_path: repo.to_string(),
        dest_path: dest.to_string(),
    })
}

/// Destination relative to home: a leading `~/`, any leading `./` and
/// trailing separators are dropped.
///
/// ```
/// use dotfiles_sync::config::mapping::normalize_dest;
///
/// assert_eq!(normalize_dest("~/.config/nvim/"), ".config/nvim");
/// assert_eq!(normalize_dest("./.bashrc"), ".bashrc");
/// assert_eq!(normalize_dest("~/"), "");
/// ```
#[must_use]
pub fn normalize_dest(dest_path: &str) -> &str {
    let mut rel = dest_path.strip_prefix("~/").unwrap_or(dest_path);
    while let Some(rest) = rel.strip_prefix("./") {
        rel = rest.trim_start_matches('/');
    }
    let trimmed = rel.trim_end_matches('/');
    if trimmed.is_empty() && rel.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

/// Whether `dest_path` names the home directory itself (or the root) rather
/// than something inside it.
fn names_home_or_root(dest_path: &str) -> bool {
    dest_path == "~"
        || !Path::new(normalize_dest(dest_path))
            .components()
            .any(|c| matches!(c, Component::Normal(_)))
}

/// Whether `path` has a `..` component, with either separator.
pub(crate) fn has_parent_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|seg| seg == "..")
}

fn check_safety(entry: &MappingEntry, line: usize) -> Result<(), ConfigError> {
    let dest = entry.dest_path();
    if names_home_or_root(dest) {
        return Err(ConfigError::Safety {
            line,
            reason: format!("refusing to manage root or home directory: {dest}"),
        });
    }
    let source = match entry {
        MappingEntry::Regular { repo_path, .. } => repo_path,
        MappingEntry::Overlay { name, .. } => name,
    };
    if has_parent_segment(source) || has_parent_segment(dest) {
        return Err(ConfigError::Safety {
            line,
            reason: format!("path traversal not allowed: {source} -> {dest}"),
        });
    }
    Ok(())
}
