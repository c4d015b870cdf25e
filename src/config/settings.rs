//! Runtime settings: defaults, an optional TOML settings file, and CLI
//! overrides, merged in that order.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SettingsError;

/// Name of the mapping file looked up inside the repository.
pub const MAPPING_FILE_NAME: &str = "dotfiles.conf";

/// Default share of well-formed lines an env file needs to be trusted.
pub const DEFAULT_VALID_LINE_RATIO: f64 = 0.8;

/// Default wall-clock limit for one substitution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How `${NAME}` placeholders are replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process replacement.
    #[default]
    Native,
    /// The external `envsubst` program.
    Envsubst,
}

/// Fully resolved settings passed to every component.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Home directory all destinations are relative to.
    pub home: PathBuf,
    /// Repository root holding versioned sources.
    pub repo_dir: PathBuf,
    /// Mapping file path.
    pub mapping_file: PathBuf,
    /// Root under which overwritten destinations are backed up.
    pub backup_dir: PathBuf,
    /// Directory holding user-local overlays.
    pub overlay_dir: PathBuf,
    /// Env files, lowest precedence first.
    pub env_files: Vec<PathBuf>,
    /// Minimum share of `KEY=VALUE` lines for an env file to be Safe.
    pub env_valid_line_ratio: f64,
    /// Seed variable lookup with the process environment.
    pub include_process_env: bool,
    /// Substitution backend.
    pub backend: Backend,
    /// Time limit for one substitution.
    pub timeout: Duration,
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--home`
    pub home: Option<PathBuf>,
    /// `--repo`
    pub repo: Option<PathBuf>,
    /// `--config`
    pub config: Option<PathBuf>,
    /// `--overlay-dir`
    pub overlay_dir: Option<PathBuf>,
    /// `--backup-dir`
    pub backup_dir: Option<PathBuf>,
    /// `--settings`
    pub settings_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    repo_dir: Option<String>,
    mapping_file: Option<String>,
    backup_dir: Option<String>,
    overlay_dir: Option<String>,
    env_files: Option<Vec<String>>,
    env_valid_line_ratio: Option<f64>,
    include_process_env: Option<bool>,
    #[serde(default)]
    substitution: SubstitutionSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubstitutionSection {
    backend: Option<Backend>,
    timeout_secs: Option<u64>,
}

/// Expand `~` and `~/` against `home`; other relative paths are taken
/// relative to `base`.
#[must_use]
pub fn expand(path: &str, home: &Path, base: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return home.join(rest);
    }
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

impl Settings {
    /// Default settings for `home` and `repo_dir`.
    #[must_use]
    pub fn for_home(home: &Path, repo_dir: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
            repo_dir: repo_dir.to_path_buf(),
            mapping_file: repo_dir.join(MAPPING_FILE_NAME),
            backup_dir: home.join(".config").join("dotfiles.bak"),
            overlay_dir: home.join(".config").join("dotfiles.custom"),
            env_files: vec![
                home.join(".env"),
                home.join(".config").join("dotfiles").join(".env"),
            ],
            env_valid_line_ratio: DEFAULT_VALID_LINE_RATIO,
            include_process_env: false,
            backend: Backend::Native,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Resolve settings from the process environment and working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if home or the repository cannot be determined, or
    /// the settings file is invalid.
    pub fn load(overrides: &Overrides) -> Result<Self, SettingsError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::resolve(overrides, |key| std::env::var(key).ok(), &cwd)
    }

    /// Resolve settings with an injectable environment lookup.
    ///
    /// Precedence per value: command line, then the settings file, then
    /// built-in defaults. The repository is taken from `--repo`,
    /// `DOTFILES_REPO`, the directory of `--config`, the settings file's
    /// `repo_dir`, or the working directory when it holds a mapping file.
    ///
    /// # Errors
    ///
    /// See [`Settings::load`].
    pub fn resolve(
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
        cwd: &Path,
    ) -> Result<Self, SettingsError> {
        let non_empty = |key: &str| env(key).filter(|v| !v.is_empty());

        let home = overrides
            .home
            .clone()
            .or_else(|| non_empty("HOME").map(PathBuf::from))
            .ok_or(SettingsError::NoHome)?;

        let file = read_settings_file(overrides, &home, &non_empty)?;

        let repo_dir = overrides
            .repo
            .clone()
            .or_else(|| non_empty("DOTFILES_REPO").map(PathBuf::from))
            .or_else(|| {
                overrides
                    .config
                    .as_deref()
                    .and_then(Path::parent)
                    .map(|p| if p.as_os_str().is_empty() { cwd } else { p })
                    .map(Path::to_path_buf)
            })
            .or_else(|| file.repo_dir.as_deref().map(|r| expand(r, &home, cwd)))
            .or_else(|| {
                cwd.join(MAPPING_FILE_NAME)
                    .is_file()
                    .then(|| cwd.to_path_buf())
            })
            .ok_or(SettingsError::NoRepo)?;

        let mut settings = Self::for_home(&home, &repo_dir);

        if let Some(m) = &file.mapping_file {
            settings.mapping_file = expand(m, &home, &repo_dir);
        }
        if let Some(b) = &file.backup_dir {
            settings.backup_dir = expand(b, &home, &home);
        }
        if let Some(o) = &file.overlay_dir {
            settings.overlay_dir = expand(o, &home, &home);
        }
        if let Some(files) = &file.env_files {
            settings.env_files = files.iter().map(|f| expand(f, &home, &home)).collect();
        }
        if let Some(ratio) = file.env_valid_line_ratio {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(SettingsError::InvalidValue {
                    key: "env_valid_line_ratio".to_string(),
                    message: format!("{ratio} is not in (0, 1]"),
                });
            }
            settings.env_valid_line_ratio = ratio;
        }
        if let Some(include) = file.include_process_env {
            settings.include_process_env = include;
        }
        if let Some(backend) = file.substitution.backend {
            settings.backend = backend;
        }
        if let Some(secs) = file.substitution.timeout_secs {
            if secs == 0 {
                return Err(SettingsError::InvalidValue {
                    key: "substitution.timeout_secs".to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
            settings.timeout = Duration::from_secs(secs);
        }

        if let Some(config) = &overrides.config {
            settings.mapping_file.clone_from(config);
        }
        if let Some(overlay) = &overrides.overlay_dir {
            settings.overlay_dir.clone_from(overlay);
        }
        if let Some(backup) = &overrides.backup_dir {
            settings.backup_dir.clone_from(backup);
        }

        Ok(settings)
    }
}

/// Default settings file location.
fn default_settings_path(home: &Path, env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    env("XDG_CONFIG_HOME")
        .map_or_else(|| home.join(".config"), PathBuf::from)
        .join("dotfiles-sync")
        .join("settings.toml")
}

/// Read the settings file. A missing default file yields empty settings; a
/// missing file named with `--settings` is an error.
fn read_settings_file(
    overrides: &Overrides,
    home: &Path,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<SettingsFile, SettingsError> {
    let (path, explicit) = overrides.settings_file.clone().map_or_else(
        || (default_settings_path(home, env), false),
        |p| (p, true),
    );
    let parse_error = |message: String| SettingsError::Parse {
        path: path.display().to_string(),
        message,
    };

    if !path.is_file() {
        return if explicit {
            Err(parse_error("file not found".to_string()))
        } else {
            Ok(SettingsFile::default())
        };
    }

    let content = std::fs::read_to_string(&path).map_err(|e| parse_error(e.to_string()))?;
    toml::from_str(&content).map_err(|e| parse_error(e.to_string()))
}
