//! Per-destination source selection between overlay and repository.
use std::path::{Component, Path, PathBuf};

use crate::config::mapping::normalize_dest;
use crate::config::{Mapping, Settings};
use crate::error::ConfigError;

/// Where a resolved source came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// The versioned file in the repository.
    Repository,
    /// A user-local overlay.
    Overlay,
    /// An overlay was declared but is missing; the repository file is used.
    FallbackFromMissingOverlay(PathBuf),
}

/// The single source chosen for one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Absolute source path.
    pub source: PathBuf,
    /// Why this source was chosen.
    pub origin: Origin,
}

/// One managed destination with everything needed to sync it either way.
#[derive(Debug, Clone)]
pub struct Target {
    /// Display label: the repository path, or `custom:<name>` for
    /// overlay-only destinations.
    pub label: String,
    /// Destination relative to home, without a leading `~/`.
    pub dest_rel: String,
    /// Absolute destination path.
    pub dest: PathBuf,
    /// Declared overlay name, if any.
    pub overlay: Option<String>,
    /// Source for sync-in.
    pub resolved: Resolved,
    /// Path sync-out writes the live file back to.
    pub collect_to: PathBuf,
}

fn unsafe_dest(dest_path: &str, reason: &str) -> ConfigError {
    ConfigError::Safety {
        line: 0,
        reason: format!("{reason}: {dest_path}"),
    }
}

/// Absolute destination for `dest_path`, refusing anything that is not
/// strictly inside `home`.
///
/// # Errors
///
/// Returns [`ConfigError::Safety`] when the destination escapes `home`, is an
/// absolute path elsewhere, or resolves to `home` itself.
pub fn dest_abs(home: &Path, dest_path: &str) -> Result<PathBuf, ConfigError> {
    let rel = Path::new(normalize_dest(dest_path));
    if rel.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(unsafe_dest(dest_path, "destination outside home directory"));
    }
    let dest = if rel.is_absolute() {
        rel.to_path_buf()
    } else {
        home.join(rel)
    };
    if !dest.starts_with(home) {
        return Err(unsafe_dest(dest_path, "destination outside home directory"));
    }
    let inside = dest
        .strip_prefix(home)
        .is_ok_and(|r| r.components().any(|c| matches!(c, Component::Normal(_))));
    if !inside {
        return Err(unsafe_dest(dest_path, "refusing to manage home directory"));
    }
    Ok(dest)
}

/// `dest` relative to `home`, as shown in logs and mirrored under the
/// backup root.
fn relative_label(home: &Path, dest: &Path) -> String {
    dest.strip_prefix(home)
        .unwrap_or(dest)
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Picks the source for each destination in a mapping.
#[derive(Debug)]
pub struct OverlayResolver<'a> {
    mapping: &'a Mapping,
    settings: &'a Settings,
}

impl<'a> OverlayResolver<'a> {
    /// Create a resolver over `mapping` using the directories in `settings`.
    #[must_use]
    pub const fn new(mapping: &'a Mapping, settings: &'a Settings) -> Self {
        Self { mapping, settings }
    }

    /// Resolve the source for a regular entry.
    ///
    /// An existing overlay declared for the same destination wins; a declared
    /// but missing overlay falls back to the repository file.
    #[must_use]
    pub fn resolve(&self, repo_path: &str, dest_path: &str) -> Resolved {
        let repo_source = self.settings.repo_dir.join(repo_path);
        match self.mapping.overlay_for(dest_path) {
            Some(name) => {
                let overlay = self.settings.overlay_dir.join(name);
                if overlay.exists() {
                    Resolved {
                        source: overlay,
                        origin: Origin::Overlay,
                    }
                } else {
                    Resolved {
                        source: repo_source,
                        origin: Origin::FallbackFromMissingOverlay(overlay),
                    }
                }
            }
            None => Resolved {
                source: repo_source,
                origin: Origin::Repository,
            },
        }
    }

    /// Every managed destination: regular entries in declaration order, then
    /// overlay-only destinations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Safety`] if any destination lies outside home.
    /// Nothing is returned in that case, so no partial sync can start.
    pub fn targets(&self) -> Result<Vec<Target>, ConfigError> {
        let home = &self.settings.home;
        let mut targets = Vec::new();

        for (repo_path, dest_path) in self.mapping.regular() {
            let resolved = self.resolve(repo_path, dest_path);
            let overlay = self.mapping.overlay_for(dest_path).map(String::from);
            let collect_to = match resolved.origin {
                Origin::Overlay => resolved.source.clone(),
                Origin::Repository | Origin::FallbackFromMissingOverlay(_) => {
                    self.settings.repo_dir.join(repo_path)
                }
            };
            let dest = dest_abs(home, dest_path)?;
            targets.push(Target {
                label: repo_path.to_string(),
                dest_rel: relative_label(home, &dest),
                dest,
                overlay,
                resolved,
                collect_to,
            });
        }

        for (name, dest_path) in self.mapping.overlay_only() {
            let source = self.settings.overlay_dir.join(name);
            let dest = dest_abs(home, dest_path)?;
            targets.push(Target {
                label: format!("custom:{name}"),
                dest_rel: relative_label(home, &dest),
                dest,
                overlay: Some(name.to_string()),
                resolved: Resolved {
                    source: source.clone(),
                    origin: Origin::Overlay,
                },
                collect_to: source,
            });
        }

        Ok(targets)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::fs;

    fn setup(mapping: &str) -> (tempfile::TempDir, Settings, Mapping) {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home");
        let repo = dir.path().join("repo");
        fs::create_dir_all(&home).unwrap();
        fs::create_dir_all(&repo).unwrap();
        let settings = Settings::for_home(&home, &repo);
        fs::create_dir_all(&settings.overlay_dir).unwrap();
        (dir, settings, Mapping::parse_str(mapping).unwrap())
    }

    #[test]
    fn repository_source_without_overlay() {
        let (_dir, settings, mapping) = setup("bashrc:~/.bashrc\n");
        let r = OverlayResolver::new(&mapping, &settings).resolve("bashrc", "~/.bashrc");
        assert_eq!(r.origin, Origin::Repository);
        assert_eq!(r.source, settings.repo_dir.join("bashrc"));
    }

    #[test]
    fn existing_overlay_wins() {
        let (_dir, settings, mapping) = setup("bashrc:.bashrc\ncustom:work:.bashrc\n");
        fs::write(settings.overlay_dir.join("work"), "overlay").unwrap();
        let r = OverlayResolver::new(&mapping, &settings).resolve("bashrc", ".bashrc");
        assert_eq!(r.origin, Origin::Overlay);
        assert_eq!(r.source, settings.overlay_dir.join("work"));
    }

    #[test]
    fn missing_overlay_falls_back_and_names_path() {
        let (_dir, settings, mapping) = setup("bashrc:.bashrc\ncustom:work:.bashrc\n");
        let r = OverlayResolver::new(&mapping, &settings).resolve("bashrc", ".bashrc");
        assert_eq!(r.source, settings.repo_dir.join("bashrc"));
        assert_eq!(
            r.origin,
            Origin::FallbackFromMissingOverlay(settings.overlay_dir.join("work"))
        );
    }

    #[test]
    fn targets_include_overlay_only_destinations() {
        let (_dir, settings, mapping) = setup("bashrc:~/.bashrc\ncustom:ssh:.ssh/config\n");
        let targets = OverlayResolver::new(&mapping, &settings).targets().unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].dest, settings.home.join(".bashrc"));
        assert_eq!(targets[0].dest_rel, ".bashrc");
        assert_eq!(targets[1].label, "custom:ssh");
        assert_eq!(targets[1].resolved.source, settings.overlay_dir.join("ssh"));
        assert_eq!(targets[1].collect_to, settings.overlay_dir.join("ssh"));
    }

    #[test]
    fn collect_target_follows_effective_source() {
        let (_dir, settings, mapping) =
            setup("bashrc:.bashrc\nvimrc:.vimrc\ncustom:work:.bashrc\ncustom:gone:.vimrc\n");
        fs::write(settings.overlay_dir.join("work"), "overlay").unwrap();
        let targets = OverlayResolver::new(&mapping, &settings).targets().unwrap();
        assert_eq!(targets[0].collect_to, settings.overlay_dir.join("work"));
        assert_eq!(targets[1].collect_to, settings.repo_dir.join("vimrc"));
    }

    #[test]
    fn destination_outside_home_is_fatal() {
        let (_dir, settings, mapping) = setup("bashrc:.bashrc\nhosts:/etc/hosts\n");
        let err = OverlayResolver::new(&mapping, &settings)
            .targets()
            .expect_err("outside home");
        assert!(matches!(err, ConfigError::Safety { .. }));
    }

    #[test]
    fn absolute_destination_inside_home_is_allowed() {
        let home = Path::new("/home/u");
        assert_eq!(
            dest_abs(home, "/home/u/.bashrc").unwrap(),
            PathBuf::from("/home/u/.bashrc")
        );
        assert_eq!(
            dest_abs(home, "~/.config/nvim").unwrap(),
            PathBuf::from("/home/u/.config/nvim")
        );
    }

    #[test]
    fn home_itself_is_never_a_destination() {
        let home = Path::new("/home/u");
        for dest in ["/home/u", "/home/u/", "/home/u/.", "/", "/home"] {
            let err = dest_abs(home, dest).expect_err(dest);
            assert!(matches!(err, ConfigError::Safety { .. }), "{dest}");
        }
    }

    #[test]
    fn home_path_destination_aborts_targets() {
        let (_dir, settings, _) = setup("bashrc:.bashrc\n");
        let content = format!("bashrc:.bashrc\nprofile:{}\n", settings.home.display());
        let mapping = Mapping::parse_str(&content).unwrap();
        let err = OverlayResolver::new(&mapping, &settings)
            .targets()
            .expect_err("home itself");
        assert!(err.to_string().contains("refusing to manage home directory"));
    }

    #[test]
    fn tilde_and_bare_forms_share_one_target() {
        let (_dir, settings, mapping) = setup("bashrc:~/.bashrc\ncustom:work:.bashrc\n");
        fs::write(settings.overlay_dir.join("work"), "overlay").unwrap();
        let targets = OverlayResolver::new(&mapping, &settings).targets().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].dest_rel, ".bashrc");
        assert_eq!(targets[0].label, "bashrc");
        assert_eq!(targets[0].overlay.as_deref(), Some("work"));
        assert_eq!(targets[0].resolved.origin, Origin::Overlay);
    }

    #[test]
    fn dest_rel_is_relative_to_home() {
        let (_dir, settings, _) = setup("x:.x\n");
        let content = format!(
            "nvim:./.config/nvim/\nrc:{}/.zshrc\n",
            settings.home.display()
        );
        let mapping = Mapping::parse_str(&content).unwrap();
        let targets = OverlayResolver::new(&mapping, &settings).targets().unwrap();
        assert_eq!(targets[0].dest_rel, ".config/nvim");
        assert_eq!(targets[1].dest_rel, ".zshrc");
        assert_eq!(targets[1].dest, settings.home.join(".zshrc"));
    }
}
