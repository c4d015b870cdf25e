//! Pre-flight validation of a parsed mapping.
//!
//! Every check runs and every failure is collected, so the operator sees
//! the whole list at once. Any failure blocks the sync.
use std::collections::BTreeSet;

use super::mapping::{Mapping, MappingEntry};
use super::settings::Settings;
use crate::error::{ValidationError, ValidationErrors};

/// A single pre-flight check over the mapping.
pub trait MappingValidator {
    /// Run the check and return every failure found.
    fn validate(&self, mapping: &Mapping, settings: &Settings) -> Vec<ValidationError>;

    /// Short name used in debug output (e.g., "sources", "overlays").
    fn name(&self) -> &'static str;
}

/// The mapping must declare at least one entry.
#[derive(Debug)]
pub struct NonEmptyValidator;

impl MappingValidator for NonEmptyValidator {
    fn validate(&self, mapping: &Mapping, _settings: &Settings) -> Vec<ValidationError> {
        if mapping.entries.is_empty() {
            vec![ValidationError::Empty]
        } else {
            Vec::new()
        }
    }

    fn name(&self) -> &'static str {
        "entries"
    }
}

/// Every regular source must exist under the repository.
#[derive(Debug)]
pub struct SourceValidator;

impl MappingValidator for SourceValidator {
    fn validate(&self, mapping: &Mapping, settings: &Settings) -> Vec<ValidationError> {
        mapping
            .regular()
            .filter(|(repo_path, _)| !settings.repo_dir.join(repo_path).exists())
            .map(|(repo_path, _)| ValidationError::SourceNotFound {
                repo_path: repo_path.to_string(),
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "sources"
    }
}

/// Every overlay must exist under the overlay directory.
#[derive(Debug)]
pub struct OverlayValidator;

impl MappingValidator for OverlayValidator {
    fn validate(&self, mapping: &Mapping, settings: &Settings) -> Vec<ValidationError> {
        mapping
            .entries
            .iter()
            .filter_map(|e| match e {
                MappingEntry::Overlay { name, .. } => Some(name),
                MappingEntry::Regular { .. } => None,
            })
            .filter_map(|name| {
                let expected = settings.overlay_dir.join(name);
                (!expected.exists()).then(|| ValidationError::OverlayNotFound {
                    name: name.clone(),
                    expected: expected.display().to_string(),
                })
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "overlays"
    }
}

/// No repository path may be mapped twice.
#[derive(Debug)]
pub struct DuplicateValidator;

impl MappingValidator for DuplicateValidator {
    fn validate(&self, mapping: &Mapping, _settings: &Settings) -> Vec<ValidationError> {
        let mut seen = BTreeSet::new();
        let mut reported = BTreeSet::new();
        let mut errors = Vec::new();
        for (repo_path, _) in mapping.regular() {
            if !seen.insert(repo_path) && reported.insert(repo_path) {
                errors.push(ValidationError::Duplicate {
                    repo_path: repo_path.to_string(),
                });
            }
        }
        errors
    }

    fn name(&self) -> &'static str {
        "duplicates"
    }
}

/// Run every validator and collect all failures.
///
/// # Errors
///
/// Returns [`ValidationErrors`] holding every failure when any check fails.
pub fn validate_all(mapping: &Mapping, settings: &Settings) -> Result<(), ValidationErrors> {
    let validators: [&dyn MappingValidator; 4] = [
        &NonEmptyValidator,
        &SourceValidator,
        &OverlayValidator,
        &DuplicateValidator,
    ];

    let mut errors = Vec::new();
    for validator in validators {
        let found = validator.validate(mapping, settings);
        tracing::debug!("validator {}: {} problem(s)", validator.name(), found.len());
        errors.extend(found);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::fs;

    fn setup() -> (tempfile::TempDir, Settings) {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home");
        let repo = dir.path().join("repo");
        fs::create_dir_all(&home).unwrap();
        fs::create_dir_all(&repo).unwrap();
        let settings = Settings::for_home(&home, &repo);
        (dir, settings)
    }

    #[test]
    fn valid_mapping_passes() {
        let (_dir, settings) = setup();
        fs::write(settings.repo_dir.join("bashrc"), "x").unwrap();
        fs::create_dir_all(&settings.overlay_dir).unwrap();
        fs::write(settings.overlay_dir.join("work"), "y").unwrap();
        let mapping = Mapping::parse_str("bashrc:.bashrc\ncustom:work:.bashrc\n").unwrap();
        assert!(validate_all(&mapping, &settings).is_ok());
    }

    #[test]
    fn empty_mapping_fails() {
        let (_dir, settings) = setup();
        let mapping = Mapping::parse_str("# nothing\n").unwrap();
        let err = validate_all(&mapping, &settings).unwrap_err();
        assert_eq!(err.0, vec![ValidationError::Empty]);
    }

    #[test]
    fn collects_every_failure() {
        let (_dir, settings) = setup();
        fs::write(settings.repo_dir.join("vimrc"), "x").unwrap();
        let mapping = Mapping::parse_str(
            "bashrc:.bashrc\nvimrc:.vimrc\nvimrc:.vimrc2\nvimrc:.vimrc3\ncustom:gone:.bashrc\n",
        )
        .unwrap();
        let err = validate_all(&mapping, &settings).unwrap_err();
        assert_eq!(err.0.len(), 3);
        assert!(err.0.contains(&ValidationError::SourceNotFound {
            repo_path: "bashrc".to_string()
        }));
        assert!(err.0.contains(&ValidationError::Duplicate {
            repo_path: "vimrc".to_string()
        }));
        assert!(
            err.0
                .iter()
                .any(|e| matches!(e, ValidationError::OverlayNotFound { name, .. } if name == "gone"))
        );
    }

    #[test]
    fn overlay_only_mapping_is_not_empty() {
        let (_dir, settings) = setup();
        fs::create_dir_all(&settings.overlay_dir).unwrap();
        fs::write(settings.overlay_dir.join("ssh"), "Host *").unwrap();
        let mapping = Mapping::parse_str("custom:ssh:.ssh/config\n").unwrap();
        assert!(validate_all(&mapping, &settings).is_ok());
    }
}
