//! Secure `${NAME}` substitution over synced files.
//!
//! Values come only from env files that pass a safety check; the file being
//! rewritten is never left half-written.
pub mod analyze;
pub mod detect;
pub mod env;
pub mod substitute;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::Settings;
use crate::error::SubstitutionError;
use crate::logging::{Log, OutcomeStatus};
use crate::sync::apply::AppliedEntry;
use env::{EnvSource, ResolvedVar};
use substitute::TemplateSubstitutor;

/// Tally of one template batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Applied files containing at least one placeholder.
    pub found: usize,
    /// Templates substituted successfully.
    pub processed: usize,
    /// Templates left alone because no safe env file exists.
    pub skipped: usize,
    /// Per-file failures.
    pub failed: Vec<SubstitutionError>,
}

impl BatchReport {
    /// Rollback snapshots retained for failed files.
    #[must_use]
    pub fn rollbacks(&self) -> Vec<&PathBuf> {
        self.failed.iter().filter_map(SubstitutionError::rollback).collect()
    }
}

/// Classify env sources and merge their variables once for a batch.
#[must_use]
pub fn load_variables(
    settings: &Settings,
    log: &dyn Log,
) -> (Vec<EnvSource>, BTreeMap<String, ResolvedVar>) {
    let sources = env::resolve_sources(settings, log);
    let process = settings.include_process_env.then(env::process_env);
    let vars = env::resolve_variables(&sources, process.as_ref());
    (sources, vars)
}

/// Whether any variable can be read at all.
#[must_use]
pub fn has_values(settings: &Settings, sources: &[EnvSource]) -> bool {
    settings.include_process_env || sources.iter().any(EnvSource::is_safe)
}

/// Substitute placeholders in every applied regular file.
pub fn process_applied(applied: &[AppliedEntry], settings: &Settings, log: &dyn Log) -> BatchReport {
    let mut report = BatchReport::default();

    let templates: Vec<_> = applied
        .iter()
        .filter(|entry| entry.dest.is_file())
        .filter_map(|entry| {
            let vars = detect::detect(&entry.dest);
            (!vars.is_empty()).then_some((entry, vars))
        })
        .collect();
    if templates.is_empty() {
        log.debug("no templates in synced files");
        return report;
    }

    log.stage("Processing templates");
    report.found = templates.len();
    for (entry, vars) in &templates {
        let names: Vec<&str> = vars.iter().map(String::as_str).collect();
        log.info(&format!("template found: {} ({})", entry.dest_rel, names.join(", ")));
    }

    let (sources, vars) = load_variables(settings, log);
    if !has_values(settings, &sources) {
        log.warn("no safe env file found, templates left unprocessed");
        for (entry, _) in &templates {
            log.record(&entry.dest_rel, OutcomeStatus::Skipped, Some("no safe env file"));
        }
        report.skipped = templates.len();
        return report;
    }

    let substitutor = TemplateSubstitutor::new(substitute::from_settings(settings));
    for (entry, required) in templates {
        let analysis = analyze::analyze_required(required, &vars);
        for (name, (_, origin)) in &analysis.resolved {
            log.debug(&format!("{}: {name} from {origin}", entry.dest_rel));
        }
        for conflict in &analysis.conflicts {
            log.debug(&format!(
                "{}: {} set in {} sources, last one wins",
                entry.dest_rel,
                conflict.name,
                conflict.sources.len()
            ));
        }
        for name in &analysis.missing {
            log.warn(&format!("{}: variable {name} not set", entry.dest_rel));
        }
        let label = format!("template {}", entry.dest_rel);
        match substitutor.process(&entry.dest, &analysis.values()) {
            Ok(()) => {
                log.info(&format!("processed {}", entry.dest_rel));
                let note = (!analysis.is_complete()).then_some("some variables missing");
                log.record(&label, OutcomeStatus::Ok, note);
                report.processed += 1;
            }
            Err(e) => {
                log.error(&e.to_string());
                if let Some(rollback) = e.rollback() {
                    log.info(&format!("original kept at {}", rollback.display()));
                }
                log.record(&label, OutcomeStatus::Failed, Some(&e.to_string()));
                report.failed.push(e);
            }
        }
    }

    log.info(&format!(
        "{} templates found, {} processed, {} failed",
        report.found,
        report.processed,
        report.failed.len()
    ));
    report
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::{Level, MemoryLog};
    use std::fs;

    fn applied(home: &std::path::Path, rel: &str) -> AppliedEntry {
        AppliedEntry {
            label: rel.to_string(),
            dest_rel: rel.to_string(),
            dest: home.join(rel),
        }
    }

    fn settings(dir: &std::path::Path) -> Settings {
        let mut s = Settings::for_home(dir, dir);
        s.env_files = vec![dir.join("a.env"), dir.join("b.env")];
        s
    }

    #[test]
    fn substitutes_with_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        fs::write(dir.path().join("a.env"), "API_KEY=low\nURL=https://x\n").unwrap();
        fs::write(dir.path().join("b.env"), "API_KEY=high\n").unwrap();
        fs::write(dir.path().join("app.conf"), "key=${API_KEY} url=${URL}\n").unwrap();
        fs::write(dir.path().join("plain"), "no placeholders\n").unwrap();

        let log = MemoryLog::new();
        let report = process_applied(
            &[applied(dir.path(), "app.conf"), applied(dir.path(), "plain")],
            &s,
            &log,
        );
        assert_eq!(report.found, 1);
        assert_eq!(report.processed, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("app.conf")).unwrap(),
            "key=high url=https://x\n"
        );
        let debug = log.messages(Level::Debug);
        let b_env = dir.path().join("b.env");
        assert!(debug.contains(&format!("app.conf: API_KEY from {}", b_env.display())));
        assert!(debug.contains(&"app.conf: API_KEY set in 2 sources, last one wins".to_string()));
        assert!(debug.iter().any(|m| m.starts_with("app.conf: URL from ")));
    }

    #[test]
    fn no_safe_source_skips_without_touching_files() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        fs::write(dir.path().join("a.env"), "API_KEY=$(curl evil)\n").unwrap();
        fs::write(dir.path().join("app.conf"), "key=${API_KEY}\n").unwrap();

        let log = MemoryLog::new();
        let report = process_applied(&[applied(dir.path(), "app.conf")], &s, &log);
        assert_eq!(report.processed, 0);
        assert_eq!(report.skipped, 1);
        assert!(report.failed.is_empty());
        assert_eq!(
            fs::read_to_string(dir.path().join("app.conf")).unwrap(),
            "key=${API_KEY}\n"
        );
        assert!(
            log.warnings()
                .iter()
                .any(|w| w.contains("no safe env file"))
        );
    }

    #[test]
    fn missing_variable_is_left_and_warned() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        fs::write(dir.path().join("a.env"), "A=1\n").unwrap();
        fs::write(dir.path().join("rc"), "${A} ${B}\n").unwrap();

        let log = MemoryLog::new();
        let report = process_applied(&[applied(dir.path(), "rc")], &s, &log);
        assert_eq!(report.processed, 1);
        assert_eq!(fs::read_to_string(dir.path().join("rc")).unwrap(), "1 ${B}\n");
        assert!(log.warnings().contains(&"rc: variable B not set".to_string()));
        assert_eq!(log.outcomes()[0].message.as_deref(), Some("some variables missing"));
    }

    #[test]
    fn directories_are_not_scanned() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        fs::create_dir_all(dir.path().join("nvim")).unwrap();
        fs::write(dir.path().join("nvim/init.lua"), "${A}").unwrap();
        let report = process_applied(&[applied(dir.path(), "nvim")], &s, &MemoryLog::new());
        assert_eq!(report.found, 0);
    }
}
