//! Required-versus-available variable analysis for one template.
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::detect;
use super::env::{EnvSource, EnvStatus, ResolvedVar, VarOrigin};
use crate::logging::Log;

/// A required variable defined in more than one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Variable name.
    pub name: String,
    /// Sources that define it, lowest precedence first.
    pub sources: Vec<VarOrigin>,
}

/// Outcome of analysing one template against the available variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateAnalysis {
    /// Placeholders used by the template.
    pub required: BTreeSet<String>,
    /// Required variables that have a value, with its source.
    pub resolved: BTreeMap<String, (String, VarOrigin)>,
    /// Required variables defined by more than one source.
    pub conflicts: Vec<Conflict>,
    /// Required variables with no value anywhere.
    pub missing: BTreeSet<String>,
}

impl TemplateAnalysis {
    /// Whether every required variable has a value.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Resolved values only, for the substitution step.
    #[must_use]
    pub fn values(&self) -> BTreeMap<String, String> {
        self.resolved
            .iter()
            .map(|(k, (v, _))| (k.clone(), v.clone()))
            .collect()
    }
}

/// Match `required` against `vars`.
#[must_use]
pub fn analyze_required(
    required: BTreeSet<String>,
    vars: &BTreeMap<String, ResolvedVar>,
) -> TemplateAnalysis {
    let mut analysis = TemplateAnalysis::default();
    for name in &required {
        match vars.get(name) {
            Some(var) => {
                if let Some(origin) = var.origin() {
                    analysis
                        .resolved
                        .insert(name.clone(), (var.value.clone(), origin.clone()));
                }
                if var.defined_in.len() > 1 {
                    analysis.conflicts.push(Conflict {
                        name: name.clone(),
                        sources: var.defined_in.clone(),
                    });
                }
            }
            None => {
                analysis.missing.insert(name.clone());
            }
        }
    }
    analysis.required = required;
    analysis
}

/// Analyse the template at `path`.
#[must_use]
pub fn analyze(path: &Path, vars: &BTreeMap<String, ResolvedVar>) -> TemplateAnalysis {
    analyze_required(detect::detect(path), vars)
}

/// Log a human-readable report of `analysis`.
pub fn report(path: &Path, analysis: &TemplateAnalysis, sources: &[EnvSource], log: &dyn Log) {
    log.stage(&format!("Analyzing {}", path.display()));
    if analysis.required.is_empty() {
        log.info("no variables found in template");
        return;
    }

    log.info(&format!(
        "variables required: {}",
        analysis
            .required
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    ));

    for source in sources {
        let state = match &source.status {
            EnvStatus::Safe => "safe",
            EnvStatus::Unsafe { .. } => "unsafe, skipped",
            EnvStatus::Missing => "not found",
        };
        log.info(&format!("env file {} ({state})", source.path.display()));
    }

    for (name, (_, origin)) in &analysis.resolved {
        log.info(&format!("{name}: {origin}"));
    }
    for conflict in &analysis.conflicts {
        let chain = conflict
            .sources
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        log.warn(&format!("{} defined in several sources: {chain}", conflict.name));
    }
    for name in &analysis.missing {
        log.warn(&format!("{name}: missing"));
    }

    log.info(&format!(
        "{} required, {} resolved, {} missing",
        analysis.required.len(),
        analysis.resolved.len(),
        analysis.missing.len()
    ));
}
