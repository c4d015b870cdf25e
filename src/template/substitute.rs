//! Placeholder substitution with snapshot, temp output and atomic commit.
use anyhow::{Context as _, Result, bail};
use regex::Captures;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use super::detect::PLACEHOLDER;
use crate::config::{Backend, Settings};
use crate::error::SubstitutionError;
use crate::exec;

/// One way of turning a template into its substituted form.
#[cfg_attr(test, mockall::automock)]
pub trait Substituter {
    /// Confirm the backend can run at all.
    ///
    /// # Errors
    ///
    /// Returns [`SubstitutionError::Unavailable`] when it cannot.
    fn check(&self) -> Result<(), SubstitutionError>;

    /// Read `input`, write the substituted text to `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if the step fails for any reason.
    fn substitute(&self, input: &Path, output: &Path, vars: &BTreeMap<String, String>) -> Result<()>;
}

/// In-process `${NAME}` replacement. Unresolved placeholders are left as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeSubstituter;

/// Replace every resolved `${NAME}` in `content`.
#[must_use]
pub fn substitute_str(content: &str, vars: &BTreeMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(content, |caps: &Captures<'_>| {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            caps.get(1)
                .and_then(|name| vars.get(name.as_str()))
                .map_or_else(|| whole.to_string(), Clone::clone)
        })
        .into_owned()
}

impl Substituter for NativeSubstituter {
    fn check(&self) -> Result<(), SubstitutionError> {
        Ok(())
    }

    fn substitute(&self, input: &Path, output: &Path, vars: &BTreeMap<String, String>) -> Result<()> {
        let content = fs::read_to_string(input)
            .with_context(|| format!("reading {}", input.display()))?;
        fs::write(output, substitute_str(&content, vars))
            .with_context(|| format!("writing {}", output.display()))?;
        Ok(())
    }
}

/// An external filter program fed the template on stdin.
///
/// The program runs with a cleared environment holding only the resolved
/// assignments and a SHELL-FORMAT argument naming them, so nothing else is
/// expanded.
#[derive(Debug, Clone)]
pub struct CommandSubstituter {
    program: String,
    timeout: Duration,
}

impl CommandSubstituter {
    /// `envsubst` with the given time limit.
    #[must_use]
    pub fn envsubst(timeout: Duration) -> Self {
        Self::new("envsubst", timeout)
    }

    /// Any envsubst-compatible program.
    #[must_use]
    pub fn new(program: &str, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            timeout,
        }
    }

    fn shell_format(vars: &BTreeMap<String, String>) -> String {
        vars.keys()
            .map(|k| format!("${k}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Substituter for CommandSubstituter {
    fn check(&self) -> Result<(), SubstitutionError> {
        if exec::which(&self.program) {
            Ok(())
        } else {
            Err(SubstitutionError::Unavailable(self.program.clone()))
        }
    }

    fn substitute(&self, input: &Path, output: &Path, vars: &BTreeMap<String, String>) -> Result<()> {
        let program = exec::resolve(&self.program)
            .ok_or_else(|| SubstitutionError::Unavailable(self.program.clone()))?;
        let stdin = File::open(input).with_context(|| format!("opening {}", input.display()))?;
        let stdout =
            File::create(output).with_context(|| format!("creating {}", output.display()))?;

        let mut cmd = Command::new(&program);
        cmd.arg(Self::shell_format(vars))
            .env_clear()
            .envs(vars)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout));
        if let Some(dir) = input.parent() {
            cmd.current_dir(dir);
        }

        let result = exec::run_with_timeout(cmd, self.timeout)?;
        if !result.success {
            let code = result
                .code
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            bail!("{} exited with {code}: {}", self.program, result.stderr.trim());
        }
        Ok(())
    }
}

/// Backend selected by `settings`.
#[must_use]
pub fn from_settings(settings: &Settings) -> Box<dyn Substituter> {
    match settings.backend {
        Backend::Native => Box::new(NativeSubstituter),
        Backend::Envsubst => Box::new(CommandSubstituter::envsubst(settings.timeout)),
    }
}

/// Runs a [`Substituter`] over a file without ever leaving it half-written.
pub struct TemplateSubstitutor {
    backend: Box<dyn Substituter>,
}

impl std::fmt::Debug for TemplateSubstitutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSubstitutor").finish_non_exhaustive()
    }
}

impl TemplateSubstitutor {
    /// Wrap `backend`.
    #[must_use]
    pub const fn new(backend: Box<dyn Substituter>) -> Self {
        Self { backend }
    }

    /// Substitute `vars` into `path` in place.
    ///
    /// A rollback snapshot is taken next to the file first. On success the
    /// snapshot is removed; on failure the file is untouched and the snapshot
    /// path is returned in the error.
    ///
    /// # Errors
    ///
    /// Returns [`SubstitutionError::NotFound`] if `path` is not a regular
    /// file, [`SubstitutionError::Unavailable`] if the backend cannot run, and
    /// [`SubstitutionError::Failed`] for any failure of the step itself.
    pub fn process(&self, path: &Path, vars: &BTreeMap<String, String>) -> Result<(), SubstitutionError> {
        if !path.is_file() {
            return Err(SubstitutionError::NotFound(path.to_path_buf()));
        }
        self.backend.check()?;

        let rollback = snapshot(path).map_err(|e| SubstitutionError::Failed {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
            rollback: None,
        })?;

        match self.run(path, vars) {
            Ok(()) => {
                fs::remove_file(&rollback).ok();
                Ok(())
            }
            Err(e) => Err(SubstitutionError::Failed {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
                rollback: Some(rollback),
            }),
        }
    }

    fn run(&self, path: &Path, vars: &BTreeMap<String, String>) -> Result<()> {
        let parent = parent_of(path);
        let output = tempfile::Builder::new()
            .prefix(".dotfiles-sync-")
            .suffix(".tmp")
            .tempfile_in(parent)
            .with_context(|| format!("create temp file in {}", parent.display()))?;

        self.backend.substitute(path, output.path(), vars)?;

        let len = fs::metadata(output.path())
            .context("substitution produced no output file")?
            .len();
        if len == 0 {
            bail!("substitution produced empty output");
        }
        let perms = fs::metadata(path)
            .with_context(|| format!("reading metadata of {}", path.display()))?
            .permissions();
        fs::set_permissions(output.path(), perms)
            .with_context(|| format!("setting permissions on {}", output.path().display()))?;

        output
            .persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("rename into {}", path.display()))?;
        Ok(())
    }
}

fn parent_of(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Copy `path` to a kept sibling `.<name>.<random>.template_backup`.
fn snapshot(path: &Path) -> Result<PathBuf> {
    let parent = parent_of(path);
    let name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    let staged = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".template_backup")
        .tempfile_in(parent)
        .with_context(|| format!("create rollback file in {}", parent.display()))?;
    fs::copy(path, staged.path())
        .with_context(|| format!("snapshot {}", path.display()))?;
    let (_, kept) = staged.keep().map_err(|e| e.error).context("keeping rollback file")?;
    Ok(kept)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn siblings(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn native_leaves_unresolved_intact() {
        let out = substitute_str("a=${A} b=${B} $A ${A", &vars(&[("A", "one")]));
        assert_eq!(out, "a=one b=${B} $A ${A");
    }

    #[test]
    fn native_does_not_rescan_values() {
        let out = substitute_str("${A}", &vars(&[("A", "${B}"), ("B", "no")]));
        assert_eq!(out, "${B}");
    }

    #[test]
    fn process_commits_and_removes_rollback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"key": "${API_KEY}"}"#).unwrap();

        let sub = TemplateSubstitutor::new(Box::new(NativeSubstituter));
        sub.process(&path, &vars(&[("API_KEY", "secret")])).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"key": "secret"}"#);
        assert_eq!(siblings(dir.path()), vec!["config.json".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn process_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt as _;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script");
        fs::write(&path, "echo ${A}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o700)).unwrap();

        TemplateSubstitutor::new(Box::new(NativeSubstituter))
            .process(&path, &vars(&[("A", "hi")]))
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[test]
    fn failure_keeps_original_and_rollback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rc");
        fs::write(&path, "x=${X}").unwrap();

        let mut backend = MockSubstituter::new();
        backend.expect_check().returning(|| Ok(()));
        backend
            .expect_substitute()
            .times(1)
            .returning(|_, _, _| Err(anyhow::anyhow!("boom")));

        let err = TemplateSubstitutor::new(Box::new(backend))
            .process(&path, &vars(&[("X", "1")]))
            .expect_err("backend fails");
        let rollback = err.rollback().expect("rollback kept").clone();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x=${X}");
        assert_eq!(fs::read_to_string(&rollback).unwrap(), "x=${X}");
        assert_eq!(siblings(dir.path()).len(), 2);
    }

    #[test]
    fn empty_output_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rc");
        fs::write(&path, "x=${X}").unwrap();

        let mut backend = MockSubstituter::new();
        backend.expect_check().returning(|| Ok(()));
        backend.expect_substitute().returning(|_, _, _| Ok(()));

        let err = TemplateSubstitutor::new(Box::new(backend))
            .process(&path, &BTreeMap::new())
            .expect_err("empty output");
        assert!(err.to_string().contains("empty output"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "x=${X}");
    }

    #[test]
    fn unavailable_backend_takes_no_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rc");
        fs::write(&path, "x=${X}").unwrap();

        let mut backend = MockSubstituter::new();
        backend
            .expect_check()
            .returning(|| Err(SubstitutionError::Unavailable("envsubst".into())));
        backend.expect_substitute().never();

        let err = TemplateSubstitutor::new(Box::new(backend))
            .process(&path, &BTreeMap::new())
            .expect_err("unavailable");
        assert!(matches!(err, SubstitutionError::Unavailable(_)));
        assert_eq!(siblings(dir.path()), vec!["rc".to_string()]);
    }

    #[test]
    fn missing_template_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = TemplateSubstitutor::new(Box::new(NativeSubstituter))
            .process(&dir.path().join("nope"), &BTreeMap::new())
            .expect_err("missing");
        assert!(matches!(err, SubstitutionError::NotFound(_)));
    }

    #[test]
    fn shell_format_lists_resolved_names() {
        assert_eq!(
            CommandSubstituter::shell_format(&vars(&[("B", "2"), ("A", "1")])),
            "$A $B"
        );
    }

    #[test]
    fn missing_program_is_unavailable() {
        let sub = CommandSubstituter::new("definitely-not-a-real-program-xyz", Duration::from_secs(1));
        assert!(matches!(sub.check(), Err(SubstitutionError::Unavailable(_))));
    }

    #[cfg(unix)]
    #[test]
    fn command_failure_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rc");
        fs::write(&path, "x=${X}").unwrap();

        let sub = TemplateSubstitutor::new(Box::new(CommandSubstituter::new(
            "false",
            Duration::from_secs(5),
        )));
        let err = sub.process(&path, &vars(&[("X", "1")])).expect_err("false fails");
        assert!(err.rollback().is_some());
        assert_eq!(fs::read_to_string(&path).unwrap(), "x=${X}");
    }

    #[cfg(unix)]
    #[test]
    fn envsubst_substitutes_only_resolved_names() {
        if !exec::which("envsubst") {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rc");
        fs::write(&path, "a=${A} home=${HOME}\n").unwrap();
        TemplateSubstitutor::new(Box::new(CommandSubstituter::envsubst(Duration::from_secs(5))))
            .process(&path, &vars(&[("A", "one")]))
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a=one home=${HOME}\n");
    }
}
