//! Subprocess execution with a hard time limit.
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::ExecError;

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of a command execution.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output (empty when stdout was redirected elsewhere).
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

impl ExecResult {
    fn new(status: ExitStatus, stdout: String, stderr: String) -> Self {
        Self {
            stdout,
            stderr,
            success: status.success(),
            code: status.code(),
        }
    }
}

/// Spawn a thread draining `reader` into a lossy UTF-8 string.
///
/// Reading on a separate thread keeps a chatty child from blocking on a full
/// pipe while the parent is polling for its exit.
fn drain<R: Read + Send + 'static>(reader: Option<R>) -> Option<JoinHandle<String>> {
    reader.map(|mut r| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            r.read_to_end(&mut buf).ok();
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Poll `child` until it exits or `timeout` elapses.
///
/// On expiry the child is killed and reaped before returning
/// [`ExecError::Timeout`].
fn wait_or_kill(child: &mut Child, program: &str, timeout: Duration) -> Result<ExitStatus, ExecError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if start.elapsed() >= timeout => {
                child.kill().ok();
                child.wait().ok();
                return Err(ExecError::Timeout {
                    program: program.to_string(),
                    timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                child.kill().ok();
                child.wait().ok();
                return Err(ExecError::Wait {
                    program: program.to_string(),
                    source,
                });
            }
        }
    }
}

/// Run a prepared command, killing it if it runs longer than `timeout`.
///
/// Stdout and stderr are captured unless the caller already redirected them.
/// A non-zero exit is not an error here; inspect [`ExecResult::success`].
///
/// # Errors
///
/// Returns [`ExecError::Spawn`] if the program cannot be started and
/// [`ExecError::Timeout`] if it is killed for exceeding the time limit.
pub fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<ExecResult, ExecError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut child = cmd
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let status = wait_or_kill(&mut child, &program, timeout)?;

    Ok(ExecResult::new(status, collect(stdout), collect(stderr)))
}

/// Check if a program is available on PATH.
#[must_use]
pub fn which(program: &str) -> bool {
    resolve(program).is_some()
}

/// Resolve a program name to its absolute path on PATH.
#[must_use]
pub fn resolve(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

#[cfg(all(test, unix))]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn command(program: &str, args: &[&str]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args).stdout(Stdio::piped());
        cmd
    }

    #[test]
    fn captures_stdout() {
        let result = run_with_timeout(command("echo", &["hello"]), Duration::from_secs(5)).unwrap();
        assert!(result.success);
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn non_zero_exit_is_reported_not_raised() {
        let result = run_with_timeout(command("false", &[]), Duration::from_secs(5)).unwrap();
        assert!(!result.success);
        assert_eq!(result.code, Some(1));
    }

    #[test]
    fn captures_stderr() {
        let result = run_with_timeout(
            command("sh", &["-c", "echo oops >&2; exit 3"]),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(result.code, Some(3));
        assert_eq!(result.stderr.trim(), "oops");
    }

    #[test]
    fn kills_child_on_timeout() {
        let start = Instant::now();
        let err = run_with_timeout(command("sleep", &["5"]), Duration::from_millis(100))
            .expect_err("sleep should time out");
        assert!(matches!(err, ExecError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn cleared_environment_only_sees_explicit_vars() {
        let sh = resolve("sh").expect("sh on PATH");
        let mut cmd = command(
            sh.to_str().unwrap(),
            &["-c", "printf '%s|%s' \"$ONLY\" \"$HOME\""],
        );
        cmd.env_clear().env("ONLY", "value");
        let result = run_with_timeout(cmd, Duration::from_secs(5)).unwrap();
        assert_eq!(result.stdout, "value|");
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let err = run_with_timeout(
            command("this-program-does-not-exist-12345", &[]),
            Duration::from_secs(1),
        )
        .expect_err("spawn should fail");
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[test]
    fn which_finds_known_program() {
        assert!(which("sh"));
        assert!(resolve("sh").is_some_and(|p| p.is_absolute()));
    }

    #[test]
    fn which_missing_program() {
        assert!(!which("this-program-does-not-exist-12345"));
    }
}
