// src/execution/shell.rs

//! POSIX shell script execution
//!
//! Scripts run with host privileges under a real shell (`sh -c`); shell
//! semantics are never reimplemented here. stdin is nullified to prevent
//! hangs, stdout/stderr are captured line-by-line, and an optional
//! timeout bounds discovery scripts that probe unresponsive services.

use crate::error::{Error, Result};
use crate::execution::line_capture::LineCaptureBuffer;
use crate::execution::{CancelToken, RecipeExecutor};
use crate::recipe::{Recipe, RecipeVars};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, trace, warn};
use wait_timeout::ChildExt;

/// Exit code recipes use to signal a user-driven cancel.
pub const EXIT_CODE_INTERRUPT: i32 = 130;
/// Exit code recipes use to declare the host OS unsupported.
pub const EXIT_CODE_UNSUPPORTED: i32 = 131;
/// Exit code recipes use for "present on host, but install deferred".
pub const EXIT_CODE_DETECTED: i32 = 132;

/// Result of one script run: exit code plus captured output.
#[derive(Debug)]
pub struct ScriptOutcome {
    pub exit_code: i32,
    pub stdout: LineCaptureBuffer,
    pub stderr: LineCaptureBuffer,
}

impl ScriptOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a recipe script string through `sh -c`.
pub struct ShellRecipeExecutor {
    pub shell_path: String,
    pub dir: Option<PathBuf>,
    /// Bound on script runtime; `None` means wait indefinitely
    pub timeout: Option<Duration>,
}

impl Default for ShellRecipeExecutor {
    fn default() -> Self {
        Self {
            shell_path: "sh".to_string(),
            dir: None,
            timeout: None,
        }
    }
}

impl ShellRecipeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run `script` and report its raw outcome. Spawn failures (shell
    /// missing, permissions) are errors; a non-zero exit is not; callers
    /// own the exit-code contract.
    ///
    /// The script is written to a temp file and handed to the shell, so
    /// multi-line scripts behave exactly as they would from disk.
    pub fn run_script(&self, script: &str, vars: &RecipeVars) -> Result<ScriptOutcome> {
        let temp_dir = TempDir::new()?;
        let script_path = temp_dir.path().join("script.sh");
        std::fs::write(&script_path, script)?;

        let mut command = Command::new(&self.shell_path);
        command
            .arg(&script_path)
            .envs(vars)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| Error::ScriptError(format!("failed to spawn {}: {}", self.shell_path, e)))?;

        if let Some(timeout) = self.timeout {
            if child.wait_timeout(timeout)?.is_none() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::ScriptError(format!(
                    "script timed out after {} seconds",
                    timeout.as_secs()
                )));
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::ScriptError(format!("failed to collect script output: {}", e)))?;

        let stdout = LineCaptureBuffer::from_output(&output.stdout);
        let stderr = LineCaptureBuffer::from_output(&output.stderr);

        for line in stdout.lines() {
            trace!("[script stdout] {}", line);
        }
        for line in stderr.lines() {
            warn!("[script stderr] {}", line);
        }

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(exit_code, "script finished");

        Ok(ScriptOutcome {
            exit_code,
            stdout,
            stderr,
        })
    }

    /// Run a script and translate its exit code into the shared error
    /// taxonomy (130 interrupt, 131 unsupported OS, anything else a
    /// failure carrying the last stderr line).
    fn run_and_map(&self, script: &str, vars: &RecipeVars) -> Result<()> {
        let outcome = self.run_script(script, vars)?;

        if outcome.success() {
            return Ok(());
        }

        let last_stderr = outcome.stderr.last_full_line().to_string();
        match outcome.exit_code {
            EXIT_CODE_INTERRUPT => Err(Error::Interrupted),
            EXIT_CODE_UNSUPPORTED => Err(Error::UnsupportedOs(last_stderr)),
            code => Err(Error::ScriptError(format!(
                "exit status {}: {}",
                code, last_stderr
            ))),
        }
    }
}

impl RecipeExecutor for ShellRecipeExecutor {
    fn execute(&self, recipe: &Recipe, vars: &RecipeVars, cancel: &CancelToken) -> Result<()> {
        if cancel.is_canceled() {
            return Err(Error::Interrupted);
        }
        self.run_and_map(&recipe.install, vars)
    }

    fn execute_pre_install(&self, recipe: &Recipe, vars: &RecipeVars) -> Result<()> {
        trace!(recipe = %recipe.name, "executing pre-install script");
        self.run_and_map(&recipe.pre_install.require_at_discovery, vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_vars() -> RecipeVars {
        RecipeVars::new()
    }

    #[test]
    fn test_successful_script() {
        let outcome = ShellRecipeExecutor::new()
            .run_script("echo hello", &no_vars())
            .unwrap();
        assert!(outcome.success());
        assert_eq!(outcome.stdout.last_full_line(), "hello");
    }

    #[test]
    fn test_exit_code_is_reported() {
        let outcome = ShellRecipeExecutor::new()
            .run_script("exit 132", &no_vars())
            .unwrap();
        assert_eq!(outcome.exit_code, 132);
    }

    #[test]
    fn test_vars_are_injected_into_environment() {
        let mut vars = RecipeVars::new();
        vars.insert("GREETING".to_string(), "bonjour".to_string());
        let outcome = ShellRecipeExecutor::new()
            .run_script("echo \"$GREETING\"", &vars)
            .unwrap();
        assert_eq!(outcome.stdout.last_full_line(), "bonjour");
    }

    #[test]
    fn test_last_stderr_line_survives_failure() {
        let recipe = Recipe {
            install: "echo noise >&2\necho 'port 3306 unreachable' >&2\nexit 1".to_string(),
            ..Default::default()
        };
        let err = ShellRecipeExecutor::new()
            .execute(&recipe, &no_vars(), &CancelToken::new())
            .unwrap_err();
        assert!(err.to_string().contains("port 3306 unreachable"));
    }

    #[test]
    fn test_unsupported_exit_code_maps_to_unsupported_os() {
        let recipe = Recipe {
            install: "echo 'kernel too old' >&2; exit 131".to_string(),
            ..Default::default()
        };
        let err = ShellRecipeExecutor::new()
            .execute(&recipe, &no_vars(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOs(_)));
    }

    #[test]
    fn test_interrupt_exit_code_maps_to_interrupted() {
        let recipe = Recipe {
            install: "exit 130".to_string(),
            ..Default::default()
        };
        let err = ShellRecipeExecutor::new()
            .execute(&recipe, &no_vars(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::Interrupted));
    }

    #[test]
    fn test_timeout_kills_hung_script() {
        let err = ShellRecipeExecutor::new()
            .with_timeout(Duration::from_millis(200))
            .run_script("sleep 30", &no_vars())
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_missing_shell_is_a_spawn_error() {
        let executor = ShellRecipeExecutor {
            shell_path: "/nonexistent/shell".to_string(),
            ..Default::default()
        };
        let err = executor.run_script("echo hi", &no_vars()).unwrap_err();
        assert!(matches!(err, Error::ScriptError(_)));
    }
}
