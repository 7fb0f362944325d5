// src/execution/tasks.rs

//! Install task-graph interpreter
//!
//! A recipe's install script is a small YAML task DSL: a map of named
//! tasks, each holding a list of commands. A command is either a shell
//! string or a reference to another task. Execution starts at the
//! `default` task. `{{.VAR}}` placeholders are substituted from the
//! injected variable map before each command runs.
//!
//! ```yaml
//! tasks:
//!   default:
//!     cmds:
//!       - task: setup
//!       - task: start
//!   setup:
//!     cmds:
//!       - mkdir -p /etc/agent
//!       - echo "license={{.LICENSE_KEY}}" > /etc/agent/agent.conf
//!   start:
//!     cmds:
//!       - systemctl restart agent
//! ```
//!
//! Failures carry the chain of task names (`task_path`) to the failing
//! command and the last line the command wrote to stderr.

use crate::error::{Error, Result};
use crate::execution::shell::{
    EXIT_CODE_INTERRUPT, EXIT_CODE_UNSUPPORTED, ShellRecipeExecutor,
};
use crate::execution::{CancelToken, RecipeExecutor};
use crate::recipe::{Recipe, RecipeVars};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace};

/// Entry task every install script must define.
const ENTRY_TASK: &str = "default";

/// Parsed install task document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Taskfile {
    #[serde(default)]
    #[allow(dead_code)]
    version: Option<String>,
    #[serde(default)]
    vars: BTreeMap<String, String>,
    #[serde(default)]
    tasks: BTreeMap<String, Task>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Task {
    #[serde(default)]
    cmds: Vec<TaskCmd>,
    #[serde(default)]
    vars: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TaskCmd {
    /// A shell command string
    Shell(String),
    /// A reference to another task in the same document
    Ref { task: String },
}

/// Interprets a recipe's install script as a task graph, running each
/// shell command through a POSIX shell with the injected variables.
pub struct TaskRecipeExecutor {
    shell: ShellRecipeExecutor,
}

impl Default for TaskRecipeExecutor {
    fn default() -> Self {
        Self {
            shell: ShellRecipeExecutor::new(),
        }
    }
}

impl TaskRecipeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each discovery-script run; install commands are not bounded
    /// (package managers legitimately take minutes).
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.shell.timeout = Some(timeout);
        self
    }

    fn run_task(
        &self,
        taskfile: &Taskfile,
        name: &str,
        vars: &RecipeVars,
        cancel: &CancelToken,
        task_path: &mut Vec<String>,
    ) -> Result<()> {
        let Some(task) = taskfile.tasks.get(name) else {
            return Err(Error::TaskError {
                task_path: task_path.clone(),
                message: format!("task \"{}\" is not defined", name),
            });
        };

        // A task referencing one of its ancestors would loop forever.
        if task_path.iter().any(|seen| seen == name) {
            return Err(Error::TaskError {
                task_path: task_path.clone(),
                message: format!("task \"{}\" references itself", name),
            });
        }

        task_path.push(name.to_string());
        debug!(task = %name, "running task");

        // Variable precedence inside the document: file-level vars, then
        // the injected recipe variables, then task-level vars.
        let mut merged = taskfile.vars.clone();
        merged.extend(vars.clone());
        merged.extend(task.vars.clone());

        for cmd in &task.cmds {
            if cancel.is_canceled() {
                return Err(Error::Interrupted);
            }

            match cmd {
                TaskCmd::Ref { task: child } => {
                    self.run_task(taskfile, child, vars, cancel, task_path)?;
                }
                TaskCmd::Shell(command) => {
                    let rendered = substitute_vars(command, &merged);
                    trace!(task = %name, cmd = %rendered, "running command");
                    self.run_command(&rendered, &merged, task_path)?;
                }
            }
        }

        task_path.pop();
        Ok(())
    }

    fn run_command(
        &self,
        command: &str,
        vars: &RecipeVars,
        task_path: &[String],
    ) -> Result<()> {
        let outcome = self.shell.run_script(command, vars)?;

        if outcome.success() {
            return Ok(());
        }

        let last_stderr = outcome.stderr.last_full_line().to_string();
        match outcome.exit_code {
            EXIT_CODE_INTERRUPT => Err(Error::Interrupted),
            EXIT_CODE_UNSUPPORTED => Err(Error::UnsupportedOs(last_stderr)),
            code => Err(Error::TaskError {
                task_path: task_path.to_vec(),
                message: format!("exit status {}: {}", code, last_stderr),
            }),
        }
    }
}

impl RecipeExecutor for TaskRecipeExecutor {
    fn execute(&self, recipe: &Recipe, vars: &RecipeVars, cancel: &CancelToken) -> Result<()> {
        debug!(recipe = %recipe.name, "executing install task graph");

        let taskfile: Taskfile = serde_yaml::from_str(&recipe.install).map_err(|e| {
            Error::ParseError(format!(
                "recipe {} has an invalid install script: {}",
                recipe.name, e
            ))
        })?;

        let mut task_path = Vec::new();
        self.run_task(&taskfile, ENTRY_TASK, vars, cancel, &mut task_path)
    }

    fn execute_pre_install(&self, recipe: &Recipe, vars: &RecipeVars) -> Result<()> {
        self.shell.execute_pre_install(recipe, vars)
    }
}

/// Replace `{{.NAME}}` placeholders with variable values; unknown names
/// render empty, matching how recipe authors probe optional variables.
fn substitute_vars(command: &str, vars: &RecipeVars) -> String {
    static PLACEHOLDER: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let placeholder = PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder pattern")
    });

    placeholder
        .replace_all(command, |caps: &regex::Captures<'_>| {
            vars.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(install: &str, vars: RecipeVars) -> Result<()> {
        let recipe = Recipe {
            name: "test-recipe".to_string(),
            install: install.to_string(),
            ..Default::default()
        };
        TaskRecipeExecutor::new().execute(&recipe, &vars, &CancelToken::new())
    }

    #[test]
    fn test_runs_default_task() {
        run("tasks:\n  default:\n    cmds:\n      - 'true'\n", RecipeVars::new()).unwrap();
    }

    #[test]
    fn test_task_references_run_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("order.txt");
        let install = format!(
            r#"
tasks:
  default:
    cmds:
      - task: first
      - task: second
  first:
    cmds:
      - echo one >> {path}
  second:
    cmds:
      - echo two >> {path}
"#,
            path = marker.display()
        );

        run(&install, RecipeVars::new()).unwrap();
        let contents = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(contents, "one\ntwo\n");
    }

    #[test]
    fn test_variable_substitution_and_env_injection() {
        let mut vars = RecipeVars::new();
        vars.insert("PORT".to_string(), "3306".to_string());
        // Both the {{.VAR}} template form and plain env expansion work.
        run(
            "tasks:\n  default:\n    cmds:\n      - test \"{{.PORT}}\" = \"$PORT\"\n",
            vars,
        )
        .unwrap();
    }

    #[test]
    fn test_task_level_vars_override_injected() {
        let mut vars = RecipeVars::new();
        vars.insert("MODE".to_string(), "global".to_string());
        run(
            r#"
tasks:
  default:
    vars:
      MODE: local
    cmds:
      - test "{{.MODE}}" = "local"
"#,
            vars,
        )
        .unwrap();
    }

    #[test]
    fn test_failure_carries_task_path_and_stderr() {
        let err = run(
            r#"
tasks:
  default:
    cmds:
      - task: configure
  configure:
    cmds:
      - echo "config file locked" >&2; exit 3
"#,
            RecipeVars::new(),
        )
        .unwrap_err();

        match err {
            Error::TaskError { task_path, message } => {
                assert_eq!(task_path, vec!["default", "configure"]);
                assert!(message.contains("exit status 3"));
                assert!(message.contains("config file locked"));
            }
            other => panic!("expected TaskError, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_default_task_is_an_error() {
        let err = run("tasks:\n  setup:\n    cmds:\n      - 'true'\n", RecipeVars::new())
            .unwrap_err();
        assert!(err.to_string().contains("\"default\" is not defined"));
    }

    #[test]
    fn test_self_referencing_task_is_rejected() {
        let err = run(
            "tasks:\n  default:\n    cmds:\n      - task: default\n",
            RecipeVars::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("references itself"));
    }

    #[test]
    fn test_interrupt_exit_code() {
        let err = run(
            "tasks:\n  default:\n    cmds:\n      - exit 130\n",
            RecipeVars::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Interrupted));
    }

    #[test]
    fn test_canceled_token_stops_before_commands_run() {
        let recipe = Recipe {
            name: "test-recipe".to_string(),
            install: "tasks:\n  default:\n    cmds:\n      - 'true'\n".to_string(),
            ..Default::default()
        };
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = TaskRecipeExecutor::new()
            .execute(&recipe, &RecipeVars::new(), &cancel)
            .unwrap_err();
        assert!(matches!(err, Error::Interrupted));
    }

    #[test]
    fn test_invalid_install_yaml_is_a_parse_error() {
        let err = run("not: [valid, taskfile", RecipeVars::new()).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn test_substitute_unknown_var_renders_empty() {
        let rendered = substitute_vars("echo [{{.MISSING}}]", &RecipeVars::new());
        assert_eq!(rendered, "echo []");
    }
}
