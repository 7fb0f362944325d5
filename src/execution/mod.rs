// src/execution/mod.rs

//! Recipe execution
//!
//! Interprets recipe install scripts. Two executors share one contract:
//! `ShellRecipeExecutor` hands a script to a POSIX shell as-is (also used
//! for discovery scripts), and `TaskRecipeExecutor` interprets the
//! install script as a YAML task graph. Recipes run one at a time; the
//! only parallelism is the subprocess itself, which the executor blocks
//! on. Cancellation is cooperative via `CancelToken`, checked between
//! commands rather than killing a script mid-flight.

pub mod line_capture;
pub mod shell;
pub mod tasks;
pub mod vars;

pub use line_capture::LineCaptureBuffer;
pub use shell::{ScriptOutcome, ShellRecipeExecutor};
pub use tasks::TaskRecipeExecutor;
pub use vars::{RecipeVarProvider, host_fact_vars};

use crate::error::Result;
use crate::recipe::{Recipe, RecipeVars};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared between the caller and the
/// executors. Cheap to clone; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Executes a selected recipe's install logic with injected variables.
pub trait RecipeExecutor {
    /// Run the recipe's install script to completion.
    fn execute(&self, recipe: &Recipe, vars: &RecipeVars, cancel: &CancelToken) -> Result<()>;

    /// Run only the recipe's discovery (pre-install) script.
    fn execute_pre_install(&self, recipe: &Recipe, vars: &RecipeVars) -> Result<()>;
}
