// src/detection/script.rs

//! Discovery script evaluation
//!
//! Runs a recipe's `preInstall.requireAtDiscovery` script and maps the
//! exit code onto a detection verdict. The exit-code contract is a
//! load-bearing ABI between recipe authors and the orchestrator:
//!
//! - `0`   - `AVAILABLE`: the recipe can be installed here
//! - `132` - `DETECTED`: the software is present but the recipe defers
//! - `131` - `UNSUPPORTED`: the host cannot run this recipe
//! - anything else (or a failure to run at all) - unavailable; the
//!   recipe is excluded with no further action

use crate::execution::ShellRecipeExecutor;
use crate::recipe::{Recipe, RecipeVars};
use crate::status::RecipeStatusType;
use std::time::Duration;
use tracing::debug;

use crate::execution::shell::{EXIT_CODE_DETECTED, EXIT_CODE_UNSUPPORTED};

/// Discovery scripts probe the host and must come back quickly.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(60);

pub struct ScriptEvaluator {
    executor: ShellRecipeExecutor,
    /// Host-fact variables injected into every discovery script
    vars: RecipeVars,
}

impl ScriptEvaluator {
    pub fn new(vars: RecipeVars) -> Self {
        Self {
            executor: ShellRecipeExecutor::new().with_timeout(DISCOVERY_TIMEOUT),
            vars,
        }
    }

    /// Evaluate the recipe's discovery script. `None` means unavailable.
    ///
    /// A recipe without a discovery script is `AVAILABLE` without
    /// spawning a process.
    pub fn detection_status(&self, recipe: &Recipe) -> Option<RecipeStatusType> {
        if !recipe.has_discovery_script() {
            return Some(RecipeStatusType::Available);
        }

        let outcome = match self
            .executor
            .run_script(&recipe.pre_install.require_at_discovery, &self.vars)
        {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(recipe = %recipe.name, "discovery script failed to run: {}", e);
                return None;
            }
        };

        match outcome.exit_code {
            0 => Some(RecipeStatusType::Available),
            EXIT_CODE_DETECTED => Some(RecipeStatusType::Detected),
            EXIT_CODE_UNSUPPORTED => Some(RecipeStatusType::Unsupported),
            code => {
                debug!(
                    recipe = %recipe.name,
                    exit_code = code,
                    stderr = %outcome.stderr.last_full_line(),
                    "recipe failed discovery script evaluation"
                );
                None
            }
        }
    }
}
