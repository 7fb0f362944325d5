// src/filter/mod.rs

//! Recipe filtering
//!
//! Turns detection verdicts plus user preferences into the final install
//! set. The pipeline per recipe, in order:
//!
//! 1. availability (process gate, then discovery script, via the shared
//!    detector); failing here hides the recipe with no status event
//! 2. application-target recipes without the "apm" keyword surface as
//!    `RECOMMENDED` in the summary instead of entering the install set
//! 3. user filters: an `--only` allow-list short-circuits everything
//!    else; skip-by-name/type/keyword marks the recipe `SKIPPED`, an
//!    observable event, not a silent drop
//!
//! The infrastructure agent is exempt from type-based skip rules: it is
//! the telemetry prerequisite for every other recipe.

use crate::detection::RecipeDetector;
use crate::recipe::{INFRA_AGENT_RECIPE_NAME, Recipe, TargetType};
use crate::status::{InstallStatus, RecipeStatusEvent, RecipeStatusType};
use std::str::FromStr;
use tracing::debug;

/// User-driven skip/only rules, distilled from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct SkipFilter {
    only_names: Vec<String>,
    skip_names: Vec<String>,
    skip_types: Vec<String>,
    skip_keywords: Vec<String>,
}

impl SkipFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only_names(mut self, names: &[String]) -> Self {
        self.only_names.extend(names.iter().cloned());
        self
    }

    pub fn skip_names(mut self, names: &[String]) -> Self {
        self.skip_names.extend(names.iter().cloned());
        self
    }

    pub fn skip_types(mut self, types: &[String]) -> Self {
        self.skip_types.extend(types.iter().cloned());
        self
    }

    pub fn skip_keywords(mut self, keywords: &[String]) -> Self {
        self.skip_keywords.extend(keywords.iter().cloned());
        self
    }

    /// Whether the user's rules exclude this recipe.
    pub fn filtered(&self, recipe: &Recipe) -> bool {
        if !self.only_names.is_empty() {
            let allowed = self
                .only_names
                .iter()
                .any(|n| n.trim().eq_ignore_ascii_case(recipe.name.trim()));
            if !allowed {
                debug!(recipe = %recipe.name, "recipe not in --only allow-list");
                return true;
            }
        }

        for name in &self.skip_names {
            if name.trim().eq_ignore_ascii_case(recipe.name.trim()) {
                debug!(recipe = %recipe.name, "recipe found in skip list");
                return true;
            }
        }

        for keyword in &self.skip_keywords {
            if recipe.has_keyword(keyword) {
                debug!(recipe = %recipe.name, keyword = %keyword, "recipe keyword in skip list");
                return true;
            }
        }

        // The infra agent can never be skipped based on type
        if recipe.name.eq_ignore_ascii_case(INFRA_AGENT_RECIPE_NAME) {
            return false;
        }

        for type_name in &self.skip_types {
            if let Ok(target_type) = TargetType::from_str(type_name) {
                if recipe.has_target_type(target_type) {
                    debug!(recipe = %recipe.name, skip_type = %type_name, "recipe type in skip list");
                    return true;
                }
            }
        }

        false
    }
}

pub struct RecipeFilterRunner<'a> {
    detector: &'a RecipeDetector,
    skip_filter: SkipFilter,
}

impl<'a> RecipeFilterRunner<'a> {
    pub fn new(detector: &'a RecipeDetector, skip_filter: SkipFilter) -> Self {
        Self {
            detector,
            skip_filter,
        }
    }

    /// Run the full pipeline for one recipe. Returns `true` when the
    /// recipe is excluded from the install set; status events are emitted
    /// as a side effect.
    pub fn run_filter(&self, recipe: &Recipe, status: &mut InstallStatus) -> bool {
        match self.detector.detect(recipe) {
            Some(RecipeStatusType::Available) => {}
            verdict => {
                debug!(recipe = %recipe.name, ?verdict, "filtering out unavailable recipe");
                return true;
            }
        }

        if recipe.has_application_target_type() && !recipe.is_apm() {
            status.recipe_recommended(RecipeStatusEvent::new(recipe));
            debug!(recipe = %recipe.name, "application-target recipe surfaced as recommendation");
            return true;
        }

        status.recipe_available(recipe);

        if self.skip_filter.filtered(recipe) {
            status.recipe_skipped(RecipeStatusEvent::new(recipe));
            return true;
        }

        false
    }

    /// Filter a list, returning the recipes that survive.
    pub fn run_filter_multiple(
        &self,
        recipes: &[Recipe],
        status: &mut InstallStatus,
    ) -> Vec<Recipe> {
        recipes
            .iter()
            .filter(|recipe| !self.run_filter(recipe, status))
            .cloned()
            .collect()
    }
}
