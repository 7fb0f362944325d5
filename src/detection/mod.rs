// src/detection/mod.rs

//! Recipe detection
//!
//! Combines the process-signature gate and the discovery script into one
//! per-recipe verdict. The process gate runs first because it is cheap:
//! a recipe with process patterns that match nothing is unavailable
//! without ever spawning its discovery script. Verdicts are memoized by
//! recipe name, so recipes shared across multiple bundles are only
//! evaluated once per run.

pub mod process_matcher;
pub mod script;

pub use process_matcher::{MatchedProcess, ProcessMatcher};
pub use script::ScriptEvaluator;

use crate::recipe::Recipe;
use crate::status::RecipeStatusType;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// Per-recipe detection verdict. `None` means "not available on this
/// host" and excludes the recipe from further consideration.
pub type DetectionVerdict = Option<RecipeStatusType>;

pub struct RecipeDetector {
    matcher: ProcessMatcher,
    evaluator: ScriptEvaluator,
    verdicts: RefCell<HashMap<String, DetectionVerdict>>,
}

impl RecipeDetector {
    pub fn new(matcher: ProcessMatcher, evaluator: ScriptEvaluator) -> Self {
        Self {
            matcher,
            evaluator,
            verdicts: RefCell::new(HashMap::new()),
        }
    }

    /// Detect one recipe, memoized by name.
    pub fn detect(&self, recipe: &Recipe) -> DetectionVerdict {
        if let Some(verdict) = self.verdicts.borrow().get(&recipe.name) {
            trace!(recipe = %recipe.name, "reusing detection verdict");
            return *verdict;
        }

        let verdict = self.detect_uncached(recipe);
        self.verdicts
            .borrow_mut()
            .insert(recipe.name.clone(), verdict);
        verdict
    }

    /// Detect a batch of recipes, returning verdicts keyed by name.
    pub fn detect_recipes(&self, recipes: &[Recipe]) -> BTreeMap<String, DetectionVerdict> {
        recipes
            .iter()
            .map(|r| (r.name.clone(), self.detect(r)))
            .collect()
    }

    pub fn matcher(&self) -> &ProcessMatcher {
        &self.matcher
    }

    fn detect_uncached(&self, recipe: &Recipe) -> DetectionVerdict {
        if !recipe.process_match.is_empty() {
            let matches = self.matcher.matches_for(recipe);
            if matches.is_empty() {
                trace!(recipe = %recipe.name, "recipe is not matching any process");
                return None;
            }
        }

        self.evaluator.detection_status(recipe)
    }
}
