// src/bundle/bundler.rs

//! Dependency bundling
//!
//! Resolves each requested recipe and its transitive dependencies (a
//! simple name-closure over the catalog, no version solving) into a
//! `Bundle` of shared `BundleRecipe` nodes, annotated with detection
//! status. Nodes are cached by name for the bundler's lifetime, so a
//! recipe reached from several bundles is resolved and detected once.
//!
//! Dependency edges are resolved under an explicit "currently resolving"
//! set: a cycle is rejected with a warning instead of recursing forever,
//! and a dependency name absent from the catalog is a warning, not an
//! error, and the recipe still bundles without it.

use crate::bundle::{Bundle, BundleRecipe, BundleType, SharedBundleRecipe};
use crate::detection::RecipeDetector;
use crate::recipe::{INFRA_AGENT_RECIPE_NAME, LOGGING_RECIPE_NAME, Recipe, RecipeCatalog};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, warn};

pub struct Bundler<'a> {
    catalog: &'a RecipeCatalog,
    detector: &'a RecipeDetector,
    /// Arena of resolved nodes, keyed by recipe name
    nodes: RefCell<HashMap<String, SharedBundleRecipe>>,
    /// Names currently being resolved, for cycle rejection
    resolving: RefCell<HashSet<String>>,
}

impl<'a> Bundler<'a> {
    pub fn new(catalog: &'a RecipeCatalog, detector: &'a RecipeDetector) -> Self {
        Self {
            catalog,
            detector,
            nodes: RefCell::new(HashMap::new()),
            resolving: RefCell::new(HashSet::new()),
        }
    }

    /// The always-considered recipes: infrastructure agent and logging.
    pub fn core_recipe_names() -> [&'static str; 2] {
        [INFRA_AGENT_RECIPE_NAME, LOGGING_RECIPE_NAME]
    }

    pub fn create_core_bundle(&self) -> Bundle {
        let recipes: Vec<Recipe> = Self::core_recipe_names()
            .iter()
            .filter_map(|name| self.catalog.find_by_name(name).cloned())
            .collect();

        self.create_bundle(&recipes, BundleType::Core)
    }

    /// Everything in the catalog that is not part of the core set.
    pub fn create_additional_guided_bundle(&self) -> Bundle {
        let recipes: Vec<Recipe> = self
            .catalog
            .find_all()
            .iter()
            .filter(|r| !Self::is_core_recipe(&r.name))
            .cloned()
            .collect();

        self.create_bundle(&recipes, BundleType::AdditionalGuided)
    }

    /// The recipes the user asked for by name. Unknown names are logged
    /// and skipped; core recipes are covered by the core bundle already.
    pub fn create_additional_targeted_bundle(&self, names: &[String]) -> Bundle {
        let mut recipes = Vec::new();
        for name in names {
            if Self::is_core_recipe(name) {
                continue;
            }
            match self.catalog.find_by_name(name) {
                Some(recipe) => recipes.push(recipe.clone()),
                None => warn!(recipe = %name, "targeted recipe not found in catalog"),
            }
        }

        self.create_bundle(&recipes, BundleType::AdditionalTargeted)
    }

    fn is_core_recipe(name: &str) -> bool {
        Self::core_recipe_names()
            .iter()
            .any(|core| core.eq_ignore_ascii_case(name))
    }

    fn create_bundle(&self, recipes: &[Recipe], bundle_type: BundleType) -> Bundle {
        let mut bundle = Bundle::new(bundle_type);

        for recipe in recipes {
            if let Some(node) = self.resolve(recipe) {
                debug!(
                    recipe = %recipe.name,
                    statuses = ?node.borrow().statuses,
                    "adding bundle recipe"
                );
                bundle.add_recipe(node);
            }
        }

        bundle
    }

    /// Resolve one recipe into a shared node, dependencies first.
    /// Returns `None` when detection says the recipe is unavailable on
    /// this host.
    pub fn resolve(&self, recipe: &Recipe) -> Option<SharedBundleRecipe> {
        if let Some(existing) = self.nodes.borrow().get(&recipe.name) {
            return Some(existing.clone());
        }

        if !self.resolving.borrow_mut().insert(recipe.name.clone()) {
            warn!(
                recipe = %recipe.name,
                "dependency cycle detected, dropping edge"
            );
            return None;
        }

        let mut node = BundleRecipe::new(recipe.clone());

        for dep_name in &recipe.dependencies {
            if dep_name.eq_ignore_ascii_case(&recipe.name) {
                warn!(recipe = %recipe.name, "recipe depends on itself, ignoring");
                continue;
            }

            match self.catalog.find_by_name(dep_name) {
                Some(dep_recipe) => {
                    let dep_recipe = dep_recipe.clone();
                    if let Some(dep_node) = self.resolve(&dep_recipe) {
                        node.dependencies.push(dep_node);
                    }
                }
                None => {
                    warn!(
                        recipe = %recipe.name,
                        dependency = %dep_name,
                        "dependency not found in catalog, skipping"
                    );
                }
            }
        }

        self.resolving.borrow_mut().remove(&recipe.name);

        let verdict = self.detector.detect(recipe)?;
        node.add_status(verdict);

        let shared = Rc::new(RefCell::new(node));
        self.nodes
            .borrow_mut()
            .insert(recipe.name.clone(), shared.clone());
        Some(shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{ProcessMatcher, ScriptEvaluator};
    use crate::discovery::DiscoveryManifest;
    use crate::recipe::RecipeVars;
    use crate::status::RecipeStatusType;

    fn recipe(name: &str, deps: &[&str]) -> Recipe {
        Recipe {
            name: name.to_string(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    fn catalog(recipes: Vec<Recipe>) -> RecipeCatalog {
        RecipeCatalog::from_recipes(recipes, &DiscoveryManifest::default())
    }

    fn detector() -> RecipeDetector {
        RecipeDetector::new(
            ProcessMatcher::new(Vec::new),
            ScriptEvaluator::new(RecipeVars::new()),
        )
    }

    #[test]
    fn test_core_bundle_excludes_non_core_recipes() {
        let catalog = catalog(vec![
            recipe(INFRA_AGENT_RECIPE_NAME, &[]),
            recipe(LOGGING_RECIPE_NAME, &[INFRA_AGENT_RECIPE_NAME]),
            recipe("mysql-integration", &[INFRA_AGENT_RECIPE_NAME]),
        ]);
        let detector = detector();
        let bundler = Bundler::new(&catalog, &detector);

        let bundle = bundler.create_core_bundle();

        assert_eq!(bundle.recipes.len(), 2);
        let names: Vec<String> = bundle.all_recipes().into_iter().collect();
        assert_eq!(names, vec![INFRA_AGENT_RECIPE_NAME, LOGGING_RECIPE_NAME]);
    }

    #[test]
    fn test_missing_dependency_is_skipped_not_fatal() {
        let catalog = catalog(vec![recipe("lonely", &["no-such-recipe"])]);
        let detector = detector();
        let bundler = Bundler::new(&catalog, &detector);

        let bundle =
            bundler.create_additional_targeted_bundle(&["lonely".to_string()]);

        assert_eq!(bundle.recipes.len(), 1);
        assert!(bundle.recipes[0].borrow().dependencies.is_empty());
    }

    #[test]
    fn test_nodes_are_shared_across_bundles() {
        let catalog = catalog(vec![
            recipe(INFRA_AGENT_RECIPE_NAME, &[]),
            recipe(LOGGING_RECIPE_NAME, &[INFRA_AGENT_RECIPE_NAME]),
            recipe("mysql-integration", &[INFRA_AGENT_RECIPE_NAME]),
        ]);
        let detector = detector();
        let bundler = Bundler::new(&catalog, &detector);

        let core = bundler.create_core_bundle();
        let guided = bundler.create_additional_guided_bundle();

        let infra_in_core = core.recipes[0].clone();
        let mysql = guided.recipes[0].clone();
        let infra_under_mysql = mysql.borrow().dependencies[0].clone();

        assert!(Rc::ptr_eq(&infra_in_core, &infra_under_mysql));
    }

    #[test]
    fn test_detection_annotates_statuses() {
        let catalog = catalog(vec![recipe("plain", &[])]);
        let detector = detector();
        let bundler = Bundler::new(&catalog, &detector);

        let bundle = bundler.create_additional_targeted_bundle(&["plain".to_string()]);
        let node = bundle.recipes[0].borrow();
        assert!(node.has_status(RecipeStatusType::Detected));
        assert!(node.has_status(RecipeStatusType::Available));
    }

    #[test]
    fn test_dependency_cycle_is_rejected() {
        let catalog = catalog(vec![
            recipe("a", &["b"]),
            recipe("b", &["a"]),
        ]);
        let detector = detector();
        let bundler = Bundler::new(&catalog, &detector);

        let bundle = bundler.create_additional_targeted_bundle(&["a".to_string()]);

        // "a" resolves; the edge b -> a is dropped instead of looping.
        assert_eq!(bundle.recipes.len(), 1);
        let a = bundle.recipes[0].borrow();
        assert_eq!(a.dependencies.len(), 1);
        let b = a.dependencies[0].borrow();
        assert!(b.dependencies.is_empty());
    }

    #[test]
    fn test_self_dependency_is_ignored() {
        let catalog = catalog(vec![recipe("selfish", &["selfish"])]);
        let detector = detector();
        let bundler = Bundler::new(&catalog, &detector);

        let bundle =
            bundler.create_additional_targeted_bundle(&["selfish".to_string()]);
        assert_eq!(bundle.recipes.len(), 1);
        assert!(bundle.recipes[0].borrow().dependencies.is_empty());
    }

    #[test]
    fn test_targeted_bundle_ignores_unknown_names() {
        let catalog = catalog(vec![recipe("known", &[])]);
        let detector = detector();
        let bundler = Bundler::new(&catalog, &detector);

        let bundle = bundler.create_additional_targeted_bundle(&[
            "known".to_string(),
            "unknown".to_string(),
        ]);
        assert_eq!(bundle.recipes.len(), 1);
    }
}
