// src/bundle/mod.rs

//! Recipe bundles
//!
//! A `Bundle` is a dependency-complete set of recipes selected for one
//! install run. Each `BundleRecipe` node wraps a recipe plus its resolved
//! dependencies and the detection statuses accumulated for it. Nodes are
//! shared by reference across all bundles in a run, so detection work for
//! a recipe reached from several roots happens once.

pub mod bundler;

pub use bundler::Bundler;

use crate::recipe::Recipe;
use crate::status::RecipeStatusType;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

/// Shared handle to a bundle node. One instance exists per recipe name
/// within a bundler's lifetime.
pub type SharedBundleRecipe = Rc<RefCell<BundleRecipe>>;

/// Why a bundle was assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BundleType {
    Core,
    AdditionalGuided,
    AdditionalTargeted,
}

/// A recipe with its resolved dependency nodes and detection history.
#[derive(Debug)]
pub struct BundleRecipe {
    pub recipe: Recipe,
    pub dependencies: Vec<SharedBundleRecipe>,
    /// De-duplicated detection status history
    pub statuses: Vec<RecipeStatusType>,
}

impl BundleRecipe {
    pub fn new(recipe: Recipe) -> Self {
        Self {
            recipe,
            dependencies: Vec::new(),
            statuses: Vec::new(),
        }
    }

    /// Record a detection status, de-duplicated. Recording `AVAILABLE`
    /// also records `DETECTED`: "present on this host" and "installable"
    /// are both visible in the history.
    pub fn add_status(&mut self, status: RecipeStatusType) {
        if self.has_status(status) {
            return;
        }
        if status == RecipeStatusType::Available
            && !self.has_status(RecipeStatusType::Detected)
        {
            self.statuses.push(RecipeStatusType::Detected);
        }
        self.statuses.push(status);
    }

    pub fn has_status(&self, status: RecipeStatusType) -> bool {
        self.statuses.contains(&status)
    }

    pub fn is_available(&self) -> bool {
        self.has_status(RecipeStatusType::Available)
    }

    /// Every resolved dependency carries `AVAILABLE`.
    pub fn all_dependencies_available(&self) -> bool {
        self.dependencies
            .iter()
            .all(|dep| dep.borrow().is_available())
    }

    /// Names of this recipe and everything below it, de-duplicated.
    pub fn flatten(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut BTreeSet<String>) {
        if !names.insert(self.recipe.name.clone()) {
            return;
        }
        for dep in &self.dependencies {
            dep.borrow().collect_names(names);
        }
    }
}

/// An ordered list of root bundle recipes.
#[derive(Debug)]
pub struct Bundle {
    pub bundle_type: BundleType,
    pub recipes: Vec<SharedBundleRecipe>,
}

impl Bundle {
    pub fn new(bundle_type: BundleType) -> Self {
        Self {
            bundle_type,
            recipes: Vec::new(),
        }
    }

    /// Add a root recipe. A no-op when a recipe of that name is already
    /// present: a recipe is in a bundle at most once.
    pub fn add_recipe(&mut self, bundle_recipe: SharedBundleRecipe) {
        let name = bundle_recipe.borrow().recipe.name.clone();
        if self.contains_name(&name) {
            return;
        }
        self.recipes.push(bundle_recipe);
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.recipes.iter().any(|r| r.borrow().recipe.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// All recipe names in the bundle, dependencies included,
    /// de-duplicated.
    pub fn all_recipes(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for recipe in &self.recipes {
            names.extend(recipe.borrow().flatten());
        }
        names
    }

    /// The bundle's recipes in install order: dependencies before their
    /// dependents, each recipe once.
    pub fn recipes_dependencies_first(&self) -> Vec<Recipe> {
        let mut seen = BTreeSet::new();
        let mut ordered = Vec::new();
        for root in &self.recipes {
            collect_dependencies_first(root, &mut seen, &mut ordered);
        }
        ordered
    }
}

fn collect_dependencies_first(
    node: &SharedBundleRecipe,
    seen: &mut BTreeSet<String>,
    ordered: &mut Vec<Recipe>,
) {
    let borrowed = node.borrow();
    if !seen.insert(borrowed.recipe.name.clone()) {
        return;
    }
    for dep in &borrowed.dependencies {
        collect_dependencies_first(dep, seen, ordered);
    }
    ordered.push(borrowed.recipe.clone());
}
