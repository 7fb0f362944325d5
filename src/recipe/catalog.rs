// src/recipe/catalog.rs

//! Recipe catalog: loading and host-target filtering
//!
//! The catalog loads every recipe definition from a directory of YAML
//! files, then narrows them to the ones whose install targets apply to
//! the current host. When several recipes share a name (platform
//! variants), the one whose targets match the host on the most fields
//! wins. The filtered set is computed once and reused for every lookup.

use crate::discovery::DiscoveryManifest;
use crate::error::{Error, Result};
use crate::recipe::{InstallTarget, Recipe};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// The host-applicable view of the recipe catalog.
#[derive(Debug)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
}

impl RecipeCatalog {
    /// Load all `*.yml`/`*.yaml` recipe definitions under `dir` and keep
    /// the ones applicable to the host described by `manifest`.
    ///
    /// A file that fails to read or parse fails the whole load: a broken
    /// catalog is fatal to the run, unlike any per-recipe condition.
    pub fn load(dir: &Path, manifest: &DiscoveryManifest) -> Result<Self> {
        let mut recipes = Vec::new();

        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry.map_err(|e| {
                Error::CatalogError(format!("cannot walk recipe directory: {}", e))
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            let is_yaml = entry
                .path()
                .extension()
                .map(|ext| ext == "yml" || ext == "yaml")
                .unwrap_or(false);
            if !is_yaml {
                continue;
            }

            let source = std::fs::read_to_string(entry.path()).map_err(|e| {
                Error::CatalogError(format!(
                    "cannot read recipe file {}: {}",
                    entry.path().display(),
                    e
                ))
            })?;
            let recipe = Recipe::from_yaml(&source).map_err(|e| {
                Error::CatalogError(format!(
                    "cannot parse recipe file {}: {}",
                    entry.path().display(),
                    e
                ))
            })?;

            trace!(name = %recipe.name, path = %entry.path().display(), "loaded recipe");
            recipes.push(recipe);
        }

        debug!("loaded {} recipe definitions", recipes.len());
        Ok(Self::from_recipes(recipes, manifest))
    }

    /// Build a catalog from already-parsed recipes, filtered for the host.
    pub fn from_recipes(recipes: Vec<Recipe>, manifest: &DiscoveryManifest) -> Self {
        let recipes = filter_for_host(recipes, manifest);
        debug!("{} recipes applicable to this host", recipes.len());
        Self { recipes }
    }

    /// All recipes applicable to this host, ordered by name.
    pub fn find_all(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Look a recipe up by name, case-insensitively.
    pub fn find_by_name(&self, name: &str) -> Option<&Recipe> {
        self.recipes
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }
}

/// Keep the recipes whose install targets apply to the host; among
/// same-name variants the best-matching one wins.
fn filter_for_host(recipes: Vec<Recipe>, manifest: &DiscoveryManifest) -> Vec<Recipe> {
    // name -> (best match score, recipe)
    let mut best: BTreeMap<String, (i32, Recipe)> = BTreeMap::new();

    for recipe in recipes {
        let Some(score) = target_match_score(&recipe, manifest) else {
            trace!(name = %recipe.name, "recipe install targets do not apply to this host");
            continue;
        };

        match best.get(&recipe.name) {
            Some((existing, _)) if *existing >= score => {}
            _ => {
                best.insert(recipe.name.clone(), (score, recipe));
            }
        }
    }

    best.into_values().map(|(_, recipe)| recipe).collect()
}

/// Score how specifically a recipe targets this host.
///
/// `None` means no install target applies. A recipe with no targets at
/// all applies everywhere with score 0. Otherwise the score is the
/// maximum number of matching non-empty fields over any single target.
fn target_match_score(recipe: &Recipe, manifest: &DiscoveryManifest) -> Option<i32> {
    if recipe.install_targets.is_empty() {
        return Some(0);
    }

    let mut max_score = None;
    for target in &recipe.install_targets {
        if let Some(score) = single_target_score(target, manifest) {
            if max_score.map(|m| score > m).unwrap_or(true) {
                max_score = Some(score);
            }
        }
    }

    max_score
}

fn single_target_score(target: &InstallTarget, manifest: &DiscoveryManifest) -> Option<i32> {
    let criteria = [
        (target.os.as_str(), manifest.os.as_str()),
        (target.platform.as_str(), manifest.platform.as_str()),
        (
            target.platform_family.as_str(),
            manifest.platform_family.as_str(),
        ),
        (
            target.platform_version.as_str(),
            manifest.platform_version.as_str(),
        ),
        (
            target.kernel_version.as_str(),
            manifest.kernel_version.as_str(),
        ),
        (target.kernel_arch.as_str(), manifest.kernel_arch.as_str()),
    ];

    let mut score = 0;
    for (wanted, actual) in criteria {
        if wanted.is_empty() {
            continue;
        }
        if matches_criterion(wanted, actual) {
            score += 1;
        } else {
            return None;
        }
    }

    Some(score)
}

/// Target values written `(...)` are regular expressions; anything else
/// compares case-insensitively. This mirrors how recipe authors pin
/// version ranges, e.g. `platformVersion: "(20|22)\\..*"`.
fn matches_criterion(wanted: &str, actual: &str) -> bool {
    if wanted.starts_with('(') {
        if let Ok(regex) = Regex::new(wanted) {
            return regex.is_match(actual);
        }
    }
    wanted.eq_ignore_ascii_case(actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::TargetType;

    fn linux_manifest() -> DiscoveryManifest {
        DiscoveryManifest {
            hostname: "testhost".to_string(),
            os: "linux".to_string(),
            platform: "ubuntu".to_string(),
            platform_family: "debian".to_string(),
            platform_version: "22.04".to_string(),
            kernel_version: "6.1.0".to_string(),
            kernel_arch: "x86_64".to_string(),
            processes: vec![],
        }
    }

    fn recipe_with_target(name: &str, os: &str, platform: &str) -> Recipe {
        Recipe {
            name: name.to_string(),
            install_targets: vec![InstallTarget {
                target_type: TargetType::Host,
                os: os.to_string(),
                platform: platform.to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_untargeted_recipe_applies_everywhere() {
        let recipe = Recipe {
            name: "generic".to_string(),
            ..Default::default()
        };
        let catalog = RecipeCatalog::from_recipes(vec![recipe], &linux_manifest());
        assert!(catalog.find_by_name("generic").is_some());
    }

    #[test]
    fn test_mismatched_os_is_excluded() {
        let catalog = RecipeCatalog::from_recipes(
            vec![recipe_with_target("win-only", "windows", "")],
            &linux_manifest(),
        );
        assert!(catalog.find_by_name("win-only").is_none());
    }

    #[test]
    fn test_most_specific_variant_wins() {
        let generic = recipe_with_target("agent", "linux", "");
        let mut specific = recipe_with_target("agent", "linux", "ubuntu");
        specific.display_name = "Agent (Ubuntu)".to_string();

        let catalog =
            RecipeCatalog::from_recipes(vec![generic, specific], &linux_manifest());
        let found = catalog.find_by_name("agent").unwrap();
        assert_eq!(found.display_name, "Agent (Ubuntu)");
        assert_eq!(catalog.find_all().len(), 1);
    }

    #[test]
    fn test_regex_target_value() {
        let mut recipe = recipe_with_target("versioned", "linux", "");
        recipe.install_targets[0].platform_version = r"(20|22)\..*".to_string();
        let catalog = RecipeCatalog::from_recipes(vec![recipe], &linux_manifest());
        assert!(catalog.find_by_name("versioned").is_some());
    }

    #[test]
    fn test_find_by_name_is_case_insensitive() {
        let catalog = RecipeCatalog::from_recipes(
            vec![recipe_with_target("MySQL-Integration", "linux", "")],
            &linux_manifest(),
        );
        assert!(catalog.find_by_name("mysql-integration").is_some());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("one.yml"),
            "name: one\ndisplayName: One\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("two.yaml"),
            "name: two\ndisplayName: Two\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a recipe").unwrap();

        let catalog = RecipeCatalog::load(dir.path(), &linux_manifest()).unwrap();
        assert_eq!(catalog.find_all().len(), 2);
    }

    #[test]
    fn test_load_fails_on_broken_recipe() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.yml"), "{{ not yaml").unwrap();

        let err = RecipeCatalog::load(dir.path(), &linux_manifest()).unwrap_err();
        assert!(matches!(err, Error::CatalogError(_)));
    }
}
