// src/install/context.rs

//! Installer context: user preferences distilled from CLI flags

use crate::filter::SkipFilter;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct InstallerContext {
    /// Unattended mode: never prompt for input variables
    pub assume_yes: bool,
    /// Recipe names for a targeted install; empty means guided
    pub recipe_names: Vec<String>,
    /// Directory holding the recipe catalog
    pub recipe_dir: Option<PathBuf>,
    pub only_names: Vec<String>,
    pub skip_names: Vec<String>,
    pub skip_types: Vec<String>,
    pub skip_keywords: Vec<String>,
    pub skip_backup: bool,
}

impl InstallerContext {
    /// A targeted install names its recipes explicitly.
    pub fn recipes_provided(&self) -> bool {
        !self.recipe_names.is_empty()
    }

    pub fn skip_filter(&self) -> SkipFilter {
        SkipFilter::new()
            .only_names(&self.only_names)
            .skip_names(&self.skip_names)
            .skip_types(&self.skip_types)
            .skip_keywords(&self.skip_keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipes_provided() {
        assert!(!InstallerContext::default().recipes_provided());
        let context = InstallerContext {
            recipe_names: vec!["mysql-integration".to_string()],
            ..Default::default()
        };
        assert!(context.recipes_provided());
    }
}
