// src/recipe/mod.rs

//! Recipe definitions for host agent installation
//!
//! A recipe declares how to detect and install one integration or agent:
//! process-signature patterns, a discovery script, an install task graph,
//! dependency names, and the host targets it applies to.
//!
//! # Example Recipe
//!
//! ```yaml
//! name: mysql-integration
//! displayName: MySQL Integration
//! dependencies:
//!   - infra-agent-installer
//! processMatch:
//!   - mysqld
//! preInstall:
//!   requireAtDiscovery: |
//!     command -v mysql > /dev/null 2>&1 || exit 1
//! install: |
//!   tasks:
//!     default:
//!       cmds:
//!         - task: setup
//!     setup:
//!       cmds:
//!         - echo "configuring {{.HOSTNAME}}"
//! installTargets:
//!   - type: host
//!     os: linux
//! keywords:
//!   - database
//! ```

pub mod catalog;

pub use catalog::RecipeCatalog;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The infrastructure agent recipe. It is the telemetry prerequisite for
/// every other recipe and is exempt from type-based skip rules.
pub const INFRA_AGENT_RECIPE_NAME: &str = "infra-agent-installer";

/// The log forwarding recipe, installed as part of the core bundle.
pub const LOGGING_RECIPE_NAME: &str = "logging-integration";

/// Keyword marking an application-target recipe as directly installable.
pub const APM_KEYWORD: &str = "apm";

/// Variables injected into recipe scripts, keyed by environment name.
pub type RecipeVars = BTreeMap<String, String>;

/// A declarative install procedure for one integration/agent.
///
/// Loaded once per run from the catalog; never mutated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recipe {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub repository: String,
    /// Names of recipes that must be installed before this one
    pub dependencies: Vec<String>,
    /// Regular expressions tested against running process command lines
    pub process_match: Vec<String>,
    pub pre_install: PreInstallConfiguration,
    pub post_install: PostInstallConfiguration,
    /// Install task graph, as a YAML document (see `execution::tasks`)
    pub install: String,
    pub install_targets: Vec<InstallTarget>,
    pub keywords: Vec<String>,
    /// Variables resolved from the environment or prompted for at install time
    pub input_vars: Vec<InputVariable>,
    /// Static variables declared in the catalog, injected at executor level
    pub vars: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreInstallConfiguration {
    /// Discovery script; its exit code decides availability (see
    /// `detection::script` for the exit-code contract)
    pub require_at_discovery: String,
    pub info: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostInstallConfiguration {
    pub info: String,
}

/// Host constraint for a recipe. Empty fields match anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstallTarget {
    #[serde(rename = "type")]
    pub target_type: TargetType,
    pub os: String,
    pub platform: String,
    pub platform_family: String,
    pub platform_version: String,
    pub kernel_version: String,
    pub kernel_arch: String,
}

/// What a recipe instruments: the host itself, or an application on it.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TargetType {
    #[default]
    Host,
    Application,
}

/// A variable a recipe needs at install time. Resolution order: process
/// environment, interactive prompt, declared default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputVariable {
    pub name: String,
    pub prompt: String,
    pub secret: bool,
    pub default: String,
}

impl Recipe {
    /// Parse a recipe from its YAML definition.
    pub fn from_yaml(source: &str) -> Result<Self> {
        let recipe: Recipe = serde_yaml::from_str(source)
            .map_err(|e| Error::ParseError(format!("invalid recipe definition: {}", e)))?;

        if recipe.name.is_empty() {
            return Err(Error::ParseError(
                "recipe definition is missing a name".to_string(),
            ));
        }

        Ok(recipe)
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword))
    }

    pub fn is_apm(&self) -> bool {
        self.has_keyword(APM_KEYWORD)
    }

    pub fn has_target_type(&self, target_type: TargetType) -> bool {
        self.install_targets
            .iter()
            .any(|t| t.target_type == target_type)
    }

    pub fn has_host_target_type(&self) -> bool {
        self.has_target_type(TargetType::Host)
    }

    pub fn has_application_target_type(&self) -> bool {
        self.has_target_type(TargetType::Application)
    }

    pub fn has_discovery_script(&self) -> bool {
        !self.pre_install.require_at_discovery.trim().is_empty()
    }

    pub fn pre_install_message(&self) -> Option<&str> {
        if self.pre_install.info.is_empty() {
            None
        } else {
            Some(&self.pre_install.info)
        }
    }

    pub fn post_install_message(&self) -> Option<&str> {
        if self.post_install.info.is_empty() {
            None
        } else {
            Some(&self.post_install.info)
        }
    }
}
