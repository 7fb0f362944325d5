// src/execution/vars.rs

//! Recipe variable preparation
//!
//! Builds the variable map injected into a recipe's scripts. Sources are
//! applied lowest precedence first, later sources overriding earlier
//! ones:
//!
//! 1. host facts from the discovery manifest (`HOSTNAME`, `OS`, ...)
//! 2. credentials from the profile (`LICENSE_KEY`, `ACCOUNT_ID`, ...)
//! 3. static per-recipe vars declared in the catalog
//! 4. recipe-declared input variables: process environment wins, else an
//!    interactive prompt, else the declared default; unattended runs with
//!    no default are a hard failure
//! 5. fixed environment passthrough (`HTTPS_PROXY`,
//!    `OUTFITTER_DOWNLOAD_URL`)

use crate::discovery::DiscoveryManifest;
use crate::error::{Error, Result};
use crate::profile::ProfileProvider;
use crate::recipe::{InputVariable, Recipe, RecipeVars};
use tracing::debug;

pub struct RecipeVarProvider {
    /// Unattended mode: never prompt, fall back to declared defaults
    pub assume_yes: bool,
}

impl RecipeVarProvider {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    pub fn prepare(
        &self,
        manifest: &DiscoveryManifest,
        recipe: &Recipe,
        profile: &dyn ProfileProvider,
    ) -> Result<RecipeVars> {
        debug!(recipe = %recipe.name, "preparing recipe variables");

        let mut vars = RecipeVars::new();

        vars.extend(host_fact_vars(manifest));
        vars.extend(vars_from_profile(profile)?);
        vars.extend(recipe.vars.clone());
        vars.extend(self.vars_from_input(&recipe.input_vars)?);
        vars.extend(vars_from_env());

        vars.insert("ASSUME_YES".to_string(), self.assume_yes.to_string());

        Ok(vars)
    }

    fn vars_from_input(&self, input_vars: &[InputVariable]) -> Result<RecipeVars> {
        let mut vars = RecipeVars::new();

        for input in input_vars {
            if let Ok(value) = std::env::var(&input.name) {
                if !value.is_empty() {
                    vars.insert(input.name.clone(), value);
                    continue;
                }
            }

            let value = if self.assume_yes {
                if input.default.is_empty() {
                    return Err(Error::MissingInputVar(input.name.clone()));
                }
                debug!(name = %input.name, "input variable not set, using default");
                input.default.clone()
            } else {
                debug!(name = %input.name, "input variable not set, prompting");
                prompt_for_var(input)?
            };

            vars.insert(input.name.clone(), value);
        }

        Ok(vars)
    }
}

/// Host facts as recipe variables. Also injected standalone into
/// discovery scripts.
pub fn host_fact_vars(manifest: &DiscoveryManifest) -> RecipeVars {
    let mut vars = RecipeVars::new();
    vars.insert("HOSTNAME".to_string(), manifest.hostname.clone());
    vars.insert("OS".to_string(), manifest.os.clone());
    vars.insert("PLATFORM".to_string(), manifest.platform.clone());
    vars.insert(
        "PLATFORM_FAMILY".to_string(),
        manifest.platform_family.clone(),
    );
    vars.insert(
        "PLATFORM_VERSION".to_string(),
        manifest.platform_version.clone(),
    );
    vars.insert(
        "KERNEL_VERSION".to_string(),
        manifest.kernel_version.clone(),
    );
    vars.insert("KERNEL_ARCH".to_string(), manifest.kernel_arch.clone());
    vars
}

fn vars_from_profile(profile: &dyn ProfileProvider) -> Result<RecipeVars> {
    let license_key = profile
        .license_key()
        .ok_or_else(|| Error::ProfileError("license key not found".to_string()))?;

    let mut vars = RecipeVars::new();
    vars.insert("LICENSE_KEY".to_string(), license_key);
    vars.insert(
        "ACCOUNT_ID".to_string(),
        profile.account_id().unwrap_or_default(),
    );
    vars.insert("API_KEY".to_string(), profile.api_key().unwrap_or_default());
    vars.insert("REGION".to_string(), profile.region().unwrap_or_default());
    Ok(vars)
}

fn vars_from_env() -> RecipeVars {
    let mut vars = RecipeVars::new();

    if let Ok(proxy) = std::env::var("HTTPS_PROXY") {
        if !proxy.is_empty() {
            vars.insert("HTTPS_PROXY".to_string(), proxy);
        }
    }
    if let Ok(url) = std::env::var("OUTFITTER_DOWNLOAD_URL") {
        if !url.is_empty() {
            vars.insert("DOWNLOAD_URL".to_string(), url);
        }
    }

    vars
}

fn prompt_for_var(input: &InputVariable) -> Result<String> {
    let message = if input.prompt.is_empty() {
        format!("value for {} required", input.name)
    } else {
        input.prompt.clone()
    };

    let answer = if input.secret {
        inquire::Password::new(&message)
            .without_confirmation()
            .prompt()
    } else {
        let mut text = inquire::Text::new(&message);
        if !input.default.is_empty() {
            text = text.with_default(&input.default);
        }
        text.prompt()
    };

    answer.map_err(|e| match e {
        inquire::InquireError::OperationCanceled
        | inquire::InquireError::OperationInterrupted => Error::Interrupted,
        other => Error::PromptError(other.to_string()),
    })
}
