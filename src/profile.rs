// src/profile.rs

//! Credentials profile collaborator
//!
//! The orchestrator needs a license key, account id, API key and region
//! to inject into recipes. Where those come from (credential vault,
//! remote fetch) is a collaborator concern; this module defines the
//! interface plus a file-backed implementation reading
//! `~/.config/outfitter/profile.toml`, with `OUTFITTER_*` environment
//! overrides taking precedence.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source of the credentials injected into recipe variables.
pub trait ProfileProvider {
    fn license_key(&self) -> Option<String>;
    fn account_id(&self) -> Option<String>;
    fn api_key(&self) -> Option<String>;
    fn region(&self) -> Option<String>;
}

/// Fixed credentials, mainly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticProfile {
    pub license_key: Option<String>,
    pub account_id: Option<String>,
    pub api_key: Option<String>,
    pub region: Option<String>,
}

impl ProfileProvider for StaticProfile {
    fn license_key(&self) -> Option<String> {
        self.license_key.clone()
    }

    fn account_id(&self) -> Option<String> {
        self.account_id.clone()
    }

    fn api_key(&self) -> Option<String> {
        self.api_key.clone()
    }

    fn region(&self) -> Option<String> {
        self.region.clone()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ProfileFile {
    license_key: Option<String>,
    account_id: Option<String>,
    api_key: Option<String>,
    region: Option<String>,
}

/// Profile loaded from the user's config file, overridable per field via
/// `OUTFITTER_LICENSE_KEY`, `OUTFITTER_ACCOUNT_ID`, `OUTFITTER_API_KEY`
/// and `OUTFITTER_REGION`.
#[derive(Debug, Clone, Default)]
pub struct TomlProfile {
    file: ProfileFile,
}

impl TomlProfile {
    /// Load the profile from the default location. A missing file is not
    /// an error; the environment may carry everything needed.
    pub fn load() -> Result<Self> {
        match default_profile_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("no profile file found, relying on environment");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::ProfileError(format!("cannot read profile {}: {}", path.display(), e))
        })?;
        let file: ProfileFile = toml::from_str(&contents).map_err(|e| {
            Error::ProfileError(format!("cannot parse profile {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "loaded credentials profile");
        Ok(Self { file })
    }
}

fn env_or(env_name: &str, fallback: &Option<String>) -> Option<String> {
    std::env::var(env_name)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| fallback.clone())
}

impl ProfileProvider for TomlProfile {
    fn license_key(&self) -> Option<String> {
        env_or("OUTFITTER_LICENSE_KEY", &self.file.license_key)
    }

    fn account_id(&self) -> Option<String> {
        env_or("OUTFITTER_ACCOUNT_ID", &self.file.account_id)
    }

    fn api_key(&self) -> Option<String> {
        env_or("OUTFITTER_API_KEY", &self.file.api_key)
    }

    fn region(&self) -> Option<String> {
        env_or("OUTFITTER_REGION", &self.file.region)
    }
}

fn default_profile_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("outfitter").join("profile.toml"))
}
