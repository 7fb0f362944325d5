// src/status/subscriber.rs

//! Status subscriber interface
//!
//! Subscribers observe every status-machine transition and drive UI,
//! telemetry, and remote state storage. They are invoked synchronously in
//! registration order with the current `InstallStatus` snapshot. A
//! subscriber error is logged and swallowed by the caller; it never
//! aborts the remaining subscribers or fails the run.

use crate::discovery::DiscoveryManifest;
use crate::error::Result;
use crate::recipe::Recipe;
use crate::status::InstallStatus;

/// An event in a recipe's execution.
#[derive(Debug, Clone)]
pub struct RecipeStatusEvent {
    pub recipe: Recipe,
    /// Diagnostic message, usually the last captured stderr line
    pub msg: Option<String>,
    pub entity_guid: Option<String>,
    /// Failing task chain, when the install task graph produced the event
    pub task_path: Vec<String>,
}

impl RecipeStatusEvent {
    pub fn new(recipe: &Recipe) -> Self {
        Self {
            recipe: recipe.clone(),
            msg: None,
            entity_guid: None,
            task_path: Vec::new(),
        }
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    pub fn with_entity_guid(mut self, guid: impl Into<String>) -> Self {
        self.entity_guid = Some(guid.into());
        self
    }

    pub fn with_task_path(mut self, task_path: Vec<String>) -> Self {
        self.task_path = task_path;
        self
    }
}

/// Notified during the lifecycle of the recipe execution status.
///
/// Every hook has a no-op default so implementations only handle the
/// transitions they care about.
pub trait StatusSubscriber {
    fn install_started(&self, _status: &InstallStatus) -> Result<()> {
        Ok(())
    }

    fn install_complete(&self, _status: &InstallStatus) -> Result<()> {
        Ok(())
    }

    fn install_canceled(&self, _status: &InstallStatus) -> Result<()> {
        Ok(())
    }

    fn discovery_complete(
        &self,
        _status: &InstallStatus,
        _manifest: &DiscoveryManifest,
    ) -> Result<()> {
        Ok(())
    }

    fn recipe_available(&self, _status: &InstallStatus, _event: &RecipeStatusEvent) -> Result<()> {
        Ok(())
    }

    fn recipe_detected(&self, _status: &InstallStatus, _event: &RecipeStatusEvent) -> Result<()> {
        Ok(())
    }

    fn recipe_installing(&self, _status: &InstallStatus, _event: &RecipeStatusEvent) -> Result<()> {
        Ok(())
    }

    fn recipe_installed(&self, _status: &InstallStatus, _event: &RecipeStatusEvent) -> Result<()> {
        Ok(())
    }

    fn recipe_failed(&self, _status: &InstallStatus, _event: &RecipeStatusEvent) -> Result<()> {
        Ok(())
    }

    fn recipe_skipped(&self, _status: &InstallStatus, _event: &RecipeStatusEvent) -> Result<()> {
        Ok(())
    }

    fn recipe_recommended(&self, _status: &InstallStatus, _event: &RecipeStatusEvent) -> Result<()> {
        Ok(())
    }

    fn recipe_unsupported(&self, _status: &InstallStatus, _event: &RecipeStatusEvent) -> Result<()> {
        Ok(())
    }

    fn recipe_canceled(&self, _status: &InstallStatus, _event: &RecipeStatusEvent) -> Result<()> {
        Ok(())
    }
}
