// src/status/mod.rs

//! Install status state machine
//!
//! `InstallStatus` is the run-scoped aggregate every component reports
//! into. Each transition updates the per-recipe entry (last write wins),
//! refreshes the run timestamp, and fans the event out to every
//! registered `StatusSubscriber` in registration order. Subscriber
//! failures are logged and swallowed; delivery is best-effort, at most
//! once per event, and never aborts the run. That is the contract, not
//! an accident of error handling.

pub mod subscriber;
pub mod terminal;

pub use subscriber::{RecipeStatusEvent, StatusSubscriber};
pub use terminal::TerminalStatusReporter;

use crate::discovery::DiscoveryManifest;
use crate::error::Error;
use crate::recipe::Recipe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, error};

/// Lifecycle status of one recipe within one install run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipeStatusType {
    Available,
    Detected,
    Recommended,
    Installing,
    Installed,
    Failed,
    Skipped,
    Unsupported,
    Canceled,
}

/// Error detail attached to a recipe entry or the run as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusError {
    pub message: String,
    pub details: String,
    /// Chain of task names that led to the failure, when the install
    /// task graph produced it
    pub task_path: Vec<String>,
}

/// The current state of one recipe. One entry per recipe name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStatus {
    pub name: String,
    pub display_name: String,
    pub status: RecipeStatusType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StatusError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_guid: Option<String>,
}

/// Run-scoped aggregate install state.
///
/// Single-writer by design: the orchestrator is sequential, so no locking
/// is needed (see the concurrency model in the crate docs).
pub struct InstallStatus {
    /// Generated once per run
    pub document_id: String,
    /// Unix timestamp of the most recent event
    pub timestamp: i64,
    pub complete: bool,
    /// De-duplicated, append-only
    pub entity_guids: Vec<String>,
    /// One entry per recipe name; status field is last-write-wins
    pub statuses: Vec<RecipeStatus>,
    /// Last error seen. Concurrent failures overwrite each other; only a
    /// single human-readable error is surfaced at the end.
    pub error: Option<StatusError>,
    /// Where the user can find captured output for failures
    pub log_file_path: PathBuf,
    subscribers: Vec<Box<dyn StatusSubscriber>>,
}

impl InstallStatus {
    pub fn new(subscribers: Vec<Box<dyn StatusSubscriber>>) -> Self {
        Self {
            document_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            complete: false,
            entity_guids: Vec::new(),
            statuses: Vec::new(),
            error: None,
            log_file_path: default_log_file_path(),
            subscribers,
        }
    }

    pub fn with_log_file_path(mut self, path: PathBuf) -> Self {
        self.log_file_path = path;
        self
    }

    pub fn install_started(&mut self) {
        self.touch();
        for sub in &self.subscribers {
            if let Err(e) = sub.install_started(self) {
                error!("could not report install start: {}", e);
            }
        }
    }

    pub fn discovery_complete(&mut self, manifest: &DiscoveryManifest) {
        self.touch();
        for sub in &self.subscribers {
            if let Err(e) = sub.discovery_complete(self, manifest) {
                error!("could not report discovery info: {}", e);
            }
        }
    }

    pub fn recipe_available(&mut self, recipe: &Recipe) {
        let event = RecipeStatusEvent::new(recipe);
        self.with_recipe_event(&event, RecipeStatusType::Available);
        for sub in &self.subscribers {
            if let Err(e) = sub.recipe_available(self, &event) {
                error!(recipe = %event.recipe.name, "could not report recipe status: {}", e);
            }
        }
    }

    pub fn recipe_detected(&mut self, event: RecipeStatusEvent) {
        self.with_recipe_event(&event, RecipeStatusType::Detected);
        for sub in &self.subscribers {
            if let Err(e) = sub.recipe_detected(self, &event) {
                error!(recipe = %event.recipe.name, "could not report recipe status: {}", e);
            }
        }
    }

    pub fn recipe_installing(&mut self, event: RecipeStatusEvent) {
        self.with_recipe_event(&event, RecipeStatusType::Installing);
        for sub in &self.subscribers {
            if let Err(e) = sub.recipe_installing(self, &event) {
                error!(recipe = %event.recipe.name, "could not report recipe status: {}", e);
            }
        }
    }

    pub fn recipe_installed(&mut self, event: RecipeStatusEvent) {
        self.with_recipe_event(&event, RecipeStatusType::Installed);
        for sub in &self.subscribers {
            if let Err(e) = sub.recipe_installed(self, &event) {
                error!(recipe = %event.recipe.name, "could not report recipe status: {}", e);
            }
        }
    }

    pub fn recipe_failed(&mut self, event: RecipeStatusEvent) {
        self.with_recipe_event(&event, RecipeStatusType::Failed);
        for sub in &self.subscribers {
            if let Err(e) = sub.recipe_failed(self, &event) {
                error!(recipe = %event.recipe.name, "could not report recipe status: {}", e);
            }
        }
    }

    pub fn recipe_skipped(&mut self, event: RecipeStatusEvent) {
        self.with_recipe_event(&event, RecipeStatusType::Skipped);
        for sub in &self.subscribers {
            if let Err(e) = sub.recipe_skipped(self, &event) {
                error!(recipe = %event.recipe.name, "could not report recipe status: {}", e);
            }
        }
    }

    pub fn recipe_recommended(&mut self, event: RecipeStatusEvent) {
        self.with_recipe_event(&event, RecipeStatusType::Recommended);
        for sub in &self.subscribers {
            if let Err(e) = sub.recipe_recommended(self, &event) {
                error!(recipe = %event.recipe.name, "could not report recipe status: {}", e);
            }
        }
    }

    pub fn recipe_unsupported(&mut self, event: RecipeStatusEvent) {
        self.with_recipe_event(&event, RecipeStatusType::Unsupported);
        for sub in &self.subscribers {
            if let Err(e) = sub.recipe_unsupported(self, &event) {
                error!(recipe = %event.recipe.name, "could not report recipe status: {}", e);
            }
        }
    }

    pub fn recipe_canceled(&mut self, event: RecipeStatusEvent) {
        self.with_recipe_event(&event, RecipeStatusType::Canceled);
        for sub in &self.subscribers {
            if let Err(e) = sub.recipe_canceled(self, &event) {
                error!(recipe = %event.recipe.name, "could not report recipe status: {}", e);
            }
        }
    }

    /// The run ended. Recipes still `AVAILABLE` or `INSTALLING` were never
    /// resolved and are swept to `FAILED`.
    pub fn install_complete(&mut self, run_error: Option<&Error>) {
        self.complete = true;
        self.touch();

        if let Some(err) = run_error {
            self.error = Some(StatusError {
                message: err.to_string(),
                details: err.stderr_detail().unwrap_or_default().to_string(),
                task_path: err.task_path().to_vec(),
            });
        }

        self.sweep_unresolved(RecipeStatusType::Failed);

        for sub in &self.subscribers {
            if let Err(e) = sub.install_complete(self) {
                error!("could not report install completion: {}", e);
            }
        }
    }

    /// The run was canceled. Unresolved recipes sweep to `CANCELED`
    /// instead of `FAILED`.
    pub fn install_canceled(&mut self) {
        self.touch();
        self.sweep_unresolved(RecipeStatusType::Canceled);

        for sub in &self.subscribers {
            if let Err(e) = sub.install_canceled(self) {
                error!("could not report install cancellation: {}", e);
            }
        }
    }

    pub fn was_successful(&self) -> bool {
        self.has_any_recipe_status(RecipeStatusType::Installed)
    }

    pub fn has_any_recipe_status(&self, status: RecipeStatusType) -> bool {
        self.statuses.iter().any(|s| s.status == status)
    }

    pub fn recipes_with_status(&self, status: RecipeStatusType) -> Vec<&RecipeStatus> {
        self.statuses
            .iter()
            .filter(|s| s.status == status)
            .collect()
    }

    pub fn status_of(&self, name: &str) -> Option<RecipeStatusType> {
        self.statuses
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.status)
    }

    /// Record an event against the recipe's entry: overwrite the status
    /// in place if the recipe is already tracked, append a new entry
    /// otherwise. A recipe name appears at most once.
    fn with_recipe_event(&mut self, event: &RecipeStatusEvent, status: RecipeStatusType) {
        if let Some(guid) = &event.entity_guid {
            self.with_entity_guid(guid);
        }

        let status_error = event.msg.as_ref().map(|msg| StatusError {
            message: msg.clone(),
            details: String::new(),
            task_path: event.task_path.clone(),
        });

        if let Some(err) = &status_error {
            self.error = Some(err.clone());
        }

        match self.statuses.iter_mut().find(|s| s.name == event.recipe.name) {
            Some(entry) => {
                entry.status = status;
                if let Some(guid) = &event.entity_guid {
                    entry.entity_guid = Some(guid.clone());
                }
                if status_error.is_some() {
                    entry.error = status_error;
                }
            }
            None => {
                self.statuses.push(RecipeStatus {
                    name: event.recipe.name.clone(),
                    display_name: event.recipe.display_name.clone(),
                    status,
                    error: status_error,
                    entity_guid: event.entity_guid.clone(),
                });
            }
        }

        self.touch();
        debug!(
            recipe = %event.recipe.name,
            status = %status,
            tracked = self.statuses.len(),
            "recipe event"
        );
    }

    fn with_entity_guid(&mut self, guid: &str) {
        if self.entity_guids.iter().any(|g| g == guid) {
            return;
        }
        debug!(%guid, "new entity GUID");
        self.entity_guids.push(guid.to_string());
    }

    fn sweep_unresolved(&mut self, terminal: RecipeStatusType) {
        for entry in &mut self.statuses {
            if entry.status == RecipeStatusType::Available
                || entry.status == RecipeStatusType::Installing
            {
                debug!(recipe = %entry.name, status = %terminal, "sweeping unresolved recipe");
                entry.status = terminal;
            }
        }
    }

    fn touch(&mut self) {
        self.timestamp = chrono::Utc::now().timestamp();
    }
}

fn default_log_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("outfitter")
        .join("outfitter.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recipe(name: &str) -> Recipe {
        Recipe {
            name: name.to_string(),
            display_name: name.to_uppercase(),
            ..Default::default()
        }
    }

    fn event(name: &str) -> RecipeStatusEvent {
        RecipeStatusEvent::new(&recipe(name))
    }

    #[test]
    fn test_recipe_event_is_last_write_wins() {
        let mut status = InstallStatus::new(vec![]);
        status.recipe_available(&recipe("infra"));
        status.recipe_installing(event("infra"));
        status.recipe_installed(event("infra"));

        assert_eq!(status.statuses.len(), 1);
        assert_eq!(status.statuses[0].status, RecipeStatusType::Installed);
    }

    #[test]
    fn test_entity_guids_are_deduplicated() {
        let mut status = InstallStatus::new(vec![]);
        let mut e1 = event("infra");
        e1.entity_guid = Some("guid-a".to_string());
        let mut e2 = event("logging");
        e2.entity_guid = Some("guid-a".to_string());
        let mut e3 = event("mysql");
        e3.entity_guid = Some("guid-b".to_string());

        status.recipe_installed(e1);
        status.recipe_installed(e2);
        status.recipe_installed(e3);

        assert_eq!(status.entity_guids, vec!["guid-a", "guid-b"]);
    }

    #[test]
    fn test_complete_sweeps_unresolved_to_failed() {
        let mut status = InstallStatus::new(vec![]);
        status.recipe_available(&recipe("left-available"));
        status.recipe_installing(event("left-installing"));
        status.recipe_installed(event("done"));
        status.recipe_skipped(event("skipped"));

        status.install_complete(None);

        assert!(status.complete);
        assert_eq!(
            status.status_of("left-available"),
            Some(RecipeStatusType::Failed)
        );
        assert_eq!(
            status.status_of("left-installing"),
            Some(RecipeStatusType::Failed)
        );
        assert_eq!(status.status_of("done"), Some(RecipeStatusType::Installed));
        assert_eq!(
            status.status_of("skipped"),
            Some(RecipeStatusType::Skipped)
        );
    }

    #[test]
    fn test_cancel_sweeps_unresolved_to_canceled() {
        let mut status = InstallStatus::new(vec![]);
        status.recipe_available(&recipe("pending"));
        status.recipe_failed(event("failed"));

        status.install_canceled();

        assert_eq!(
            status.status_of("pending"),
            Some(RecipeStatusType::Canceled)
        );
        assert_eq!(status.status_of("failed"), Some(RecipeStatusType::Failed));
    }

    #[test]
    fn test_failure_message_lands_in_run_error() {
        let mut status = InstallStatus::new(vec![]);
        let mut e = event("mysql");
        e.msg = Some("exit status 1: permission denied".to_string());
        e.task_path = vec!["default".to_string(), "setup".to_string()];
        status.recipe_failed(e);

        let err = status.error.as_ref().unwrap();
        assert!(err.message.contains("permission denied"));
        assert_eq!(err.task_path, vec!["default", "setup"]);
    }

    struct FailingSubscriber;

    impl StatusSubscriber for FailingSubscriber {
        fn recipe_installed(
            &self,
            _status: &InstallStatus,
            _event: &RecipeStatusEvent,
        ) -> crate::error::Result<()> {
            Err(Error::ScriptError("reporter unreachable".to_string()))
        }
    }

    struct RecordingSubscriber {
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl StatusSubscriber for RecordingSubscriber {
        fn recipe_installed(
            &self,
            _status: &InstallStatus,
            event: &RecipeStatusEvent,
        ) -> crate::error::Result<()> {
            self.seen.borrow_mut().push(event.recipe.name.clone());
            Ok(())
        }
    }

    #[test]
    fn test_subscriber_error_does_not_stop_fanout() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut status = InstallStatus::new(vec![
            Box::new(FailingSubscriber),
            Box::new(RecordingSubscriber { seen: seen.clone() }),
        ]);

        status.recipe_installed(event("infra"));

        // The failing subscriber was first in registration order, yet the
        // second one still saw the event.
        assert_eq!(seen.borrow().as_slice(), ["infra"]);
    }
}
