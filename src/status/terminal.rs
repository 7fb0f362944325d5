// src/status/terminal.rs

//! Terminal status reporter
//!
//! Thin reference `StatusSubscriber`: a spinner while recipes install,
//! one line per resolved recipe, and a final summary pointing failures at
//! the captured log file. Heavier reporters (remote event submission,
//! state storage) live with their transports, not here.

use crate::discovery::DiscoveryManifest;
use crate::error::Result;
use crate::status::{InstallStatus, RecipeStatusEvent, RecipeStatusType, StatusSubscriber};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct TerminalStatusReporter {
    spinner: ProgressBar,
}

impl TerminalStatusReporter {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { spinner }
    }

    fn announce(&self, line: String) {
        // suspend() keeps the spinner from overdrawing the line
        self.spinner.suspend(|| println!("{}", line));
    }

    fn print_group(&self, header: &str, entries: &[&crate::status::RecipeStatus]) {
        if entries.is_empty() {
            return;
        }
        println!("\n  {}", header);
        for entry in entries {
            let name = if entry.display_name.is_empty() {
                &entry.name
            } else {
                &entry.display_name
            };
            match &entry.error {
                Some(err) if !err.message.is_empty() => {
                    println!("    - {} ({})", name, err.message)
                }
                _ => println!("    - {}", name),
            }
        }
    }
}

impl Default for TerminalStatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSubscriber for TerminalStatusReporter {
    fn install_started(&self, _status: &InstallStatus) -> Result<()> {
        println!("Preparing this host for instrumentation.\n");
        Ok(())
    }

    fn discovery_complete(
        &self,
        _status: &InstallStatus,
        manifest: &DiscoveryManifest,
    ) -> Result<()> {
        self.announce(format!(
            "Discovered {} {} ({} running processes)",
            manifest.platform, manifest.platform_version, manifest.processes.len()
        ));
        Ok(())
    }

    fn recipe_installing(&self, _status: &InstallStatus, event: &RecipeStatusEvent) -> Result<()> {
        self.spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner
            .set_message(format!("Installing {}", event.recipe.display_name));
        Ok(())
    }

    fn recipe_installed(&self, _status: &InstallStatus, event: &RecipeStatusEvent) -> Result<()> {
        self.announce(format!("  ✔ {} installed", event.recipe.display_name));
        if let Some(info) = event.recipe.post_install_message() {
            self.announce(format!("    {}", info.trim_end()));
        }
        Ok(())
    }

    fn recipe_failed(&self, _status: &InstallStatus, event: &RecipeStatusEvent) -> Result<()> {
        self.announce(format!("  ✘ {} failed", event.recipe.display_name));
        Ok(())
    }

    fn install_complete(&self, status: &InstallStatus) -> Result<()> {
        self.spinner.finish_and_clear();

        self.print_group(
            "Installed:",
            &status.recipes_with_status(RecipeStatusType::Installed),
        );
        self.print_group(
            "Failed:",
            &status.recipes_with_status(RecipeStatusType::Failed),
        );
        self.print_group(
            "Skipped:",
            &status.recipes_with_status(RecipeStatusType::Skipped),
        );
        self.print_group(
            "Recommended for later:",
            &status.recipes_with_status(RecipeStatusType::Recommended),
        );

        if status.has_any_recipe_status(RecipeStatusType::Failed) {
            println!(
                "\nSome installations failed. See {} for the captured output.",
                status.log_file_path.display()
            );
        } else if status.was_successful() {
            println!("\nInstallation complete.");
        }

        Ok(())
    }

    fn install_canceled(&self, status: &InstallStatus) -> Result<()> {
        self.spinner.finish_and_clear();
        println!(
            "\nInstallation canceled. {} recipe(s) were left unresolved.",
            status
                .recipes_with_status(RecipeStatusType::Canceled)
                .len()
        );
        Ok(())
    }
}
