// src/install/mod.rs

//! Install orchestration
//!
//! `RecipeInstaller` drives one run end to end: discover the host,
//! invoke the configuration backup, load the catalog, resolve bundles,
//! filter, then execute each selected recipe in dependency order, one
//! at a time, so install side effects stay deterministic and no two
//! scripts race over shared host resources. Every step reports into the
//! `InstallStatus` machine, which fans events out to the registered
//! subscribers.
//!
//! Failure policy: a failure local to one recipe never propagates to its
//! siblings. Only a catalog-load failure (or a missing profile) is fatal
//! to the whole run. Cancellation is cooperative and sweeps unresolved
//! recipes to `CANCELED`.

pub mod backup;
pub mod context;

pub use backup::{ConfigBackup, NoopBackup};
pub use context::InstallerContext;

use crate::bundle::{Bundle, Bundler};
use crate::detection::{ProcessMatcher, RecipeDetector, ScriptEvaluator};
use crate::discovery::{DiscoveryManifest, HostDiscoverer};
use crate::error::{Error, Result};
use crate::execution::{
    CancelToken, RecipeExecutor, RecipeVarProvider, TaskRecipeExecutor, host_fact_vars,
};
use crate::filter::RecipeFilterRunner;
use crate::profile::ProfileProvider;
use crate::recipe::{Recipe, RecipeCatalog};
use crate::status::{InstallStatus, RecipeStatusEvent, RecipeStatusType, StatusSubscriber};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub struct RecipeInstaller {
    context: InstallerContext,
    profile: Box<dyn ProfileProvider>,
    backup: Box<dyn ConfigBackup>,
    status: InstallStatus,
    cancel: CancelToken,
}

impl RecipeInstaller {
    pub fn new(
        context: InstallerContext,
        profile: Box<dyn ProfileProvider>,
        backup: Box<dyn ConfigBackup>,
        subscribers: Vec<Box<dyn StatusSubscriber>>,
    ) -> Self {
        Self {
            context,
            profile,
            backup,
            status: InstallStatus::new(subscribers),
            cancel: CancelToken::new(),
        }
    }

    /// Handle callers can use to request a cooperative cancel.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the install to completion. The returned status carries the
    /// final per-recipe outcomes; `Err` means the run as a whole could
    /// not proceed (fatal error or cancellation).
    pub fn install(mut self) -> Result<InstallStatus> {
        self.status.install_started();

        let context = self.context.clone();
        match self.run(&context) {
            Ok(()) => {
                self.status.install_complete(None);
                Ok(self.status)
            }
            Err(Error::Interrupted) => {
                self.status.install_canceled();
                Err(Error::Interrupted)
            }
            Err(e) => {
                self.status.install_complete(Some(&e));
                Err(e)
            }
        }
    }

    fn run(&mut self, context: &InstallerContext) -> Result<()> {
        let manifest = HostDiscoverer::new().discover()?;
        self.status.discovery_complete(&manifest);

        if context.skip_backup {
            debug!("configuration backup skipped by request");
        } else if let Err(e) = self.backup.backup() {
            warn!("configuration backup failed, continuing install: {}", e);
        }

        let recipe_dir = context.recipe_dir.as_ref().ok_or_else(|| {
            Error::CatalogError("no recipe directory configured".to_string())
        })?;
        let catalog = RecipeCatalog::load(recipe_dir, &manifest)?;

        let detector = RecipeDetector::new(
            ProcessMatcher::from_manifest(&manifest),
            ScriptEvaluator::new(host_fact_vars(&manifest)),
        );
        let bundler = Bundler::new(&catalog, &detector);

        let mut bundles = vec![bundler.create_core_bundle()];
        if context.recipes_provided() {
            bundles.push(bundler.create_additional_targeted_bundle(&context.recipe_names));
        } else {
            bundles.push(bundler.create_additional_guided_bundle());
        }

        let filter_runner = RecipeFilterRunner::new(&detector, context.skip_filter());
        let var_provider = RecipeVarProvider::new(context.assume_yes);
        let executor = TaskRecipeExecutor::new();

        let mut processed: BTreeSet<String> = BTreeSet::new();
        for bundle in bundles {
            self.report_detections(&bundle);

            let candidates: Vec<Recipe> = bundle
                .recipes_dependencies_first()
                .into_iter()
                .filter(|r| !processed.contains(&r.name))
                .collect();

            let selected = filter_runner.run_filter_multiple(&candidates, &mut self.status);

            info!(
                bundle = %bundle.bundle_type,
                candidates = candidates.len(),
                selected = selected.len(),
                "bundle filtered"
            );

            for recipe in selected {
                processed.insert(recipe.name.clone());
                self.execute_recipe(&recipe, &manifest, &var_provider, &executor)?;
            }
        }

        debug!("done installing");
        Ok(())
    }

    /// Surface detection-only verdicts (present but deferred, or
    /// unsupported) so they show up in the final summary.
    fn report_detections(&mut self, bundle: &Bundle) {
        for node in &bundle.recipes {
            let node = node.borrow();
            if node.has_status(RecipeStatusType::Unsupported) {
                self.status
                    .recipe_unsupported(RecipeStatusEvent::new(&node.recipe));
            } else if node.has_status(RecipeStatusType::Detected) && !node.is_available() {
                self.status
                    .recipe_detected(RecipeStatusEvent::new(&node.recipe));
            }
        }
    }

    /// Execute one recipe. Per-recipe failures are recorded and do not
    /// propagate; only interruption stops the run.
    fn execute_recipe(
        &mut self,
        recipe: &Recipe,
        manifest: &DiscoveryManifest,
        var_provider: &RecipeVarProvider,
        executor: &TaskRecipeExecutor,
    ) -> Result<()> {
        if self.cancel.is_canceled() {
            return Err(Error::Interrupted);
        }

        let vars = match var_provider.prepare(manifest, recipe, self.profile.as_ref()) {
            Ok(vars) => vars,
            Err(Error::Interrupted) => return Err(Error::Interrupted),
            Err(e) => {
                warn!(recipe = %recipe.name, "could not prepare recipe variables: {}", e);
                self.status.recipe_failed(
                    RecipeStatusEvent::new(recipe).with_msg(e.to_string()),
                );
                return Ok(());
            }
        };

        info!(recipe = %recipe.name, "installing");
        self.status.recipe_installing(RecipeStatusEvent::new(recipe));

        match executor.execute(recipe, &vars, &self.cancel) {
            Ok(()) => {
                self.status.recipe_installed(RecipeStatusEvent::new(recipe));
            }
            Err(Error::Interrupted) => {
                self.status.recipe_canceled(RecipeStatusEvent::new(recipe));
                return Err(Error::Interrupted);
            }
            Err(Error::UnsupportedOs(msg)) => {
                self.status
                    .recipe_unsupported(RecipeStatusEvent::new(recipe).with_msg(msg));
            }
            Err(e) => {
                let event = RecipeStatusEvent::new(recipe)
                    .with_msg(e.to_string())
                    .with_task_path(e.task_path().to_vec());
                self.status.recipe_failed(event);
            }
        }

        Ok(())
    }
}
