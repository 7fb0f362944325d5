// src/commands.rs
//! Command implementations for the outfitter CLI
//!
//! Each function backs one subcommand defined in `cli.rs`. Fatal errors
//! bubble up as `anyhow::Error`; per-recipe outcomes are reported through
//! the status machine and its terminal subscriber instead.

use crate::cli::Cli;
use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::Shell;
use outfitter::{
    HostDiscoverer, InstallerContext, NoopBackup, RecipeCatalog, RecipeInstaller,
    TerminalStatusReporter, TomlProfile,
};
use std::io;
use std::path::PathBuf;

/// Arguments to the `install` subcommand.
pub struct InstallArgs {
    pub recipe_dir: Option<PathBuf>,
    pub recipes: Vec<String>,
    pub only: Vec<String>,
    pub skip_names: Vec<String>,
    pub skip_types: Vec<String>,
    pub skip_keywords: Vec<String>,
    pub assume_yes: bool,
    pub skip_backup: bool,
}

pub fn install(args: InstallArgs) -> Result<()> {
    let recipe_dir = args
        .recipe_dir
        .or_else(default_recipe_dir)
        .context("no recipe directory given and no default could be determined")?;

    let context = InstallerContext {
        assume_yes: args.assume_yes,
        recipe_names: args.recipes,
        recipe_dir: Some(recipe_dir),
        only_names: args.only,
        skip_names: args.skip_names,
        skip_types: args.skip_types,
        skip_keywords: args.skip_keywords,
        skip_backup: args.skip_backup,
    };

    let profile = TomlProfile::load().context("could not load credentials profile")?;

    let installer = RecipeInstaller::new(
        context,
        Box::new(profile),
        Box::new(NoopBackup),
        vec![Box::new(TerminalStatusReporter::new())],
    );

    let status = installer.install().context("installation did not complete")?;

    if status.has_any_recipe_status(outfitter::RecipeStatusType::Failed) {
        anyhow::bail!("one or more recipes failed to install");
    }

    Ok(())
}

pub fn list_recipes(recipe_dir: Option<PathBuf>) -> Result<()> {
    let recipe_dir = recipe_dir
        .or_else(default_recipe_dir)
        .context("no recipe directory given and no default could be determined")?;

    let manifest = HostDiscoverer::new().discover()?;
    let catalog = RecipeCatalog::load(&recipe_dir, &manifest)?;

    if catalog.find_all().is_empty() {
        println!("No recipes in {} apply to this host.", recipe_dir.display());
        return Ok(());
    }

    println!("{:<32} {:<28} {}", "NAME", "PROCESS MATCH", "DEPENDENCIES");
    for recipe in catalog.find_all() {
        println!(
            "{:<32} {:<28} {}",
            recipe.name,
            recipe.process_match.join(", "),
            recipe.dependencies.join(", ")
        );
    }

    Ok(())
}

pub fn completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "outfitter", &mut io::stdout());
    Ok(())
}

fn default_recipe_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("outfitter").join("recipes"))
}
