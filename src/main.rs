// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Install {
            recipe_dir,
            recipes,
            only,
            skip_names,
            skip_types,
            skip_keywords,
            assume_yes,
            skip_backup,
        }) => commands::install(commands::InstallArgs {
            recipe_dir,
            recipes,
            only,
            skip_names,
            skip_types,
            skip_keywords,
            assume_yes,
            skip_backup,
        }),
        Some(Commands::Recipes { recipe_dir }) => commands::list_recipes(recipe_dir),
        Some(Commands::Completions { shell }) => commands::completions(shell),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}
