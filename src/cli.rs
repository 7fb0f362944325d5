// src/cli.rs
//! CLI definitions for the outfitter orchestrator
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module. The
//! command tree is built here and dispatched from `main`; there is no
//! package-level mutable state.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "outfitter")]
#[command(author = "Outfitter Project")]
#[command(version)]
#[command(about = "Host agent-installer orchestrator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect, select and install applicable recipes on this host
    Install {
        /// Directory containing recipe YAML definitions
        #[arg(long, value_name = "DIR")]
        recipe_dir: Option<PathBuf>,

        /// Recipe name for a targeted install (repeatable)
        #[arg(short = 'n', long = "recipe", value_name = "NAME")]
        recipes: Vec<String>,

        /// Restrict the install set to these recipe names
        #[arg(long = "only", value_name = "NAME")]
        only: Vec<String>,

        /// Skip recipes by name
        #[arg(long = "skip-name", value_name = "NAME")]
        skip_names: Vec<String>,

        /// Skip recipes by install-target type (host, application)
        #[arg(long = "skip-type", value_name = "TYPE")]
        skip_types: Vec<String>,

        /// Skip recipes by keyword
        #[arg(long = "skip-keyword", value_name = "KEYWORD")]
        skip_keywords: Vec<String>,

        /// Run unattended; never prompt for input variables
        #[arg(short = 'y', long)]
        assume_yes: bool,

        /// Skip the pre-install configuration backup
        #[arg(long)]
        skip_backup: bool,
    },

    /// List recipes applicable to this host
    Recipes {
        /// Directory containing recipe YAML definitions
        #[arg(long, value_name = "DIR")]
        recipe_dir: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}
