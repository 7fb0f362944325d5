// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: recipe catalog directory
fn recipe_dir_arg() -> Arg {
    Arg::new("recipe_dir")
        .long("recipe-dir")
        .value_name("DIR")
        .help("Directory containing recipe YAML definitions")
}

fn build_cli() -> Command {
    Command::new("outfitter")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Outfitter Contributors")
        .about("Host agent-installer orchestrator")
        .subcommand_required(false)
        .subcommand(
            Command::new("install")
                .about("Detect, select and install applicable recipes on this host")
                .arg(recipe_dir_arg())
                .arg(
                    Arg::new("recipe")
                        .long("recipe")
                        .short('n')
                        .action(clap::ArgAction::Append)
                        .help("Recipe name for a targeted install (repeatable)"),
                )
                .arg(
                    Arg::new("only")
                        .long("only")
                        .action(clap::ArgAction::Append)
                        .help("Restrict the install set to these recipe names"),
                )
                .arg(
                    Arg::new("skip_name")
                        .long("skip-name")
                        .action(clap::ArgAction::Append)
                        .help("Skip recipes by name"),
                )
                .arg(
                    Arg::new("skip_type")
                        .long("skip-type")
                        .action(clap::ArgAction::Append)
                        .help("Skip recipes by install-target type"),
                )
                .arg(
                    Arg::new("skip_keyword")
                        .long("skip-keyword")
                        .action(clap::ArgAction::Append)
                        .help("Skip recipes by keyword"),
                )
                .arg(
                    Arg::new("assume_yes")
                        .long("assume-yes")
                        .short('y')
                        .action(clap::ArgAction::SetTrue)
                        .help("Run unattended; never prompt for input variables"),
                )
                .arg(
                    Arg::new("skip_backup")
                        .long("skip-backup")
                        .action(clap::ArgAction::SetTrue)
                        .help("Skip the pre-install configuration backup"),
                ),
        )
        .subcommand(
            Command::new("recipes")
                .about("List recipes applicable to this host")
                .arg(recipe_dir_arg()),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("outfitter.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
        return;
    }

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
