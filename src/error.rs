// src/error.rs

//! Error types for the outfitter orchestrator
//!
//! One crate-wide error enum; per-recipe execution failures are surfaced
//! through the status machine rather than propagated across recipes.

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Recipe catalog could not be loaded (fatal to the run)
    #[error("Catalog error: {0}")]
    CatalogError(String),

    /// A recipe definition failed to parse
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Discovery or install script execution failed
    #[error("Script error: {0}")]
    ScriptError(String),

    /// A task in the install task graph failed.
    ///
    /// `task_path` is the chain of task names leading to the failing
    /// command, retained for the final error summary.
    #[error("Task {task_path:?} failed: {message}")]
    TaskError {
        task_path: Vec<String>,
        message: String,
    },

    /// A recipe input variable had no env value, no default, and the run
    /// is unattended
    #[error("No value for required input variable {0} and none provided")]
    MissingInputVar(String),

    /// The run was interrupted by the user (exit code 130 or cancel token)
    #[error("Installation interrupted")]
    Interrupted,

    /// The install script declared this operating system unsupported
    /// (exit code 131)
    #[error("Unsupported operating system: {0}")]
    UnsupportedOs(String),

    /// Interactive prompt for an input variable failed
    #[error("Prompt failed: {0}")]
    PromptError(String),

    /// Profile/credentials could not be read
    #[error("Profile error: {0}")]
    ProfileError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The last captured stderr line for diagnostics, when present.
    pub fn stderr_detail(&self) -> Option<&str> {
        match self {
            Error::TaskError { message, .. } => Some(message.as_str()),
            Error::ScriptError(message) => Some(message.as_str()),
            Error::UnsupportedOs(message) => Some(message.as_str()),
            _ => None,
        }
    }

    /// The failing task path, when the error came out of the task graph.
    pub fn task_path(&self) -> &[String] {
        match self {
            Error::TaskError { task_path, .. } => task_path,
            _ => &[],
        }
    }
}
