// src/discovery/mod.rs

//! Host discovery
//!
//! Builds the `DiscoveryManifest`: a read-only snapshot of host facts and
//! the running process table, created once at run start. Everything
//! downstream (catalog target filtering, process matching, variable
//! injection) reads from this snapshot; the OS is scanned exactly once.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::debug;

/// An abstracted running process: just enough for signature matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// Full command line, arguments joined with single spaces
    pub command: String,
}

/// Discovered facts about the host. Created once per run, read-only
/// thereafter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryManifest {
    pub hostname: String,
    pub os: String,
    pub platform: String,
    pub platform_family: String,
    pub platform_version: String,
    pub kernel_version: String,
    pub kernel_arch: String,
    pub processes: Vec<ProcessInfo>,
}

/// Snapshots host facts and the process table via sysinfo.
#[derive(Debug, Default)]
pub struct HostDiscoverer;

impl HostDiscoverer {
    pub fn new() -> Self {
        Self
    }

    /// Walk the OS process table and collect host facts.
    ///
    /// Processes without a readable command line are dropped; they cannot
    /// match any process signature.
    pub fn discover(&self) -> Result<DiscoveryManifest> {
        let sys = System::new_all();

        let mut processes = Vec::new();
        for (pid, process) in sys.processes() {
            let command = process
                .cmd()
                .iter()
                .map(|part| part.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");

            if command.is_empty() {
                continue;
            }

            processes.push(ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().to_string(),
                command,
            });
        }

        let manifest = DiscoveryManifest {
            hostname: System::host_name().unwrap_or_default(),
            os: std::env::consts::OS.to_string(),
            platform: System::name().unwrap_or_default(),
            platform_family: System::distribution_id(),
            platform_version: System::os_version().unwrap_or_default(),
            kernel_version: System::kernel_version().unwrap_or_default(),
            kernel_arch: std::env::consts::ARCH.to_string(),
            processes,
        };

        debug!(
            os = %manifest.os,
            platform = %manifest.platform,
            processes = manifest.processes.len(),
            "host discovery complete"
        );

        Ok(manifest)
    }
}
