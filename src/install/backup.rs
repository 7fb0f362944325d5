// src/install/backup.rs

//! Configuration backup collaborator
//!
//! The orchestrator invokes the backup exactly once, before any recipe
//! executes. Backups are best-effort: a failure is logged as a warning
//! and never blocks the install. The checksum/rotation/restore machinery
//! lives with the collaborator implementing this trait.

use crate::error::Result;

pub trait ConfigBackup {
    /// Snapshot whatever host configuration the installer may touch.
    fn backup(&self) -> Result<()>;
}

/// Default collaborator: does nothing.
#[derive(Debug, Default)]
pub struct NoopBackup;

impl ConfigBackup for NoopBackup {
    fn backup(&self) -> Result<()> {
        Ok(())
    }
}
