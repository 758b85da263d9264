use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::ApprovedRecord;

/// Owns the canonical design file and its session backup.
///
/// Both paths are explicit constructor parameters; nothing here derives one
/// path from the other, so tests can point the pair anywhere.
pub struct DesignStore {
    canonical: PathBuf,
    backup: PathBuf,
    output_dir: PathBuf,
}

impl DesignStore {
    pub fn new(canonical: PathBuf, backup: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            canonical,
            backup,
            output_dir,
        }
    }

    pub fn canonical_path(&self) -> &Path {
        &self.canonical
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Reads the current canonical document as raw text.
    pub fn read(&self) -> Result<String> {
        fs::read_to_string(&self.canonical)
            .with_context(|| format!("failed to read design file {}", self.canonical.display()))
    }

    /// Overwrites the canonical document.
    pub fn write(&self, raw: &str) -> Result<()> {
        fs::write(&self.canonical, raw)
            .with_context(|| format!("failed to write design file {}", self.canonical.display()))
    }

    /// Copies the pristine document to the backup path. Called once at
    /// session start; the backup is left on disk for manual recovery.
    pub fn backup(&self) -> Result<()> {
        fs::copy(&self.canonical, &self.backup)
            .with_context(|| format!("failed to create backup {}", self.backup.display()))?;
        info!("backup created at {}", self.backup.display());
        Ok(())
    }

    /// Restores the canonical document from the session backup. A missing
    /// backup is a no-op (no session has started yet).
    pub fn restore(&self) -> Result<()> {
        if self.backup.exists() {
            fs::copy(&self.backup, &self.canonical).with_context(|| {
                format!(
                    "failed to restore design from backup {}",
                    self.backup.display()
                )
            })?;
        }
        Ok(())
    }

    /// Writes the session's approved records to
    /// `<output_dir>/<state>_<token>_approved.json`. Returns the path.
    pub fn write_approved(
        &self,
        state: &str,
        session_token: &str,
        records: &[ApprovedRecord],
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "failed to create output directory {}",
                self.output_dir.display()
            )
        })?;
        let path = self
            .output_dir
            .join(format!("{}_{}_approved.json", state, session_token));
        let body = serde_json::to_string_pretty(records)
            .context("failed to serialize approved records")?;
        fs::write(&path, body)
            .with_context(|| format!("failed to write approved designs to {}", path.display()))?;
        info!("saved {} approved design(s) to {}", records.len(), path.display());
        Ok(path)
    }
}
