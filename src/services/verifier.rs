//! Checksum gate between a finished transfer and the authoritative tree.

use std::path::PathBuf;

use crate::errors::{LauncherError, Result};
use crate::models::ManifestEntry;
use crate::utils::file::{promote, sha256_file};
use crate::utils::paths::InstallLayout;

#[derive(Clone)]
pub struct Verifier {
    layout: InstallLayout,
}

impl Verifier {
    pub fn new(layout: InstallLayout) -> Self {
        Self { layout }
    }

    /// Recompute the digest of the transferred bytes and either promote the
    /// temp file over the final path or discard it, leaving any prior final
    /// file untouched. A file only ever becomes part of the installation
    /// through this gate.
    pub fn verify_and_promote(&self, temp_path: &PathBuf, entry: &ManifestEntry) -> Result<()> {
        let actual = sha256_file(temp_path)?;
        if actual != entry.expected_checksum {
            if let Err(err) = std::fs::remove_file(temp_path) {
                tracing::warn!(
                    "failed to discard rejected temp file {}: {}",
                    temp_path.display(),
                    err
                );
            }
            return Err(LauncherError::ChecksumMismatch {
                path: entry.relative_path.clone(),
                expected: entry.expected_checksum.clone(),
                actual,
            });
        }

        let final_path = self.layout.local_path(&entry.relative_path);
        promote(temp_path, &final_path)?;
        tracing::debug!("verified and promoted {}", entry.relative_path);
        Ok(())
    }

    /// Blocking work moved off the async worker.
    pub async fn verify_and_promote_async(
        &self,
        temp_path: PathBuf,
        entry: ManifestEntry,
    ) -> Result<()> {
        let verifier = self.clone();
        tokio::task::spawn_blocking(move || verifier.verify_and_promote(&temp_path, &entry))
            .await
            .map_err(|err| LauncherError::Config(format!("verify join error: {err}")))?
    }
}
