//! Read-only view of the local installation tree.

use crate::errors::Result;
use crate::models::{LocalFileRecord, ManifestEntry};
use crate::utils::file::sha256_file;
use crate::utils::paths::InstallLayout;

pub struct LocalInventory {
    layout: InstallLayout,
}

impl LocalInventory {
    pub fn new(layout: InstallLayout) -> Self {
        Self { layout }
    }

    /// Observe one manifest entry on disk. The size comes from metadata; the
    /// checksum is only computed when `need_checksum` is set, since hashing
    /// an entire installation is what repair mode pays for and update mode
    /// avoids.
    pub fn record_for(&self, entry: &ManifestEntry, need_checksum: bool) -> Result<LocalFileRecord> {
        let path = self.layout.local_path(&entry.relative_path);

        let metadata = match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta,
            _ => {
                return Ok(LocalFileRecord {
                    relative_path: entry.relative_path.clone(),
                    exists: false,
                    size: 0,
                    checksum: None,
                })
            }
        };

        let checksum = if need_checksum {
            Some(sha256_file(&path)?)
        } else {
            None
        };

        Ok(LocalFileRecord {
            relative_path: entry.relative_path.clone(),
            exists: true,
            size: metadata.len(),
            checksum,
        })
    }
}
