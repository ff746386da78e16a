//! Diffing the manifest against local state into a transfer plan.

use crate::errors::Result;
use crate::models::{Manifest, PlanItem, SyncMode, SyncPlan, TransferReason};
use crate::services::inventory::LocalInventory;

pub struct DiffPlanner;

impl DiffPlanner {
    /// Produce the ordered list of entries requiring transfer for `mode`.
    ///
    /// Install plans the full manifest unconditionally: installing is a
    /// "lay out everything" operation even where a local file happens to
    /// match. Update compares existence and size only; Repair additionally
    /// hashes every present file. Output order is manifest order, which
    /// keeps progress counts reproducible across runs.
    pub fn plan(manifest: &Manifest, inventory: &LocalInventory, mode: SyncMode) -> Result<SyncPlan> {
        let mut items = Vec::new();

        for entry in manifest.entries() {
            let reason = match mode {
                SyncMode::Install => Some(TransferReason::Missing),
                SyncMode::Update => {
                    let record = inventory.record_for(entry, false)?;
                    if !record.exists {
                        Some(TransferReason::Missing)
                    } else if record.size != entry.expected_size {
                        Some(TransferReason::SizeMismatch)
                    } else {
                        None
                    }
                }
                SyncMode::Repair => {
                    let record = inventory.record_for(entry, true)?;
                    if !record.exists {
                        Some(TransferReason::Missing)
                    } else if record.size != entry.expected_size {
                        Some(TransferReason::SizeMismatch)
                    } else if record.checksum.as_deref() != Some(entry.expected_checksum.as_str()) {
                        Some(TransferReason::ChecksumMismatch)
                    } else {
                        None
                    }
                }
            };

            if let Some(reason) = reason {
                items.push(PlanItem {
                    entry: entry.clone(),
                    reason,
                });
            }
        }

        tracing::debug!(
            "plan for {:?}: {} of {} entries, {} bytes",
            mode,
            items.len(),
            manifest.len(),
            items
                .iter()
                .fold(0u64, |acc, item| acc.saturating_add(item.entry.expected_size))
        );
        Ok(SyncPlan { items })
    }
}
