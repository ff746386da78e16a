//! Composition of manifest, inventory, planner, downloader and verifier
//! into a single synchronization run per mode.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::errors::{LauncherError, Result};
use crate::models::{SyncEvent, SyncMode, SyncOutcome, SyncPlan};
use crate::remote::RemoteStore;
use crate::services::downloader::Downloader;
use crate::services::inventory::LocalInventory;
use crate::services::manifest_service::ManifestService;
use crate::services::planner::DiffPlanner;
use crate::utils::file::{clear_marker, touch_marker};
use crate::utils::paths::{
    platform_sentinel_path, remote_version_path, InstallLayout, INSTALL_MARKER, UPDATE_MARKER,
};
use crate::models::Platform;

/// Removes the in-progress marker when the run returns control, however it
/// ends. A marker that survives means the process died mid-run, which the
/// next startup surfaces through [`SyncOrchestrator::interrupted_run`].
struct MarkerGuard(PathBuf);

impl Drop for MarkerGuard {
    fn drop(&mut self) {
        clear_marker(&self.0);
    }
}

pub struct SyncOrchestrator {
    store: Arc<dyn RemoteStore>,
    layout: InstallLayout,
    events: mpsc::Sender<SyncEvent>,
    cancel: CancellationToken,
    manifest: ManifestService,
    downloader: Downloader,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        layout: InstallLayout,
        events: mpsc::Sender<SyncEvent>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let manifest = ManifestService::new(store.clone());
        let downloader = Downloader::new(store.clone(), layout.clone(), events.clone(), cancel.clone());
        Self {
            store,
            layout,
            events,
            cancel,
            manifest,
            downloader,
        }
    }

    /// Token observers may use to stop the run between chunks and between
    /// plan entries. Cancellation yields `SyncOutcome::Cancelled`.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// A marker left behind by a run that never returned. Surfaced to the
    /// caller, not resolved here.
    pub fn interrupted_run(&self) -> Option<SyncMode> {
        if self.layout.root().join(INSTALL_MARKER).exists() {
            return Some(SyncMode::Install);
        }
        if self.layout.root().join(UPDATE_MARKER).exists() {
            return Some(SyncMode::Update);
        }
        None
    }

    /// Run one synchronization for `mode`. The only entry point external
    /// callers use; never panics and never returns `Err` — every failure is
    /// classified into the outcome, which is also posted as the final event
    /// on the channel.
    pub async fn run(&self, mode: SyncMode) -> SyncOutcome {
        tracing::info!("synchronization run starting: {:?}", mode);
        let outcome = match self.run_inner(mode).await {
            Ok(outcome) => outcome,
            Err(LauncherError::Cancelled) => SyncOutcome::Cancelled,
            Err(err) => {
                tracing::error!("synchronization run failed: {}", err);
                SyncOutcome::Failed {
                    kind: err.kind(),
                    entry: None,
                }
            }
        };
        tracing::info!("synchronization run finished: {:?}", outcome);
        let _ = self.events.send(SyncEvent::Finished(outcome.clone())).await;
        outcome
    }

    async fn run_inner(&self, mode: SyncMode) -> Result<SyncOutcome> {
        if self.layout.platform() == Platform::Invalid {
            return Err(LauncherError::Config(
                "no target platform configured".to_string(),
            ));
        }

        // sentinel check before any transfer is attempted
        let sentinel = platform_sentinel_path(self.layout.platform());
        if !self.store.exists(&sentinel).await? {
            tracing::warn!("platform sentinel absent: {}", sentinel);
            return Ok(SyncOutcome::Failed {
                kind: crate::errors::ErrorKind::PlatformNotProvided,
                entry: None,
            });
        }

        let marker = self.layout.marker_path(mode);
        touch_marker(&marker)?;
        let _marker = MarkerGuard(marker);

        let manifest = self.manifest.fetch_manifest().await?;
        let plan = self.build_plan(manifest, mode).await?;

        if plan.is_empty() {
            // already up to date; nothing to lay out
            self.record_installed_version().await;
            return Ok(SyncOutcome::Success);
        }

        let files_total = plan.len();
        let mut files_completed = 0usize;
        tracing::info!(
            "executing plan: {} file(s), {} bytes",
            files_total,
            plan.total_bytes()
        );

        for item in &plan.items {
            if self.cancel.is_cancelled() {
                return Ok(SyncOutcome::Cancelled);
            }

            let result = self
                .downloader
                .transfer(&item.entry, files_completed, files_total)
                .await?;

            if !result.succeeded {
                // verified files stay; untried files keep their prior state,
                // so a later run replans from where this one stopped
                return Ok(SyncOutcome::Failed {
                    kind: result
                        .failure
                        .unwrap_or(crate::errors::ErrorKind::Network),
                    entry: Some(item.entry.relative_path.clone()),
                });
            }
            files_completed += 1;
        }

        self.record_installed_version().await;
        Ok(SyncOutcome::Success)
    }

    async fn build_plan(&self, manifest: crate::models::Manifest, mode: SyncMode) -> Result<SyncPlan> {
        // repair hashes the whole tree; keep that off the async worker
        let layout = self.layout.clone();
        tokio::task::spawn_blocking(move || {
            let inventory = LocalInventory::new(layout);
            DiffPlanner::plan(&manifest, &inventory, mode)
        })
        .await
        .map_err(|err| LauncherError::Config(format!("plan join error: {err}")))?
    }

    /// Record the remote-declared version in the local version marker so the
    /// next status probe sees the installation as current. Best effort; a
    /// stale marker only re-triggers update mode.
    async fn record_installed_version(&self) {
        let path = remote_version_path(self.layout.platform());
        match self.store.fetch(&path).await {
            Ok(raw) => {
                let version = String::from_utf8_lossy(&raw).trim().to_string();
                if version.is_empty() {
                    return;
                }
                let file = self.layout.version_file();
                if let Some(parent) = file.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                if let Err(err) = std::fs::write(&file, &version) {
                    tracing::warn!("failed to record installed version: {}", err);
                } else {
                    tracing::debug!("installed version recorded: {}", version);
                }
            }
            Err(err) => tracing::warn!("remote version unavailable: {}", err),
        }
    }
}
