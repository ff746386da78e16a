//! Streaming transfer of planned entries with bounded retry.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::errors::{LauncherError, Result};
use crate::models::{ManifestEntry, ProgressEvent, SyncEvent, TransferResult};
use crate::remote::RemoteStore;
use crate::services::verifier::Verifier;
use crate::utils::paths::{remote_file_path, InstallLayout};

/// Transient failures and per-entry checksum rejections are retried with a
/// full re-fetch from offset zero, up to this many attempts total.
pub const MAX_TRANSFER_ATTEMPTS: u32 = 3;

const RETRY_WAIT_MS: u64 = 250;

pub struct Downloader {
    store: Arc<dyn RemoteStore>,
    layout: InstallLayout,
    verifier: Verifier,
    events: mpsc::Sender<SyncEvent>,
    cancel: CancellationToken,
}

impl Downloader {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        layout: InstallLayout,
        events: mpsc::Sender<SyncEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let verifier = Verifier::new(layout.clone());
        Self {
            store,
            layout,
            verifier,
            events,
            cancel,
        }
    }

    /// Transfer one planned entry: stream into a `.part` file, emit a
    /// progress event per chunk, then hand the temp file to the verifier
    /// before it becomes visible at the final path.
    ///
    /// Only cancellation surfaces as `Err`; every other outcome, including
    /// exhausted retries, is classified in the returned `TransferResult`.
    pub async fn transfer(
        &self,
        entry: &ManifestEntry,
        files_completed: usize,
        files_total: usize,
    ) -> Result<TransferResult> {
        let remote_path = remote_file_path(self.layout.platform(), &entry.relative_path);
        let temp_path = self.layout.temp_path(&entry.relative_path);

        let mut attempts = 0;
        loop {
            attempts += 1;
            if self.cancel.is_cancelled() {
                return Err(LauncherError::Cancelled);
            }

            let result = self
                .attempt(entry, &remote_path, &temp_path, files_completed, files_total)
                .await;

            let err = match result {
                Ok(()) => {
                    return Ok(TransferResult {
                        entry: entry.clone(),
                        succeeded: true,
                        failure: None,
                        attempts,
                    })
                }
                Err(err) => err,
            };

            if matches!(err, LauncherError::Cancelled) {
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(LauncherError::Cancelled);
            }

            // a file absent on the server for this platform is never
            // transient; the orchestrator aborts the whole plan on it
            let kind = err.kind();
            if kind.is_transient() && attempts < MAX_TRANSFER_ATTEMPTS {
                tracing::warn!(
                    "transfer of {} failed ({}), retrying from offset zero [attempt {}/{}]",
                    entry.relative_path,
                    err,
                    attempts,
                    MAX_TRANSFER_ATTEMPTS
                );
                sleep(Duration::from_millis(RETRY_WAIT_MS * attempts as u64)).await;
                continue;
            }

            tracing::error!(
                "transfer of {} failed after {} attempt(s): {}",
                entry.relative_path,
                attempts,
                err
            );
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Ok(TransferResult {
                entry: entry.clone(),
                succeeded: false,
                failure: Some(kind),
                attempts,
            });
        }
    }

    async fn attempt(
        &self,
        entry: &ManifestEntry,
        remote_path: &str,
        temp_path: &std::path::Path,
        files_completed: usize,
        files_total: usize,
    ) -> Result<()> {
        let mut stream = self.store.open(remote_path).await.map_err(|err| match err {
            LauncherError::RemoteMissing(_) => {
                LauncherError::PlatformNotProvided(self.layout.platform())
            }
            other => other,
        })?;

        if let Some(parent) = temp_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(temp_path).await?;
        let mut downloaded: u64 = 0;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(LauncherError::Cancelled);
                }
                next = stream.next() => {
                    let Some(next) = next else { break };
                    let bytes = next?;
                    file.write_all(&bytes).await?;
                    downloaded = downloaded.saturating_add(bytes.len() as u64);
                    self.emit_progress(
                        entry,
                        downloaded.min(entry.expected_size),
                        files_completed,
                        files_total,
                    )
                    .await;
                }
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        self.verifier
            .verify_and_promote_async(temp_path.to_path_buf(), entry.clone())
            .await?;

        // closing event so observers always see bytes == total on success
        self.emit_progress(entry, entry.expected_size, files_completed, files_total)
            .await;
        Ok(())
    }

    async fn emit_progress(
        &self,
        entry: &ManifestEntry,
        bytes_downloaded: u64,
        files_completed: usize,
        files_total: usize,
    ) {
        let event = SyncEvent::Progress(ProgressEvent {
            current_file: entry.relative_path.clone(),
            bytes_downloaded,
            total_bytes: entry.expected_size,
            files_completed,
            files_total,
        });
        // a dropped receiver only means nobody is rendering progress
        let _ = self.events.send(event).await;
    }
}
