//! Probing remote and local state into a status snapshot.
//!
//! The probe is best-effort and never fails: anything unreadable on the
//! remote side collapses into `remote_reachable = false`, and the state
//! machine settles in its initial mode until a later probe succeeds.

use std::sync::Arc;

use crate::remote::RemoteStore;
use crate::services::state_machine::StatusSnapshot;
use crate::utils::paths::{remote_version_path, InstallLayout, LAUNCHER_VERSION_PATH, MANIFEST_PATH};

pub struct StatusProbe {
    store: Arc<dyn RemoteStore>,
    layout: InstallLayout,
    launcher_version: String,
}

impl StatusProbe {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        layout: InstallLayout,
        launcher_version: impl Into<String>,
    ) -> Self {
        Self {
            store,
            layout,
            launcher_version: launcher_version.into(),
        }
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        let remote_reachable = matches!(self.store.exists(MANIFEST_PATH).await, Ok(true));
        if !remote_reachable {
            tracing::warn!("content server unreachable or serving no manifest");
            return StatusSnapshot::default();
        }

        let launcher_outdated = match self.remote_text(LAUNCHER_VERSION_PATH).await {
            Some(remote) => version_behind(&self.launcher_version, &remote),
            None => false,
        };

        let game_installed = self.layout.version_file().is_file();
        let game_version_current = if game_installed {
            let local = std::fs::read_to_string(self.layout.version_file())
                .ok()
                .map(|value| value.trim().to_string());
            let remote = self
                .remote_text(&remote_version_path(self.layout.platform()))
                .await;
            match (local, remote) {
                (Some(local), Some(remote)) => !version_behind(&local, &remote),
                // no remote version published means nothing to be behind of
                (_, None) => true,
                (None, _) => false,
            }
        } else {
            false
        };

        StatusSnapshot {
            remote_reachable,
            launcher_outdated,
            game_installed,
            game_version_current,
        }
    }

    async fn remote_text(&self, path: &str) -> Option<String> {
        match self.store.fetch(path).await {
            Ok(body) => match String::from_utf8(body) {
                Ok(text) => Some(text.trim().to_string()),
                Err(_) => {
                    tracing::warn!("remote resource {path} is not valid UTF-8");
                    None
                }
            },
            Err(err) => {
                tracing::debug!("could not read remote resource {path}: {err}");
                None
            }
        }
    }
}

/// Compare dotted numeric versions segment by segment. Missing segments
/// count as zero, non-numeric segments as zero. Returns whether `local`
/// is strictly behind `remote`.
pub fn version_behind(local: &str, remote: &str) -> bool {
    let parse = |value: &str| -> Vec<u64> {
        value
            .trim()
            .split('.')
            .map(|segment| segment.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let local = parse(local);
    let remote = parse(remote);
    let width = local.len().max(remote.len());
    for index in 0..width {
        let ours = local.get(index).copied().unwrap_or(0);
        let theirs = remote.get(index).copied().unwrap_or(0);
        if ours != theirs {
            return ours < theirs;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;
    use crate::remote::testing::MemoryRemoteStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn version_compare_is_segment_wise() {
        assert!(version_behind("1.2.3", "1.2.4"));
        assert!(version_behind("1.9", "1.10"));
        assert!(version_behind("1.2", "1.2.1"));
        assert!(!version_behind("1.2.3", "1.2.3"));
        assert!(!version_behind("2.0", "1.9.9"));
        assert!(!version_behind("1.2.0", "1.2"));
        // garbage segments degrade to zero instead of panicking
        assert!(version_behind("1.x", "1.1"));
    }

    #[tokio::test]
    async fn unreachable_remote_collapses_the_snapshot() {
        let dir = TempDir::new().unwrap();
        let layout = InstallLayout::new(dir.path(), Platform::Linux);
        let probe = StatusProbe::new(Arc::new(MemoryRemoteStore::new()), layout, "1.0");

        let snapshot = probe.snapshot().await;
        assert!(!snapshot.remote_reachable);
        assert!(!snapshot.game_installed);
    }

    #[tokio::test]
    async fn installed_and_current_tree_reports_healthy() {
        let dir = TempDir::new().unwrap();
        let layout = InstallLayout::new(dir.path(), Platform::Linux);
        let store = Arc::new(MemoryRemoteStore::new());
        store.put(MANIFEST_PATH, b"");
        store.put(LAUNCHER_VERSION_PATH, b"1.0.0\n");
        store.put("Linux/version.txt", b"2.1\n");

        fs::create_dir_all(layout.game_dir()).unwrap();
        fs::write(layout.version_file(), "2.1\n").unwrap();

        let probe = StatusProbe::new(store, layout, "1.0.0");
        let snapshot = probe.snapshot().await;
        assert!(snapshot.remote_reachable);
        assert!(!snapshot.launcher_outdated);
        assert!(snapshot.game_installed);
        assert!(snapshot.game_version_current);
    }

    #[tokio::test]
    async fn stale_game_version_and_outdated_launcher_are_flagged() {
        let dir = TempDir::new().unwrap();
        let layout = InstallLayout::new(dir.path(), Platform::Win64);
        let store = Arc::new(MemoryRemoteStore::new());
        store.put(MANIFEST_PATH, b"");
        store.put(LAUNCHER_VERSION_PATH, b"1.1");
        store.put("Win64/version.txt", b"3.0");

        fs::create_dir_all(layout.game_dir()).unwrap();
        fs::write(layout.version_file(), "2.9").unwrap();

        let probe = StatusProbe::new(store, layout, "1.0");
        let snapshot = probe.snapshot().await;
        assert!(snapshot.launcher_outdated);
        assert!(snapshot.game_installed);
        assert!(!snapshot.game_version_current);
    }

    #[tokio::test]
    async fn missing_version_file_means_not_installed() {
        let dir = TempDir::new().unwrap();
        let layout = InstallLayout::new(dir.path(), Platform::Linux);
        let store = Arc::new(MemoryRemoteStore::new());
        store.put(MANIFEST_PATH, b"");

        // game files may exist but an interrupted install never recorded
        // a version, so the tree does not count as installed
        fs::create_dir_all(layout.game_dir()).unwrap();
        fs::write(layout.local_path("a.dat"), b"partial").unwrap();

        let probe = StatusProbe::new(store, layout, "1.0");
        let snapshot = probe.snapshot().await;
        assert!(!snapshot.game_installed);
        assert!(!snapshot.game_version_current);
    }
}
