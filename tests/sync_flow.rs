//! End-to-end synchronization flows against an in-memory content server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tokio::sync::mpsc;

use ember_launcher::remote::ByteStream;
use ember_launcher::services::state_machine::StatusSnapshot;
use ember_launcher::utils::paths::{
    platform_sentinel_path, remote_version_path, InstallLayout, MANIFEST_CHECKSUM_PATH,
    MANIFEST_PATH,
};
use ember_launcher::{
    ErrorKind, LauncherError, LauncherMode, ModeStateMachine, Platform, RemoteStore,
    SyncEvent, SyncMode, SyncOrchestrator, SyncOutcome, TriggerAction,
};

/// Minimal content server double: a path-to-bytes map.
#[derive(Default)]
struct FakeServer {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeServer {
    fn put(&self, path: &str, data: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), data.to_vec());
    }

    fn remove(&self, path: &str) {
        self.files.lock().unwrap().remove(path);
    }

    /// Publish a complete release: manifest, its checksum, the platform
    /// sentinel, a version marker, and the content files themselves.
    fn publish(&self, platform: Platform, version: &str, files: &[(&str, &[u8])]) {
        let mut body = String::new();
        for (path, data) in files {
            body.push_str(&format!("{path}\t{}\t{}\n", data.len(), hex_digest(data)));
            self.put(&format!("{}/{path}", platform.as_str()), data);
        }
        self.put(MANIFEST_PATH, body.as_bytes());
        self.put(MANIFEST_CHECKSUM_PATH, hex_digest(body.as_bytes()).as_bytes());
        self.put(&platform_sentinel_path(platform), b"");
        self.put(&remote_version_path(platform), version.as_bytes());
    }
}

fn hex_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[async_trait]
impl RemoteStore for FakeServer {
    async fn exists(&self, path: &str) -> ember_launcher::Result<bool> {
        Ok(self.files.lock().unwrap().contains_key(path))
    }

    async fn fetch(&self, path: &str) -> ember_launcher::Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| LauncherError::RemoteMissing(path.to_string()))
    }

    async fn open(&self, path: &str) -> ember_launcher::Result<ByteStream> {
        let data = self.fetch(path).await?;
        let chunks: Vec<ember_launcher::Result<Bytes>> = data
            .chunks(8)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        Ok(Box::pin(futures_util::stream::iter(chunks)))
    }
}

struct Harness {
    _dir: TempDir,
    layout: InstallLayout,
    server: Arc<FakeServer>,
    events: mpsc::Receiver<SyncEvent>,
    orchestrator: SyncOrchestrator,
}

fn harness(platform: Platform) -> Harness {
    let dir = TempDir::new().unwrap();
    let layout = InstallLayout::new(dir.path(), platform);
    let server = Arc::new(FakeServer::default());
    let (tx, rx) = mpsc::channel(1024);
    let orchestrator = SyncOrchestrator::new(server.clone(), layout.clone(), tx);
    Harness {
        _dir: dir,
        layout,
        server,
        events: rx,
        orchestrator,
    }
}

#[tokio::test]
async fn fresh_install_through_the_state_machine() {
    let mut hx = harness(Platform::Linux);
    hx.server.publish(
        Platform::Linux,
        "1.0.0",
        &[
            ("bin/ember", b"binary payload that spans chunks"),
            ("data/core.pak", b"core assets"),
            ("data/maps/arena.pak", b"arena"),
        ],
    );

    let mut machine = ModeStateMachine::new();
    machine.observe(&StatusSnapshot {
        remote_reachable: true,
        launcher_outdated: false,
        game_installed: false,
        game_version_current: false,
    });
    assert_eq!(machine.mode(), LauncherMode::Install);
    assert_eq!(
        machine.trigger(),
        Some(TriggerAction::Sync(SyncMode::Install))
    );

    let outcome = hx.orchestrator.run(SyncMode::Install).await;
    assert_eq!(outcome, SyncOutcome::Success);
    machine.on_outcome(&outcome);
    assert_eq!(machine.mode(), LauncherMode::Launch);

    // every manifest entry landed, verified, under the platform tree
    assert_eq!(
        std::fs::read(hx.layout.local_path("bin/ember")).unwrap(),
        b"binary payload that spans chunks"
    );
    assert_eq!(
        std::fs::read(hx.layout.local_path("data/maps/arena.pak")).unwrap(),
        b"arena"
    );
    assert_eq!(
        std::fs::read_to_string(hx.layout.version_file()).unwrap(),
        "1.0.0"
    );

    // progress never regresses within a file and the run closes with Finished
    let mut last_for_file: HashMap<String, u64> = HashMap::new();
    let mut finished = None;
    while let Ok(event) = hx.events.try_recv() {
        match event {
            SyncEvent::Progress(progress) => {
                let last = last_for_file
                    .entry(progress.current_file.clone())
                    .or_insert(0);
                assert!(progress.bytes_downloaded >= *last);
                assert!(progress.bytes_downloaded <= progress.total_bytes);
                *last = progress.bytes_downloaded;
            }
            SyncEvent::Finished(outcome) => finished = Some(outcome),
        }
    }
    assert_eq!(finished, Some(SyncOutcome::Success));
}

#[tokio::test]
async fn missing_platform_routes_back_to_install_mode() {
    let hx = harness(Platform::Mac);
    hx.server
        .publish(Platform::Mac, "1.0.0", &[("bin/ember", b"payload")]);
    hx.server.remove(&platform_sentinel_path(Platform::Mac));

    let mut machine = ModeStateMachine::new();
    machine.observe(&StatusSnapshot {
        remote_reachable: true,
        launcher_outdated: false,
        game_installed: true,
        game_version_current: false,
    });
    machine.trigger();

    let outcome = hx.orchestrator.run(SyncMode::Update).await;
    assert_eq!(
        outcome,
        SyncOutcome::Failed {
            kind: ErrorKind::PlatformNotProvided,
            entry: None
        }
    );
    machine.on_outcome(&outcome);
    assert_eq!(machine.mode(), LauncherMode::Install);
    assert!(!machine.in_progress());
}

#[tokio::test]
async fn update_after_release_bump_transfers_only_changes() {
    let hx = harness(Platform::Linux);
    hx.server.publish(
        Platform::Linux,
        "1.0.0",
        &[("bin/ember", b"v1 binary"), ("data/core.pak", b"assets")],
    );
    assert_eq!(
        hx.orchestrator.run(SyncMode::Install).await,
        SyncOutcome::Success
    );

    // new release changes the binary size, assets stay identical
    hx.server.publish(
        Platform::Linux,
        "1.1.0",
        &[
            ("bin/ember", b"v2 binary, longer"),
            ("data/core.pak", b"assets"),
        ],
    );

    let outcome = hx.orchestrator.run(SyncMode::Update).await;
    assert_eq!(outcome, SyncOutcome::Success);
    assert_eq!(
        std::fs::read(hx.layout.local_path("bin/ember")).unwrap(),
        b"v2 binary, longer"
    );
    assert_eq!(
        std::fs::read_to_string(hx.layout.version_file()).unwrap(),
        "1.1.0"
    );
}

#[tokio::test]
async fn repair_restores_same_size_corruption() {
    let hx = harness(Platform::Linux);
    hx.server
        .publish(Platform::Linux, "1.0.0", &[("data/core.pak", b"good")]);
    assert_eq!(
        hx.orchestrator.run(SyncMode::Install).await,
        SyncOutcome::Success
    );

    // flip bytes without changing the size; update must not notice
    std::fs::write(hx.layout.local_path("data/core.pak"), b"evil").unwrap();
    assert_eq!(
        hx.orchestrator.run(SyncMode::Update).await,
        SyncOutcome::Success
    );
    assert_eq!(
        std::fs::read(hx.layout.local_path("data/core.pak")).unwrap(),
        b"evil"
    );

    assert_eq!(
        hx.orchestrator.run(SyncMode::Repair).await,
        SyncOutcome::Success
    );
    assert_eq!(
        std::fs::read(hx.layout.local_path("data/core.pak")).unwrap(),
        b"good"
    );
}

#[tokio::test]
async fn rerunning_a_successful_install_is_idempotent() {
    let hx = harness(Platform::Win64);
    hx.server.publish(
        Platform::Win64,
        "2.0",
        &[("Ember.exe", b"pe header and friends")],
    );

    assert_eq!(
        hx.orchestrator.run(SyncMode::Install).await,
        SyncOutcome::Success
    );
    assert_eq!(
        hx.orchestrator.run(SyncMode::Repair).await,
        SyncOutcome::Success
    );
    assert_eq!(
        std::fs::read(hx.layout.local_path("Ember.exe")).unwrap(),
        b"pe header and friends"
    );
    // no stray temp files survive
    assert!(!hx.layout.temp_path("Ember.exe").exists());
}
