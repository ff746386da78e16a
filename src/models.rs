use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ErrorKind;

/// Target build variant of the game. Maps to a directory name under the
/// remote root and under the local `Game/` tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Win64,
    Win32,
    Linux,
    Mac,
    #[default]
    Invalid,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Win64 => "Win64",
            Platform::Win32 => "Win32",
            Platform::Linux => "Linux",
            Platform::Mac => "Mac",
            Platform::Invalid => "Invalid",
        }
    }

    pub fn parse(value: &str) -> Platform {
        match value.trim().to_ascii_lowercase().as_str() {
            "win64" => Platform::Win64,
            "win32" => Platform::Win32,
            "linux" => Platform::Linux,
            "mac" => Platform::Mac,
            _ => Platform::Invalid,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which synchronization policy a run uses. `Install` lays out every manifest
/// entry; `Update` and `Repair` diff against existing local state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Install,
    Update,
    Repair,
}

/// One record of the remote manifest: a file that must exist in a correct
/// installation, with its expected size and lowercase-hex SHA-256 digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub relative_path: String,
    pub expected_size: u64,
    pub expected_checksum: String,
}

/// Ordered list of manifest entries. Order is declaration order in the
/// remote resource and drives deterministic transfer ordering.
#[derive(Clone, Debug, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries
            .iter()
            .fold(0u64, |acc, entry| acc.saturating_add(entry.expected_size))
    }
}

/// Snapshot of one local file as observed under the installation root.
/// The checksum is computed lazily and only when requested; it must not be
/// reused across runs since the tree is mutated during download.
#[derive(Clone, Debug)]
pub struct LocalFileRecord {
    pub relative_path: String,
    pub exists: bool,
    pub size: u64,
    pub checksum: Option<String>,
}

/// Why an entry made it into the plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferReason {
    Missing,
    SizeMismatch,
    ChecksumMismatch,
}

#[derive(Clone, Debug)]
pub struct PlanItem {
    pub entry: ManifestEntry,
    pub reason: TransferReason,
}

/// Ordered queue of entries requiring transfer, in manifest order.
#[derive(Clone, Debug, Default)]
pub struct SyncPlan {
    pub items: Vec<PlanItem>,
}

impl SyncPlan {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |acc, item| acc.saturating_add(item.entry.expected_size))
    }
}

/// Outcome of one entry transfer, including how many attempts it took.
#[derive(Clone, Debug)]
pub struct TransferResult {
    pub entry: ManifestEntry,
    pub succeeded: bool,
    pub failure: Option<ErrorKind>,
    pub attempts: u32,
}

/// Byte-level progress crossing the worker boundary. Within a single file
/// transfer `bytes_downloaded` never decreases and never exceeds
/// `total_bytes`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub current_file: String,
    pub bytes_downloaded: u64,
    pub total_bytes: u64,
    pub files_completed: usize,
    pub files_total: usize,
}

/// Final result of a synchronization run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Success,
    Cancelled,
    Failed {
        kind: ErrorKind,
        entry: Option<String>,
    },
}

/// Messages the synchronization worker posts onto the bounded event channel.
/// The interactive side drains them on its own schedule.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEvent {
    Progress(ProgressEvent),
    Finished(SyncOutcome),
}
