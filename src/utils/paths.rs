//! Remote and local layout.
//!
//! Remote, under the configured endpoint root:
//! `manifest.txt`, `manifest.txt.sha256`, `launcher_version.txt`, then per
//! platform `<platform>/.build_available`, `<platform>/version.txt` and
//! `<platform>/<relative_path>` for every manifest entry.
//!
//! Local, under the installation root: `Game/<platform>/...` mirroring
//! manifest paths, plus zero-byte in-progress markers at the root.

use std::path::{Path, PathBuf};

use crate::models::Platform;

pub const MANIFEST_PATH: &str = "manifest.txt";
pub const MANIFEST_CHECKSUM_PATH: &str = "manifest.txt.sha256";
pub const LAUNCHER_VERSION_PATH: &str = "launcher_version.txt";
pub const PLATFORM_SENTINEL: &str = ".build_available";
pub const VERSION_FILE: &str = "version.txt";
pub const INSTALL_MARKER: &str = ".install_in_progress";
pub const UPDATE_MARKER: &str = ".update_in_progress";

/// Normalize a manifest path to forward slashes without a leading separator.
pub fn normalize_relative_path(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_string()
}

/// Reject paths that could escape the install root.
pub fn is_safe_relative_path(path: &Path) -> bool {
    use std::path::Component;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => return false,
            _ => {}
        }
    }
    true
}

pub fn remote_file_path(platform: Platform, relative_path: &str) -> String {
    format!(
        "{}/{}",
        platform.as_str(),
        normalize_relative_path(relative_path)
    )
}

pub fn platform_sentinel_path(platform: Platform) -> String {
    format!("{}/{}", platform.as_str(), PLATFORM_SENTINEL)
}

pub fn remote_version_path(platform: Platform) -> String {
    format!("{}/{}", platform.as_str(), VERSION_FILE)
}

/// Where the installation lives on disk for one platform.
#[derive(Clone, Debug)]
pub struct InstallLayout {
    root: PathBuf,
    platform: Platform,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            root: root.into(),
            platform,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn game_dir(&self) -> PathBuf {
        self.root.join("Game").join(self.platform.as_str())
    }

    pub fn local_path(&self, relative_path: &str) -> PathBuf {
        self.game_dir().join(normalize_relative_path(relative_path))
    }

    /// Temporary location a transfer streams into before verification.
    pub fn temp_path(&self, relative_path: &str) -> PathBuf {
        let final_path = self.local_path(relative_path);
        let name = final_path
            .file_name()
            .map(|value| value.to_string_lossy().to_string())
            .unwrap_or_else(|| "download".to_string());
        final_path.with_file_name(format!("{name}.part"))
    }

    pub fn version_file(&self) -> PathBuf {
        self.game_dir().join(VERSION_FILE)
    }

    pub fn marker_path(&self, mode: crate::models::SyncMode) -> PathBuf {
        let name = match mode {
            crate::models::SyncMode::Install => INSTALL_MARKER,
            _ => UPDATE_MARKER,
        };
        self.root.join(name)
    }
}
