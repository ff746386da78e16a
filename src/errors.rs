use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::models::Platform;

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Remote resource missing: {0}")]
    RemoteMissing(String),
    #[error("Manifest corrupt: {0}")]
    ManifestCorrupt(String),
    #[error("Manifest parse error: {0}")]
    ManifestParse(String),
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("No build provided for platform {0:?}")]
    PlatformNotProvided(Platform),
    #[error("Local write failure: {0}")]
    LocalWrite(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Launch failed: {0}")]
    Launch(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Operation cancelled")]
    Cancelled,
}

/// Failure classification surfaced to the mode state machine and the UI
/// collaborator. `Network` is retryable, `ChecksumMismatch` is retryable
/// per entry up to the attempt ceiling, everything else aborts the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    ManifestCorrupt,
    ManifestParse,
    ChecksumMismatch,
    PlatformNotProvided,
    LocalWriteFailure,
    Launch,
    Config,
    Cancelled,
}

impl ErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::ChecksumMismatch)
    }
}

impl LauncherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LauncherError::Network(_) | LauncherError::Http(_) => ErrorKind::Network,
            LauncherError::RemoteMissing(_) | LauncherError::PlatformNotProvided(_) => {
                ErrorKind::PlatformNotProvided
            }
            LauncherError::ManifestCorrupt(_) => ErrorKind::ManifestCorrupt,
            LauncherError::ManifestParse(_) => ErrorKind::ManifestParse,
            LauncherError::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            LauncherError::LocalWrite(_) => ErrorKind::LocalWriteFailure,
            LauncherError::Serde(_) | LauncherError::Config(_) => ErrorKind::Config,
            LauncherError::Launch(_) => ErrorKind::Launch,
            LauncherError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

pub type Result<T> = std::result::Result<T, LauncherError>;
