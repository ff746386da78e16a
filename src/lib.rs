//! Manifest-driven installation and update engine for the Ember launcher.
//!
//! The remote side publishes a flat content manifest plus per-platform game
//! trees; this crate keeps a local installation in sync with it (install,
//! update, repair), verifies every transferred byte against the manifest
//! digest, and drives the launcher's mode state machine through to launching
//! the game itself.

pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod remote;
pub mod services;
pub mod utils;

pub use config::ConfigStore;
pub use errors::{ErrorKind, LauncherError, Result};
pub use models::{
    Manifest, ManifestEntry, Platform, ProgressEvent, SyncEvent, SyncMode, SyncOutcome, SyncPlan,
};
pub use remote::{HttpRemoteStore, RemoteStore};
pub use services::{
    GameRuntime, LauncherMode, ModeStateMachine, StatusProbe, StatusSnapshot, SyncOrchestrator,
    TriggerAction, UsagePing,
};
