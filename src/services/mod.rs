pub mod downloader;
pub mod inventory;
pub mod manifest_service;
pub mod orchestrator;
pub mod planner;
pub mod runtime;
pub mod state_machine;
pub mod status;
pub mod telemetry;
pub mod verifier;

pub use downloader::Downloader;
pub use inventory::LocalInventory;
pub use manifest_service::ManifestService;
pub use orchestrator::SyncOrchestrator;
pub use planner::DiffPlanner;
pub use runtime::GameRuntime;
pub use state_machine::{LauncherMode, ModeStateMachine, StatusSnapshot, TriggerAction};
pub use status::StatusProbe;
pub use telemetry::UsagePing;
pub use verifier::Verifier;
