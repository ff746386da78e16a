//! The user-facing mode state machine behind the primary action control.
//!
//! Pure state: external signals arrive through [`StatusSnapshot`] and run
//! outcomes through [`on_outcome`](ModeStateMachine::on_outcome); the machine
//! itself never touches the network or disk. `in_progress` is the mutual
//! exclusion mechanism guaranteeing at most one synchronization run in
//! flight: triggers are rejected while it is set.

use crate::errors::ErrorKind;
use crate::models::{SyncMode, SyncOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LauncherMode {
    Invalid,
    Install,
    Update,
    Repair,
    Launch,
}

/// External signals the machine transitions on. Built by the status probe,
/// or by tests directly.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatusSnapshot {
    pub remote_reachable: bool,
    pub launcher_outdated: bool,
    pub game_installed: bool,
    pub game_version_current: bool,
}

/// What a trigger of the primary action should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerAction {
    Sync(SyncMode),
    Launch,
}

#[derive(Debug)]
pub struct ModeStateMachine {
    mode: LauncherMode,
    in_progress: bool,
    last_failure: Option<ErrorKind>,
}

impl Default for ModeStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeStateMachine {
    pub fn new() -> Self {
        Self {
            mode: LauncherMode::Invalid,
            in_progress: false,
            last_failure: None,
        }
    }

    pub fn mode(&self) -> LauncherMode {
        self.mode
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Classification of the last failed run, for the UI to render a
    /// mode-specific retry affordance.
    pub fn last_failure(&self) -> Option<ErrorKind> {
        self.last_failure
    }

    /// Apply an observed status. Ignored while a run is in flight; the
    /// pending outcome decides the next mode then. Self-update outranks
    /// game synchronization.
    pub fn observe(&mut self, status: &StatusSnapshot) {
        if self.in_progress {
            return;
        }
        self.mode = if !status.remote_reachable {
            LauncherMode::Invalid
        } else if status.launcher_outdated {
            LauncherMode::Update
        } else if !status.game_installed {
            LauncherMode::Install
        } else if !status.game_version_current {
            LauncherMode::Update
        } else {
            LauncherMode::Launch
        };
    }

    /// The user pressed the primary action. Returns what to run, or `None`
    /// when the trigger is rejected (run already in flight, or no mode
    /// decided yet).
    pub fn trigger(&mut self) -> Option<TriggerAction> {
        if self.in_progress {
            return None;
        }
        match self.mode {
            LauncherMode::Invalid => None,
            LauncherMode::Install => {
                self.in_progress = true;
                Some(TriggerAction::Sync(SyncMode::Install))
            }
            LauncherMode::Update => {
                self.in_progress = true;
                Some(TriggerAction::Sync(SyncMode::Update))
            }
            LauncherMode::Repair => {
                self.in_progress = true;
                Some(TriggerAction::Sync(SyncMode::Repair))
            }
            LauncherMode::Launch => Some(TriggerAction::Launch),
        }
    }

    /// A synchronization run finished.
    pub fn on_outcome(&mut self, outcome: &SyncOutcome) {
        self.in_progress = false;
        match outcome {
            SyncOutcome::Success => {
                self.last_failure = None;
                self.mode = LauncherMode::Launch;
            }
            SyncOutcome::Cancelled => {
                // recoverable: mode stays selectable, no deadlock
                self.last_failure = Some(ErrorKind::Cancelled);
            }
            SyncOutcome::Failed { kind, .. } => {
                self.last_failure = Some(*kind);
                if *kind == ErrorKind::PlatformNotProvided {
                    self.mode = LauncherMode::Install;
                }
            }
        }
    }

    /// The external process-launch collaborator reported back.
    pub fn on_launch_result(&mut self, launched: bool) {
        if launched {
            self.last_failure = None;
        } else {
            self.last_failure = Some(ErrorKind::Launch);
            self.mode = LauncherMode::Repair;
        }
    }
}
