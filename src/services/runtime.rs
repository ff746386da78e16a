//! Spawning the installed game executable.

use std::path::PathBuf;
use std::process::Command;

use crate::errors::{LauncherError, Result};
use crate::models::Platform;
use crate::utils::paths::InstallLayout;

pub struct GameRuntime {
    layout: InstallLayout,
}

impl GameRuntime {
    pub fn new(layout: InstallLayout) -> Self {
        Self { layout }
    }

    /// Resolved path of the game binary inside the installed tree.
    pub fn executable_path(&self, game_name: &str) -> PathBuf {
        let file_name = match self.layout.platform() {
            Platform::Win64 | Platform::Win32 => format!("{game_name}.exe"),
            _ => game_name.to_string(),
        };
        self.layout.game_dir().join(file_name)
    }

    /// Spawn the game detached, with the installed tree as working
    /// directory, and return its process id. The process is not awaited;
    /// callers only learn whether the spawn itself succeeded.
    pub fn launch(&self, game_name: &str) -> Result<u32> {
        let executable = self.executable_path(game_name);
        if !executable.is_file() {
            return Err(LauncherError::Launch(format!(
                "game executable not found at {}",
                executable.display()
            )));
        }

        let child = Command::new(&executable)
            .current_dir(self.layout.game_dir())
            .spawn()
            .map_err(|err| {
                LauncherError::Launch(format!(
                    "failed to start {}: {err}",
                    executable.display()
                ))
            })?;

        let pid = child.id();
        tracing::info!("launched {} (pid {pid})", executable.display());
        Ok(pid)
    }
}
