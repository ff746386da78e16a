//! Persisted launcher settings.
//!
//! One JSON file, three logical sections. Each section sits behind its own
//! `RwLock` so readers in different collaborators never contend with each
//! other; a single write mutex serializes the save path so no reader can
//! observe a half-written file. The store is passed by reference into every
//! collaborator that needs it; there is no global instance.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LauncherError, Result};
use crate::models::Platform;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalSection {
    pub platform: Platform,
    pub install_root: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteSection {
    pub endpoint_url: String,
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchpadSection {
    pub game_name: String,
    pub guid: String,
    pub ping_url: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SettingsFile {
    local: LocalSection,
    remote: RemoteSection,
    launchpad: LaunchpadSection,
}

pub struct ConfigStore {
    path: PathBuf,
    local: RwLock<LocalSection>,
    remote: RwLock<RemoteSection>,
    launchpad: RwLock<LaunchpadSection>,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    /// Load settings from `config_dir/settings.json`, creating defaults
    /// (including a fresh GUID) when the file does not exist yet.
    pub fn load(config_dir: &Path) -> Result<Self> {
        fs::create_dir_all(config_dir)?;
        let path = config_dir.join(SETTINGS_FILE);

        let mut settings = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str::<SettingsFile>(&raw)
                .map_err(|err| LauncherError::Config(format!("invalid settings file: {err}")))?
        } else {
            SettingsFile::default()
        };

        let mut dirty = false;
        if settings.launchpad.guid.trim().is_empty() {
            settings.launchpad.guid = Uuid::new_v4().to_string();
            dirty = true;
        }

        let store = Self {
            path,
            local: RwLock::new(settings.local),
            remote: RwLock::new(settings.remote),
            launchpad: RwLock::new(settings.launchpad),
            write_lock: Mutex::new(()),
        };
        if dirty {
            store.save()?;
        }
        Ok(store)
    }

    pub fn local(&self) -> LocalSection {
        self.read(&self.local)
    }

    pub fn remote(&self) -> RemoteSection {
        self.read(&self.remote)
    }

    pub fn launchpad(&self) -> LaunchpadSection {
        self.read(&self.launchpad)
    }

    pub fn endpoint_url(&self) -> String {
        self.read(&self.remote).endpoint_url
    }

    pub fn platform(&self) -> Platform {
        self.read(&self.local).platform
    }

    pub fn game_name(&self) -> String {
        self.read(&self.launchpad).game_name
    }

    pub fn guid(&self) -> String {
        self.read(&self.launchpad).guid
    }

    pub fn set_local(&self, section: LocalSection) -> Result<()> {
        self.write(&self.local, section);
        self.save()
    }

    pub fn set_remote(&self, section: RemoteSection) -> Result<()> {
        self.write(&self.remote, section);
        self.save()
    }

    pub fn set_launchpad(&self, section: LaunchpadSection) -> Result<()> {
        self.write(&self.launchpad, section);
        self.save()
    }

    fn read<T: Clone>(&self, lock: &RwLock<T>) -> T {
        match lock.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn write<T>(&self, lock: &RwLock<T>, value: T) {
        match lock.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }

    fn save(&self) -> Result<()> {
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let snapshot = SettingsFile {
            local: self.read(&self.local),
            remote: self.read(&self.remote),
            launchpad: self.read(&self.launchpad),
        };
        let payload = serde_json::to_vec_pretty(&snapshot)?;

        // temp + rename so a crashed save never leaves a torn file behind
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}
