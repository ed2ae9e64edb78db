use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::{AppDirs, DB_FILE};
use crate::error::StorageError;
use crate::storage::{JsonFileStore, KeyValueStore, MemoryStore, SqliteStore};

/// Where progress is persisted
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Json,
    /// Nothing is written; progress lasts for this run only
    Memory,
}

impl StorageBackend {
    /// Open the medium for this backend. `state_dir` overrides the default
    /// location under `$HOME/.local/state`.
    pub fn open(&self, state_dir: Option<&Path>) -> Result<Box<dyn KeyValueStore>, StorageError> {
        let dir = state_dir
            .map(Path::to_path_buf)
            .or_else(AppDirs::state_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(match self {
            StorageBackend::Sqlite => Box::new(SqliteStore::open(dir.join(DB_FILE))?),
            StorageBackend::Json => Box::new(JsonFileStore::new(dir)),
            StorageBackend::Memory => Box::new(MemoryStore::new()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Custom reference table; the bundled chart when absent
    pub table_path: Option<PathBuf>,
    pub backend: StorageBackend,
    /// Ignore miss weights and draw hands uniformly
    pub uniform: bool,
    /// Show the current hand's weight on the quiz screen
    pub show_weights: bool,
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("handdrill_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("ignoring unreadable config {}: {e}", self.path.display()),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
