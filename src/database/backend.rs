//! Storage backends for the bot state document.
//!
//! A backend loads and saves the whole [`BotState`] at once. Serialization
//! of concurrent callers is the job of [`ChatStore`](super::ChatStore).

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use super::models::{BotState, ChatSetting};

pub const SETTINGS_FILE: &str = "chat_settings.json";
pub const BLACKLIST_FILE: &str = "blacklist.json";

const MAX_BAK_FILES: u32 = 3;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt state in {}: {source}", path.display())]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Whole-document load/save.
pub trait StateBackend: Send + Sync {
    fn load(&self) -> Result<BotState, StoreError>;

    fn save(&self, state: &BotState) -> Result<(), StoreError>;

    /// Move unreadable data out of the way so the next load starts empty.
    fn quarantine(&self) -> Result<(), StoreError>;

    fn describe(&self) -> String;
}

/// Two JSON files in a data directory: settings object and blacklist array.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    settings_path: PathBuf,
    blacklist_path: PathBuf,
}

impl JsonFileBackend {
    /// Use `dir`, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        Ok(Self {
            settings_path: dir.join(SETTINGS_FILE),
            blacklist_path: dir.join(BLACKLIST_FILE),
        })
    }

    /// Files whose contents do not match their schema.
    fn corrupt_files(&self) -> Vec<&Path> {
        let mut corrupt = Vec::new();
        if is_corrupt::<BTreeMap<String, ChatSetting>>(&self.settings_path) {
            corrupt.push(self.settings_path.as_path());
        }
        if is_corrupt::<BTreeSet<String>>(&self.blacklist_path) {
            corrupt.push(self.blacklist_path.as_path());
        }
        corrupt
    }
}

impl StateBackend for JsonFileBackend {
    fn load(&self) -> Result<BotState, StoreError> {
        let chats: BTreeMap<String, ChatSetting> = read_json(&self.settings_path)?;
        let blacklist: BTreeSet<String> = read_json(&self.blacklist_path)?;
        Ok(BotState { chats, blacklist })
    }

    fn save(&self, state: &BotState) -> Result<(), StoreError> {
        write_json(&self.settings_path, &state.chats)?;
        write_json(&self.blacklist_path, &state.blacklist)?;
        debug!(
            "Saved {} chat settings, {} blacklisted chats",
            state.chats.len(),
            state.blacklist.len()
        );
        Ok(())
    }

    fn quarantine(&self) -> Result<(), StoreError> {
        for path in self.corrupt_files() {
            let bak = rotate_bak_path(path);
            fs::rename(path, &bak).map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            warn!("Moved corrupt {} to {}", path.display(), bak.display());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "json files {} + {}",
            self.settings_path.display(),
            self.blacklist_path.display()
        )
    }
}

/// Missing file reads as the empty document.
fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_slice(&bytes).map_err(|source| StoreError::CorruptState {
        path: path.to_path_buf(),
        source,
    })
}

fn is_corrupt<T: DeserializeOwned + Default>(path: &Path) -> bool {
    matches!(read_json::<T>(path), Err(StoreError::CorruptState { .. }))
}

/// Write to a sibling temp file, then rename over the target.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");

    let io_err = |source: io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = fs::File::create(&tmp).map_err(io_err)?;
    file.write_all(&bytes).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

/// Process-memory backend. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<BotState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self) -> Result<BotState, StoreError> {
        Ok(self.state.lock().clone())
    }

    fn save(&self, state: &BotState) -> Result<(), StoreError> {
        *self.state.lock() = state.clone();
        Ok(())
    }

    fn quarantine(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
