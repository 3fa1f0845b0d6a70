use crate::core::config::RaceConfig;
use crate::core::state::RaceState;
use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const KEY_CONFIG: &str = "race_config";
pub const KEY_STATE: &str = "race_state";

/// BlobStore is the persistence seam of the timing core: an opaque, synchronous
/// key-value store for serialized blobs. The core never interprets storage errors;
/// malformed entries are discarded wholesale by the typed loaders below.
pub trait BlobStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// FileStore keeps one JSON file per key under a store directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: &Path) -> FileStore {
        FileStore { dir: dir.to_path_buf() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl BlobStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.key_path(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir).context(format!(
            "Failed to create store directory {}!",
            self.dir.display()
        ))?;
        std::fs::write(self.key_path(key), value)
            .context(format!("Failed to write store entry {}!", key))?;
        Ok(())
    }
}

/// MemoryStore backs tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl BlobStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// load_config reads the configuration blob. A blob that fails to parse or fails the
/// shape check yields None; it is never repaired field by field.
pub fn load_config<S: BlobStore>(store: &S) -> Option<RaceConfig> {
    let raw = store.get(KEY_CONFIG)?;
    let config: RaceConfig = serde_json::from_str(&raw).ok()?;
    if config.check().is_err() {
        return None;
    }
    Some(config)
}

pub fn save_config<S: BlobStore>(store: &mut S, config: &RaceConfig) -> anyhow::Result<()> {
    let raw = serde_json::to_string(config).context("Failed to serialize the configuration!")?;
    store.set(KEY_CONFIG, &raw)
}

/// load_state reads the state blob. Besides parsing, the embedded configuration must
/// pass its shape check and the stint index must address the sequence; anything else is
/// discarded so the core restarts from the default state.
pub fn load_state<S: BlobStore>(store: &S) -> Option<RaceState> {
    let raw = store.get(KEY_STATE)?;
    let state: RaceState = serde_json::from_str(&raw).ok()?;
    if state.config.check().is_err() {
        return None;
    }
    if state.current_stint_index >= state.config.stint_sequence.len() {
        return None;
    }
    Some(state)
}

pub fn save_state<S: BlobStore>(store: &mut S, state: &RaceState) -> anyhow::Result<()> {
    let raw = serde_json::to_string(state).context("Failed to serialize the race state!")?;
    store.set(KEY_STATE, &raw)
}
