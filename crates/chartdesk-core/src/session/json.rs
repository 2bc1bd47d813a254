use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chart::ColorScheme;
use crate::error::StoreError;

use super::{SessionRecord, SessionStore, StoreResult};

type SessionMap = BTreeMap<String, SessionRecord>;

/// File next to the session file that holds state shared by all sessions.
pub const MEMORY_FILE_NAME: &str = "persistent-memory.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistentMemory {
    #[serde(default)]
    color_scheme: Option<ColorScheme>,
}

/// All sessions in one pretty-printed JSON object keyed by session id.
///
/// Every operation reads the file and every mutation rewrites it through a
/// temporary file, so several processes may share the same file between
/// commands. The last color scheme lives in [`MEMORY_FILE_NAME`] in the same
/// directory.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    memory_path: PathBuf,
    io: Mutex<()>,
}

fn read_json<T: Default + DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&content)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let content = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl JsonFileStore {
    /// Open the store, creating an empty file (and its directory) if missing.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if !path.exists() {
            fs::write(&path, "{}")?;
        }
        let memory_path = path.with_file_name(MEMORY_FILE_NAME);
        Ok(Self {
            path,
            memory_path,
            io: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn memory_path(&self) -> &Path {
        &self.memory_path
    }

    fn load(&self) -> StoreResult<SessionMap> {
        read_json(&self.path)
    }

    fn save(&self, sessions: &SessionMap) -> StoreResult<()> {
        write_json(&self.path, sessions)?;
        debug!("Saved {} sessions to {:?}", sessions.len(), self.path);
        Ok(())
    }

    fn modify<R>(&self, f: impl FnOnce(&mut SessionMap) -> R) -> StoreResult<R> {
        let _io = self.io.lock().map_err(|_| StoreError::Poisoned)?;
        let mut sessions = self.load()?;
        let result = f(&mut sessions);
        self.save(&sessions)?;
        Ok(result)
    }
}

impl SessionStore for JsonFileStore {
    fn get(&self, session_id: &str) -> StoreResult<Option<SessionRecord>> {
        let _io = self.io.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.load()?.remove(session_id))
    }

    fn put(&self, record: SessionRecord) -> StoreResult<()> {
        self.modify(|sessions| {
            sessions.insert(record.session_id.clone(), record);
        })
    }

    fn delete(&self, session_id: &str) -> StoreResult<bool> {
        self.modify(|sessions| sessions.remove(session_id).is_some())
    }

    fn last_color_scheme(&self) -> StoreResult<Option<ColorScheme>> {
        let _io = self.io.lock().map_err(|_| StoreError::Poisoned)?;
        let memory: PersistentMemory = read_json(&self.memory_path)?;
        Ok(memory.color_scheme)
    }

    fn set_last_color_scheme(&self, scheme: ColorScheme) -> StoreResult<()> {
        let _io = self.io.lock().map_err(|_| StoreError::Poisoned)?;
        let mut memory: PersistentMemory = read_json(&self.memory_path)?;
        memory.color_scheme = Some(scheme);
        write_json(&self.memory_path, &memory)?;
        debug!("Remembered {} as last color scheme", scheme.as_str());
        Ok(())
    }
}
