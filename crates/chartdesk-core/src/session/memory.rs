use std::collections::HashMap;
use std::sync::Mutex;

use crate::chart::ColorScheme;
use crate::error::StoreError;

use super::{SessionRecord, SessionStore, StoreResult};

/// Non-persistent store for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    last_scheme: Mutex<Option<ColorScheme>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, session_id: &str) -> StoreResult<Option<SessionRecord>> {
        let sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(sessions.get(session_id).cloned())
    }

    fn put(&self, record: SessionRecord) -> StoreResult<()> {
        let mut sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        sessions.insert(record.session_id.clone(), record);
        Ok(())
    }

    fn delete(&self, session_id: &str) -> StoreResult<bool> {
        let mut sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(sessions.remove(session_id).is_some())
    }

    fn last_color_scheme(&self) -> StoreResult<Option<ColorScheme>> {
        let last = self.last_scheme.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(*last)
    }

    fn set_last_color_scheme(&self, scheme: ColorScheme) -> StoreResult<()> {
        let mut last = self.last_scheme.lock().map_err(|_| StoreError::Poisoned)?;
        *last = Some(scheme);
        Ok(())
    }
}
