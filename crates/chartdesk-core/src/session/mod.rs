//! Session persistence
//!
//! A session is a style preference plus the conversation so far. Stores only
//! need to load, replace and delete whole records; the bookkeeping operations
//! are provided on top of those. Callers that mutate a session concurrently
//! serialize through [`SessionLocks`].

mod json;
mod memory;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;

use crate::chart::ColorScheme;
use crate::error::StoreError;
use crate::state::ConversationTurn;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    #[serde(default)]
    pub style: ColorScheme,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    #[serde(default)]
    pub chat_history: Vec<ConversationTurn>,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>, style: ColorScheme) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            style,
            created_at: now,
            last_used: now,
            chat_history: Vec::new(),
        }
    }

    pub fn touch(&mut self) {
        self.last_used = Utc::now();
    }
}

pub trait SessionStore: Send + Sync {
    fn get(&self, session_id: &str) -> StoreResult<Option<SessionRecord>>;

    /// Insert or replace the record stored under `record.session_id`.
    fn put(&self, record: SessionRecord) -> StoreResult<()>;

    /// Returns whether a record was removed.
    fn delete(&self, session_id: &str) -> StoreResult<bool>;

    /// Most recent explicitly requested color scheme across all sessions.
    fn last_color_scheme(&self) -> StoreResult<Option<ColorScheme>>;

    fn set_last_color_scheme(&self, scheme: ColorScheme) -> StoreResult<()>;

    fn history(&self, session_id: &str) -> StoreResult<Vec<ConversationTurn>> {
        Ok(self
            .get(session_id)?
            .map(|record| record.chat_history)
            .unwrap_or_default())
    }

    /// Append a turn, creating the session with the default style if needed.
    fn append(&self, session_id: &str, turn: ConversationTurn) -> StoreResult<()> {
        let mut record = self
            .get(session_id)?
            .unwrap_or_else(|| SessionRecord::new(session_id, ColorScheme::default()));
        record.chat_history.push(turn);
        record.touch();
        self.put(record)
    }

    fn clear_history(&self, session_id: &str) -> StoreResult<()> {
        if let Some(mut record) = self.get(session_id)? {
            record.chat_history.clear();
            self.put(record)?;
        }
        Ok(())
    }

    fn get_style(&self, session_id: &str) -> StoreResult<ColorScheme> {
        Ok(self
            .get(session_id)?
            .map(|record| record.style)
            .unwrap_or_default())
    }

    fn set_style(&self, session_id: &str, style: ColorScheme) -> StoreResult<SessionRecord> {
        let record = match self.get(session_id)? {
            Some(mut record) => {
                record.style = style;
                record.touch();
                record
            }
            None => SessionRecord::new(session_id, style),
        };
        self.put(record.clone())?;
        Ok(record)
    }

    /// No-op for unknown sessions.
    fn update_last_used(&self, session_id: &str) -> StoreResult<()> {
        if let Some(mut record) = self.get(session_id)? {
            record.touch();
            self.put(record)?;
        }
        Ok(())
    }
}

/// One async mutex per session id.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, session_id: &str) -> StoreResult<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| StoreError::Poisoned)?;
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        Ok(lock.lock_owned().await)
    }

    /// Drop the lock entry for a deleted session.
    pub fn forget(&self, session_id: &str) -> StoreResult<()> {
        let mut locks = self.locks.lock().map_err(|_| StoreError::Poisoned)?;
        locks.remove(session_id);
        Ok(())
    }
}
