//! Conversation state types
//!
//! These are shared between the classification engine, the session store and
//! any front end. They don't depend on storage or transport details.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chart::ChartType;

/// One turn in a chart conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TurnMetadata>,
}

/// The role of a turn's author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    System,
}

/// Structured data attached to a turn.
///
/// Assistant turns that produced a chart carry `Chart`; spreadsheet uploads
/// are recorded on the user side as `FileUpload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnMetadata {
    Chart(ChartMetadata),
    FileUpload { filename: String, file_size: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartMetadata {
    pub chart_id: String,
    pub chart_type: ChartType,
    pub x_labels: Vec<String>,
    pub y_values: Vec<f64>,
    #[serde(default)]
    pub title: Option<String>,
    /// Where the data came from, e.g. `chat` or `spreadsheet_auto_detect`.
    #[serde(default)]
    pub source: Option<String>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content, None)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content, None)
    }

    pub fn new(role: TurnRole, content: impl Into<String>, metadata: Option<TurnMetadata>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata,
        }
    }

    pub fn with_metadata(mut self, metadata: TurnMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Chart data recorded on this turn, if any.
    pub fn chart_data(&self) -> Option<(&[String], &[f64])> {
        match &self.metadata {
            Some(TurnMetadata::Chart(chart)) => Some((&chart.x_labels, &chart.y_values)),
            _ => None,
        }
    }
}

/// The last `window` turns of `history`.
pub fn recent_turns(history: &[ConversationTurn], window: usize) -> &[ConversationTurn] {
    let start = history.len().saturating_sub(window);
    &history[start..]
}
