//! Append-only conversation log.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One chat turn: the user's message, the generated response, and the alert
/// flag computed once at creation. Entries are never updated after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntry {
    pub id: Uuid,
    pub user_message: String,
    pub ai_response: String,
    pub is_safety_alert: bool,
    pub created_at: DateTime<Utc>,
}

/// In-memory conversation log. The log exclusively owns its entries; readers
/// get cloned snapshots, so a listing taken before an append does not change.
pub struct ConversationLog {
    entries: DashMap<Uuid, ConversationEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Record a completed chat turn. Always succeeds; assigns id and timestamp.
    pub fn append(&self, user_message: &str, ai_response: &str, is_safety_alert: bool) -> ConversationEntry {
        let id = Uuid::new_v4();
        let entry = ConversationEntry {
            id,
            user_message: user_message.to_string(),
            ai_response: ai_response.to_string(),
            is_safety_alert,
            created_at: Utc::now(),
        };
        self.entries.insert(id, entry.clone());
        entry
    }

    /// All entries, ascending by creation time (display order).
    pub fn list(&self) -> Vec<ConversationEntry> {
        let mut all: Vec<ConversationEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        all
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new()
    }
}
