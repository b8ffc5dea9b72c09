//! Safety keywords: the in-memory store and the substring matcher.
//!
//! The matcher is intentionally naive — case-insensitive substring, no word
//! boundaries ("helping" matches "help"), no stemming. The safety UI depends
//! on that literal behavior.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Keywords seeded into every freshly constructed store, all active.
pub const DEFAULT_KEYWORDS: [&str; 4] = ["help", "emergency", "danger", "unsafe"];

/// One safety keyword. Text keeps the casing it was entered with; lowercase
/// comparison happens only at match time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyKeyword {
    pub id: Uuid,
    pub keyword: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for adding a keyword.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSafetyKeyword {
    pub keyword: String,
}

/// In-memory keyword store. Keywords are created active, mutated only via the
/// active flag, and never deleted. Duplicate text is permitted.
pub struct KeywordStore {
    keywords: DashMap<Uuid, SafetyKeyword>,
}

impl KeywordStore {
    /// Store seeded with [`DEFAULT_KEYWORDS`].
    pub fn new() -> Self {
        let store = Self::empty();
        for word in DEFAULT_KEYWORDS {
            let id = Uuid::new_v4();
            store.keywords.insert(
                id,
                SafetyKeyword {
                    id,
                    keyword: word.to_string(),
                    is_active: true,
                    created_at: Utc::now(),
                },
            );
        }
        store
    }

    /// Unseeded store, for callers that manage their own keyword set.
    pub fn empty() -> Self {
        Self {
            keywords: DashMap::new(),
        }
    }

    /// All keywords, newest first (management listing order).
    pub fn list(&self) -> Vec<SafetyKeyword> {
        let mut all: Vec<SafetyKeyword> = self.keywords.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    /// Text of every active keyword, in insertion order. This is the snapshot
    /// the chat pipeline reads once per request.
    pub fn list_active(&self) -> Vec<String> {
        let mut active: Vec<SafetyKeyword> = self
            .keywords
            .iter()
            .filter(|e| e.value().is_active)
            .map(|e| e.value().clone())
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        active.into_iter().map(|k| k.keyword).collect()
    }

    /// Add a keyword, active by default. Text must be non-empty after trimming;
    /// duplicates of existing text are allowed.
    pub fn add(&self, keyword: &str) -> CoreResult<SafetyKeyword> {
        if keyword.trim().is_empty() {
            return Err(CoreError::Validation("keyword must not be empty".to_string()));
        }
        let id = Uuid::new_v4();
        let record = SafetyKeyword {
            id,
            keyword: keyword.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.keywords.insert(id, record.clone());
        Ok(record)
    }

    /// Flip the active flag on an existing keyword.
    pub fn set_active(&self, id: Uuid, is_active: bool) -> CoreResult<SafetyKeyword> {
        match self.keywords.get_mut(&id) {
            Some(mut entry) => {
                entry.is_active = is_active;
                Ok(entry.clone())
            }
            None => Err(CoreError::NotFound(format!("keyword {}", id))),
        }
    }

    /// Number of stored keywords (active or not).
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    /// True when the store holds no keywords.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

impl Default for KeywordStore {
    fn default() -> Self {
        Self::new()
    }
}

/// True iff any keyword is a case-insensitive substring of the message.
/// Pure and non-mutating; an empty keyword list never matches.
pub fn message_matches(message: &str, keywords: &[String]) -> bool {
    let lower = message.to_lowercase();
    keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
}
