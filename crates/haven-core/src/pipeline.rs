//! Chat pipeline: one request, one sequential flow.
//!
//! receive -> keyword check -> completion -> append -> return entry.
//!
//! The active-keyword read is a single snapshot taken once per request;
//! concurrent toggles are not re-checked. A failed request writes nothing:
//! the log only sees turns that completed (at-most-once append).

use std::sync::Arc;

use crate::conversation::{ConversationEntry, ConversationLog};
use crate::error::{CoreError, CoreResult};
use crate::keyword::{message_matches, KeywordStore};
use crate::responder::Responder;

/// Orchestrates a chat turn across the keyword store, the completion bridge,
/// and the conversation log. Composition is by explicit call; none of the
/// collaborators holds a reference back to the pipeline.
pub struct ChatPipeline {
    keywords: Arc<KeywordStore>,
    log: Arc<ConversationLog>,
    responder: Arc<dyn Responder>,
}

impl ChatPipeline {
    pub fn new(keywords: Arc<KeywordStore>, log: Arc<ConversationLog>, responder: Arc<dyn Responder>) -> Self {
        Self {
            keywords,
            log,
            responder,
        }
    }

    /// Run one chat turn. Returns the persisted entry, or the first error hit;
    /// on error nothing is logged and no alert is recorded.
    pub async fn submit(&self, message: &str) -> CoreResult<ConversationEntry> {
        if message.is_empty() {
            return Err(CoreError::Validation("message must not be empty".to_string()));
        }
        tracing::info!(target: "haven::chat", chars = message.len(), "Chat request received");

        // Snapshot of active keywords, held for the remainder of this request.
        let active = self.keywords.list_active();
        let is_safety_alert = message_matches(message, &active);
        if is_safety_alert {
            tracing::warn!(target: "haven::chat", "Safety keyword detected in message");
        }

        let ai_response = self.responder.complete(message).await.map_err(|e| {
            tracing::warn!(target: "haven::chat", error = %e, "Completion failed; nothing logged");
            e
        })?;

        Ok(self.log.append(message, &ai_response, is_safety_alert))
    }
}
