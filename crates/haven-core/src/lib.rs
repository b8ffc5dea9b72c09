//! haven-core: wellness & safety companion core (records, in-memory stores,
//! safety-keyword matcher, completion bridge, and the chat pipeline).
//!
//! The gateway composes these once at startup and shares them via Arc; no
//! module-level singletons, so tests construct isolated stores per case.

mod config;
mod conversation;
mod error;
mod keyword;
mod pipeline;
mod responder;
mod tracker;

pub use config::CoreConfig;

pub use error::{CoreError, CoreResult};

pub use keyword::{message_matches, KeywordStore, NewSafetyKeyword, SafetyKeyword, DEFAULT_KEYWORDS};

pub use conversation::{ConversationEntry, ConversationLog};

pub use responder::{CompletionBridge, LlmMode, Responder};

pub use pipeline::ChatPipeline;

pub use tracker::{
    CycleEntry, EmergencyContact, MoodEntry, NewCycleEntry, NewEmergencyContact, NewMoodEntry,
    NewVoiceSettings, NewWellnessMetric, TrackerStore, VoiceSettings, WellnessMetric,
};
