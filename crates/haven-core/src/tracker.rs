//! Wellness tracking record stores: emergency contacts, cycle tracking, mood
//! entries, wellness metrics, and the voice profile.
//!
//! Simple in-memory CRUD with no derived logic beyond field validation. Each
//! listing sorts the way the companion UI displays it (newest first).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

// -----------------------------------------------------------------------------
// Emergency contacts
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub relationship: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmergencyContact {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub relationship: String,
}

// -----------------------------------------------------------------------------
// Cycle tracking
// -----------------------------------------------------------------------------

fn default_cycle_length() -> i32 {
    28
}

fn default_period_length() -> i32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleEntry {
    pub id: Uuid,
    pub start_date: DateTime<Utc>,
    /// Days from one period start to the next.
    pub cycle_length: i32,
    /// Days of bleeding.
    pub period_length: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCycleEntry {
    pub start_date: DateTime<Utc>,
    #[serde(default = "default_cycle_length")]
    pub cycle_length: i32,
    #[serde(default = "default_period_length")]
    pub period_length: i32,
}

// -----------------------------------------------------------------------------
// Mood entries
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub id: Uuid,
    /// e.g. happy, calm, anxious, sad, energetic, stressed.
    pub mood: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMoodEntry {
    pub mood: String,
    #[serde(default)]
    pub notes: Option<String>,
}

// -----------------------------------------------------------------------------
// Wellness metrics
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessMetric {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    /// In ml.
    pub water_intake: i32,
    /// In hours.
    #[serde(default)]
    pub sleep_hours: Option<i32>,
    /// In minutes.
    #[serde(default)]
    pub exercise_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWellnessMetric {
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub water_intake: i32,
    #[serde(default)]
    pub sleep_hours: Option<i32>,
    #[serde(default)]
    pub exercise_minutes: Option<i32>,
}

// -----------------------------------------------------------------------------
// Voice settings
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSettings {
    /// "default" until the first upsert assigns a real id.
    pub id: String,
    pub voice_name: String,
    /// 0-20, divided by 10 by the speech client.
    pub pitch: i32,
    /// 0-20, divided by 10 by the speech client.
    pub rate: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVoiceSettings {
    pub voice_name: String,
    pub pitch: i32,
    pub rate: i32,
}

impl VoiceSettings {
    /// Profile returned before any upsert has happened.
    pub fn default_profile() -> Self {
        Self {
            id: "default".to_string(),
            voice_name: "Google US English Female".to_string(),
            pitch: 10,
            rate: 10,
            updated_at: Utc::now(),
        }
    }
}

// -----------------------------------------------------------------------------
// Store
// -----------------------------------------------------------------------------

/// In-memory store for the wellness tracking resources. One instance per
/// process, constructed at startup and shared via Arc.
pub struct TrackerStore {
    contacts: DashMap<Uuid, EmergencyContact>,
    cycles: DashMap<Uuid, CycleEntry>,
    moods: DashMap<Uuid, MoodEntry>,
    metrics: DashMap<Uuid, WellnessMetric>,
    voice: RwLock<Option<VoiceSettings>>,
}

impl TrackerStore {
    pub fn new() -> Self {
        Self {
            contacts: DashMap::new(),
            cycles: DashMap::new(),
            moods: DashMap::new(),
            metrics: DashMap::new(),
            voice: RwLock::new(None),
        }
    }

    // --- emergency contacts ---

    /// All contacts, newest first.
    pub fn list_contacts(&self) -> Vec<EmergencyContact> {
        let mut all: Vec<EmergencyContact> = self.contacts.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    pub fn create_contact(&self, new: NewEmergencyContact) -> CoreResult<EmergencyContact> {
        validate_contact(&new)?;
        let id = Uuid::new_v4();
        let contact = EmergencyContact {
            id,
            name: new.name,
            phone: new.phone,
            relationship: new.relationship,
            created_at: Utc::now(),
        };
        self.contacts.insert(id, contact.clone());
        Ok(contact)
    }

    /// Replace a contact's fields; the original `created_at` is kept.
    pub fn update_contact(&self, id: Uuid, new: NewEmergencyContact) -> CoreResult<EmergencyContact> {
        validate_contact(&new)?;
        match self.contacts.get_mut(&id) {
            Some(mut entry) => {
                entry.name = new.name;
                entry.phone = new.phone;
                entry.relationship = new.relationship;
                Ok(entry.clone())
            }
            None => Err(CoreError::NotFound(format!("contact {}", id))),
        }
    }

    /// Remove a contact. Removing an unknown id is a no-op.
    pub fn delete_contact(&self, id: Uuid) {
        self.contacts.remove(&id);
    }

    // --- cycle tracking ---

    /// All cycle entries, most recent start date first.
    pub fn list_cycles(&self) -> Vec<CycleEntry> {
        let mut all: Vec<CycleEntry> = self.cycles.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        all
    }

    pub fn create_cycle(&self, new: NewCycleEntry) -> CycleEntry {
        let id = Uuid::new_v4();
        let entry = CycleEntry {
            id,
            start_date: new.start_date,
            cycle_length: new.cycle_length,
            period_length: new.period_length,
            created_at: Utc::now(),
        };
        self.cycles.insert(id, entry.clone());
        entry
    }

    // --- mood entries ---

    /// All mood entries, newest first.
    pub fn list_moods(&self) -> Vec<MoodEntry> {
        let mut all: Vec<MoodEntry> = self.moods.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    pub fn create_mood(&self, new: NewMoodEntry) -> CoreResult<MoodEntry> {
        if new.mood.trim().is_empty() {
            return Err(CoreError::Validation("mood must not be empty".to_string()));
        }
        let id = Uuid::new_v4();
        let entry = MoodEntry {
            id,
            mood: new.mood,
            notes: new.notes,
            created_at: Utc::now(),
        };
        self.moods.insert(id, entry.clone());
        Ok(entry)
    }

    // --- wellness metrics ---

    /// All metrics, most recent date first.
    pub fn list_metrics(&self) -> Vec<WellnessMetric> {
        let mut all: Vec<WellnessMetric> = self.metrics.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.date.cmp(&a.date));
        all
    }

    pub fn create_metric(&self, new: NewWellnessMetric) -> WellnessMetric {
        let id = Uuid::new_v4();
        let metric = WellnessMetric {
            id,
            date: new.date,
            water_intake: new.water_intake,
            sleep_hours: new.sleep_hours,
            exercise_minutes: new.exercise_minutes,
            created_at: Utc::now(),
        };
        self.metrics.insert(id, metric.clone());
        metric
    }

    // --- voice settings ---

    /// The stored profile, or the default profile when nothing has been saved.
    pub fn voice_settings(&self) -> VoiceSettings {
        self.voice
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_else(VoiceSettings::default_profile)
    }

    /// Create or replace the voice profile. The id assigned on first upsert is
    /// kept by later ones.
    pub fn upsert_voice_settings(&self, new: NewVoiceSettings) -> VoiceSettings {
        let mut guard = self.voice.write().unwrap_or_else(|e| e.into_inner());
        let id = guard
            .as_ref()
            .map(|v| v.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let settings = VoiceSettings {
            id,
            voice_name: new.voice_name,
            pitch: new.pitch,
            rate: new.rate,
            updated_at: Utc::now(),
        };
        *guard = Some(settings.clone());
        settings
    }
}

impl Default for TrackerStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_contact(new: &NewEmergencyContact) -> CoreResult<()> {
    if new.name.trim().is_empty() {
        return Err(CoreError::Validation("contact name must not be empty".to_string()));
    }
    if new.phone.trim().is_empty() {
        return Err(CoreError::Validation("contact phone must not be empty".to_string()));
    }
    Ok(())
}
