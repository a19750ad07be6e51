//! Homeostatic state types.
//!
//! The live state is owned by the self model; everything handed out of it is
//! one of these plain values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ENERGY_MAX: f64 = 100.0;
pub const MOOD_MIN: f64 = -1.0;
pub const MOOD_MAX: f64 = 1.0;

/// Maximum number of retained recent events.
pub const RECENT_EVENTS_CAP: usize = 10;

/// The agent's internal "self" state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalState {
    /// 0..=100
    pub energy: f64,
    /// -1..=1
    pub mood: f64,
    /// 0..=1
    pub confidence: f64,
    /// Chronological, at most [`RECENT_EVENTS_CAP`] entries
    pub recent_events: Vec<String>,
    pub active_goals: Vec<String>,
}

impl Default for InternalState {
    fn default() -> Self {
        Self {
            energy: ENERGY_MAX,
            mood: 0.5,
            confidence: 0.7,
            recent_events: Vec::new(),
            active_goals: vec!["maintain_energy".into(), "respond_to_user".into()],
        }
    }
}

/// Parameters of the homeostasis update law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeostasisConfig {
    /// Energy units lost per second
    pub energy_decay_rate: f64,
    /// Fraction of the distance to neutral pulled back per update
    pub mood_stability: f64,
    /// Minimum confidence required to act
    pub confidence_threshold: f64,
}

impl Default for HomeostasisConfig {
    fn default() -> Self {
        Self {
            energy_decay_rate: 0.1,
            mood_stability: 0.05,
            confidence_threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyStatus {
    Critical,
    Low,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodStatus {
    Negative,
    Neutral,
    Positive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceStatus {
    Uncertain,
    Confident,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeostasisReport {
    pub energy_status: EnergyStatus,
    pub mood_status: MoodStatus,
    pub confidence_status: ConfidenceStatus,
}

/// Detailed self report produced by introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Introspection {
    pub current_state: InternalState,
    pub homeostasis: HomeostasisReport,
    pub recent_activity: Vec<String>,
    pub active_goals: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl EnergyStatus {
    pub fn classify(energy: f64) -> Self {
        if energy < 20.0 {
            EnergyStatus::Critical
        } else if energy < 50.0 {
            EnergyStatus::Low
        } else {
            EnergyStatus::Normal
        }
    }
}

impl MoodStatus {
    pub fn classify(mood: f64) -> Self {
        if mood < -0.5 {
            MoodStatus::Negative
        } else if mood > 0.5 {
            MoodStatus::Positive
        } else {
            MoodStatus::Neutral
        }
    }
}

impl ConfidenceStatus {
    pub fn classify(confidence: f64, threshold: f64) -> Self {
        if confidence < threshold {
            ConfidenceStatus::Uncertain
        } else {
            ConfidenceStatus::Confident
        }
    }
}
