//! # Sentia Homeostasis
//!
//! The agent's self model: three bounded scalars (energy, mood, confidence),
//! a short list of recent events, and the conversation ring buffer that
//! providers see.
//!
//! ## Update law
//!
//! - energy decays linearly with elapsed wall time and never goes below 0
//! - mood is pulled a fixed fraction of the way towards 0.5 on every update
//! - confidence drifts by one tenth of the success/failure balance of the
//!   retained events

use std::collections::VecDeque;

use chrono::Utc;
use sentia_core::state::{
    ConfidenceStatus, EnergyStatus, HomeostasisReport, MoodStatus, ENERGY_MAX, MOOD_MAX, MOOD_MIN,
    RECENT_EVENTS_CAP,
};
use sentia_core::{ConversationTurn, HomeostasisConfig, InternalState, Introspection, SelfView, TurnRole};
use tokio::time::Instant;

/// Mood value the stability pull converges on.
pub const MOOD_SET_POINT: f64 = 0.5;

/// Conversation turns retained in memory.
pub const HISTORY_CAP: usize = 20;

/// Conversation turns exposed to providers.
pub const HISTORY_WINDOW: usize = 10;

/// Energy spent by any action.
pub const ACTION_ENERGY_COST: f64 = 5.0;

/// Mood shift caused by an action's outcome.
pub const ACTION_MOOD_IMPACT: f64 = 0.1;

/// Energy below which the agent refuses to act.
pub const MIN_ACTION_ENERGY: f64 = 20.0;

const SENTIMENT_GAIN: f64 = 0.1;
const CONFIDENCE_GAIN: f64 = 0.1;

/// The agent's homeostatic self.
#[derive(Debug, Clone)]
pub struct SelfModel {
    state: InternalState,
    config: HomeostasisConfig,
    personality: String,
    history: VecDeque<ConversationTurn>,
    last_update: Instant,
}

impl SelfModel {
    pub fn new(config: HomeostasisConfig) -> Self {
        Self {
            state: InternalState::default(),
            config,
            personality: String::new(),
            history: VecDeque::with_capacity(HISTORY_CAP),
            last_update: Instant::now(),
        }
    }

    /// Set the personality prompt handed to providers.
    pub fn with_personality(mut self, personality: impl Into<String>) -> Self {
        self.personality = personality.into();
        self
    }

    pub fn config(&self) -> &HomeostasisConfig {
        &self.config
    }

    pub fn personality(&self) -> &str {
        &self.personality
    }

    /// An owned copy of the live state.
    pub fn state(&self) -> InternalState {
        self.state.clone()
    }

    /// Advance the state to now, folding in `events`.
    pub fn update(&mut self, events: &[&str]) -> InternalState {
        self.update_at(Instant::now(), events)
    }

    /// Advance the state to `now`, folding in `events`.
    ///
    /// A `now` earlier than the last update counts as zero elapsed time.
    pub fn update_at(&mut self, now: Instant, events: &[&str]) -> InternalState {
        let dt = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.last_update = now;

        self.state.energy = clamp_energy(self.state.energy - self.config.energy_decay_rate * dt);

        let pull = (MOOD_SET_POINT - self.state.mood) * self.config.mood_stability;
        self.state.mood = clamp_mood(self.state.mood + pull);

        for event in events {
            self.push_event(event.to_string());
        }

        self.recompute_confidence();
        self.state()
    }

    /// Shift mood by a tenth of the sentiment score.
    pub fn update_mood_from_sentiment(&mut self, score: f64) {
        let impact = score * SENTIMENT_GAIN;
        self.state.mood = clamp_mood(self.state.mood + impact);

        if impact > 0.0 {
            self.push_event("positive_user_interaction".into());
        } else if impact < 0.0 {
            self.push_event("negative_user_interaction".into());
        }
    }

    /// Charge the energy cost of an action and record its outcome.
    pub fn record_action_impact(&mut self, action: &str, success: bool) {
        self.state.energy = clamp_energy(self.state.energy - ACTION_ENERGY_COST);

        let impact = if success { ACTION_MOOD_IMPACT } else { -ACTION_MOOD_IMPACT };
        self.state.mood = clamp_mood(self.state.mood + impact);

        let outcome = if success { "success" } else { "failure" };
        self.push_event(format!("{action}_{outcome}"));
    }

    /// Whether the agent has the energy and confidence to act.
    ///
    /// The action name is currently not consulted.
    pub fn can_perform_action(&self, _action: &str) -> bool {
        self.state.energy >= MIN_ACTION_ENERGY
            && self.state.confidence >= self.config.confidence_threshold
    }

    pub fn introspect(&self) -> Introspection {
        Introspection {
            current_state: self.state(),
            homeostasis: HomeostasisReport {
                energy_status: EnergyStatus::classify(self.state.energy),
                mood_status: MoodStatus::classify(self.state.mood),
                confidence_status: ConfidenceStatus::classify(
                    self.state.confidence,
                    self.config.confidence_threshold,
                ),
            },
            recent_activity: self.state.recent_events.clone(),
            active_goals: self.state.active_goals.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn add_to_conversation_history(&mut self, role: TurnRole, content: impl Into<String>) {
        self.history.push_back(ConversationTurn {
            role,
            content: content.into(),
        });
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }
    }

    /// The last [`HISTORY_WINDOW`] turns, oldest first.
    pub fn recent_conversation_history(&self) -> Vec<ConversationTurn> {
        let skip = self.history.len().saturating_sub(HISTORY_WINDOW);
        self.history.iter().skip(skip).cloned().collect()
    }

    /// Personality plus recent history, as handed to a provider.
    pub fn prompt_view(&self) -> SelfView {
        SelfView {
            personality: self.personality.clone(),
            history: self.recent_conversation_history(),
        }
    }

    fn push_event(&mut self, event: String) {
        self.state.recent_events.push(event);
        let overflow = self.state.recent_events.len().saturating_sub(RECENT_EVENTS_CAP);
        if overflow > 0 {
            self.state.recent_events.drain(..overflow);
        }
    }

    fn recompute_confidence(&mut self) {
        let events = &self.state.recent_events;
        let positive = events
            .iter()
            .filter(|e| e.contains("success") || e.contains("positive"))
            .count() as f64;
        let negative = events
            .iter()
            .filter(|e| e.contains("failure") || e.contains("negative"))
            .count() as f64;
        let balance = (positive - negative) / events.len().max(1) as f64;

        self.state.confidence = clamp_unit(self.state.confidence + balance * CONFIDENCE_GAIN);
    }
}

impl Default for SelfModel {
    fn default() -> Self {
        Self::new(HomeostasisConfig::default())
    }
}

fn clamp_energy(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, ENERGY_MAX) }
}

fn clamp_mood(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(MOOD_MIN, MOOD_MAX) }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}
