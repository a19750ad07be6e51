//! The perception-action loop.
//!
//! One `AgentLoop` serves every input source while a background task ticks
//! the self model. The self model sits behind a `tokio::sync::Mutex`; each
//! logical event applies its state changes and the paired store write while
//! holding that lock. Provider calls run with the lock released.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use sentia_config::AppConfig;
use sentia_core::analysis::{InputAnalyzer, TextAnalysis};
use sentia_core::error::{AgentError, MemoryError};
use sentia_core::event::{DomainEvent, EventBus};
use sentia_core::input::{Envelope, InputEvent, ResponsePayload, StatePayload};
use sentia_core::memory::{MemoryStore, NewEpisode};
use sentia_core::message::{SelfView, TurnRole};
use sentia_core::state::{InternalState, Introspection};
use sentia_homeostasis::SelfModel;
use sentia_providers::{ChainReply, ProviderChain, ProviderPolicy, ReplyOutcome};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::LexiconAnalyzer;
use crate::commands::{help_text, unknown_text, Command};

/// Reply used when the self model is too drained to act.
pub const LOW_ENERGY_REPLY: &str = "I'm feeling a bit low on energy. I need to recharge.";

/// Episode type for the agent's own replies.
pub const RESPONSE_EVENT: &str = "response";

/// How a reply came about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplySource {
    /// A colon command, answered locally.
    Command { name: String },
    /// The self model could not act.
    LowEnergy,
    /// The provider chain produced the text.
    Chain { outcome: ReplyOutcome },
}

/// What the agent says back for one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub content: String,
    /// Display name of the backend that generated the text, if any.
    pub provider: Option<String>,
    /// The input this answers.
    pub input: String,
    pub source: ReplySource,
}

impl AgentReply {
    pub fn to_envelope(&self) -> Envelope {
        Envelope::Response(ResponsePayload {
            content: self.content.clone(),
            provider: self.provider.clone(),
            input: self.input.clone(),
        })
    }
}

/// Result of the locked pre-generation section.
enum Prepared {
    Answered(AgentReply),
    LowEnergy,
    Generate { view: SelfView, context: TextAnalysis },
}

struct Ticker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// The agent: self model, memory, providers, and the tick task.
pub struct AgentLoop {
    self_model: Arc<Mutex<SelfModel>>,
    store: Arc<dyn MemoryStore>,
    chain: ProviderChain,
    analyzer: Arc<dyn InputAnalyzer>,
    events: Arc<EventBus>,
    policy: ProviderPolicy,
    session_id: Uuid,
    tick_interval: Duration,
    command_prefix: String,
    running: AtomicBool,
    stopped: AtomicBool,
    ticker: Mutex<Option<Ticker>>,
}

impl AgentLoop {
    /// Build an agent from configuration over an already-opened store.
    pub fn new(config: &AppConfig, store: Arc<dyn MemoryStore>) -> Self {
        let self_model = SelfModel::new(config.homeostasis)
            .with_personality(config.identity.personality.clone());

        Self {
            self_model: Arc::new(Mutex::new(self_model)),
            store,
            chain: ProviderChain::from_config(config),
            analyzer: Arc::new(LexiconAnalyzer::new()),
            events: Arc::new(EventBus::default()),
            policy: ProviderPolicy::from_setting(&config.agent.provider),
            session_id: Uuid::new_v4(),
            tick_interval: Duration::from_secs(config.agent.tick_interval_secs.max(1)),
            command_prefix: config.agent.command_prefix.clone(),
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            ticker: Mutex::new(None),
        }
    }

    /// Replace the provider chain.
    pub fn with_chain(mut self, chain: ProviderChain) -> Self {
        self.chain = chain;
        self
    }

    /// Replace the input analyzer.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn InputAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Override the provider policy from config.
    pub fn with_policy(mut self, policy: ProviderPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Share an event bus with a transport.
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn policy(&self) -> &ProviderPolicy {
        &self.policy
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn store(&self) -> &Arc<dyn MemoryStore> {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the current scalars and events.
    pub async fn state(&self) -> InternalState {
        self.self_model.lock().await.state()
    }

    pub async fn introspect(&self) -> Introspection {
        self.self_model.lock().await.introspect()
    }

    /// The `state` envelope a transport pushes to clients.
    pub async fn state_envelope(&self) -> Envelope {
        let state = self.state().await;
        Envelope::State(StatePayload {
            energy: state.energy,
            mood: state.mood,
            confidence: state.confidence,
        })
    }

    /// Start the tick task. The self model always begins at its initial state;
    /// stored snapshots are history only.
    ///
    /// Does nothing if already running or once stopped.
    pub async fn start(&self) {
        let mut ticker = self.ticker.lock().await;
        if ticker.is_some() || self.stopped.load(Ordering::SeqCst) {
            debug!("Start ignored, agent already running or stopped");
            return;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(tick_loop(
            self.self_model.clone(),
            self.store.clone(),
            self.events.clone(),
            self.tick_interval,
            shutdown_rx,
        ));
        *ticker = Some(Ticker { shutdown, handle });
        self.running.store(true, Ordering::SeqCst);

        self.events.publish(DomainEvent::StatusChanged {
            running: true,
            timestamp: Utc::now(),
        });
        info!(
            session_id = %self.session_id,
            policy = %self.policy,
            tick_secs = self.tick_interval.as_secs(),
            "Agent started"
        );
    }

    /// Stop ticking and close the store. An in-progress tick finishes first.
    pub async fn stop(&self) {
        let Some(ticker) = self.ticker.lock().await.take() else {
            return;
        };

        self.running.store(false, Ordering::SeqCst);
        self.stopped.store(true, Ordering::SeqCst);

        let _ = ticker.shutdown.send(true);
        if let Err(e) = ticker.handle.await {
            warn!(error = %e, "Tick task ended abnormally");
        }

        if let Err(e) = self.store.close().await {
            warn!(error = %e, "Failed to close memory store");
        }

        self.events.publish(DomainEvent::StatusChanged {
            running: false,
            timestamp: Utc::now(),
        });
        info!(session_id = %self.session_id, "Agent stopped");
    }

    /// Handle one input and return the complete reply.
    pub async fn handle_input(&self, event: InputEvent) -> Result<AgentReply, AgentError> {
        let (view, context) = match self.prepare(&event).await? {
            Prepared::Answered(reply) => return Ok(reply),
            Prepared::LowEnergy => return Ok(self.low_energy(&event).await),
            Prepared::Generate { view, context } => (view, context),
        };

        debug!(policy = %self.policy, "Generating reply");
        let reply = self
            .chain
            .generate(&view, &event.content, &context, &self.policy)
            .await;

        Ok(self.finish(&event, reply).await)
    }

    /// Handle one input, passing reply fragments to `on_chunk` as they arrive.
    ///
    /// Replies that are not streamed by a provider (commands, low energy,
    /// local fallback) arrive as one chunk.
    pub async fn handle_input_streaming<F>(
        &self,
        event: InputEvent,
        mut on_chunk: F,
    ) -> Result<AgentReply, AgentError>
    where
        F: FnMut(&str) + Send,
    {
        let (view, context) = match self.prepare(&event).await? {
            Prepared::Answered(reply) => {
                on_chunk(&reply.content);
                return Ok(reply);
            }
            Prepared::LowEnergy => {
                let reply = self.low_energy(&event).await;
                on_chunk(&reply.content);
                return Ok(reply);
            }
            Prepared::Generate { view, context } => (view, context),
        };

        debug!(policy = %self.policy, "Streaming reply");
        let reply = self
            .chain
            .stream(&view, &event.content, &context, &self.policy, on_chunk)
            .await;

        Ok(self.finish(&event, reply).await)
    }

    /// Persist the input, then either answer a command or run the state
    /// update that precedes generation. For conversational input the store
    /// write and the state change happen under one hold of the model lock.
    async fn prepare(&self, event: &InputEvent) -> Result<Prepared, AgentError> {
        if !self.is_running() {
            return Err(AgentError::NotRunning);
        }

        self.events.publish(DomainEvent::InputReceived {
            event_type: event.event_type.clone(),
            content_preview: event.content.chars().take(50).collect(),
            timestamp: Utc::now(),
        });

        if let Some(rest) = event.content.strip_prefix(self.command_prefix.as_str()) {
            self.persist_input(event).await;
            let reply = self.run_command(Command::parse(rest), event).await;
            return Ok(Prepared::Answered(reply));
        }

        let context = self.analyzer.analyze(&event.content);
        let sentiment = self.analyzer.sentiment(&event.content);
        let input_marker = format!("input_{}", event.event_type);

        let mut model = self.self_model.lock().await;
        self.persist_input(event).await;
        model.update(&[input_marker.as_str()]);
        model.update_mood_from_sentiment(sentiment);
        let view = model.prompt_view();
        model.add_to_conversation_history(TurnRole::User, event.content.clone());

        if !model.can_perform_action("respond") {
            info!(energy = model.state().energy, "Too low on energy to respond");
            return Ok(Prepared::LowEnergy);
        }

        Ok(Prepared::Generate { view, context })
    }

    async fn persist_input(&self, event: &InputEvent) {
        let metadata = serde_json::to_value(&event.metadata).unwrap_or_default();
        let episode = NewEpisode {
            event_type: event.event_type.clone(),
            timestamp: event.timestamp,
            content: event.content.clone(),
            metadata,
            session_id: None,
        }
        .with_session(self.session_id.to_string());
        if let Err(e) = self.store.store_episodic_memory(episode).await {
            self.storage_failed("store_episodic_memory", &e);
        }
    }

    async fn low_energy(&self, event: &InputEvent) -> AgentReply {
        let content = LOW_ENERGY_REPLY.to_string();
        self.record_response(&content, serde_json::json!({ "kind": "low_energy" }))
            .await;
        self.reply_published(AgentReply {
            content,
            provider: None,
            input: event.content.clone(),
            source: ReplySource::LowEnergy,
        })
    }

    /// Persist the reply, apply the action impact, and append the agent turn.
    async fn finish(&self, event: &InputEvent, reply: ChainReply) -> AgentReply {
        let provider = reply.provider().map(|name| {
            self.chain
                .registry()
                .get(name)
                .map(|p| p.display_name().to_string())
                .unwrap_or_else(|| name.to_string())
        });

        let outcome = serde_json::to_value(&reply.outcome).unwrap_or_default();
        self.record_response(&reply.text, outcome).await;

        self.reply_published(AgentReply {
            content: reply.text,
            provider,
            input: event.content.clone(),
            source: ReplySource::Chain {
                outcome: reply.outcome,
            },
        })
    }

    async fn record_response(&self, content: &str, outcome: serde_json::Value) {
        let mut model = self.self_model.lock().await;
        let state = model.state();

        let episode = NewEpisode::now(RESPONSE_EVENT, content)
            .with_metadata(serde_json::json!({
                "outcome": outcome,
                "energy": state.energy,
                "mood": state.mood,
                "confidence": state.confidence,
            }))
            .with_session(self.session_id.to_string());
        if let Err(e) = self.store.store_episodic_memory(episode).await {
            self.storage_failed("store_episodic_memory", &e);
        }

        model.record_action_impact("respond", true);
        model.add_to_conversation_history(TurnRole::Agent, content);
    }

    fn reply_published(&self, reply: AgentReply) -> AgentReply {
        self.events.publish(DomainEvent::ResponseGenerated {
            provider: reply.provider.clone(),
            content_length: reply.content.len(),
            timestamp: Utc::now(),
        });
        reply
    }

    async fn run_command(&self, command: Command, event: &InputEvent) -> AgentReply {
        debug!(command = command.name(), "Dispatching command");

        let content = match &command {
            Command::Introspect => {
                let report = self.introspect().await;
                serde_json::to_string_pretty(&report)
                    .unwrap_or_else(|e| format!("Failed to render introspection: {e}"))
            }
            Command::Status => {
                let state = self.state().await;
                format!(
                    "Energy: {:.1} | Mood: {:.2} | Confidence: {:.2} | Provider: {} | Session: {}",
                    state.energy, state.mood, state.confidence, self.policy, self.session_id
                )
            }
            Command::Help => help_text(&self.command_prefix),
            Command::Stop => {
                self.stop().await;
                "Stopping. Goodbye!".to_string()
            }
            Command::Unknown(name) => unknown_text(&self.command_prefix, name),
        };

        AgentReply {
            content,
            provider: None,
            input: event.content.clone(),
            source: ReplySource::Command {
                name: command.name().to_string(),
            },
        }
    }

    fn storage_failed(&self, operation: &str, error: &MemoryError) {
        report_storage_failure(&self.events, operation, error);
    }
}

fn report_storage_failure(events: &EventBus, operation: &str, error: &MemoryError) {
    warn!(operation, error = %error, "Memory store write failed, continuing");
    events.publish(DomainEvent::StorageFailed {
        operation: operation.to_string(),
        error_message: error.to_string(),
        timestamp: Utc::now(),
    });
}

/// Advance the self model every `period` until told to stop.
/// The first tick fires one full period after start.
async fn tick_loop(
    self_model: Arc<Mutex<SelfModel>>,
    store: Arc<dyn MemoryStore>,
    events: Arc<EventBus>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                tick(&self_model, store.as_ref(), &events).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Tick loop shutting down");
                    return;
                }
            }
        }
    }
}

async fn tick(self_model: &Mutex<SelfModel>, store: &dyn MemoryStore, events: &EventBus) {
    let mut model = self_model.lock().await;
    let state = model.update(&[]);

    if let Err(e) = store.store_internal_state(&state).await {
        report_storage_failure(events, "store_internal_state", &e);
    }

    events.publish(DomainEvent::StateTicked {
        energy: state.energy,
        mood: state.mood,
        confidence: state.confidence,
        timestamp: Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_envelope_shape() {
        let reply = AgentReply {
            content: "Hi!".into(),
            provider: Some("Claude".into()),
            input: "hello".into(),
            source: ReplySource::Chain {
                outcome: ReplyOutcome::Generated {
                    provider: "anthropic".into(),
                },
            },
        };
        let json = serde_json::to_value(reply.to_envelope()).unwrap();
        assert_eq!(json["type"], "response");
        assert_eq!(json["data"]["content"], "Hi!");
        assert_eq!(json["data"]["provider"], "Claude");
        assert_eq!(json["data"]["input"], "hello");
    }

    #[test]
    fn reply_source_serializes_with_kind() {
        let json = serde_json::to_value(ReplySource::LowEnergy).unwrap();
        assert_eq!(json["kind"], "low_energy");
        let json = serde_json::to_value(ReplySource::Command { name: "status".into() }).unwrap();
        assert_eq!(json["name"], "status");
    }
}
