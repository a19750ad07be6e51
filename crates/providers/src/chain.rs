//! Provider chain: ordered fallback with per-provider timeouts, explicit
//! selection, and streaming.
//!
//! Under [`ProviderPolicy::Auto`] the chain walks the priority order, skipping
//! providers without credentials. When a provider fails (timeout, rate limit,
//! error) it logs and tries the next one. When nothing answers, the reply is a
//! deterministic local-mode text that echoes the input.
//!
//! Under [`ProviderPolicy::Named`] exactly one provider is called and its
//! failure is explained to the user instead of falling back.

use std::sync::Arc;
use std::time::Duration;

use sentia_config::AppConfig;
use sentia_core::analysis::TextAnalysis;
use sentia_core::error::ProviderError;
use sentia_core::message::SelfView;
use sentia_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::prompt::build_messages;
use crate::registry::{build_from_config, ProviderRegistry};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How a reply should be generated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProviderPolicy {
    /// Walk the fallback order.
    #[default]
    Auto,
    /// Call only this provider (name or alias).
    Named(String),
}

impl ProviderPolicy {
    /// `"auto"` (or blank) selects the fallback chain; anything else names a provider.
    pub fn from_setting(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(sentia_config::AUTO_PROVIDER) {
            Self::Auto
        } else {
            Self::Named(trimmed.to_string())
        }
    }
}

impl std::fmt::Display for ProviderPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

/// What happened while producing a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyOutcome {
    Generated { provider: String },
    LocalFallback { attempted: Vec<String> },
    SelectionFailed { provider: String, reason: String },
}

/// The text handed back to the user, plus how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainReply {
    pub text: String,
    pub outcome: ReplyOutcome,
}

impl ChainReply {
    fn generated(provider: &str, text: String) -> Self {
        Self {
            text,
            outcome: ReplyOutcome::Generated {
                provider: provider.to_string(),
            },
        }
    }

    fn local_fallback(attempted: Vec<String>, input: &str) -> Self {
        Self {
            text: local_fallback_text(&attempted, input),
            outcome: ReplyOutcome::LocalFallback { attempted },
        }
    }

    fn selection_failed(provider: &str, reason: impl Into<String>, text: String) -> Self {
        Self {
            text,
            outcome: ReplyOutcome::SelectionFailed {
                provider: provider.to_string(),
                reason: reason.into(),
            },
        }
    }

    /// The provider that generated the text, if one did.
    pub fn provider(&self) -> Option<&str> {
        match &self.outcome {
            ReplyOutcome::Generated { provider } => Some(provider),
            _ => None,
        }
    }
}

/// The reply used when no provider could answer.
pub fn local_fallback_text(attempted: &[String], input: &str) -> String {
    if attempted.is_empty() {
        format!(
            "I'm running in local mode. No LLM API key was found, so I can only give basic responses. Your message was: {input}"
        )
    } else {
        format!(
            "I'm running in local mode. The configured providers ({}) could not be reached, so I can only give basic responses. Your message was: {input}",
            attempted.join(", ")
        )
    }
}

/// How a stream ended.
enum Drained {
    Completed(String),
    FailedEarly(ProviderError),
    Interrupted { text: String, error: ProviderError },
}

/// Generates replies from the registered providers.
pub struct ProviderChain {
    registry: ProviderRegistry,
    order: Vec<String>,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
}

impl ProviderChain {
    /// Create a chain over `registry`, tried in `order` under `Auto`.
    pub fn new(registry: ProviderRegistry, order: Vec<String>) -> Self {
        Self {
            registry,
            order,
            timeout: DEFAULT_TIMEOUT,
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    /// Build the registry, order, timeout, and sampling settings from config.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(build_from_config(config), config.agent.fallback_order.clone())
            .with_timeout(Duration::from_secs(config.agent.provider_timeout_secs))
            .with_sampling(config.default_temperature, config.default_max_tokens)
    }

    /// Bound on each provider attempt (and on each stream chunk).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// The fallback order as configured.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Providers in fallback order, paired with whether each is configured.
    pub fn status(&self) -> Vec<(Arc<dyn Provider>, bool)> {
        self.registry
            .ordered(&self.order)
            .into_iter()
            .map(|p| {
                let configured = p.is_configured();
                (p, configured)
            })
            .collect()
    }

    fn request(&self, view: &SelfView, input: &str, context: &TextAnalysis) -> ProviderRequest {
        ProviderRequest {
            messages: build_messages(view, input, context),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Generate a complete reply.
    pub async fn generate(
        &self,
        view: &SelfView,
        input: &str,
        context: &TextAnalysis,
        policy: &ProviderPolicy,
    ) -> ChainReply {
        let request = self.request(view, input, context);

        match policy {
            ProviderPolicy::Auto => self.generate_auto(request, input).await,
            ProviderPolicy::Named(name) => self.generate_named(name, request).await,
        }
    }

    async fn generate_auto(&self, request: ProviderRequest, input: &str) -> ChainReply {
        let mut attempted = Vec::new();

        for provider in self.configured_in_order() {
            attempted.push(provider.display_name().to_string());
            info!(
                provider = %provider.name(),
                attempt = attempted.len(),
                "Fallback: trying provider"
            );

            match self.complete_bounded(provider.as_ref(), request.clone()).await {
                Ok(response) => return ChainReply::generated(provider.name(), response.content),
                Err(e) => {
                    warn!(provider = %provider.name(), error = %e, "Fallback: provider failed, trying next");
                }
            }
        }

        if attempted.is_empty() {
            debug!("No configured providers, answering in local mode");
        }
        ChainReply::local_fallback(attempted, input)
    }

    async fn generate_named(&self, name: &str, request: ProviderRequest) -> ChainReply {
        let provider = match self.select(name) {
            Ok(provider) => provider,
            Err(reply) => return reply,
        };

        match self.complete_bounded(provider.as_ref(), request).await {
            Ok(response) => ChainReply::generated(provider.name(), response.content),
            Err(e) => {
                warn!(provider = %provider.name(), error = %e, "Selected provider failed");
                Self::failure_reply(provider.as_ref(), &e)
            }
        }
    }

    /// Stream a reply, passing each fragment to `on_chunk` in arrival order.
    ///
    /// The returned reply carries the full text that was delivered.
    pub async fn stream<F>(
        &self,
        view: &SelfView,
        input: &str,
        context: &TextAnalysis,
        policy: &ProviderPolicy,
        mut on_chunk: F,
    ) -> ChainReply
    where
        F: FnMut(&str) + Send,
    {
        let request = self.request(view, input, context);

        let reply = match policy {
            ProviderPolicy::Auto => self.stream_auto(request, input, &mut on_chunk).await,
            ProviderPolicy::Named(name) => self.stream_named(name, request, &mut on_chunk).await,
        };

        // Texts nobody streamed arrive as a single chunk.
        if reply.provider().is_none() {
            on_chunk(&reply.text);
        }
        reply
    }

    async fn stream_auto<F>(&self, request: ProviderRequest, input: &str, on_chunk: &mut F) -> ChainReply
    where
        F: FnMut(&str) + Send,
    {
        let mut attempted = Vec::new();

        for provider in self.configured_in_order() {
            attempted.push(provider.display_name().to_string());
            info!(
                provider = %provider.name(),
                attempt = attempted.len(),
                "Fallback: trying provider (streaming)"
            );

            let rx = match self.open_stream(provider.as_ref(), request.clone()).await {
                Ok(rx) => rx,
                Err(e) => {
                    warn!(provider = %provider.name(), error = %e, "Fallback: provider stream failed, trying next");
                    continue;
                }
            };

            match self.drain(provider.name(), rx, on_chunk).await {
                Drained::Completed(text) => return ChainReply::generated(provider.name(), text),
                Drained::FailedEarly(e) => {
                    warn!(provider = %provider.name(), error = %e, "Fallback: stream failed before any text, trying next");
                }
                Drained::Interrupted { text, error } => {
                    return Self::interrupted(provider.name(), text, &error, on_chunk);
                }
            }
        }

        ChainReply::local_fallback(attempted, input)
    }

    async fn stream_named<F>(&self, name: &str, request: ProviderRequest, on_chunk: &mut F) -> ChainReply
    where
        F: FnMut(&str) + Send,
    {
        let provider = match self.select(name) {
            Ok(provider) => provider,
            Err(reply) => return reply,
        };

        let rx = match self.open_stream(provider.as_ref(), request).await {
            Ok(rx) => rx,
            Err(e) => {
                warn!(provider = %provider.name(), error = %e, "Selected provider stream failed");
                return Self::failure_reply(provider.as_ref(), &e);
            }
        };

        match self.drain(provider.name(), rx, on_chunk).await {
            Drained::Completed(text) => ChainReply::generated(provider.name(), text),
            Drained::FailedEarly(e) => {
                warn!(provider = %provider.name(), error = %e, "Selected provider stream failed");
                Self::failure_reply(provider.as_ref(), &e)
            }
            Drained::Interrupted { text, error } => {
                Self::interrupted(provider.name(), text, &error, on_chunk)
            }
        }
    }

    fn configured_in_order(&self) -> impl Iterator<Item = Arc<dyn Provider>> {
        self.registry
            .ordered(&self.order)
            .into_iter()
            .filter(|p| {
                let configured = p.is_configured();
                if !configured {
                    debug!(provider = %p.name(), "Skipping unconfigured provider");
                }
                configured
            })
    }

    /// Resolve an explicitly selected provider, or the reply explaining why not.
    fn select(&self, name: &str) -> Result<Arc<dyn Provider>, ChainReply> {
        let Some(provider) = self.registry.resolve(name) else {
            let text = format!(
                "Unknown provider '{name}'. Available providers: {}",
                self.registry.names().join(", ")
            );
            return Err(ChainReply::selection_failed(name, "unknown provider", text));
        };

        if !provider.is_configured() {
            let text = format!(
                "{} is not configured. Set {} to use it.",
                provider.display_name(),
                provider.credential_env()
            );
            return Err(ChainReply::selection_failed(provider.name(), "not configured", text));
        }

        Ok(provider)
    }

    fn failure_reply(provider: &dyn Provider, error: &ProviderError) -> ChainReply {
        let text = format!(
            "{} could not generate a response: {error}",
            provider.display_name()
        );
        ChainReply::selection_failed(provider.name(), error.to_string(), text)
    }

    fn interrupted<F>(provider: &str, mut text: String, error: &ProviderError, on_chunk: &mut F) -> ChainReply
    where
        F: FnMut(&str) + Send,
    {
        warn!(provider = %provider, error = %error, "Stream interrupted after partial output");
        let notice = format!("[stream interrupted: {error}]");
        on_chunk(&notice);
        text.push_str(&notice);
        ChainReply::generated(provider, text)
    }

    async fn complete_bounded(
        &self,
        provider: &dyn Provider,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        match tokio::time::timeout(self.timeout, provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(self.timed_out(provider.name())),
        }
    }

    async fn open_stream(
        &self,
        provider: &dyn Provider,
        request: ProviderRequest,
    ) -> Result<ChunkReceiver, ProviderError> {
        match tokio::time::timeout(self.timeout, provider.stream(request)).await {
            Ok(result) => result,
            Err(_) => Err(self.timed_out(provider.name())),
        }
    }

    async fn drain<F>(&self, provider: &str, mut rx: ChunkReceiver, on_chunk: &mut F) -> Drained
    where
        F: FnMut(&str) + Send,
    {
        let mut text = String::new();

        loop {
            let next = match tokio::time::timeout(self.timeout, rx.recv()).await {
                Ok(next) => next,
                Err(_) => Some(Err(self.timed_out(provider))),
            };

            match next {
                None => break,
                Some(Ok(chunk)) => {
                    if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
                        on_chunk(&content);
                        text.push_str(&content);
                    }
                    if chunk.done {
                        break;
                    }
                }
                Some(Err(error)) if text.is_empty() => return Drained::FailedEarly(error),
                Some(Err(error)) => return Drained::Interrupted { text, error },
            }
        }

        Drained::Completed(text)
    }

    fn timed_out(&self, provider: &str) -> ProviderError {
        ProviderError::Timeout(format!(
            "Provider '{provider}' timed out after {}s",
            self.timeout.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    enum Script {
        Reply(&'static str),
        Fail(ProviderError),
        Hang,
        Chunks(Vec<Result<&'static str, ProviderError>>),
    }

    /// A mock provider that follows a fixed script and counts calls.
    struct ScriptedProvider {
        name: &'static str,
        display: &'static str,
        configured: bool,
        script: Script,
        call_count: Mutex<usize>,
    }

    impl ScriptedProvider {
        fn new(name: &'static str, script: Script) -> Arc<Self> {
            Arc::new(Self {
                name,
                display: name,
                configured: true,
                script,
                call_count: Mutex::new(0),
            })
        }

        fn unconfigured(name: &'static str, display: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                display,
                configured: false,
                script: Script::Reply("should never be called"),
                call_count: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn display_name(&self) -> &str {
            self.display
        }

        fn credential_env(&self) -> &str {
            "SCRIPTED_API_KEY"
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            match &self.script {
                Script::Reply(text) => Ok(ProviderResponse {
                    content: text.to_string(),
                    model: "scripted".into(),
                    usage: None,
                }),
                Script::Fail(e) => Err(e.clone()),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!()
                }
                Script::Chunks(chunks) => Ok(ProviderResponse {
                    content: chunks.iter().filter_map(|c| c.as_ref().ok().copied()).collect(),
                    model: "scripted".into(),
                    usage: None,
                }),
            }
        }

        async fn stream(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ChunkReceiver, ProviderError> {
            let Script::Chunks(chunks) = &self.script else {
                let response = self.complete(request).await?;
                let (tx, rx) = tokio::sync::mpsc::channel(2);
                let _ = tx.send(Ok(StreamChunk::text(response.content))).await;
                let _ = tx.send(Ok(StreamChunk::finished())).await;
                return Ok(rx);
            };

            *self.call_count.lock().unwrap() += 1;
            let (tx, rx) = tokio::sync::mpsc::channel(chunks.len() + 1);
            for chunk in chunks {
                let item = chunk.clone().map(|text| StreamChunk::text(text));
                let _ = tx.send(item).await;
            }
            let _ = tx.send(Ok(StreamChunk::finished())).await;
            Ok(rx)
        }
    }

    fn chain_of(providers: Vec<Arc<ScriptedProvider>>) -> ProviderChain {
        let order = providers.iter().map(|p| p.name.to_string()).collect();
        let registry = providers
            .into_iter()
            .fold(ProviderRegistry::new(), |r, p| r.with(p));
        ProviderChain::new(registry, order)
    }

    fn view() -> SelfView {
        SelfView {
            personality: "You are a test agent.".into(),
            history: vec![],
        }
    }

    async fn generate(chain: &ProviderChain, input: &str, policy: ProviderPolicy) -> ChainReply {
        chain.generate(&view(), input, &TextAnalysis::default(), &policy).await
    }

    #[test]
    fn policy_from_setting() {
        assert_eq!(ProviderPolicy::from_setting("auto"), ProviderPolicy::Auto);
        assert_eq!(ProviderPolicy::from_setting(" AUTO "), ProviderPolicy::Auto);
        assert_eq!(ProviderPolicy::from_setting(""), ProviderPolicy::Auto);
        assert_eq!(
            ProviderPolicy::from_setting("claude"),
            ProviderPolicy::Named("claude".into())
        );
    }

    #[tokio::test]
    async fn first_configured_provider_answers() {
        let skipped = ScriptedProvider::unconfigured("openai", "OpenAI");
        let primary = ScriptedProvider::new("anthropic", Script::Reply("hi from claude"));
        let secondary = ScriptedProvider::new("gemini", Script::Reply("hi from gemini"));
        let chain = chain_of(vec![skipped.clone(), primary.clone(), secondary.clone()]);

        let reply = generate(&chain, "hello", ProviderPolicy::Auto).await;
        assert_eq!(reply.text, "hi from claude");
        assert_eq!(reply.provider(), Some("anthropic"));
        assert_eq!(skipped.calls(), 0);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn falls_back_on_failure() {
        let p1 = ScriptedProvider::new(
            "openai",
            Script::Fail(ProviderError::ApiError {
                status_code: 500,
                message: "Internal Server Error".into(),
            }),
        );
        let p2 = ScriptedProvider::new(
            "anthropic",
            Script::Fail(ProviderError::RateLimited { retry_after_secs: 60 }),
        );
        let p3 = ScriptedProvider::new("deepseek", Script::Reply("success"));
        let chain = chain_of(vec![p1.clone(), p2.clone(), p3.clone()]);

        let reply = generate(&chain, "hello", ProviderPolicy::Auto).await;
        assert_eq!(reply.text, "success");
        assert_eq!(reply.outcome, ReplyOutcome::Generated { provider: "deepseek".into() });
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 1);
    }

    #[tokio::test]
    async fn nothing_configured_answers_locally() {
        let chain = chain_of(vec![
            ScriptedProvider::unconfigured("openai", "OpenAI"),
            ScriptedProvider::unconfigured("qwen", "Qwen"),
        ]);

        let reply = generate(&chain, "what is up", ProviderPolicy::Auto).await;
        assert_eq!(
            reply.text,
            "I'm running in local mode. No LLM API key was found, so I can only give basic responses. Your message was: what is up"
        );
        assert_eq!(reply.outcome, ReplyOutcome::LocalFallback { attempted: vec![] });
        assert!(reply.provider().is_none());
    }

    #[tokio::test]
    async fn all_failures_answer_locally_naming_attempts() {
        let p1 = ScriptedProvider::new("openai", Script::Fail(ProviderError::Network("down".into())));
        let p2 = ScriptedProvider::new(
            "qwen",
            Script::Fail(ProviderError::AuthenticationFailed("bad key".into())),
        );
        let chain = chain_of(vec![p1, p2]);

        let reply = generate(&chain, "ping", ProviderPolicy::Auto).await;
        assert!(reply.text.contains("(openai, qwen) could not be reached"));
        assert!(reply.text.ends_with("Your message was: ping"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_triggers_fallback() {
        let hanging = ScriptedProvider::new("openai", Script::Hang);
        let backup = ScriptedProvider::new("gemini", Script::Reply("late but here"));
        let chain = chain_of(vec![hanging.clone(), backup.clone()])
            .with_timeout(Duration::from_millis(50));

        let reply = generate(&chain, "hello", ProviderPolicy::Auto).await;
        assert_eq!(reply.text, "late but here");
        assert_eq!(hanging.calls(), 1);
        assert_eq!(backup.calls(), 1);
    }

    #[tokio::test]
    async fn named_unconfigured_provider_is_explained_without_trying_others() {
        let claude = ScriptedProvider::unconfigured("anthropic", "Claude");
        let other = ScriptedProvider::new("openai", Script::Reply("should not be used"));
        let chain = chain_of(vec![other.clone(), claude.clone()]);

        let reply = generate(&chain, "hello", ProviderPolicy::Named("claude".into())).await;
        assert_eq!(reply.text, "Claude is not configured. Set SCRIPTED_API_KEY to use it.");
        assert!(matches!(
            reply.outcome,
            ReplyOutcome::SelectionFailed { ref provider, .. } if provider == "anthropic"
        ));
        assert_eq!(other.calls(), 0);
        assert_eq!(claude.calls(), 0);
    }

    #[tokio::test]
    async fn named_unknown_provider_lists_available() {
        let chain = chain_of(vec![
            ScriptedProvider::new("openai", Script::Reply("x")),
            ScriptedProvider::new("gemini", Script::Reply("y")),
        ]);

        let reply = generate(&chain, "hello", ProviderPolicy::Named("llama".into())).await;
        assert_eq!(
            reply.text,
            "Unknown provider 'llama'. Available providers: openai, gemini"
        );
    }

    #[tokio::test]
    async fn named_failure_does_not_fall_back() {
        let failing = ScriptedProvider::new("gemini", Script::Fail(ProviderError::Network("refused".into())));
        let healthy = ScriptedProvider::new("openai", Script::Reply("fine"));
        let chain = chain_of(vec![healthy.clone(), failing.clone()]);

        let reply = generate(&chain, "hello", ProviderPolicy::Named("gemini".into())).await;
        assert!(reply.text.starts_with("gemini could not generate a response:"));
        assert!(reply.text.contains("refused"));
        assert_eq!(failing.calls(), 1);
        assert_eq!(healthy.calls(), 0);
    }

    #[tokio::test]
    async fn stream_delivers_chunks_in_order() {
        let streamer = ScriptedProvider::new(
            "openai",
            Script::Chunks(vec![Ok("Hel"), Ok("lo"), Ok(" there")]),
        );
        let chain = chain_of(vec![streamer]);

        let mut seen = Vec::new();
        let reply = chain
            .stream(&view(), "hi", &TextAnalysis::default(), &ProviderPolicy::Auto, |c| {
                seen.push(c.to_string())
            })
            .await;

        assert_eq!(seen, vec!["Hel", "lo", " there"]);
        assert_eq!(reply.text, "Hello there");
        assert_eq!(reply.provider(), Some("openai"));
    }

    #[tokio::test]
    async fn stream_failing_before_text_moves_on() {
        let broken = ScriptedProvider::new(
            "openai",
            Script::Chunks(vec![Err(ProviderError::StreamInterrupted("reset".into()))]),
        );
        let backup = ScriptedProvider::new("qwen", Script::Chunks(vec![Ok("ok")]));
        let chain = chain_of(vec![broken.clone(), backup.clone()]);

        let mut seen = Vec::new();
        let reply = chain
            .stream(&view(), "hi", &TextAnalysis::default(), &ProviderPolicy::Auto, |c| {
                seen.push(c.to_string())
            })
            .await;

        assert_eq!(seen, vec!["ok"]);
        assert_eq!(reply.provider(), Some("qwen"));
        assert_eq!(broken.calls(), 1);
    }

    #[tokio::test]
    async fn stream_failing_after_text_ends_with_notice() {
        let flaky = ScriptedProvider::new(
            "openai",
            Script::Chunks(vec![
                Ok("partial"),
                Err(ProviderError::StreamInterrupted("reset".into())),
            ]),
        );
        let backup = ScriptedProvider::new("qwen", Script::Chunks(vec![Ok("unused")]));
        let chain = chain_of(vec![flaky, backup.clone()]);

        let mut seen = Vec::new();
        let reply = chain
            .stream(&view(), "hi", &TextAnalysis::default(), &ProviderPolicy::Auto, |c| {
                seen.push(c.to_string())
            })
            .await;

        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], "partial");
        assert!(seen[1].starts_with("[stream interrupted:"));
        assert!(reply.text.starts_with("partial[stream interrupted:"));
        assert_eq!(backup.calls(), 0);
    }

    #[tokio::test]
    async fn stream_local_fallback_is_one_chunk() {
        let chain = chain_of(vec![ScriptedProvider::unconfigured("openai", "OpenAI")]);

        let mut seen = Vec::new();
        let reply = chain
            .stream(&view(), "yo", &TextAnalysis::default(), &ProviderPolicy::Auto, |c| {
                seen.push(c.to_string())
            })
            .await;

        assert_eq!(seen, vec![reply.text.clone()]);
        assert!(reply.text.ends_with("Your message was: yo"));
    }

    #[test]
    fn from_config_uses_fallback_order() {
        let chain = ProviderChain::from_config(&AppConfig::default());
        assert_eq!(chain.order().len(), 5);
        assert!(chain.status().iter().all(|(_, configured)| !configured));
    }
}
