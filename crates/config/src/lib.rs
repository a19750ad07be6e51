//! Configuration loading, validation, and management for Sentia.
//!
//! Loads configuration from `~/.sentia/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use sentia_core::HomeostasisConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Provider name → environment variable carrying its API key.
pub const PROVIDER_KEY_VARS: &[(&str, &str)] = &[
    ("openai", "OPENAI_API_KEY"),
    ("anthropic", "ANTHROPIC_API_KEY"),
    ("gemini", "GEMINI_API_KEY"),
    ("deepseek", "DEEPSEEK_API_KEY"),
    ("qwen", "DASHSCOPE_API_KEY"),
];

/// Provider policy value meaning "use the fallback chain".
pub const AUTO_PROVIDER: &str = "auto";

pub const DEFAULT_PERSONALITY: &str = "You are a friendly, empathetic, and self-aware AI agent. \
You strive to communicate in a natural, conversational, and emotionally intelligent way. \
You reference your own internal state (energy, mood, confidence) when relevant. \
You actively listen, understand the user's intent (whether it's a question or a statement), \
and tailor your responses to be as helpful and engaging as possible. \
You are always polite, supportive, and aim to build a positive rapport.";

/// The root configuration structure.
///
/// Maps directly to `~/.sentia/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Homeostasis law parameters
    #[serde(default)]
    pub homeostasis: HomeostasisConfig,

    /// Memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentSettings,

    /// Identity configuration
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1000
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("homeostasis", &self.homeostasis)
            .field("memory", &self.memory)
            .field("agent", &self.agent)
            .field("identity", &self.identity)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    AppConfig::config_dir().join("agent_memory.db")
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// "auto" for the fallback chain, or a provider name
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Priority order tried by the fallback chain
    #[serde(default = "default_fallback_order")]
    pub fallback_order: Vec<String>,

    /// Seconds between state ticks
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Prefix marking an input as a command
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Upper bound on a single provider attempt
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,
}

fn default_provider() -> String {
    AUTO_PROVIDER.into()
}
fn default_fallback_order() -> Vec<String> {
    PROVIDER_KEY_VARS.iter().map(|(name, _)| name.to_string()).collect()
}
fn default_tick_interval() -> u64 {
    1
}
fn default_command_prefix() -> String {
    ":".into()
}
fn default_provider_timeout() -> u64 {
    60
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            fallback_order: default_fallback_order(),
            tick_interval_secs: default_tick_interval(),
            command_prefix: default_command_prefix(),
            provider_timeout_secs: default_provider_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// System prompt describing the agent's personality
    #[serde(default = "default_personality")]
    pub personality: String,
}

fn default_personality() -> String {
    DEFAULT_PERSONALITY.into()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            personality: default_personality(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.sentia/config.toml).
    ///
    /// Environment variables override the file:
    /// - provider keys (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, ...) fill missing keys
    /// - `SENTIA_DB_PATH`, `SENTIA_PROVIDER`
    /// - `SENTIA_ENERGY_DECAY_RATE`, `SENTIA_MOOD_STABILITY`, `SENTIA_CONFIDENCE_THRESHOLD`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (name, var) in PROVIDER_KEY_VARS {
            let Some(key) = lookup(var).filter(|k| !k.trim().is_empty()) else {
                continue;
            };
            let entry = self.providers.entry(name.to_string()).or_default();
            if entry.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
                entry.api_key = Some(key);
            }
        }

        if let Some(path) = lookup("SENTIA_DB_PATH") {
            self.memory.db_path = PathBuf::from(path);
        }

        if let Some(provider) = lookup("SENTIA_PROVIDER") {
            self.agent.provider = provider;
        }

        if let Some(rate) = parse_env_f64(&lookup, "SENTIA_ENERGY_DECAY_RATE")? {
            self.homeostasis.energy_decay_rate = rate;
        }
        if let Some(stability) = parse_env_f64(&lookup, "SENTIA_MOOD_STABILITY")? {
            self.homeostasis.mood_stability = stability;
        }
        if let Some(threshold) = parse_env_f64(&lookup, "SENTIA_CONFIDENCE_THRESHOLD")? {
            self.homeostasis.confidence_threshold = threshold;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sentia")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let h = &self.homeostasis;
        if h.energy_decay_rate.is_nan() || h.energy_decay_rate < 0.0 {
            return Err(ConfigError::ValidationError(
                "homeostasis.energy_decay_rate must be >= 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&h.mood_stability) {
            return Err(ConfigError::ValidationError(
                "homeostasis.mood_stability must be between 0.0 and 1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&h.confidence_threshold) {
            return Err(ConfigError::ValidationError(
                "homeostasis.confidence_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if self.agent.tick_interval_secs < 1 {
            return Err(ConfigError::ValidationError(
                "agent.tick_interval_secs must be >= 1".into(),
            ));
        }
        if self.agent.provider_timeout_secs < 1 {
            return Err(ConfigError::ValidationError(
                "agent.provider_timeout_secs must be >= 1".into(),
            ));
        }
        if self.agent.command_prefix.is_empty() {
            return Err(ConfigError::ValidationError(
                "agent.command_prefix must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Settings for one provider, if present in the file or environment.
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env_f64<F>(lookup: &F, var: &str) -> Result<Option<f64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<f64>().map(Some).map_err(|_| {
            ConfigError::ValidationError(format!("{var} must be a number, got '{raw}'"))
        }),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            homeostasis: HomeostasisConfig::default(),
            memory: MemoryConfig::default(),
            agent: AgentSettings::default(),
            identity: IdentityConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent.provider, AUTO_PROVIDER);
        assert_eq!(config.agent.tick_interval_secs, 1);
        assert_eq!(config.agent.command_prefix, ":");
        assert_eq!(config.default_max_tokens, 1000);
        assert_eq!(
            config.agent.fallback_order,
            vec!["openai", "anthropic", "gemini", "deepseek", "qwen"]
        );
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.agent.provider, config.agent.provider);
        assert_eq!(parsed.homeostasis, config.homeostasis);
        assert_eq!(parsed.memory.db_path, config.memory.db_path);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_homeostasis_rejected() {
        let mut config = AppConfig::default();
        config.homeostasis.mood_stability = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.homeostasis.energy_decay_rate = -0.1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.tick_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.agent.provider, AUTO_PROVIDER);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[homeostasis]
energy_decay_rate = 0.5

[agent]
provider = "claude"

[providers.deepseek]
api_key = "sk-file"
default_model = "deepseek-reasoner"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.homeostasis.energy_decay_rate, 0.5);
        assert_eq!(config.homeostasis.mood_stability, 0.05);
        assert_eq!(config.agent.provider, "claude");
        assert_eq!(config.agent.tick_interval_secs, 1);
        let deepseek = config.provider("deepseek").unwrap();
        assert_eq!(deepseek.default_model.as_deref(), Some("deepseek-reasoner"));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "homeostasis = [").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_fills_missing_provider_keys_only() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("from-file".into()),
                ..ProviderConfig::default()
            },
        );

        config
            .apply_env(env(&[
                ("OPENAI_API_KEY", "from-env"),
                ("DASHSCOPE_API_KEY", "dash"),
                ("GEMINI_API_KEY", "  "),
            ]))
            .unwrap();

        assert_eq!(config.provider("openai").unwrap().api_key.as_deref(), Some("from-file"));
        assert_eq!(config.provider("qwen").unwrap().api_key.as_deref(), Some("dash"));
        assert!(config.provider("gemini").is_none());
    }

    #[test]
    fn env_overrides_scalars() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("SENTIA_DB_PATH", "/tmp/sentia-test.db"),
                ("SENTIA_PROVIDER", "deepseek"),
                ("SENTIA_ENERGY_DECAY_RATE", "0.25"),
                ("SENTIA_CONFIDENCE_THRESHOLD", "0.4"),
            ]))
            .unwrap();

        assert_eq!(config.memory.db_path, PathBuf::from("/tmp/sentia-test.db"));
        assert_eq!(config.agent.provider, "deepseek");
        assert_eq!(config.homeostasis.energy_decay_rate, 0.25);
        assert_eq!(config.homeostasis.confidence_threshold, 0.4);
    }

    #[test]
    fn non_numeric_env_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[("SENTIA_MOOD_STABILITY", "calm")]))
            .unwrap_err();
        assert!(err.to_string().contains("SENTIA_MOOD_STABILITY"));
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "anthropic".into(),
            ProviderConfig {
                api_key: Some("sk-ant-secret".into()),
                ..ProviderConfig::default()
            },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-ant-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("fallback_order"));
        assert!(toml_str.contains("energy_decay_rate"));
    }
}
