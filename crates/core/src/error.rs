//! Error types, one enum per subsystem.

use thiserror::Error;

/// Failures talking to a text-generation backend.
///
/// `NotConfigured` is the configuration class of failure; every other variant
/// is a transport failure. Adapters return these instead of apology strings and
/// the provider chain decides whether to fall back or surface them.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Memory store is closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent is not running")]
    NotRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_names_status_and_body() {
        let err = ProviderError::ApiError {
            status_code: 529,
            message: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "API request failed: overloaded (status: 529)");
    }

    #[test]
    fn closed_store_error_displays_correctly() {
        assert_eq!(MemoryError::Closed.to_string(), "Memory store is closed");
    }

    #[test]
    fn rate_limit_mentions_retry_delay() {
        let err = ProviderError::RateLimited { retry_after_secs: 7 };
        assert_eq!(err.to_string(), "Rate limited by provider, retry after 7s");
    }
}
