// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for every stage of the hook: construction, encoding, submission
//! and shutdown.

/// Errors that prevent a hook from being constructed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("LogDNA API key is required")]
    MissingApiKey,

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to resolve local hostname: {0}")]
    Hostname(String),

    #[error("Failed to start flusher: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Error raised while turning a single record into a [`crate::entry::LogEntry`].
///
/// The record is not enqueued when this happens.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("Message formatter failed: {0}")]
    Formatter(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to serialize line as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of a failed batch submission. The engine decides whether the batch
/// is kept for the next trigger or discarded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("Failed to reach ingestion endpoint: {0}")]
    Transport(String),

    #[error("HTTP error {0}")]
    HttpStatus(u16),

    #[error("Unexpected response from ingestion endpoint: {0}")]
    BadResponse(String),

    #[error("Failed to prepare payload: {0}")]
    Payload(String),
}

/// The final flush performed on shutdown failed. Entries still pending at that
/// point are lost.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to flush {pending} pending entries on shutdown: {source}")]
pub struct ShutdownFlushError {
    pub pending: usize,
    #[source]
    pub source: SubmitError,
}

/// Errors surfaced to callers of the producer-facing API.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    ShutdownFlush(#[from] ShutdownFlushError),

    #[error("Hook is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_error_display() {
        assert_eq!(SubmitError::HttpStatus(503).to_string(), "HTTP error 503");
        assert_eq!(
            SubmitError::BadResponse("response has no 'status' key".to_string()).to_string(),
            "Unexpected response from ingestion endpoint: response has no 'status' key"
        );
    }

    #[test]
    fn test_shutdown_flush_error_keeps_source() {
        let error = ShutdownFlushError {
            pending: 3,
            source: SubmitError::Transport("connection refused".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "Failed to flush 3 pending entries on shutdown: Failed to reach ingestion endpoint: connection refused"
        );
        let source = std::error::Error::source(&error).expect("source should be set");
        assert!(source.to_string().contains("connection refused"));
    }

    #[test]
    fn test_hook_error_is_transparent() {
        let error = HookError::from(SubmitError::HttpStatus(500));
        assert_eq!(error.to_string(), "HTTP error 500");
        assert!(matches!(error, HookError::Submit(SubmitError::HttpStatus(500))));
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::MissingApiKey.to_string(),
            "LogDNA API key is required"
        );
        let error = ConfigError::Invalid("flush interval must be greater than 0".into());
        assert_eq!(
            error.to_string(),
            "Invalid configuration: flush interval must be greater than 0"
        );
    }
}
