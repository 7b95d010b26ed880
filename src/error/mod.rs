//! Error types for the bridge.

pub mod unified;

pub use unified::{ErrorCategory, ErrorCode, TimeoutPhase};

use thiserror::Error;

/// Primary error type for all bridge operations.
///
/// Only fatal conditions live here. Irregularities the translator tolerates
/// (malformed parts, unmatched tool results) are recorded as
/// [`Anomaly`](crate::run::Anomaly) values instead.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable {
        message: String,
        status: Option<u16>,
    },

    #[error("Upstream timed out after {timeout_ms}ms ({phase})")]
    UpstreamTimeout { phase: TimeoutPhase, timeout_ms: u64 },

    #[error("Upstream protocol error: {0}")]
    UpstreamProtocolError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Connection-level failure without an HTTP status.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
            status: None,
        }
    }

    /// Connection-level failure carrying the HTTP status the engine returned.
    pub fn unavailable_with_status(status: u16, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn timeout(phase: TimeoutPhase, duration: std::time::Duration) -> Self {
        Self::UpstreamTimeout {
            phase,
            timeout_ms: duration.as_millis() as u64,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::UpstreamUnavailable { .. } => ErrorCategory::Connection,
            Self::UpstreamTimeout { .. } => ErrorCategory::Timeout,
            Self::UpstreamProtocolError(_) => ErrorCategory::Protocol,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Io(_) => ErrorCategory::Io,
        }
    }

    /// Code reported to the client on `RUN_ERROR`.
    pub fn code(&self) -> ErrorCode {
        match self.category() {
            ErrorCategory::Connection => ErrorCode::UpstreamUnavailable,
            ErrorCategory::Timeout => ErrorCode::UpstreamTimeout,
            ErrorCategory::Protocol => ErrorCode::UpstreamProtocolError,
            ErrorCategory::Configuration => ErrorCode::ConfigurationError,
            ErrorCategory::Serialization | ErrorCategory::Io => ErrorCode::InternalError,
        }
    }

    /// Whether establishing the connection again could succeed.
    ///
    /// Only consulted before the first byte of a run's body is read.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UpstreamUnavailable { status: None, .. } => true,
            Self::UpstreamUnavailable {
                status: Some(status),
                ..
            } => *status == 429 || (500..=599).contains(status),
            Self::UpstreamTimeout { phase, .. } => *phase == TimeoutPhase::Connect,
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BridgeError>;
