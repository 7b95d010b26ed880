//! Unified error classification.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Machine-readable code carried on `RUN_ERROR` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UpstreamUnavailable,
    UpstreamTimeout,
    UpstreamProtocolError,
    /// The engine itself reported an error marker in the stream.
    UpstreamError,
    ConfigurationError,
    InternalError,
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection could not be established or was lost.
    Connection,
    Timeout,
    /// Upstream answered with something we could not parse.
    Protocol,
    Configuration,
    Serialization,
    Io,
}

/// Where in the upstream lifecycle a timeout fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimeoutPhase {
    Connect,
    FirstEnvelope,
    NextEnvelope,
}
