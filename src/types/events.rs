//! Outbound protocol events.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumDiscriminants};

use crate::error::ErrorCode;

use super::role::Role;
use super::usage::ThinkingUsage;

/// Lifecycle status carried on `THINKING_END`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThinkingStatus {
    Started,
    Completed,
}

/// One event in the translated output sequence.
///
/// Serializes with a `type` tag and camelCase fields, e.g.
/// `{"type":"MESSAGE_CONTENT","messageId":"…","delta":"Hi"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[strum_discriminants(name(EventType), derive(Display, Hash))]
#[strum_discriminants(strum(serialize_all = "SCREAMING_SNAKE_CASE"))]
pub enum ProtocolEvent {
    #[serde(rename_all = "camelCase")]
    RunStarted { thread_id: String, run_id: String },

    #[serde(rename_all = "camelCase")]
    MessageStart { message_id: String, role: Role },

    #[serde(rename_all = "camelCase")]
    MessageContent { message_id: String, delta: String },

    #[serde(rename_all = "camelCase")]
    MessageEnd { message_id: String },

    #[serde(rename_all = "camelCase")]
    ThinkingStart {
        segment_id: String,
        #[serde(flatten)]
        usage: ThinkingUsage,
        model: String,
    },

    #[serde(rename_all = "camelCase")]
    ThinkingContent { segment_id: String, delta: String },

    #[serde(rename_all = "camelCase")]
    ThinkingEnd {
        segment_id: String,
        status: ThinkingStatus,
    },

    #[serde(rename_all = "camelCase")]
    ToolCallStart {
        tool_call_id: String,
        tool_call_name: String,
    },

    /// Arguments as a serialized JSON string.
    #[serde(rename_all = "camelCase")]
    ToolCallArgs { tool_call_id: String, args: String },

    #[serde(rename_all = "camelCase")]
    ToolCallEnd { tool_call_id: String },

    /// `matched` is false when no `TOOL_CALL_START` for this id was seen in the run.
    #[serde(rename_all = "camelCase")]
    ToolCallResult {
        message_id: String,
        tool_call_id: String,
        content: String,
        matched: bool,
        role: Role,
    },

    #[serde(rename_all = "camelCase")]
    SessionSummary {
        thread_id: String,
        run_id: String,
        total_thinking_tokens: u64,
        total_tool_calls: u32,
        duration_seconds: f64,
    },

    #[serde(rename_all = "camelCase")]
    RunFinished { thread_id: String, run_id: String },

    #[serde(rename_all = "camelCase")]
    RunError {
        thread_id: String,
        run_id: String,
        message: String,
        code: ErrorCode,
    },
}

impl ProtocolEvent {
    pub fn event_type(&self) -> EventType {
        EventType::from(self)
    }

    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunFinished { .. } | Self::RunError { .. })
    }
}
