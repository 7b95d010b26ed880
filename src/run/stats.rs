//! Session statistics computed once when a run ends.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::ProtocolEvent;

use super::state::RunState;

/// Immutable aggregate of one finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    pub thread_id: String,
    pub run_id: String,
    pub total_thinking_tokens: u64,
    pub total_tool_calls: u32,
    pub duration: Duration,
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionStats {
    /// Read the counters of `state`. Performs no side effects.
    pub fn finalize(state: &RunState) -> Self {
        Self {
            thread_id: state.thread_id().to_string(),
            run_id: state.run_id().to_string(),
            total_thinking_tokens: state.thinking_tokens(),
            total_tool_calls: state.tool_call_count(),
            duration: state.elapsed(),
            started_at: state.started_at(),
        }
    }

    /// Duration in seconds, rounded to two decimals.
    pub fn duration_seconds(&self) -> f64 {
        (self.duration.as_secs_f64() * 100.0).round() / 100.0
    }

    pub fn to_event(&self) -> ProtocolEvent {
        ProtocolEvent::SessionSummary {
            thread_id: self.thread_id.clone(),
            run_id: self.run_id.clone(),
            total_thinking_tokens: self.total_thinking_tokens,
            total_tool_calls: self.total_tool_calls,
            duration_seconds: self.duration_seconds(),
        }
    }
}
