//! Per-run state owned by exactly one translator.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tokio::time::Instant;

use crate::types::Role;

/// Lifecycle of a mirrored tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolCallStatus {
    Started,
    Ended,
    ResultReceived,
    /// A result arrived for an id this run never saw start.
    ResultUnmatched,
}

/// A tool call observed in the upstream stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Serialized JSON arguments; empty for unmatched results.
    pub args: String,
    pub status: ToolCallStatus,
}

/// Kinds of non-fatal irregularities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnomalyKind {
    MalformedPart,
    UnmatchedToolResult,
    DuplicateToolCallId,
    DuplicateToolResult,
}

/// A non-fatal irregularity recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpenMessage {
    pub id: String,
    pub role: Role,
}

/// Mutable record for one run.
///
/// Deliberately not `Clone`: a run's state is never copied or shared.
#[derive(Debug)]
pub struct RunState {
    thread_id: String,
    run_id: String,
    started: Option<(Instant, DateTime<Utc>)>,
    pub(crate) open_message: Option<OpenMessage>,
    pub(crate) open_segment: Option<String>,
    tool_calls: HashMap<String, ToolCall>,
    thinking_tokens: u64,
    tool_call_count: u32,
    anomalies: Vec<Anomaly>,
}

impl RunState {
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            started: None,
            open_message: None,
            open_segment: None,
            tool_calls: HashMap::new(),
            thinking_tokens: 0,
            tool_call_count: 0,
            anomalies: Vec::new(),
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Record the start time. Later calls are ignored.
    pub(crate) fn mark_started(&mut self) {
        if self.started.is_none() {
            self.started = Some((Instant::now(), Utc::now()));
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started.map(|(_, at)| at)
    }

    /// Wall-clock time since the run started.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started
            .map(|(instant, _)| instant.elapsed())
            .unwrap_or_default()
    }

    pub fn open_message_id(&self) -> Option<&str> {
        self.open_message.as_ref().map(|m| m.id.as_str())
    }

    pub fn open_segment_id(&self) -> Option<&str> {
        self.open_segment.as_deref()
    }

    pub(crate) fn add_thinking_tokens(&mut self, tokens: u64) {
        self.thinking_tokens = self.thinking_tokens.saturating_add(tokens);
    }

    pub fn thinking_tokens(&self) -> u64 {
        self.thinking_tokens
    }

    pub fn tool_call_count(&self) -> u32 {
        self.tool_call_count
    }

    /// Register a started call. Returns the call it replaced, if the id repeats.
    pub(crate) fn register_tool_call(&mut self, call: ToolCall) -> Option<ToolCall> {
        self.tool_call_count += 1;
        self.tool_calls.insert(call.id.clone(), call)
    }

    pub(crate) fn tool_call_mut(&mut self, id: &str) -> Option<&mut ToolCall> {
        self.tool_calls.get_mut(id)
    }

    pub fn tool_call(&self, id: &str) -> Option<&ToolCall> {
        self.tool_calls.get(id)
    }

    /// Record a result-only call without counting it as started.
    pub(crate) fn register_unmatched(&mut self, call: ToolCall) {
        self.tool_calls.insert(call.id.clone(), call);
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.tool_calls.values()
    }

    pub(crate) fn record_anomaly(&mut self, kind: AnomalyKind, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::warn!(
            thread_id = %self.thread_id,
            run_id = %self.run_id,
            anomaly = %kind,
            detail = %detail,
            "Recorded stream anomaly"
        );
        self.anomalies.push(Anomaly { kind, detail });
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }
}
