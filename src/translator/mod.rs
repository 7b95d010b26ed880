//! Translation of upstream envelopes into protocol events.
//!
//! [`Translator`] is the synchronous state machine: feed it envelopes and it
//! returns the events each one produces. [`translate`] and friends wrap it in
//! a pull-based stream over an [`EnvelopeStream`](crate::upstream::EnvelopeStream).
//!
//! Invariants the machine maintains:
//! - at most one message and at most one thinking segment are open, and never
//!   both at once;
//! - everything opened is closed before the terminal event;
//! - exactly one terminal event (`RUN_FINISHED` or `RUN_ERROR`) is produced,
//!   after which the translator ignores further input.

mod stream;

pub use stream::{run, translate, translate_with_cancellation, EventStream};

use tracing::{debug, error, info};

use crate::error::{BridgeError, ErrorCode};
use crate::run::{AnomalyKind, RunState, SessionStats, ToolCall, ToolCallStatus};
use crate::run::state::OpenMessage;
use crate::types::{
    Envelope, Part, ProtocolEvent, ReasoningDelta, Role, ThinkingStatus, ToolCallRequest,
    ToolCallResult,
};

/// Stateful translator for exactly one run.
#[derive(Debug)]
pub struct Translator {
    state: RunState,
    terminated: bool,
}

impl Translator {
    /// Create a translator with a fresh, exclusively-owned run state.
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            state: RunState::new(thread_id, run_id),
            terminated: false,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Whether a terminal event has been produced.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Translate one envelope.
    ///
    /// Parts after a terminal marker are ignored.
    pub fn on_envelope(&mut self, envelope: Envelope) -> Vec<ProtocolEvent> {
        let mut out = Vec::new();
        if self.terminated {
            debug!(run_id = %self.state.run_id(), "Ignoring envelope after run ended");
            return out;
        }
        self.ensure_started(&mut out);

        let role = envelope.role;
        let part_count = envelope.parts.len();
        for (index, part) in envelope.parts.into_iter().enumerate() {
            match part {
                Part::Text { text } => self.on_text(role, text, &mut out),
                Part::Reasoning(delta) => self.on_reasoning(delta, &mut out),
                Part::ToolCall(call) => self.on_tool_call(call, &mut out),
                Part::ToolResult(result) => self.on_tool_result(result, &mut out),
                Part::Malformed { reason } => {
                    self.state.record_anomaly(AnomalyKind::MalformedPart, reason);
                }
                Part::End => {
                    self.complete(&mut out);
                }
                Part::Error { message } => {
                    self.abort(message, ErrorCode::UpstreamError, &mut out);
                }
            }
            if self.terminated {
                let skipped = part_count - index - 1;
                if skipped > 0 {
                    debug!(run_id = %self.state.run_id(), skipped, "Dropping parts after terminal marker");
                }
                return out;
            }
        }

        if envelope.turn_complete {
            self.close_brackets(&mut out);
        }
        out
    }

    /// The upstream sequence ended; finish the run normally.
    pub fn finish(&mut self) -> Vec<ProtocolEvent> {
        let mut out = Vec::new();
        if self.terminated {
            return out;
        }
        self.ensure_started(&mut out);
        self.complete(&mut out);
        out
    }

    /// The upstream sequence failed; end the run with `RUN_ERROR`.
    pub fn fail(&mut self, err: &BridgeError) -> Vec<ProtocolEvent> {
        let mut out = Vec::new();
        if self.terminated {
            return out;
        }
        self.ensure_started(&mut out);
        self.abort(err.to_string(), err.code(), &mut out);
        out
    }

    fn ensure_started(&mut self, out: &mut Vec<ProtocolEvent>) {
        if self.state.is_started() {
            return;
        }
        self.state.mark_started();
        info!(
            thread_id = %self.state.thread_id(),
            run_id = %self.state.run_id(),
            "Run started"
        );
        out.push(ProtocolEvent::RunStarted {
            thread_id: self.state.thread_id().to_string(),
            run_id: self.state.run_id().to_string(),
        });
    }

    fn on_text(&mut self, role: Role, text: String, out: &mut Vec<ProtocolEvent>) {
        if text.is_empty() {
            return;
        }
        self.close_segment(out);
        if self
            .state
            .open_message
            .as_ref()
            .is_some_and(|open| open.role != role)
        {
            self.close_message(out);
        }

        let message_id = match &self.state.open_message {
            Some(open) => open.id.clone(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                self.state.open_message = Some(OpenMessage {
                    id: id.clone(),
                    role,
                });
                out.push(ProtocolEvent::MessageStart {
                    message_id: id.clone(),
                    role,
                });
                id
            }
        };

        debug!(message_id = %message_id, chars = text.len(), "Message content");
        out.push(ProtocolEvent::MessageContent {
            message_id,
            delta: text,
        });
    }

    fn on_reasoning(&mut self, delta: ReasoningDelta, out: &mut Vec<ProtocolEvent>) {
        self.close_message(out);

        let segment_id = match &self.state.open_segment {
            Some(id) => id.clone(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                self.state.open_segment = Some(id.clone());
                self.state
                    .add_thinking_tokens(delta.usage.thoughts_token_count);
                info!(
                    run_id = %self.state.run_id(),
                    segment_id = %id,
                    thoughts_token_count = delta.usage.thoughts_token_count,
                    model = %delta.model,
                    "Thinking started"
                );
                out.push(ProtocolEvent::ThinkingStart {
                    segment_id: id.clone(),
                    usage: delta.usage,
                    model: delta.model,
                });
                id
            }
        };

        if let Some(text) = delta.text {
            out.push(ProtocolEvent::ThinkingContent {
                segment_id,
                delta: text,
            });
        }
        if delta.complete {
            self.close_segment(out);
        }
    }

    fn on_tool_call(&mut self, call: ToolCallRequest, out: &mut Vec<ProtocolEvent>) {
        self.close_brackets(out);

        let args = call.args.to_string();
        let replaced = self.state.register_tool_call(ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            args: args.clone(),
            status: ToolCallStatus::Started,
        });
        // A placeholder left by an earlier unmatched result is not a prior start.
        if replaced.is_some_and(|prev| prev.status != ToolCallStatus::ResultUnmatched) {
            self.state.record_anomaly(
                AnomalyKind::DuplicateToolCallId,
                format!("tool call id {} started more than once", call.id),
            );
        }

        info!(
            run_id = %self.state.run_id(),
            tool_call_id = %call.id,
            tool_name = %call.name,
            "Tool call observed"
        );
        out.push(ProtocolEvent::ToolCallStart {
            tool_call_id: call.id.clone(),
            tool_call_name: call.name,
        });
        out.push(ProtocolEvent::ToolCallArgs {
            tool_call_id: call.id.clone(),
            args,
        });
        out.push(ProtocolEvent::ToolCallEnd {
            tool_call_id: call.id.clone(),
        });

        if let Some(registered) = self.state.tool_call_mut(&call.id) {
            registered.status = ToolCallStatus::Ended;
        }
    }

    fn on_tool_result(&mut self, result: ToolCallResult, out: &mut Vec<ProtocolEvent>) {
        self.close_brackets(out);

        let matched = match self.state.tool_call(&result.id).map(|call| call.status) {
            None | Some(ToolCallStatus::ResultUnmatched) => false,
            Some(previous) => {
                if let Some(call) = self.state.tool_call_mut(&result.id) {
                    call.status = ToolCallStatus::ResultReceived;
                }
                if previous == ToolCallStatus::ResultReceived {
                    self.state.record_anomaly(
                        AnomalyKind::DuplicateToolResult,
                        format!("tool call {} received more than one result", result.id),
                    );
                }
                true
            }
        };

        if !matched {
            self.state.register_unmatched(ToolCall {
                id: result.id.clone(),
                name: result.name.clone().unwrap_or_else(|| "unknown".to_string()),
                args: String::new(),
                status: ToolCallStatus::ResultUnmatched,
            });
            self.state.record_anomaly(
                AnomalyKind::UnmatchedToolResult,
                format!("result for tool call {} without a prior start", result.id),
            );
        }

        info!(
            run_id = %self.state.run_id(),
            tool_call_id = %result.id,
            matched,
            "Tool result observed"
        );
        out.push(ProtocolEvent::ToolCallResult {
            message_id: uuid::Uuid::new_v4().to_string(),
            tool_call_id: result.id,
            content: result.response.to_string(),
            matched,
            role: Role::Tool,
        });
    }

    /// End path: close brackets, summarize, finish.
    fn complete(&mut self, out: &mut Vec<ProtocolEvent>) {
        self.close_brackets(out);

        let stats = SessionStats::finalize(&self.state);
        info!(
            thread_id = %stats.thread_id,
            run_id = %stats.run_id,
            thinking_tokens = stats.total_thinking_tokens,
            tool_calls = stats.total_tool_calls,
            duration_seconds = stats.duration_seconds(),
            anomalies = self.state.anomalies().len(),
            "Run finished"
        );
        out.push(stats.to_event());
        out.push(ProtocolEvent::RunFinished {
            thread_id: self.state.thread_id().to_string(),
            run_id: self.state.run_id().to_string(),
        });
        self.terminated = true;
    }

    /// Error path: close brackets, report the failure.
    fn abort(&mut self, message: String, code: ErrorCode, out: &mut Vec<ProtocolEvent>) {
        self.close_brackets(out);

        error!(
            thread_id = %self.state.thread_id(),
            run_id = %self.state.run_id(),
            code = %code,
            error = %message,
            "Run failed"
        );
        out.push(ProtocolEvent::RunError {
            thread_id: self.state.thread_id().to_string(),
            run_id: self.state.run_id().to_string(),
            message,
            code,
        });
        self.terminated = true;
    }

    fn close_brackets(&mut self, out: &mut Vec<ProtocolEvent>) {
        self.close_segment(out);
        self.close_message(out);
    }

    fn close_message(&mut self, out: &mut Vec<ProtocolEvent>) {
        if let Some(open) = self.state.open_message.take() {
            out.push(ProtocolEvent::MessageEnd {
                message_id: open.id,
            });
        }
    }

    fn close_segment(&mut self, out: &mut Vec<ProtocolEvent>) {
        if let Some(segment_id) = self.state.open_segment.take() {
            out.push(ProtocolEvent::ThinkingEnd {
                segment_id,
                status: ThinkingStatus::Completed,
            });
        }
    }
}
