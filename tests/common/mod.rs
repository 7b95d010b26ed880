//! Shared test helpers: scripted upstream and event-sequence checks.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use agent_bridge::error::BridgeError;
use agent_bridge::translator::EventStream;
use agent_bridge::types::*;
use agent_bridge::upstream::{EnvelopeSource, EnvelopeStream, RunQuery};

/// One scripted upstream item.
pub enum Step {
    Envelope(Value),
    Fail(BridgeError),
}

pub fn env(value: Value) -> Step {
    Step::Envelope(value)
}

pub fn fail(err: BridgeError) -> Step {
    Step::Fail(err)
}

/// Build an upstream stream from scripted steps. Nothing follows a failure.
pub fn scripted(steps: Vec<Step>) -> EnvelopeStream {
    let items: Vec<Result<Envelope, BridgeError>> = steps
        .into_iter()
        .map(|step| match step {
            Step::Envelope(value) => {
                Ok(Envelope::from_value(value).expect("scripted envelope decodes"))
            }
            Step::Fail(err) => Err(err),
        })
        .collect();
    futures::stream::iter(items).boxed()
}

/// A source that hands out a prepared stream once, or fails to open.
pub struct ScriptedSource {
    script: Mutex<Option<Result<Vec<Step>, BridgeError>>>,
    pub opens: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(Some(Ok(steps))),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: BridgeError) -> Self {
        Self {
            script: Mutex::new(Some(Err(err))),
            opens: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EnvelopeSource for ScriptedSource {
    async fn open(&self, _query: &RunQuery) -> Result<EnvelopeStream, BridgeError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().take() {
            Some(Ok(steps)) => Ok(scripted(steps)),
            Some(Err(err)) => Err(err),
            None => Err(BridgeError::unavailable("script already consumed")),
        }
    }
}

pub async fn collect(events: EventStream) -> Vec<ProtocolEvent> {
    events.collect().await
}

pub fn types(events: &[ProtocolEvent]) -> Vec<EventType> {
    events.iter().map(ProtocolEvent::event_type).collect()
}

/// Check the structural guarantees every translated run must satisfy.
pub fn assert_well_formed(events: &[ProtocolEvent]) {
    assert!(
        matches!(events.first(), Some(ProtocolEvent::RunStarted { .. })),
        "run must begin with RUN_STARTED: {events:?}"
    );
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1, "exactly one terminal event: {events:?}");
    assert!(
        events.last().is_some_and(ProtocolEvent::is_terminal),
        "terminal event must come last: {events:?}"
    );

    let mut open_message: Option<String> = None;
    let mut open_segment: Option<String> = None;
    let mut seen_messages = HashSet::new();
    let mut seen_segments = HashSet::new();

    for event in events {
        match event {
            ProtocolEvent::MessageStart { message_id, .. } => {
                assert!(open_message.is_none(), "nested message at {message_id}");
                assert!(open_segment.is_none(), "message opened inside thinking");
                assert!(seen_messages.insert(message_id.clone()), "message id reused");
                open_message = Some(message_id.clone());
            }
            ProtocolEvent::MessageContent { message_id, .. } => {
                assert_eq!(open_message.as_ref(), Some(message_id), "content outside its message");
            }
            ProtocolEvent::MessageEnd { message_id } => {
                assert_eq!(open_message.take().as_ref(), Some(message_id), "unbalanced MESSAGE_END");
            }
            ProtocolEvent::ThinkingStart { segment_id, .. } => {
                assert!(open_segment.is_none(), "nested thinking at {segment_id}");
                assert!(open_message.is_none(), "thinking opened inside message");
                assert!(seen_segments.insert(segment_id.clone()), "segment id reused");
                open_segment = Some(segment_id.clone());
            }
            ProtocolEvent::ThinkingContent { segment_id, .. } => {
                assert_eq!(open_segment.as_ref(), Some(segment_id), "thinking content outside segment");
            }
            ProtocolEvent::ThinkingEnd { segment_id, .. } => {
                assert_eq!(open_segment.take().as_ref(), Some(segment_id), "unbalanced THINKING_END");
            }
            e if e.is_terminal() => {
                assert!(open_message.is_none(), "message left open at terminal event");
                assert!(open_segment.is_none(), "thinking left open at terminal event");
            }
            _ => {}
        }
    }
}

/// `matched` flag of every `TOOL_CALL_RESULT`, keyed by tool call id.
pub fn result_matches(events: &[ProtocolEvent]) -> HashMap<String, bool> {
    events
        .iter()
        .filter_map(|e| match e {
            ProtocolEvent::ToolCallResult {
                tool_call_id,
                matched,
                ..
            } => Some((tool_call_id.clone(), *matched)),
            _ => None,
        })
        .collect()
}

pub fn summary(events: &[ProtocolEvent]) -> Option<(u64, u32)> {
    events.iter().find_map(|e| match e {
        ProtocolEvent::SessionSummary {
            total_thinking_tokens,
            total_tool_calls,
            ..
        } => Some((*total_thinking_tokens, *total_tool_calls)),
        _ => None,
    })
}
