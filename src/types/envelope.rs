//! Upstream envelopes and their typed parts.
//!
//! The engine streams one JSON object per line. Each object is decoded into
//! an [`Envelope`] holding zero or more [`Part`]s. Decoding of the envelope
//! itself is strict (a non-object is a protocol error); decoding of each part
//! is lenient, so one bad part becomes [`Part::Malformed`] and the rest of the
//! envelope survives.

use serde_json::{Map, Value};

use crate::error::BridgeError;

use super::role::Role;
use super::usage::ThinkingUsage;

const UNKNOWN_MODEL: &str = "unknown";
const UNKNOWN_TOOL: &str = "unknown";

/// One unit of the upstream delta stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Envelope {
    /// Engine-assigned event id, when present.
    pub id: Option<String>,
    /// Role applied to text parts in this envelope.
    pub role: Role,
    pub parts: Vec<Part>,
    /// The engine marked the end of a turn after these parts.
    pub turn_complete: bool,
}

/// One typed fragment within an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text { text: String },
    Reasoning(ReasoningDelta),
    ToolCall(ToolCallRequest),
    ToolResult(ToolCallResult),
    /// Normal end of the run.
    End,
    /// The engine reported a failure.
    Error { message: String },
    /// A part that did not match any known shape.
    Malformed { reason: String },
}

/// Reasoning output with its usage snapshot already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningDelta {
    pub text: Option<String>,
    pub usage: ThinkingUsage,
    pub model: String,
    /// Explicit "reasoning complete" signal.
    pub complete: bool,
}

/// A tool invocation the engine made.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub args: Value,
}

/// The result of a tool invocation, as reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub id: String,
    pub name: Option<String>,
    pub response: Value,
}

/// Envelope-level metadata that parts fall back to.
#[derive(Debug, Default)]
struct EnvelopeContext {
    usage: Option<ThinkingUsage>,
    model: Option<String>,
}

impl Envelope {
    pub fn new(parts: Vec<Part>) -> Self {
        Self {
            parts,
            ..Default::default()
        }
    }

    /// Parse one line of upstream JSON.
    pub fn from_json(line: &str) -> Result<Self, BridgeError> {
        let value: Value = serde_json::from_str(line).map_err(|e| {
            BridgeError::UpstreamProtocolError(format!("invalid JSON envelope: {e}"))
        })?;
        Self::from_value(value)
    }

    /// Decode an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, BridgeError> {
        let Value::Object(mut obj) = value else {
            return Err(protocol_error("envelope is not a JSON object"));
        };

        let (role, raw_parts) = match obj.remove("content") {
            None | Some(Value::Null) => (Role::Assistant, take_parts(obj.remove("parts"))?),
            Some(Value::Object(mut content)) => {
                let role = content
                    .get("role")
                    .and_then(Value::as_str)
                    .map(Role::from_upstream)
                    .unwrap_or_default();
                (role, take_parts(content.remove("parts"))?)
            }
            Some(_) => return Err(protocol_error("`content` is not an object")),
        };

        let context = EnvelopeContext {
            usage: field(&obj, "usage_metadata", "usageMetadata")
                .and_then(|u| serde_json::from_value(u.clone()).ok()),
            model: field(&obj, "model_version", "modelVersion")
                .and_then(Value::as_str)
                .map(String::from),
        };

        let mut parts = Vec::with_capacity(raw_parts.len());
        for raw in raw_parts {
            decode_part(raw, &context, &mut parts);
        }

        parts.extend(error_marker(obj.get("error")));
        parts.extend(end_marker(obj.get("end")));

        Ok(Self {
            id: obj.get("id").and_then(Value::as_str).map(String::from),
            role,
            parts,
            turn_complete: is_true(field(&obj, "turn_complete", "turnComplete")),
        })
    }

    /// Whether any part ends the run.
    pub fn is_terminal(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, Part::End | Part::Error { .. }))
    }
}

fn take_parts(parts: Option<Value>) -> Result<Vec<Value>, BridgeError> {
    match parts {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(parts)) => Ok(parts),
        Some(_) => Err(protocol_error("`parts` is not an array")),
    }
}

fn decode_part(raw: Value, context: &EnvelopeContext, out: &mut Vec<Part>) {
    let Value::Object(part) = raw else {
        out.push(malformed("part is not an object"));
        return;
    };

    if let Some(marker) = end_marker(part.get("end")) {
        out.push(marker);
        return;
    }
    if let Some(marker) = error_marker(part.get("error")) {
        out.push(marker);
        return;
    }
    if is_true(part.get("thought")) {
        out.push(Part::Reasoning(reasoning_from(&part, context)));
        return;
    }

    let decoded = if let Some(text) = part.get("text") {
        match text.as_str() {
            Some(text) => Part::Text {
                text: text.to_string(),
            },
            None => malformed("`text` is not a string"),
        }
    } else if let Some(call) = field(&part, "function_call", "functionCall") {
        tool_call_from(call)
    } else if let Some(response) = field(&part, "function_response", "functionResponse") {
        tool_result_from(response)
    } else if !part.is_empty() && part.keys().all(|k| k == "end" || k == "error") {
        // Only inert markers such as `"end": false`.
        return;
    } else {
        let keys: Vec<&str> = part.keys().map(String::as_str).collect();
        malformed(format!("unrecognized part with keys [{}]", keys.join(", ")))
    };

    // A thought signature means the engine reasoned before producing this part.
    // Signed empty text is not counted.
    let signed = field(&part, "thought_signature", "thoughtSignature").is_some();
    let carries_output = match &decoded {
        Part::Malformed { .. } => false,
        Part::Text { text } => !text.is_empty(),
        _ => true,
    };
    if signed && carries_output {
        out.push(Part::Reasoning(ReasoningDelta {
            text: None,
            usage: context.usage.unwrap_or_default(),
            model: context.model.clone().unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
            complete: false,
        }));
    }
    out.push(decoded);
}

fn reasoning_from(part: &Map<String, Value>, context: &EnvelopeContext) -> ReasoningDelta {
    let usage = part
        .get("usage")
        .and_then(|u| serde_json::from_value(u.clone()).ok())
        .or(context.usage)
        .unwrap_or_default();
    let model = part
        .get("model")
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| context.model.clone())
        .unwrap_or_else(|| UNKNOWN_MODEL.to_string());

    ReasoningDelta {
        text: part
            .get("text")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(String::from),
        usage,
        model,
        complete: is_true(part.get("complete")),
    }
}

fn tool_call_from(call: &Value) -> Part {
    let Some(call) = call.as_object() else {
        return malformed("function call is not an object");
    };
    let args = match call.get("args") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(args) => args.clone(),
    };
    Part::ToolCall(ToolCallRequest {
        id: id_or_generated(call),
        name: call
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_TOOL)
            .to_string(),
        args,
    })
}

fn tool_result_from(response: &Value) -> Part {
    let Some(response) = response.as_object() else {
        return malformed("function response is not an object");
    };
    Part::ToolResult(ToolCallResult {
        id: id_or_generated(response),
        name: response
            .get("name")
            .and_then(Value::as_str)
            .map(String::from),
        response: response
            .get("response")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
    })
}

fn id_or_generated(obj: &Map<String, Value>) -> String {
    obj.get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// `"end": true` ends the run; `false` and `null` are inert.
fn end_marker(value: Option<&Value>) -> Option<Part> {
    match value? {
        Value::Bool(true) => Some(Part::End),
        Value::Bool(false) | Value::Null => None,
        _ => Some(malformed("`end` marker is not a boolean")),
    }
}

/// Only a string or object reports a failure; `null` is inert.
fn error_marker(value: Option<&Value>) -> Option<Part> {
    match value? {
        error @ (Value::String(_) | Value::Object(_)) => Some(Part::Error {
            message: error_message(error),
        }),
        Value::Null => None,
        _ => Some(malformed("`error` marker is not a string or object")),
    }
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

/// Look up a key under its snake_case or camelCase spelling.
fn field<'a>(obj: &'a Map<String, Value>, snake: &str, camel: &str) -> Option<&'a Value> {
    obj.get(snake).or_else(|| obj.get(camel))
}

fn is_true(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Bool(true)))
}

fn malformed(reason: impl Into<String>) -> Part {
    Part::Malformed {
        reason: reason.into(),
    }
}

fn protocol_error(message: &str) -> BridgeError {
    BridgeError::UpstreamProtocolError(message.to_string())
}
