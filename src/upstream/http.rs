//! HTTP helpers shared by upstream sources: headers, SSE line parsing, and
//! status/transport error mapping.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::error::{BridgeError, TimeoutPhase};

/// What one line of the response body carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// A JSON payload, with any `data:` prefix removed.
    Data(&'a str),
    /// `[DONE]` sentinel.
    Done,
    /// Blank line, comment, or a field we don't use.
    Skip,
}

/// Build request headers, adding a Bearer token when one is configured.
pub fn bearer_headers(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/event-stream, application/json"),
    );
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        if let Ok(val) = HeaderValue::from_str(&format!("Bearer {token}")) {
            headers.insert(AUTHORIZATION, val);
        }
    }
    headers
}

/// Classify one body line.
///
/// Lines are either bare JSON (newline-delimited) or SSE `data:` fields.
pub fn parse_sse_data(line: &str) -> SseLine<'_> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }
    let data = match line.strip_prefix("data:") {
        Some(data) => data.trim_start(),
        None if is_sse_field(line) => return SseLine::Skip,
        None => line,
    };
    match data {
        "" => SseLine::Skip,
        "[DONE]" => SseLine::Done,
        data => SseLine::Data(data),
    }
}

fn is_sse_field(line: &str) -> bool {
    ["event:", "id:", "retry:"]
        .iter()
        .any(|field| line.starts_with(field))
}

/// Map a non-success status into an error.
pub fn status_to_error(status: u16, body: &str) -> BridgeError {
    let body = body.trim();
    let message = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {}", extract_error_message(body))
    };
    BridgeError::unavailable_with_status(status, message)
}

/// Map a transport failure during connection establishment.
pub fn connect_error(err: reqwest::Error, timeout: std::time::Duration) -> BridgeError {
    if err.is_timeout() {
        BridgeError::timeout(TimeoutPhase::Connect, timeout)
    } else {
        BridgeError::unavailable(format!("connection failed: {err}"))
    }
}

fn extract_error_message(body: &str) -> String {
    // Google APIs wrap failures as {"error": {"message": ...}}
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}
