//! Wire framing for outbound events.

use futures::stream::BoxStream;
use futures::StreamExt;

use crate::error::Result;
use crate::types::ProtocolEvent;

/// Frame one event as a server-sent event: `data: <json>\n\n`.
pub fn encode_sse(event: &ProtocolEvent) -> Result<String> {
    let json = serde_json::to_string(event)?;
    Ok(format!("data: {json}\n\n"))
}

/// Frame a whole event stream.
pub fn sse_frames(
    events: BoxStream<'static, ProtocolEvent>,
) -> BoxStream<'static, Result<String>> {
    events.map(|event| encode_sse(&event)).boxed()
}
