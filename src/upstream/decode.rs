//! Line framing and envelope decoding over a raw byte stream.

use std::fmt::Display;

use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio::time::Instant;
use tokio_util::io::ReaderStream;
use tracing::{debug, trace, warn};

use crate::config::UpstreamTimeouts;
use crate::error::{BridgeError, TimeoutPhase};
use crate::types::{Envelope, Part};

use super::http::{parse_sse_data, SseLine};
use super::EnvelopeStream;

const RAW_TARGET: &str = "agent_bridge::upstream::raw";

/// Longest line the decoder buffers before giving up on the body.
pub const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

enum LineOutcome {
    Skip,
    Envelope(Envelope),
    Done,
    Fatal(BridgeError),
}

/// Decode a chunked byte stream into envelopes.
///
/// Applies `timeouts.first_envelope` until the first envelope and
/// `timeouts.next_envelope` between envelopes. Time the consumer spends
/// before pulling the next item does not count against the gap. A line
/// longer than [`MAX_LINE_BYTES`] fails the stream.
pub fn decode_envelopes<S, B, E>(bytes: S, timeouts: UpstreamTimeouts) -> EnvelopeStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    decode_envelopes_with_limit(bytes, timeouts, MAX_LINE_BYTES)
}

pub(crate) fn decode_envelopes_with_limit<S, B, E>(
    bytes: S,
    timeouts: UpstreamTimeouts,
    max_line_bytes: usize,
) -> EnvelopeStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let stream = async_stream::stream! {
        futures::pin_mut!(bytes);
        let mut buffer: Vec<u8> = Vec::new();
        // Prefix of `buffer` already searched for a newline.
        let mut scanned = 0usize;
        let mut decoded = 0usize;
        let mut interval = timeouts.first_envelope;
        let mut deadline = Instant::now() + interval;
        let mut eof = false;

        'read: loop {
            let mut start = 0usize;
            while let Some(offset) = buffer[scanned..].iter().position(|b| *b == b'\n') {
                let end = scanned + offset + 1;
                if end - start - 1 > max_line_bytes {
                    yield Err(line_too_long(max_line_bytes));
                    break 'read;
                }
                let outcome = decode_line(&buffer[start..end], decoded == 0);
                start = end;
                scanned = end;
                match outcome {
                    LineOutcome::Skip => {}
                    LineOutcome::Envelope(envelope) => {
                        decoded += 1;
                        yield Ok(envelope);
                        interval = timeouts.next_envelope;
                        deadline = Instant::now() + interval;
                    }
                    LineOutcome::Done => {
                        debug!(envelopes = decoded, "Upstream sent [DONE]");
                        yield Ok(Envelope::new(vec![Part::End]));
                        break 'read;
                    }
                    LineOutcome::Fatal(err) => {
                        yield Err(err);
                        break 'read;
                    }
                }
            }
            buffer.drain(..start);
            scanned = buffer.len();

            if buffer.len() > max_line_bytes {
                yield Err(line_too_long(max_line_bytes));
                break;
            }

            if eof {
                if buffer.is_empty() {
                    debug!(envelopes = decoded, "Upstream body ended");
                    break;
                }
                // Final line without a trailing newline.
                buffer.push(b'\n');
                continue;
            }

            match tokio::time::timeout_at(deadline, bytes.next()).await {
                Err(_) => {
                    let phase = if decoded == 0 {
                        TimeoutPhase::FirstEnvelope
                    } else {
                        TimeoutPhase::NextEnvelope
                    };
                    yield Err(BridgeError::timeout(phase, interval));
                    break;
                }
                Ok(None) => eof = true,
                Ok(Some(Err(e))) => {
                    yield Err(BridgeError::unavailable(format!("connection lost: {e}")));
                    break;
                }
                Ok(Some(Ok(chunk))) => buffer.extend_from_slice(chunk.as_ref()),
            }
        }
    };

    Box::pin(stream)
}

/// Decode a recorded envelope log (one envelope per line) from any reader.
pub fn decode_reader<R>(reader: R, timeouts: UpstreamTimeouts) -> EnvelopeStream
where
    R: AsyncRead + Send + 'static,
{
    decode_envelopes(ReaderStream::new(reader), timeouts)
}

fn decode_line(raw: &[u8], first: bool) -> LineOutcome {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line,
        Err(e) => return malformed_envelope(format!("line is not valid UTF-8: {e}"), first),
    };
    trace!(target: RAW_TARGET, line = line.trim_end(), "upstream line");

    match parse_sse_data(line) {
        SseLine::Skip => LineOutcome::Skip,
        SseLine::Done => LineOutcome::Done,
        SseLine::Data(data) => match Envelope::from_json(data) {
            Ok(envelope) => LineOutcome::Envelope(envelope),
            Err(BridgeError::UpstreamProtocolError(reason)) => malformed_envelope(reason, first),
            Err(other) => LineOutcome::Fatal(other),
        },
    }
}

fn line_too_long(max_line_bytes: usize) -> BridgeError {
    warn!(max_line_bytes, "Upstream line exceeds the buffer limit");
    BridgeError::UpstreamProtocolError(format!("upstream line exceeds {max_line_bytes} bytes"))
}

/// The first envelope must parse; later bad envelopes are skipped.
fn malformed_envelope(reason: String, first: bool) -> LineOutcome {
    if first {
        LineOutcome::Fatal(BridgeError::UpstreamProtocolError(format!(
            "first envelope is malformed: {reason}"
        )))
    } else {
        warn!(reason = %reason, "Skipping malformed upstream envelope");
        LineOutcome::Skip
    }
}
