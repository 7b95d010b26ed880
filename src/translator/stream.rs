//! Pull-based stream wrappers around [`Translator`].

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::types::ProtocolEvent;
use crate::upstream::{EnvelopeSource, EnvelopeStream, RunQuery};

use super::Translator;

/// Lazy sequence of translated events for one run.
pub type EventStream = BoxStream<'static, ProtocolEvent>;

/// Translate an upstream envelope stream into protocol events.
///
/// Nothing is read from `upstream` until the returned stream is polled, and
/// dropping it drops `upstream` with it.
pub fn translate(
    upstream: EnvelopeStream,
    thread_id: impl Into<String>,
    run_id: impl Into<String>,
) -> EventStream {
    translate_with_cancellation(upstream, thread_id, run_id, CancellationToken::new())
}

/// Like [`translate`], but stops as soon as `cancel` fires.
///
/// A cancelled run produces no further events; open brackets are left open
/// because nobody is listening for them.
pub fn translate_with_cancellation(
    mut upstream: EnvelopeStream,
    thread_id: impl Into<String>,
    run_id: impl Into<String>,
    cancel: CancellationToken,
) -> EventStream {
    let mut translator = Translator::new(thread_id, run_id);

    let stream = async_stream::stream! {
        'run: loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(run_id = %translator.state().run_id(), "Run cancelled by consumer");
                    break 'run;
                }
                next = upstream.next() => next,
            };

            let events = match next {
                Some(Ok(envelope)) => translator.on_envelope(envelope),
                Some(Err(err)) => translator.fail(&err),
                None => translator.finish(),
            };

            for event in events {
                if cancel.is_cancelled() {
                    break 'run;
                }
                debug!(
                    run_id = %translator.state().run_id(),
                    event_type = %event.event_type(),
                    "Emitting event"
                );
                yield event;
            }

            if translator.is_terminated() {
                break;
            }
        }
        // Close the connection now rather than when the consumer drops us.
        drop(upstream);
    };

    Box::pin(stream)
}

/// Open `source` for `query` and translate the result.
///
/// A failure to connect still yields a complete run: `RUN_STARTED` followed
/// by `RUN_ERROR`.
pub async fn run(
    source: &dyn EnvelopeSource,
    query: &RunQuery,
    thread_id: impl Into<String>,
    run_id: impl Into<String>,
) -> EventStream {
    let thread_id = thread_id.into();
    let run_id = run_id.into();

    match source.open(query).await {
        Ok(upstream) => translate(upstream, thread_id, run_id),
        Err(err) => {
            let mut translator = Translator::new(thread_id, run_id);
            Box::pin(futures::stream::iter(translator.fail(&err)))
        }
    }
}
