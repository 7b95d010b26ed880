//! Upstream envelope sources.
//!
//! A source opens one lazy sequence of [`Envelope`]s per run. `Ok` items are
//! envelopes; an `Err` item is a terminal failure and nothing follows it;
//! exhaustion is a normal end.

pub mod agent_engine;
pub mod decode;
pub mod http;

pub use agent_engine::AgentEngineSource;
pub use decode::{decode_envelopes, decode_reader};

use async_trait::async_trait;
use bon::Builder;
use futures::stream::BoxStream;

use crate::error::BridgeError;
use crate::types::Envelope;

/// Lazy, cancellable sequence of upstream envelopes.
///
/// Dropping the stream releases the underlying connection.
pub type EnvelopeStream = BoxStream<'static, Result<Envelope, BridgeError>>;

/// Parameters for one upstream query.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct RunQuery {
    #[builder(into)]
    pub message: String,
    /// Engine-side user; the source's default applies when unset.
    #[builder(into)]
    pub user_id: Option<String>,
}

impl RunQuery {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            user_id: None,
        }
    }
}

/// Opens envelope streams for runs.
#[async_trait]
pub trait EnvelopeSource: Send + Sync {
    /// Establish the connection and return the envelope sequence.
    ///
    /// Failures here happen before any envelope exists; the caller still owes
    /// the client a started-and-errored run.
    async fn open(&self, query: &RunQuery) -> Result<EnvelopeStream, BridgeError>;
}
