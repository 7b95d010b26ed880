//! Convenience re-exports for common use.

pub use crate::config::{BridgeConfig, UpstreamTimeouts};
pub use crate::error::{BridgeError, ErrorCode, Result};
pub use crate::run::{Anomaly, AnomalyKind, RunState, SessionStats};
pub use crate::translator::{translate, translate_with_cancellation, EventStream, Translator};
pub use crate::transport::encode_sse;
pub use crate::types::{Envelope, EventType, Part, ProtocolEvent, Role, ThinkingUsage};
pub use crate::upstream::{AgentEngineSource, EnvelopeSource, EnvelopeStream, RunQuery};
