//! agent-bridge: Agent Engine to AG-UI event translation.
//!
//! Reads the delta stream of a Vertex AI Agent Engine `streamQuery` call and
//! re-emits it as a well-formed sequence of run events: messages and
//! thinking segments are bracketed, tool calls are mirrored with their
//! results, and every run ends with exactly one `RUN_FINISHED` or
//! `RUN_ERROR`.
//!
//! # Quick Start
//!
//! ```no_run
//! use agent_bridge::prelude::*;
//! use futures::StreamExt;
//!
//! # async fn example() -> agent_bridge::error::Result<()> {
//! let source = AgentEngineSource::new(BridgeConfig::from_env()?)?;
//! let query = RunQuery::new("What's the weather in Paris?");
//! let mut events = agent_bridge::translator::run(&source, &query, "thread-1", "run-1").await;
//! while let Some(event) = events.next().await {
//!     print!("{}", encode_sse(&event)?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod prelude;
pub mod run;
pub mod translator;
pub mod transport;
pub mod types;
pub mod upstream;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
