//! CLI driver: stream a live run or replay a recorded envelope log as SSE frames.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::config::{BridgeConfig, UpstreamTimeouts};
use crate::error::Result;
use crate::translator::{self, EventStream, Translator};
use crate::transport::encode_sse;
use crate::types::ProtocolEvent;
use crate::upstream::{decode_reader, AgentEngineSource, RunQuery};

/// Agent Engine to AG-UI event bridge
#[derive(Parser, Debug)]
#[command(name = "agent-bridge", version, about = "Translate Agent Engine streams into run events")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a message to the configured Agent Engine and stream the run
    Run(RunArgs),
    /// Translate a recorded newline-delimited envelope log
    Replay(ReplayArgs),
}

/// Run identifiers; fresh UUIDs when omitted.
#[derive(Args, Debug, Clone, Default)]
pub struct RunIds {
    #[arg(long)]
    pub thread_id: Option<String>,
    #[arg(long)]
    pub run_id: Option<String>,
}

impl RunIds {
    pub fn resolve(self) -> (String, String) {
        let fresh = || uuid::Uuid::new_v4().to_string();
        (
            self.thread_id.unwrap_or_else(fresh),
            self.run_id.unwrap_or_else(fresh),
        )
    }
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Message to send
    pub message: String,

    #[command(flatten)]
    pub ids: RunIds,

    /// Engine-side user (defaults to AGENT_ENGINE_USER_ID or "default-user")
    #[arg(long)]
    pub user_id: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Recorded envelope log, one JSON envelope per line
    pub file: PathBuf,

    #[command(flatten)]
    pub ids: RunIds,
}

/// Outcome of a driven run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Finished,
    Failed,
    /// The event stream ended without a terminal event.
    Interrupted,
}

/// `agent-bridge run`
pub async fn handle_run(args: RunArgs) -> Result<RunOutcome> {
    let (thread_id, run_id) = args.ids.resolve();

    let source = match BridgeConfig::from_env().and_then(AgentEngineSource::new) {
        Ok(source) => source,
        Err(err) => {
            let mut translator = Translator::new(thread_id, run_id);
            let events = futures::stream::iter(translator.fail(&err)).boxed();
            return write_frames(events).await;
        }
    };

    let query = RunQuery::builder()
        .message(args.message)
        .maybe_user_id(args.user_id)
        .build();
    let events = translator::run(&source, &query, thread_id, run_id).await;
    write_frames(events).await
}

/// `agent-bridge replay`
pub async fn handle_replay(args: ReplayArgs) -> Result<RunOutcome> {
    let (thread_id, run_id) = args.ids.resolve();
    let file = tokio::fs::File::open(&args.file).await?;
    let upstream = decode_reader(file, UpstreamTimeouts::default());
    let events = translator::translate(upstream, thread_id, run_id);
    write_frames(events).await
}

/// Write every event to stdout as an SSE frame.
pub async fn write_frames(mut events: EventStream) -> Result<RunOutcome> {
    let mut stdout = tokio::io::stdout();
    let mut outcome = RunOutcome::Interrupted;

    while let Some(event) = events.next().await {
        stdout.write_all(encode_sse(&event)?.as_bytes()).await?;
        stdout.flush().await?;
        match event {
            ProtocolEvent::RunFinished { .. } => outcome = RunOutcome::Finished,
            ProtocolEvent::RunError { .. } => outcome = RunOutcome::Failed,
            _ => {}
        }
    }
    Ok(outcome)
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
