//! agent-bridge CLI binary entry point.

use std::io;

use agent_bridge::cli::{Cli, Commands, RunOutcome};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // stdout carries the event stream; logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_bridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse_args();

    let result = match cli.command {
        Commands::Run(args) => agent_bridge::cli::handle_run(args).await,
        Commands::Replay(args) => agent_bridge::cli::handle_replay(args).await,
    };

    match result {
        Ok(RunOutcome::Finished) => {}
        Ok(RunOutcome::Failed | RunOutcome::Interrupted) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
