//! Run state and session statistics.

pub mod state;
pub mod stats;

pub use state::{Anomaly, AnomalyKind, RunState, ToolCall, ToolCallStatus};
pub use stats::SessionStats;
