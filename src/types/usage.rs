//! Token usage reported alongside reasoning output.

use serde::{Deserialize, Serialize};

/// Usage counters snapshotted when a thinking segment starts.
///
/// Accepts both the engine's native snake_case spelling and camelCase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingUsage {
    #[serde(default, alias = "thoughts_token_count")]
    pub thoughts_token_count: u64,
    #[serde(default, alias = "total_token_count")]
    pub total_token_count: u64,
    #[serde(default, alias = "candidates_token_count")]
    pub candidates_token_count: u64,
    #[serde(default, alias = "prompt_token_count")]
    pub prompt_token_count: u64,
}

impl ThinkingUsage {
    pub fn with_thoughts(thoughts_token_count: u64) -> Self {
        Self {
            thoughts_token_count,
            ..Default::default()
        }
    }
}
