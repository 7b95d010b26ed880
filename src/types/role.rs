//! Message roles.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Author of a text message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Assistant,
    User,
    Tool,
    System,
}

impl Role {
    /// Map an engine content role onto a protocol role.
    ///
    /// The engine labels generated output `model`; anything unknown is
    /// treated as assistant output.
    pub fn from_upstream(role: &str) -> Self {
        match role {
            "user" => Self::User,
            "tool" | "function" => Self::Tool,
            "system" => Self::System,
            _ => Self::Assistant,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Assistant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_model_role_maps_to_assistant() {
        assert_eq!(Role::from_upstream("model"), Role::Assistant);
        assert_eq!(Role::from_upstream("function"), Role::Tool);
        assert_eq!(Role::from_upstream("user"), Role::User);
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
