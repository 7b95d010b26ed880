//! Bridge configuration (layered: code > env / TOML file > defaults).

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

const DEFAULT_LOCATION: &str = "us-central1";
const DEFAULT_USER_ID: &str = "default-user";
const DEFAULT_CONNECT_ATTEMPTS: u32 = 3;

/// Per-phase upstream timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamTimeouts {
    /// Establishing the connection, up to response headers.
    #[serde(with = "secs")]
    pub connect: Duration,
    /// From connection to the first envelope.
    #[serde(with = "secs")]
    pub first_envelope: Duration,
    /// Maximum gap between consecutive envelopes.
    #[serde(with = "secs")]
    pub next_envelope: Duration,
}

impl Default for UpstreamTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            first_envelope: Duration::from_secs(60),
            next_envelope: Duration::from_secs(60),
        }
    }
}

/// Settings for reaching one Agent Engine deployment.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub project_id: String,
    #[serde(default = "default_location")]
    pub location: String,
    pub agent_engine_resource_id: String,
    #[serde(default)]
    pub access_token: Option<String>,
    /// Replaces `https://{location}-aiplatform.googleapis.com`.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub timeouts: UpstreamTimeouts,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .field("agent_engine_resource_id", &self.agent_engine_resource_id)
            .field("access_token", &self.access_token.as_ref().map(|_| ".."))
            .field("base_url", &self.base_url)
            .field("user_id", &self.user_id)
            .field("timeouts", &self.timeouts)
            .field("connect_attempts", &self.connect_attempts)
            .finish()
    }
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

fn default_connect_attempts() -> u32 {
    DEFAULT_CONNECT_ATTEMPTS
}

impl BridgeConfig {
    /// Config with defaults for everything but the deployment identity.
    pub fn new(project_id: impl Into<String>, agent_engine_resource_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: default_location(),
            agent_engine_resource_id: agent_engine_resource_id.into(),
            access_token: None,
            base_url: None,
            user_id: default_user_id(),
            timeouts: UpstreamTimeouts::default(),
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_timeouts(mut self, timeouts: UpstreamTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts;
        self
    }

    /// Load from environment variables (`GCP_PROJECT_ID`, `AGENT_ENGINE_RESOURCE_ID`, ...).
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self, BridgeError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error

        let mut config = Self::new(
            required_env("GCP_PROJECT_ID")?,
            required_env("AGENT_ENGINE_RESOURCE_ID")?,
        );
        if let Some(location) = env_var("GCP_LOCATION") {
            config.location = location;
        }
        config.access_token = env_var("AGENT_ENGINE_ACCESS_TOKEN");
        config.base_url = env_var("AGENT_ENGINE_BASE_URL");
        if let Some(user_id) = env_var("AGENT_ENGINE_USER_ID") {
            config.user_id = user_id;
        }
        if let Some(secs) = parsed_env::<f64>("BRIDGE_CONNECT_TIMEOUT_SECS")? {
            config.timeouts.connect = secs_to_duration("BRIDGE_CONNECT_TIMEOUT_SECS", secs)?;
        }
        if let Some(secs) = parsed_env::<f64>("BRIDGE_FIRST_ENVELOPE_TIMEOUT_SECS")? {
            config.timeouts.first_envelope =
                secs_to_duration("BRIDGE_FIRST_ENVELOPE_TIMEOUT_SECS", secs)?;
        }
        if let Some(secs) = parsed_env::<f64>("BRIDGE_ENVELOPE_TIMEOUT_SECS")? {
            config.timeouts.next_envelope =
                secs_to_duration("BRIDGE_ENVELOPE_TIMEOUT_SECS", secs)?;
        }
        if let Some(attempts) = parsed_env::<u32>("BRIDGE_CONNECT_ATTEMPTS")? {
            config.connect_attempts = attempts;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file with the same field names as this struct.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text).map_err(|e| {
            BridgeError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could succeed with.
    pub fn validate(&self) -> Result<(), BridgeError> {
        for (name, value) in [
            ("project_id", &self.project_id),
            ("location", &self.location),
            ("agent_engine_resource_id", &self.agent_engine_resource_id),
        ] {
            if value.trim().is_empty() {
                return Err(BridgeError::Configuration(format!("{name} must not be empty")));
            }
        }
        if self.connect_attempts == 0 {
            return Err(BridgeError::Configuration(
                "connect_attempts must be at least 1".to_string(),
            ));
        }
        let UpstreamTimeouts {
            connect,
            first_envelope,
            next_envelope,
        } = self.timeouts;
        if connect.is_zero() || first_envelope.is_zero() || next_envelope.is_zero() {
            return Err(BridgeError::Configuration(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The `streamQuery` URL for this deployment.
    pub fn endpoint_url(&self) -> String {
        let base = match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        };
        format!(
            "{base}/v1/projects/{}/locations/{}/reasoningEngines/{}:streamQuery?alt=sse",
            self.project_id, self.location, self.agent_engine_resource_id
        )
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_env(name: &str) -> Result<String, BridgeError> {
    env_var(name).ok_or_else(|| BridgeError::Configuration(format!("{name} is not set")))
}

fn parsed_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, BridgeError>
where
    T::Err: fmt::Display,
{
    env_var(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| BridgeError::Configuration(format!("{name}={raw:?}: {e}")))
        })
        .transpose()
}

fn secs_to_duration(name: &str, secs: f64) -> Result<Duration, BridgeError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| BridgeError::Configuration(format!("{name}={secs}: {e}")))
}

/// Durations as (fractional) seconds.
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
