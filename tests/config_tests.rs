//! Tests for configuration loading.

use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use agent_bridge::config::{BridgeConfig, UpstreamTimeouts};
use agent_bridge::error::BridgeError;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const CONFIG_ENV_VARS: [&str; 10] = [
    "GCP_PROJECT_ID",
    "GCP_LOCATION",
    "AGENT_ENGINE_RESOURCE_ID",
    "AGENT_ENGINE_ACCESS_TOKEN",
    "AGENT_ENGINE_BASE_URL",
    "AGENT_ENGINE_USER_ID",
    "BRIDGE_CONNECT_TIMEOUT_SECS",
    "BRIDGE_FIRST_ENVELOPE_TIMEOUT_SECS",
    "BRIDGE_ENVELOPE_TIMEOUT_SECS",
    "BRIDGE_CONNECT_ATTEMPTS",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn capture(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| ((*key).to_string(), std::env::var(key).ok()))
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn clear_env() {
    for key in CONFIG_ENV_VARS {
        std::env::remove_var(key);
    }
}

#[test]
fn from_env_reads_required_and_optional_values() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_env();

    std::env::set_var("GCP_PROJECT_ID", "my-project");
    std::env::set_var("AGENT_ENGINE_RESOURCE_ID", "8675309");
    std::env::set_var("GCP_LOCATION", "asia-northeast1");
    std::env::set_var("AGENT_ENGINE_ACCESS_TOKEN", "ya29.token");
    std::env::set_var("BRIDGE_ENVELOPE_TIMEOUT_SECS", "2.5");
    std::env::set_var("BRIDGE_CONNECT_ATTEMPTS", "5");

    let config = BridgeConfig::from_env().unwrap();

    assert_eq!(config.project_id, "my-project");
    assert_eq!(config.agent_engine_resource_id, "8675309");
    assert_eq!(config.location, "asia-northeast1");
    assert_eq!(config.access_token.as_deref(), Some("ya29.token"));
    assert_eq!(config.user_id, "default-user");
    assert_eq!(config.timeouts.next_envelope, Duration::from_millis(2_500));
    assert_eq!(config.timeouts.first_envelope, Duration::from_secs(60));
    assert_eq!(config.connect_attempts, 5);
    assert!(config
        .endpoint_url()
        .starts_with("https://asia-northeast1-aiplatform.googleapis.com/"));
}

#[test]
fn from_env_requires_project_and_resource() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_env();

    std::env::set_var("GCP_PROJECT_ID", "my-project");

    let err = BridgeConfig::from_env().unwrap_err();
    assert!(matches!(err, BridgeError::Configuration(ref m) if m.contains("AGENT_ENGINE_RESOURCE_ID")));
}

#[test]
fn from_env_rejects_unparsable_numbers() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_env();

    std::env::set_var("GCP_PROJECT_ID", "p");
    std::env::set_var("AGENT_ENGINE_RESOURCE_ID", "r");
    std::env::set_var("BRIDGE_CONNECT_ATTEMPTS", "many");

    let err = BridgeConfig::from_env().unwrap_err();
    assert!(matches!(err, BridgeError::Configuration(ref m) if m.contains("BRIDGE_CONNECT_ATTEMPTS")));
}

#[test]
fn toml_file_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.toml");
    std::fs::write(
        &path,
        r#"
project_id = "proj"
agent_engine_resource_id = "42"
base_url = "http://localhost:8080"

[timeouts]
first_envelope = 15
"#,
    )
    .unwrap();

    let config = BridgeConfig::from_toml_file(&path).unwrap();

    assert_eq!(config.location, "us-central1");
    assert_eq!(config.user_id, "default-user");
    assert_eq!(config.connect_attempts, 3);
    assert_eq!(
        config.timeouts,
        UpstreamTimeouts {
            first_envelope: Duration::from_secs(15),
            ..UpstreamTimeouts::default()
        }
    );
    assert_eq!(
        config.endpoint_url(),
        "http://localhost:8080/v1/projects/proj/locations/us-central1/reasoningEngines/42:streamQuery?alt=sse"
    );
}

#[test]
fn toml_file_missing_required_field_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.toml");
    std::fs::write(&path, "project_id = \"proj\"\n").unwrap();

    let err = BridgeConfig::from_toml_file(&path).unwrap_err();
    assert!(matches!(err, BridgeError::Configuration(_)));
}

#[test]
fn missing_toml_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = BridgeConfig::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, BridgeError::Io(_)));
}
