//! Vertex AI Agent Engine `streamQuery` source.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result, TimeoutPhase};
use crate::util::retry::RetryPolicy;
use crate::util::timeout::with_timeout;

use super::decode::decode_envelopes;
use super::http::{bearer_headers, connect_error, status_to_error};
use super::{EnvelopeSource, EnvelopeStream, RunQuery};

const STREAM_METHOD: &str = "async_stream_query";

/// Streams envelopes from one Agent Engine deployment.
#[derive(Debug, Clone)]
pub struct AgentEngineSource {
    client: reqwest::Client,
    config: BridgeConfig,
    retry: RetryPolicy,
}

impl AgentEngineSource {
    pub fn new(config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeouts.connect)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| BridgeError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            retry: RetryPolicy::with_attempts(config.connect_attempts),
            config,
        })
    }

    /// Replace the connection retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// One connection attempt, bounded by the connect timeout up to response headers.
    async fn connect(&self, url: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        let timeout = self.config.timeouts.connect;
        let attempt = async {
            let resp = self
                .client
                .post(url)
                .headers(bearer_headers(self.config.access_token.as_deref()))
                .json(body)
                .send()
                .await
                .map_err(|e| connect_error(e, timeout))?;

            let status = resp.status().as_u16();
            if status != 200 {
                let body_text = resp.text().await.unwrap_or_default();
                return Err(status_to_error(status, &body_text));
            }
            Ok(resp)
        };
        with_timeout(timeout, TimeoutPhase::Connect, attempt).await
    }
}

#[async_trait]
impl EnvelopeSource for AgentEngineSource {
    async fn open(&self, query: &RunQuery) -> Result<EnvelopeStream> {
        let url = self.config.endpoint_url();
        let user_id = query.user_id.as_deref().unwrap_or(&self.config.user_id);
        let body = json!({
            "class_method": STREAM_METHOD,
            "input": {
                "message": query.message,
                "user_id": user_id,
            }
        });

        debug!(url = %url, user_id, "Opening Agent Engine stream");
        let resp = self.retry.execute(|| self.connect(&url, &body)).await?;
        info!(
            resource_id = %self.config.agent_engine_resource_id,
            "Agent Engine stream established"
        );

        Ok(decode_envelopes(resp.bytes_stream(), self.config.timeouts))
    }
}
