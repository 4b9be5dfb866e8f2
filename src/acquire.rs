//! Acquisition strategy chain - fetch the catalog JSON despite unreliable access
//!
//! Strategies are tried one at a time, in a fixed order, each bounded by a
//! per-attempt timeout. The first strategy that yields a JSON value wins.
//!
//! Built-in strategies:
//! - envelope proxy: returns `{"contents": "<body>"}`, body parsed a second time
//! - direct: the endpoint itself, with leading non-JSON noise stripped
//! - verbatim proxy: returns the endpoint's body unchanged

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::{Config, StrategySpec};
use crate::error::{AccessError, AttemptFailure, IngestError};

const USER_AGENT: &str = "FilamentAtlas/0.1";

/// One way of reaching the endpoint
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    async fn attempt(&self, endpoint: &str) -> Result<Value, AccessError>;
}

/// Successful fetch
#[derive(Debug, Clone)]
pub struct Acquired {
    pub strategy: String,
    pub value: Value,
}

/// Ordered list of strategies sharing one timeout
pub struct StrategyChain {
    strategies: Vec<Box<dyn Strategy>>,
    timeout: Duration,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn Strategy>>, timeout: Duration) -> Self {
        Self { strategies, timeout }
    }

    /// Build the HTTP strategies listed in config
    pub fn from_config(config: &Config) -> Result<Self, AccessError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AccessError::Transport(format!("client error: {}", e)))?;

        let strategies = config
            .strategies
            .iter()
            .map(|spec| -> Box<dyn Strategy> {
                match spec {
                    StrategySpec::EnvelopeProxy { base } => {
                        Box::new(EnvelopeProxy::new(client.clone(), base))
                    }
                    StrategySpec::Direct => Box::new(Direct::new(client.clone())),
                    StrategySpec::VerbatimProxy { base } => {
                        Box::new(VerbatimProxy::new(client.clone(), base))
                    }
                }
            })
            .collect();

        Ok(Self::new(strategies, config.timeout()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in order; fail only when all of them fail
    pub async fn fetch(&self, endpoint: &str) -> Result<Acquired, IngestError> {
        let mut failures = Vec::new();

        for strategy in &self.strategies {
            tracing::debug!("Trying strategy '{}' for {}", strategy.name(), endpoint);

            // Dropping the attempt future on timeout aborts the request
            let result = match tokio::time::timeout(self.timeout, strategy.attempt(endpoint)).await {
                Ok(result) => result,
                Err(_) => Err(AccessError::Timeout(self.timeout)),
            };

            match result {
                Ok(value) => {
                    tracing::info!("Strategy '{}' succeeded", strategy.name());
                    return Ok(Acquired {
                        strategy: strategy.name().to_string(),
                        value,
                    });
                }
                Err(error) => {
                    tracing::warn!("Strategy '{}' failed: {}", strategy.name(), error);
                    failures.push(AttemptFailure {
                        strategy: strategy.name().to_string(),
                        error,
                    });
                }
            }
        }

        tracing::error!("All {} strategies failed", failures.len());
        Err(IngestError::TotalAcquisitionFailure(failures))
    }
}

/// Proxy URL for `endpoint`: base followed by the percent-encoded endpoint
pub fn proxied_url(base: &str, endpoint: &str) -> String {
    format!("{}{}", base, urlencoding::encode(endpoint))
}

/// GET `url` and return the body, failing on non-success status
async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, AccessError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AccessError::Status(status.as_u16()));
    }
    let body = response.text().await?;
    tracing::debug!("Fetched {} bytes from {}", body.len(), url);
    Ok(body)
}

/// Parse a `{"contents": "..."}` envelope.
///
/// The inner string is parsed as JSON; when that fails the raw string is
/// returned as a JSON string value.
pub fn unwrap_envelope(body: &str) -> Result<Value, AccessError> {
    let envelope: Value = serde_json::from_str(body)?;
    let contents = envelope
        .get("contents")
        .and_then(Value::as_str)
        .ok_or_else(|| AccessError::Decode("envelope has no contents string".to_string()))?;

    match serde_json::from_str(contents) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::debug!("Envelope contents are not JSON ({}), keeping raw text", e);
            Ok(Value::String(contents.to_string()))
        }
    }
}

/// Parse from the first `{` or `[`, skipping banners and warnings before it
pub fn parse_after_noise(body: &str) -> Result<Value, AccessError> {
    let start = body
        .find(['{', '['])
        .ok_or_else(|| AccessError::Decode("no JSON object or array in body".to_string()))?;
    if start > 0 {
        tracing::debug!("Skipping {} bytes of leading noise", start);
    }
    Ok(serde_json::from_str(&body[start..])?)
}

pub struct EnvelopeProxy {
    client: reqwest::Client,
    base: String,
}

impl EnvelopeProxy {
    pub fn new(client: reqwest::Client, base: &str) -> Self {
        Self {
            client,
            base: base.to_string(),
        }
    }
}

#[async_trait]
impl Strategy for EnvelopeProxy {
    fn name(&self) -> &str {
        "envelope-proxy"
    }

    async fn attempt(&self, endpoint: &str) -> Result<Value, AccessError> {
        let body = get_text(&self.client, &proxied_url(&self.base, endpoint)).await?;
        unwrap_envelope(&body)
    }
}

pub struct Direct {
    client: reqwest::Client,
}

impl Direct {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Strategy for Direct {
    fn name(&self) -> &str {
        "direct"
    }

    async fn attempt(&self, endpoint: &str) -> Result<Value, AccessError> {
        let body = get_text(&self.client, endpoint).await?;
        parse_after_noise(&body)
    }
}

pub struct VerbatimProxy {
    client: reqwest::Client,
    base: String,
}

impl VerbatimProxy {
    pub fn new(client: reqwest::Client, base: &str) -> Self {
        Self {
            client,
            base: base.to_string(),
        }
    }
}

#[async_trait]
impl Strategy for VerbatimProxy {
    fn name(&self) -> &str {
        "verbatim-proxy"
    }

    async fn attempt(&self, endpoint: &str) -> Result<Value, AccessError> {
        let body = get_text(&self.client, &proxied_url(&self.base, endpoint)).await?;
        Ok(serde_json::from_str(&body)?)
    }
}
