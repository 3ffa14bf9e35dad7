use crate::config::{build_http_client, ProxyConfig, DEFAULT_TIMEOUT_SECS};
use crate::error::{ProxyError, Result};
use crate::models::{normalize_endpoint, RequestSpec};
use crate::registry::PortRegistry;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

/// What to do when a bot fails while others are still untried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPolicy {
    /// The first failure aborts the call. Later bots are never contacted.
    #[default]
    FailFast,
    /// Failures are logged and the next bot is tried. The last error is
    /// returned only if every bot fails.
    FirstSuccess,
}

impl fmt::Display for DispatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchPolicy::FailFast => f.write_str("fail-fast"),
            DispatchPolicy::FirstSuccess => f.write_str("first-success"),
        }
    }
}

impl FromStr for DispatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "fail-fast" => Ok(DispatchPolicy::FailFast),
            "first-success" => Ok(DispatchPolicy::FirstSuccess),
            other => Err(format!("unknown dispatch policy: {}", other)),
        }
    }
}

/// Sends one logical request to the bots listening on the registry's
/// ports, one port at a time, and returns the first decoded JSON body.
pub struct RequestForwarder {
    client: Client,
    registry: PortRegistry,
    host: String,
    api_key: String,
    policy: DispatchPolicy,
}

impl RequestForwarder {
    pub fn new(
        registry: PortRegistry,
        host: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            registry,
            host: host.into(),
            api_key: api_key.into(),
            policy: DispatchPolicy::default(),
        })
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config.request_timeout)?,
            registry: config.registry(),
            host: config.bot_host.clone(),
            api_key: config.api_key()?.to_string(),
            policy: config.dispatch_policy,
        })
    }

    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    pub async fn request(&self, spec: &RequestSpec) -> Result<Value> {
        let endpoint = normalize_endpoint(&spec.endpoint)?;
        if spec.method.takes_body() && spec.payload.is_none() {
            return Err(ProxyError::MissingPayload {
                method: spec.method.as_str(),
                endpoint: endpoint.to_string(),
            });
        }

        let ports = self.registry.ports_for(spec.targets.as_deref())?;
        if ports.is_empty() {
            return Err(ProxyError::NoTargets {
                endpoint: endpoint.to_string(),
            });
        }

        let request_id = Uuid::new_v4();
        info!(
            "Forwarding request (ID: {}) {} /{} to {} bot(s), policy: {}",
            request_id,
            spec.method,
            endpoint,
            ports.len(),
            self.policy
        );

        let mut last_error = None;
        for (bot, port) in ports {
            match self.send(spec, endpoint, &bot, port).await {
                Ok(body) => {
                    info!(
                        "Request (ID: {}) answered by bot '{}' on port {}",
                        request_id, bot, port
                    );
                    return Ok(body);
                }
                Err(e) => match self.policy {
                    DispatchPolicy::FailFast => {
                        error!("Request (ID: {}) aborted: {}", request_id, e);
                        return Err(e);
                    }
                    DispatchPolicy::FirstSuccess => {
                        warn!(
                            "Request (ID: {}) failed on bot '{}', trying next: {}",
                            request_id, bot, e
                        );
                        last_error = Some(e);
                    }
                },
            }
        }

        Err(last_error.unwrap_or(ProxyError::NoTargets {
            endpoint: endpoint.to_string(),
        }))
    }

    async fn send(&self, spec: &RequestSpec, endpoint: &str, bot: &str, port: u16) -> Result<Value> {
        let url = self.bot_url(port, endpoint, &spec.query)?;
        let target = format!("bot '{}' (port {})", bot, port);
        debug!("{} /{} -> {}", spec.method, endpoint, target);

        let mut builder = self.client.request(spec.method.into(), url);
        if spec.method.takes_body() {
            if let Some(payload) = &spec.payload {
                builder = builder.json(payload);
            }
        }

        // without_url keeps the api_key out of error messages
        let response = builder.send().await.map_err(|e| ProxyError::Transport {
            target: target.clone(),
            source: e.without_url(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::Upstream {
                status,
                endpoint: endpoint.to_string(),
                target,
            });
        }

        response.json::<Value>().await.map_err(|e| ProxyError::Decode {
            target,
            source: e.without_url(),
        })
    }

    fn bot_url(&self, port: u16, endpoint: &str, query: &[(String, String)]) -> Result<Url> {
        let raw = format!("http://{}:{}/{}", self.host, port, endpoint);
        let mut url = Url::parse(&raw).map_err(|source| ProxyError::Url { url: raw, source })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api_key", &self.api_key);
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}
