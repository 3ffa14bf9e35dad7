use crate::config::{build_http_client, ProxyConfig, DEFAULT_TIMEOUT_SECS};
use crate::error::{ProxyError, Result};
use crate::models::{normalize_endpoint, Method};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Pass-through client for the single local API service.
///
/// Owns its connection pool; connections are released when the proxy is
/// dropped or [`close`](Self::close)d, whichever comes first.
pub struct LocalApiProxy {
    client: Client,
    base_url: String,
}

impl LocalApiProxy {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config.request_timeout)?,
            base_url: config.local_api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, endpoint: &str, query: &[(String, String)]) -> Result<Value> {
        let url = self.url(endpoint)?;
        let mut builder = self.client.get(&url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        self.execute(Method::Get, endpoint, builder).await
    }

    /// Sends `payload` as the JSON body; `None` sends no body at all.
    pub async fn post(&self, endpoint: &str, payload: Option<&Value>) -> Result<Value> {
        let url = self.url(endpoint)?;
        let builder = with_json(self.client.post(&url), payload);
        self.execute(Method::Post, endpoint, builder).await
    }

    pub async fn put(&self, endpoint: &str, payload: Option<&Value>) -> Result<Value> {
        let url = self.url(endpoint)?;
        let builder = with_json(self.client.put(&url), payload);
        self.execute(Method::Put, endpoint, builder).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Value> {
        let url = self.url(endpoint)?;
        let builder = self.client.delete(&url);
        self.execute(Method::Delete, endpoint, builder).await
    }

    /// Ends the proxy's scope explicitly, releasing pooled connections.
    pub fn close(self) {
        debug!("Closing local API proxy for {}", self.base_url);
    }

    fn url(&self, endpoint: &str) -> Result<String> {
        Ok(format!("{}/{}", self.base_url, normalize_endpoint(endpoint)?))
    }

    async fn execute(&self, method: Method, endpoint: &str, builder: RequestBuilder) -> Result<Value> {
        info!("{} {} via local API {}", method, endpoint, self.base_url);

        let response = builder.send().await.map_err(|source| ProxyError::Transport {
            target: self.base_url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::Upstream {
                status,
                endpoint: endpoint.to_string(),
                target: self.base_url.clone(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|source| ProxyError::Decode {
                target: self.base_url.clone(),
                source,
            })
    }
}

fn with_json(builder: RequestBuilder, payload: Option<&Value>) -> RequestBuilder {
    match payload {
        Some(payload) => builder.json(payload),
        None => builder,
    }
}
