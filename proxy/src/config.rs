use crate::error::{ProxyError, Result};
use crate::forwarder::DispatchPolicy;
use crate::models::PortMapping;
use crate::registry::{default_ports, PortRegistry, DEFAULT_PORTS_FILE};
use dotenvy::dotenv;
use reqwest::Client;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BOT_HOST: &str = "127.0.0.1";
pub const DEFAULT_LOCAL_API_URL: &str = "http://localhost:7000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything the forwarder and the local proxy need, resolved up front.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub bot_host: String,
    /// Sent as the `api_key` query parameter to every bot.
    pub api_key: Option<String>,
    pub ports_file: PathBuf,
    pub default_ports: PortMapping,
    pub local_api_url: String,
    pub request_timeout: Duration,
    pub dispatch_policy: DispatchPolicy,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bot_host: DEFAULT_BOT_HOST.to_string(),
            api_key: None,
            ports_file: PathBuf::from(DEFAULT_PORTS_FILE),
            default_ports: default_ports(),
            local_api_url: DEFAULT_LOCAL_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            dispatch_policy: DispatchPolicy::default(),
        }
    }
}

impl ProxyConfig {
    /// Reads the process environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = var("BOT_HOST") {
            config.bot_host = host;
        }
        config.api_key = var("BOT_API_KEY");
        if let Some(path) = var("PORTS_FILE") {
            config.ports_file = PathBuf::from(path);
        }
        if let Some(url) = var("LOCAL_API_URL") {
            config.local_api_url = validate_base_url("LOCAL_API_URL", &url)?;
        }
        if let Some(secs) = var("REQUEST_TIMEOUT_SECS") {
            let invalid = || ProxyError::InvalidEnv {
                name: "REQUEST_TIMEOUT_SECS",
                value: secs.clone(),
            };
            let parsed: u64 = secs.trim().parse().map_err(|_| invalid())?;
            if parsed == 0 {
                return Err(invalid());
            }
            config.request_timeout = Duration::from_secs(parsed);
        }
        if let Some(policy) = var("DISPATCH_POLICY") {
            config.dispatch_policy = policy.parse().map_err(|_| ProxyError::InvalidEnv {
                name: "DISPATCH_POLICY",
                value: policy.clone(),
            })?;
        }

        Ok(config)
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(ProxyError::MissingEnv("BOT_API_KEY"))
    }

    pub fn registry(&self) -> PortRegistry {
        PortRegistry::new(self.ports_file.clone(), self.default_ports.clone())
    }
}

fn validate_base_url(name: &'static str, raw: &str) -> Result<String> {
    let parsed = Url::parse(raw).map_err(|source| ProxyError::Url {
        url: raw.to_string(),
        source,
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ProxyError::InvalidEnv {
            name,
            value: raw.to_string(),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ProxyError::Client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = ProxyConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bot_host, DEFAULT_BOT_HOST);
        assert_eq!(config.local_api_url, DEFAULT_LOCAL_API_URL);
        assert_eq!(config.ports_file, PathBuf::from(DEFAULT_PORTS_FILE));
        assert_eq!(config.default_ports, default_ports());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.dispatch_policy, DispatchPolicy::FailFast);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn variables_override_defaults() {
        let config = ProxyConfig::from_lookup(lookup(&[
            ("BOT_HOST", "10.0.0.5"),
            ("BOT_API_KEY", "secret"),
            ("PORTS_FILE", "/etc/bots/ports.json"),
            ("LOCAL_API_URL", "https://api.internal:8443/"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("DISPATCH_POLICY", "first-success"),
        ]))
        .unwrap();
        assert_eq!(config.bot_host, "10.0.0.5");
        assert_eq!(config.api_key().unwrap(), "secret");
        assert_eq!(config.ports_file, PathBuf::from("/etc/bots/ports.json"));
        assert_eq!(config.local_api_url, "https://api.internal:8443");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.dispatch_policy, DispatchPolicy::FirstSuccess);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = ProxyConfig::from_lookup(lookup(&[("BOT_API_KEY", "  ")])).unwrap();
        let err = config.api_key().unwrap_err();
        assert!(matches!(err, ProxyError::MissingEnv("BOT_API_KEY")));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = ProxyConfig::from_lookup(lookup(&[("REQUEST_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ProxyError::InvalidEnv {
                name: "REQUEST_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ProxyConfig::from_lookup(lookup(&[("REQUEST_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(
            err,
            ProxyError::InvalidEnv {
                name: "REQUEST_TIMEOUT_SECS",
                ref value,
            } if value == "0"
        ));
    }

    #[test]
    fn non_http_local_url_is_rejected() {
        let err =
            ProxyConfig::from_lookup(lookup(&[("LOCAL_API_URL", "ftp://localhost")])).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidEnv { name: "LOCAL_API_URL", .. }));

        let err = ProxyConfig::from_lookup(lookup(&[("LOCAL_API_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, ProxyError::Url { .. }));
    }
}
