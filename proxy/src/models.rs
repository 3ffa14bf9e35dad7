use crate::error::{ProxyError, Result};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Bot identifier to port, kept in the order the bots were listed.
///
/// Under fail-fast dispatch the first entry is the only bot an untargeted
/// request ever reaches, so the port file's order is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortMapping(Vec<(String, u16)>);

impl PortMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bot, or updates its port in place if already listed.
    pub fn insert(&mut self, bot: impl Into<String>, port: u16) {
        let bot = bot.into();
        match self.0.iter_mut().find(|(name, _)| *name == bot) {
            Some(entry) => entry.1 = port,
            None => self.0.push((bot, port)),
        }
    }

    pub fn get(&self, bot: &str) -> Option<u16> {
        self.0
            .iter()
            .find(|(name, _)| name == bot)
            .map(|&(_, port)| port)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.0.iter().map(|(bot, port)| (bot.as_str(), *port))
    }
}

impl<S: Into<String>> FromIterator<(S, u16)> for PortMapping {
    fn from_iter<I: IntoIterator<Item = (S, u16)>>(iter: I) -> Self {
        let mut mapping = PortMapping::new();
        for (bot, port) in iter {
            mapping.insert(bot, port);
        }
        mapping
    }
}

impl IntoIterator for PortMapping {
    type Item = (String, u16);
    type IntoIter = std::vec::IntoIter<(String, u16)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Serialize for PortMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Whether requests with this method carry a JSON body.
    pub fn takes_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(ProxyError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One logical request to be forwarded to the bots.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub endpoint: String,
    pub method: Method,
    pub payload: Option<Value>,
    /// `None` targets every known bot.
    pub targets: Option<Vec<String>>,
    pub query: Vec<(String, String)>,
}

impl RequestSpec {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            payload: None,
            targets: None,
            query: Vec::new(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Delete, endpoint)
    }

    pub fn post(endpoint: impl Into<String>, payload: Value) -> Self {
        Self::new(Method::Post, endpoint).with_payload(payload)
    }

    pub fn put(endpoint: impl Into<String>, payload: Value) -> Self {
        Self::new(Method::Put, endpoint).with_payload(payload)
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Strips leading slashes and rejects empty paths.
pub(crate) fn normalize_endpoint(endpoint: &str) -> Result<&str> {
    let trimmed = endpoint.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(ProxyError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(trimmed)
}
