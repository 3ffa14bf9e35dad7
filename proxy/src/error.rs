use reqwest::StatusCode;
use std::path::PathBuf;

/// Which stage of a proxied call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Request,
    Upstream,
    Transport,
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("failed to read port file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid port file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid port {value} for bot '{bot}'")]
    InvalidPort { bot: String, value: String },
    #[error("{0} must be set")]
    MissingEnv(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("no bot ports resolved for '{endpoint}'")]
    NoTargets { endpoint: String },
    #[error("invalid endpoint: '{0}'")]
    InvalidEndpoint(String),
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
    #[error("{method} '{endpoint}' requires a JSON payload")]
    MissingPayload {
        method: &'static str,
        endpoint: String,
    },

    #[error("upstream {target} returned {status} for '{endpoint}'")]
    Upstream {
        status: StatusCode,
        endpoint: String,
        target: String,
    },

    #[error("request to {target} failed: {source}")]
    Transport {
        target: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid JSON body from {target}: {source}")]
    Decode {
        target: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid URL {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl ProxyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProxyError::ConfigIo { .. }
            | ProxyError::ConfigParse { .. }
            | ProxyError::InvalidPort { .. }
            | ProxyError::MissingEnv(_)
            | ProxyError::InvalidEnv { .. }
            | ProxyError::Client(_)
            | ProxyError::Url { .. } => ErrorKind::Config,
            ProxyError::NoTargets { .. }
            | ProxyError::InvalidEndpoint(_)
            | ProxyError::UnsupportedMethod(_)
            | ProxyError::MissingPayload { .. } => ErrorKind::Request,
            ProxyError::Upstream { .. } => ErrorKind::Upstream,
            ProxyError::Transport { .. } | ProxyError::Decode { .. } => ErrorKind::Transport,
        }
    }

    /// HTTP status reported by the upstream, if the failure was a status error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ProxyError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
