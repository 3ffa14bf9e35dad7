//! Forwards JSON requests to bot processes addressed by port, and passes
//! requests through to a single local API service.
//!
//! Ports come from a shared JSON file that is re-read on every call:
//!
//! ```json
//! { "nom": 49089, "zed": 49090 }
//! ```

pub mod config;
pub mod error;
pub mod forwarder;
pub mod local;
pub mod logging;
pub mod models;
pub mod registry;

pub use config::ProxyConfig;
pub use error::{ErrorKind, ProxyError, Result};
pub use forwarder::{DispatchPolicy, RequestForwarder};
pub use local::LocalApiProxy;
pub use models::{Method, PortMapping, RequestSpec};
pub use registry::PortRegistry;
