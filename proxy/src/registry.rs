use crate::error::{ProxyError, Result};
use crate::models::PortMapping;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_PORTS_FILE: &str = "../parent_api/ports.json";

/// Mapping used when no port file exists.
pub fn default_ports() -> PortMapping {
    [("nom", 49089)].into_iter().collect()
}

/// Resolves bot identifiers to ports from a shared JSON file.
///
/// The file is re-read on every call so that edits made by the process
/// managing the bots are picked up without a restart.
#[derive(Debug, Clone)]
pub struct PortRegistry {
    path: PathBuf,
    defaults: PortMapping,
}

impl PortRegistry {
    pub fn new(path: impl Into<PathBuf>, defaults: PortMapping) -> Self {
        Self {
            path: path.into(),
            defaults,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the current mapping, falling back to the defaults only when
    /// the file does not exist.
    pub fn resolve(&self) -> Result<PortMapping> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    "Port file {} not found, using {} default port(s)",
                    self.path.display(),
                    self.defaults.len()
                );
                return Ok(self.defaults.clone());
            }
            Err(source) => {
                return Err(ProxyError::ConfigIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        // serde_json is built with preserve_order, so the file's key order survives
        let raw: Map<String, Value> = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| ProxyError::ConfigParse {
                path: self.path.clone(),
                source,
            })?;

        let mut ports = PortMapping::new();
        for (bot, value) in raw {
            match value.as_u64().and_then(|p| u16::try_from(p).ok()) {
                Some(port) if port != 0 => ports.insert(bot, port),
                _ => {
                    return Err(ProxyError::InvalidPort {
                        bot,
                        value: value.to_string(),
                    })
                }
            }
        }
        debug!(
            "Loaded {} port(s) from {}",
            ports.len(),
            self.path.display()
        );
        Ok(ports)
    }

    /// Resolves the ports to contact, in the order they should be tried.
    ///
    /// With `targets`, order follows the list; unknown bots are skipped and
    /// repeated ones are contacted once. Without, every known bot is
    /// returned in mapping order.
    pub fn ports_for(&self, targets: Option<&[String]>) -> Result<Vec<(String, u16)>> {
        let mapping = self.resolve()?;

        let Some(targets) = targets else {
            return Ok(mapping.into_iter().collect());
        };

        let mut seen = HashSet::new();
        let mut selected = Vec::with_capacity(targets.len());
        for bot in targets {
            match mapping.get(bot) {
                Some(port) => {
                    if seen.insert(port) {
                        selected.push((bot.clone(), port));
                    }
                }
                None => warn!("Skipping unknown bot '{}'", bot),
            }
        }
        Ok(selected)
    }
}
