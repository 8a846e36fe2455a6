use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::stream::{Endpoint, SessionCredential};

pub const DEFAULT_SERVER: &str = "ws://localhost:8080";
pub const DEFAULT_NAMESPACE: &str = "default";

/// Contents of `config.json`. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: Option<String>,
    pub session_id: Option<String>,
    pub namespace: Option<String>,
    pub log_buffer_limit: Option<usize>,
}

pub fn default_config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("kubesync");
    path.push("config.json");
    path
}

impl Config {
    /// A missing file is an empty config; anything else that goes wrong is
    /// reported.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(Error::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub server: Option<String>,
    pub session_id: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: Endpoint,
    pub session: SessionCredential,
    pub namespace: String,
    pub log_buffer_limit: Option<usize>,
}

impl Settings {
    pub fn resolve(config: Config, overrides: Overrides) -> Result<Self> {
        let server = overrides
            .server
            .or(config.server)
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());
        let endpoint = Endpoint::parse(&server)?;

        let session = match overrides.session_id.or(config.session_id) {
            Some(id) if !id.is_empty() => SessionCredential::new(id),
            _ => {
                tracing::debug!("no session id configured, generating one");
                SessionCredential::generate()
            }
        };

        let namespace = overrides
            .namespace
            .or(config.namespace)
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        Ok(Self {
            endpoint,
            session,
            namespace,
            log_buffer_limit: config.log_buffer_limit,
        })
    }
}
