//! Configuration loading.
//!
//! Configuration is read from a TOML file; every section and key is optional and
//! falls back to a default. `GAZETTE_API_ROOT` overrides `api.root_url`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const API_ROOT_ENV: &str = "GAZETTE_API_ROOT";

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ConfigError {
    #[error("could not read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("invalid api root url {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub toasts: ToastConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Articles API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Root URL every endpoint path is appended to
    #[serde(default = "default_root_url")]
    pub root_url: String,
    /// Page size requested when listing publications
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            root_url: default_root_url(),
            page_size: default_page_size(),
        }
    }
}

fn default_root_url() -> String {
    "http://localhost:3000/api/".to_string()
}

fn default_page_size() -> u32 {
    20
}

/// Identity provider (Cognito user pool) configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_region")]
    pub region: String,
    /// App client id of the user pool
    #[serde(default)]
    pub client_id: String,
    /// Overrides the regional endpoint, for local stand-ins
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            client_id: String::new(),
            endpoint: None,
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastConfig {
    #[serde(default = "default_toast_duration_ms")]
    pub duration_ms: u64,
    /// Used for short-lived progress notices such as "Submitting..."
    #[serde(default = "default_transient_duration_ms")]
    pub transient_duration_ms: u64,
}

impl ToastConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn transient_duration(&self) -> Duration {
        Duration::from_millis(self.transient_duration_ms)
    }
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_toast_duration_ms(),
            transient_duration_ms: default_transient_duration_ms(),
        }
    }
}

fn default_toast_duration_ms() -> u64 {
    4000
}

fn default_transient_duration_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// File holding the "has signed in before" flag
    #[serde(default = "default_flag_path")]
    pub flag_path: PathBuf,
    /// File where the identity provider keeps the user's refresh token
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            flag_path: default_flag_path(),
            token_path: default_token_path(),
        }
    }
}

fn default_flag_path() -> PathBuf {
    PathBuf::from(".gazette-session.json")
}

fn default_token_path() -> PathBuf {
    PathBuf::from(".gazette-identity.json")
}

impl GazetteConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.api_root()?;
        Ok(config)
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_api_root_override(std::env::var(API_ROOT_ENV).ok())
    }

    fn with_api_root_override(mut self, root_url: Option<String>) -> Self {
        if let Some(root_url) = root_url.filter(|url| !url.is_empty()) {
            self.api.root_url = root_url;
        }
        self
    }

    /// The API root, always ending in `/` so endpoint paths join underneath it.
    pub fn api_root(&self) -> Result<Url, ConfigError> {
        let mut root = self.api.root_url.clone();
        if !root.ends_with('/') {
            root.push('/');
        }
        Url::parse(&root).map_err(|e| ConfigError::InvalidUrl {
            url: self.api.root_url.clone(),
            message: e.to_string(),
        })
    }
}
