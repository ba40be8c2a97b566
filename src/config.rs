//! Configuration management for zipserve
//!
//! Settings are read from a YAML file. The server level `archive` and
//! `extract` values act as defaults that every route inherits unless it sets
//! its own, and routes are compiled once at startup.

use crate::error::ConfigError;
use crate::handler::DEFAULT_MAX_ENTRY_SIZE;
use crate::resolver::Route;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// Top level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Address to listen on (default: 127.0.0.1:8080)
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Largest decompressed entry served, in bytes (default: 256MB)
    #[serde(default = "default_max_entry_size")]
    pub max_entry_size: u64,

    /// Archive template inherited by routes without their own
    #[serde(default)]
    pub archive: Option<String>,

    /// Entry template inherited by routes without their own
    #[serde(default)]
    pub extract: Option<String>,

    /// Routes, tried in order
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// One route as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteConfig {
    /// Regular expression matched against the decoded request path
    pub pattern: String,

    #[serde(default)]
    pub archive: Option<String>,

    #[serde(default)]
    pub extract: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_entry_size: default_max_entry_size(),
            archive: None,
            extract: None,
            routes: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load and validate configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks the listen address, the entry size limit, and that every route
    /// compiles with both values present after inheritance.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;

        if self.max_entry_size == 0 {
            return Err(ConfigError::Invalid(
                "max_entry_size must be greater than 0".to_string(),
            ));
        }

        if self.routes.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one route must be configured".to_string(),
            ));
        }

        self.build_routes().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen.parse().map_err(|_| {
            ConfigError::Invalid(format!("listen address {} is not host:port", self.listen))
        })
    }

    /// Merge server level defaults into each route and compile it
    pub fn build_routes(&self) -> Result<Vec<Route>, ConfigError> {
        self.routes
            .iter()
            .map(|route| {
                let archive = route
                    .archive
                    .as_deref()
                    .or(self.archive.as_deref())
                    .ok_or_else(|| ConfigError::MissingDirective {
                        pattern: route.pattern.clone(),
                        directive: "archive",
                    })?;
                let extract = route
                    .extract
                    .as_deref()
                    .or(self.extract.as_deref())
                    .ok_or_else(|| ConfigError::MissingDirective {
                        pattern: route.pattern.clone(),
                        directive: "extract",
                    })?;
                Route::new(&route.pattern, archive, extract)
            })
            .collect()
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_entry_size() -> u64 {
    DEFAULT_MAX_ENTRY_SIZE
}
