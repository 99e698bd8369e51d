//! Configuration module
//!
//! Controller settings, layered as defaults, then an optional config file,
//! then environment variables, then CLI flags.

mod env;
mod file;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::deploy::{HealthCheckConfig, LaunchOptions, DEFAULT_DEPENDENT_PATTERN};
use crate::models::{
    BackendSpec, GatewayOptions, NamedBackend, ProcessIdentity, DEFAULT_LISTEN_PORT,
    GITHUB_TOKEN_VAR,
};

pub use env::{print_env_help, EnvConfig};

/// Controller configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Container name of the gateway
    pub container_name: String,

    /// Container runtime CLI
    pub runtime_binary: String,

    /// Gateway image without tag
    pub gateway_image: String,

    /// Gateway image tag
    pub gateway_version: String,

    /// Host port published for the gateway
    pub host_port: u16,

    /// Port the gateway listens on inside its container
    pub listen_port: u16,

    pub domain: String,

    /// Fixed API key; a random one is generated per start when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Runtime control socket mounted into the gateway
    pub socket_path: PathBuf,

    /// Regex selecting containers spawned by the gateway
    pub dependent_pattern: String,

    pub paths: PathsConfig,

    pub health: HealthSettings,

    /// Backends served by the gateway; empty means the GitHub backend only
    pub backends: Vec<NamedBackend>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            container_name: "mcpg-gateway".to_string(),
            runtime_binary: "docker".to_string(),
            gateway_image: "ghcr.io/githubnext/gh-aw-mcpg".to_string(),
            gateway_version: "v0.0.59".to_string(),
            host_port: 80,
            listen_port: DEFAULT_LISTEN_PORT,
            domain: "localhost".to_string(),
            api_key: None,
            socket_path: PathBuf::from("/var/run/docker.sock"),
            dependent_pattern: DEFAULT_DEPENDENT_PATTERN.to_string(),
            paths: PathsConfig::default(),
            health: HealthSettings::default(),
            backends: Vec::new(),
        }
    }
}

impl ControllerConfig {
    /// Apply environment overrides
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(name) = &env.container_name {
            self.container_name = name.clone();
        }
        if let Some(port) = env.port {
            self.host_port = port;
        }
        if let Some(domain) = &env.domain {
            self.domain = domain.clone();
        }
        if let Some(key) = &env.api_key {
            self.api_key = Some(key.clone());
        }
        if let Some(version) = &env.version {
            self.gateway_version = version.clone();
        }
    }

    /// Fully qualified gateway image reference
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.gateway_image, self.gateway_version)
    }

    pub fn identity(&self) -> ProcessIdentity {
        ProcessIdentity::new(&self.container_name)
    }

    pub fn dependent_regex(&self) -> Result<Regex, regex::Error> {
        Regex::new(&self.dependent_pattern)
    }

    pub fn health_endpoint(&self) -> String {
        format!("http://127.0.0.1:{}/health", self.host_port)
    }

    pub fn health_config(&self) -> HealthCheckConfig {
        HealthCheckConfig::new()
            .max_attempts(self.health.max_attempts)
            .interval(Duration::from_millis(self.health.interval_ms))
            .probe_timeout(self.health.probe_timeout_secs)
    }

    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions::new()
            .listen_port(self.listen_port)
            .domain(&self.domain)
    }

    /// Launch options; the credential is also exported to the gateway itself
    pub fn launch_options(&self, token: &str) -> LaunchOptions {
        LaunchOptions::new(self.image_ref())
            .host_port(self.host_port)
            .socket_path(&self.socket_path)
            .config_path(&self.paths.gateway_config)
            .log_path(&self.paths.gateway_log)
            .env(GITHUB_TOKEN_VAR, token)
    }

    /// Configured backends, or the GitHub backend authenticated with `token`
    pub fn backends_or_default(&self, token: &str) -> Vec<NamedBackend> {
        if self.backends.is_empty() {
            vec![NamedBackend::new("github", BackendSpec::github(token))]
        } else {
            self.backends.clone()
        }
    }
}

/// Well-known file locations
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Generated gateway config document
    pub gateway_config: PathBuf,

    /// Key of the last healthy start
    pub api_key: PathBuf,

    /// Gateway stdout/stderr
    pub gateway_log: PathBuf,

    /// Client config written by `client-config`
    pub client_config: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            gateway_config: PathBuf::from("/tmp/mcpg-config.json"),
            api_key: PathBuf::from("/tmp/mcpg-api-key.txt"),
            gateway_log: PathBuf::from("/tmp/mcpg-gateway.log"),
            client_config: PathBuf::from("/tmp/mcp-gateway-config.json"),
        }
    }
}

/// Health wait settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    pub max_attempts: u32,
    pub interval_ms: u64,
    pub probe_timeout_secs: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval_ms: 1000,
            probe_timeout_secs: 5,
        }
    }
}
