//! Gateway configuration models
//!
//! Defines the startup document handed to the MCP Gateway container and the
//! pure builder that assembles it from caller-supplied backends.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Port the gateway listens on inside its container
pub const DEFAULT_LISTEN_PORT: u16 = 8000;

/// Image used for the built-in GitHub backend
pub const GITHUB_MCP_IMAGE: &str = "ghcr.io/github/github-mcp-server:latest";

/// Environment variable carrying the GitHub credential
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_PERSONAL_ACCESS_TOKEN";

/// Configuration build errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API key must not be empty")]
    EmptyApiKey,

    #[error("Backend '{0}' is defined more than once")]
    DuplicateBackend(String),
}

/// A single backend tool server proxied by the gateway
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendSpec {
    /// Launched by the gateway as a subordinate container speaking stdio
    Stdio {
        container: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
    },

    /// Reached over HTTP
    Http {
        url: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tools: Option<Vec<String>>,
    },
}

impl BackendSpec {
    /// Create a stdio backend for a container image
    pub fn stdio(container: impl Into<String>) -> Self {
        BackendSpec::Stdio {
            container: container.into(),
            env: BTreeMap::new(),
        }
    }

    /// Create an HTTP backend
    pub fn http(url: impl Into<String>) -> Self {
        BackendSpec::Http {
            url: url.into(),
            headers: BTreeMap::new(),
            tools: None,
        }
    }

    /// Add an environment variable (stdio) or header (http)
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self {
            BackendSpec::Stdio { env, .. } => {
                env.insert(key.into(), value.into());
            }
            BackendSpec::Http { headers, .. } => {
                headers.insert(key.into(), value.into());
            }
        }
        self
    }

    /// Restrict the tools exposed by an HTTP backend
    pub fn with_tools(mut self, list: Vec<String>) -> Self {
        if let BackendSpec::Http { tools, .. } = &mut self {
            *tools = Some(list);
        }
        self
    }

    /// Short type name used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            BackendSpec::Stdio { .. } => "stdio",
            BackendSpec::Http { .. } => "http",
        }
    }

    /// The built-in GitHub backend authenticated with `token`
    pub fn github(token: impl Into<String>) -> Self {
        Self::stdio(GITHUB_MCP_IMAGE).with_entry(GITHUB_TOKEN_VAR, token)
    }
}

/// A named backend as supplied by callers and config files
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedBackend {
    pub name: String,
    #[serde(flatten)]
    pub spec: BackendSpec,
}

impl NamedBackend {
    pub fn new(name: impl Into<String>, spec: BackendSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }
}

/// Listening parameters for the gateway
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOptions {
    /// Port inside the container
    pub listen_port: u16,

    /// Public domain the gateway announces
    pub domain: String,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            domain: "localhost".to_string(),
        }
    }
}

impl GatewayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }
}

/// Startup configuration consumed by the gateway process
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(rename = "mcpServers")]
    pub backends: BTreeMap<String, BackendSpec>,

    pub gateway: GatewaySection,
}

/// The `gateway` block of the startup document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySection {
    pub port: u16,
    pub domain: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

impl GatewayConfig {
    pub fn listen_port(&self) -> u16 {
        self.gateway.port
    }

    pub fn domain(&self) -> &str {
        &self.gateway.domain
    }

    pub fn api_key(&self) -> &str {
        &self.gateway.api_key
    }

    /// Serialize to the JSON document the gateway reads on stdin
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Assembles a [`GatewayConfig`] from backends, options and an API key
pub struct ConfigBuilder;

impl ConfigBuilder {
    /// Build the gateway configuration. Pure: no I/O, no defaults injected.
    pub fn build(
        backends: &[NamedBackend],
        options: &GatewayOptions,
        api_key: &str,
    ) -> Result<GatewayConfig, ConfigError> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }

        let mut map = BTreeMap::new();
        for backend in backends {
            if map
                .insert(backend.name.clone(), backend.spec.clone())
                .is_some()
            {
                return Err(ConfigError::DuplicateBackend(backend.name.clone()));
            }
        }

        Ok(GatewayConfig {
            backends: map,
            gateway: GatewaySection {
                port: options.listen_port,
                domain: options.domain.clone(),
                api_key: api_key.to_string(),
            },
        })
    }
}
