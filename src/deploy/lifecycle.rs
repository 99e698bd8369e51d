//! Gateway container lifecycle
//!
//! Brings the gateway container from absent to running and back, and sweeps
//! the backend containers the gateway spawns on its own. No state is kept
//! between calls: every operation re-reads the runtime first.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{GatewayConfig, LaunchSpec, Mount, PortMapping, ProcessIdentity, ProcessState};
use crate::runtime::ProcessHandle;

/// Names of backend containers spawned by the gateway
pub const DEFAULT_DEPENDENT_PATTERN: &str = "github-mcp|mcp-server";

/// Errors raised while launching the gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("Container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("Could not clear existing container '{name}': {reason}")]
    Conflict { name: String, reason: String },

    #[error("Failed to write gateway config to {path}: {reason}")]
    ConfigWrite { path: String, reason: String },

    #[error("Runtime refused to start the gateway: {0}")]
    Rejected(String),
}

/// Errors raised while tearing containers down
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TeardownError {
    #[error("Could not determine container state: {0}")]
    StateUnknown(String),

    #[error("Teardown of '{name}' incomplete: {}", .failures.join("; "))]
    Partial { name: String, failures: Vec<String> },

    #[error("{} dependent container(s) could not be removed", .failures.len())]
    Sweep { failures: Vec<SweepFailure> },
}

/// Host-side launch parameters not carried by the gateway config
#[derive(Clone, Debug)]
pub struct LaunchOptions {
    /// Fully qualified gateway image
    pub image: String,

    /// Host port mapped onto the gateway's listen port
    pub host_port: u16,

    /// Runtime control socket mounted into the gateway
    pub socket_path: PathBuf,

    /// Where the generated config document is written
    pub config_path: PathBuf,

    /// File receiving the gateway's stdout/stderr
    pub log_path: PathBuf,

    /// Extra environment passed to the gateway (e.g. backend credentials)
    pub env: BTreeMap<String, String>,
}

impl LaunchOptions {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            host_port: 80,
            socket_path: PathBuf::from("/var/run/docker.sock"),
            config_path: PathBuf::from("/tmp/mcpg-config.json"),
            log_path: PathBuf::from("/tmp/mcpg-gateway.log"),
            env: BTreeMap::new(),
        }
    }

    pub fn host_port(mut self, port: u16) -> Self {
        self.host_port = port;
        self
    }

    pub fn socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Result of a successful start
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartOutcome {
    /// An existing container under the same name was removed first
    pub replaced: bool,
}

/// Result of a successful stop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    NotFound,
    Removed,
}

/// One dependent that could not be removed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SweepFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of a dependent sweep
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub matched: Vec<String>,
    pub removed: Vec<String>,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_result(self) -> Result<SweepReport, TeardownError> {
        if self.is_clean() {
            Ok(self)
        } else {
            Err(TeardownError::Sweep {
                failures: self.failures,
            })
        }
    }
}

/// Drives a named container through start/stop via a [`ProcessHandle`]
pub struct ContainerLifecycleManager<'a> {
    handle: &'a dyn ProcessHandle,
}

impl<'a> ContainerLifecycleManager<'a> {
    pub fn new(handle: &'a dyn ProcessHandle) -> Self {
        Self { handle }
    }

    /// Launch the gateway, replacing any existing container of the same name.
    /// Does not wait for health.
    pub async fn start(
        &self,
        identity: &ProcessIdentity,
        config: &GatewayConfig,
        options: &LaunchOptions,
    ) -> Result<StartOutcome, LaunchError> {
        let name = identity.as_str();

        let replaced = match self.handle.state(name).await {
            ProcessState::Absent => false,
            ProcessState::Unknown(e) => return Err(LaunchError::RuntimeUnavailable(e)),
            ProcessState::Present(_) => {
                info!("Removing existing container {}", name);
                if let Err(e) = self.handle.stop(name).await {
                    debug!("Stop of existing {} failed: {}", name, e);
                }
                self.handle
                    .remove(name, true)
                    .await
                    .map_err(|e| LaunchError::Conflict {
                        name: name.to_string(),
                        reason: e.to_string(),
                    })?;
                true
            }
        };

        let payload = config.to_json().map_err(|e| LaunchError::ConfigWrite {
            path: options.config_path.display().to_string(),
            reason: e.to_string(),
        })?;
        std::fs::write(&options.config_path, &payload).map_err(|e| LaunchError::ConfigWrite {
            path: options.config_path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!("Gateway config written to {}", options.config_path.display());

        let mut spec = LaunchSpec::new(name, &options.image)
            .port(PortMapping::new(options.host_port, config.listen_port()))
            .mount(Mount::bind(&options.socket_path, &options.socket_path))
            .env("MCP_GATEWAY_PORT", config.listen_port().to_string())
            .env("MCP_GATEWAY_DOMAIN", config.domain())
            .env("MCP_GATEWAY_API_KEY", config.api_key())
            .stdin(payload)
            .log_path(&options.log_path);
        for (key, value) in &options.env {
            spec = spec.env(key, value);
        }

        self.handle
            .start(&spec)
            .await
            .map_err(|e| LaunchError::Rejected(e.to_string()))?;

        info!("Gateway container {} launched", name);
        Ok(StartOutcome { replaced })
    }

    /// Stop and remove the container. Absence is success.
    pub async fn stop(&self, identity: &ProcessIdentity) -> Result<StopOutcome, TeardownError> {
        let name = identity.as_str();

        let state = match self.handle.state(name).await {
            ProcessState::Absent => {
                debug!("Container {} not present, nothing to stop", name);
                return Ok(StopOutcome::NotFound);
            }
            ProcessState::Unknown(e) => return Err(TeardownError::StateUnknown(e)),
            state => state,
        };
        debug!("Container {} is {}", name, state.as_str());

        let mut failures = Vec::new();

        let stopped = if state.is_running() {
            match self.handle.stop(name).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to stop {}: {}", name, e);
                    failures.push(format!("stop: {e}"));
                    false
                }
            }
        } else {
            true
        };

        // a failed stop leaves it running, so force the removal
        if let Err(e) = self.handle.remove(name, !stopped).await {
            warn!("Failed to remove {}: {}", name, e);
            failures.push(format!("remove: {e}"));
        }

        if failures.is_empty() {
            info!("Container {} stopped and removed", name);
            Ok(StopOutcome::Removed)
        } else {
            Err(TeardownError::Partial {
                name: name.to_string(),
                failures,
            })
        }
    }

    /// Force-remove every container whose name matches `pattern`
    pub async fn sweep(&self, pattern: &Regex) -> Result<SweepReport, TeardownError> {
        let listing = self
            .handle
            .list(true)
            .await
            .map_err(|e| TeardownError::StateUnknown(e.to_string()))?;

        let mut report = SweepReport::default();

        for summary in listing.into_iter().filter(|s| pattern.is_match(&s.name)) {
            report.matched.push(summary.name.clone());

            match self.handle.remove(&summary.name, true).await {
                Ok(()) => {
                    debug!("Removed dependent {}", summary.name);
                    report.removed.push(summary.name);
                }
                Err(e) => {
                    warn!("Failed to remove dependent {}: {}", summary.name, e);
                    report.failures.push(SweepFailure {
                        name: summary.name,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}
