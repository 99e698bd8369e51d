//! Gateway inspection for `debug`

use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::health::{HealthCheck, HealthProbe};
use crate::models::{ProcessIdentity, ProcessSummary, GITHUB_TOKEN_VAR};
use crate::runtime::ProcessHandle;

/// Directory inside the gateway holding its own log files
pub const GATEWAY_LOG_DIR: &str = "/tmp/gh-aw/mcp-logs/";

const LOG_TAIL: usize = 50;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InspectError {
    #[error("Container '{0}' not found")]
    NotFound(String),

    #[error("Container runtime error: {0}")]
    Runtime(String),
}

/// Everything `debug` prints about a running gateway
#[derive(Clone, Debug)]
pub struct DebugReport {
    pub container: String,
    pub summary: ProcessSummary,
    pub health: HealthCheck,
    /// Health response body, pretty-printed when JSON
    pub health_body: Option<String>,
    pub logs: Option<String>,
    /// `name: image (status)` for running dependents
    pub dependents: Vec<String>,
    pub log_files: Option<String>,
    pub checklist: Vec<HealthCheck>,
}

impl DebugReport {
    pub fn all_passed(&self) -> bool {
        self.health.passed && self.checklist.iter().all(|c| c.passed)
    }
}

/// Collects a [`DebugReport`] for the gateway container
pub struct GatewayInspector<'a> {
    handle: &'a dyn ProcessHandle,
    probe: &'a dyn HealthProbe,
    dependent_pattern: Regex,
    socket_path: PathBuf,
    host_port: u16,
    connect_timeout: Duration,
}

impl<'a> GatewayInspector<'a> {
    pub fn new(
        handle: &'a dyn ProcessHandle,
        probe: &'a dyn HealthProbe,
        dependent_pattern: Regex,
    ) -> Self {
        Self {
            handle,
            probe,
            dependent_pattern,
            socket_path: PathBuf::from("/var/run/docker.sock"),
            host_port: 80,
            connect_timeout: Duration::from_secs(1),
        }
    }

    pub fn socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    pub fn host_port(mut self, port: u16) -> Self {
        self.host_port = port;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub async fn inspect(&self, identity: &ProcessIdentity) -> Result<DebugReport, InspectError> {
        let name = identity.as_str();

        let summary = self
            .handle
            .inspect(name)
            .await
            .map_err(|e| InspectError::Runtime(e.to_string()))?
            .ok_or_else(|| InspectError::NotFound(name.to_string()))?;

        let endpoint = format!("http://127.0.0.1:{}/health", self.host_port);
        let (health, health_body) = match self.probe.probe(&endpoint).await {
            Ok(body) => (HealthCheck::pass("Health", "Gateway is healthy"), Some(body)),
            Err(e) => (
                HealthCheck::fail("Health", format!("Gateway health check failed: {e}")),
                None,
            ),
        };

        let logs = match self.handle.logs(name, LOG_TAIL).await {
            Ok(logs) => Some(logs),
            Err(e) => {
                debug!("Could not read logs of {}: {}", name, e);
                None
            }
        };

        let dependents = match self.handle.list(false).await {
            Ok(running) => running
                .into_iter()
                .filter(|p| self.dependent_pattern.is_match(&p.name))
                .map(|p| format!("{}: {} ({})", p.name, p.image, p.status))
                .collect(),
            Err(e) => {
                debug!("Could not list dependents: {}", e);
                Vec::new()
            }
        };

        let log_files = self
            .handle
            .exec(name, &["ls", "-lh", GATEWAY_LOG_DIR])
            .await
            .ok()
            .filter(|out| out.success() && !out.stdout.trim().is_empty())
            .map(|out| out.stdout.trim_end().to_string());

        let checklist = vec![
            self.check_token(name).await,
            self.check_socket(name).await,
            self.check_port().await,
        ];

        Ok(DebugReport {
            container: name.to_string(),
            summary,
            health,
            health_body,
            logs,
            dependents,
            log_files,
            checklist,
        })
    }

    async fn check_token(&self, name: &str) -> HealthCheck {
        let label = format!("{GITHUB_TOKEN_VAR} set");
        match self.handle.exec(name, &["printenv", GITHUB_TOKEN_VAR]).await {
            Ok(out) if out.success() => HealthCheck::pass(label, "Yes"),
            _ => HealthCheck::fail(label, "No (this may cause authentication issues)"),
        }
    }

    async fn check_socket(&self, name: &str) -> HealthCheck {
        let socket = self.socket_path.display().to_string();
        match self.handle.exec(name, &["test", "-S", &socket]).await {
            Ok(out) if out.success() => HealthCheck::pass("Docker socket accessible", "Yes"),
            _ => HealthCheck::fail(
                "Docker socket accessible",
                "No (cannot spawn MCP server containers)",
            ),
        }
    }

    async fn check_port(&self) -> HealthCheck {
        let label = format!("Port {} bound", self.host_port);
        if port_listening(self.host_port, self.connect_timeout).await {
            HealthCheck::pass(label, "Yes")
        } else {
            HealthCheck::fail(label, format!("Port {} not listening", self.host_port))
        }
    }
}

/// Whether something on the local host accepts TCP connections on `port`
pub async fn port_listening(port: u16, within: Duration) -> bool {
    matches!(
        timeout(within, TcpStream::connect(("127.0.0.1", port))).await,
        Ok(Ok(_))
    )
}
