//! Container runtime abstraction
//!
//! The controller never talks to a container runtime directly. Everything
//! goes through [`ProcessHandle`], which has a Docker CLI adapter for real
//! use and an in-memory fake for tests.

mod docker;
#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{LaunchSpec, ProcessState, ProcessSummary};

pub use docker::DockerRuntime;

/// Runtime adapter errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Container runtime unavailable: {0}")]
    Unavailable(String),

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Container '{0}' not found")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl RuntimeError {
    pub fn command_failed(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        RuntimeError::CommandFailed {
            command: command.into(),
            stderr: stderr.into().trim().to_string(),
        }
    }
}

/// Output of a command executed inside a container
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Capability interface over named, externally running containers
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    /// Current state of the named container
    async fn state(&self, name: &str) -> ProcessState;

    /// Create and start a container. Returns once the runtime has accepted it.
    async fn start(&self, spec: &LaunchSpec) -> Result<(), RuntimeError>;

    /// Stop a running container
    async fn stop(&self, name: &str) -> Result<(), RuntimeError>;

    /// Remove a container; `force` also kills it if running
    async fn remove(&self, name: &str, force: bool) -> Result<(), RuntimeError>;

    /// List containers; `all` includes stopped ones
    async fn list(&self, all: bool) -> Result<Vec<ProcessSummary>, RuntimeError>;

    /// Describe a single container, if present
    async fn inspect(&self, name: &str) -> Result<Option<ProcessSummary>, RuntimeError> {
        Ok(self
            .list(true)
            .await?
            .into_iter()
            .find(|summary| summary.name == name))
    }

    /// Last `tail` lines of combined stdout/stderr
    async fn logs(&self, name: &str, tail: usize) -> Result<String, RuntimeError>;

    /// Run a command inside the container
    async fn exec(&self, name: &str, command: &[&str]) -> Result<ExecOutput, RuntimeError>;
}
