//! Backend credential resolution
//!
//! Looks for the GitHub token in an explicit value, then an environment
//! variable, then the output of an identity CLI (`gh auth token`).

use std::env;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::models::GITHUB_TOKEN_VAR;

/// No credential could be obtained
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("No credential found: {env_var} is unset and `{command}` failed: {reason}")]
    Exhausted {
        env_var: String,
        command: String,
        reason: String,
    },
}

/// Resolves the backend token from the first source that yields one
#[derive(Clone, Debug)]
pub struct CredentialResolver {
    env_var: String,
    command: Vec<String>,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self {
            env_var: GITHUB_TOKEN_VAR.to_string(),
            command: vec!["gh".to_string(), "auth".to_string(), "token".to_string()],
        }
    }
}

impl CredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    /// Program and arguments printing the token on stdout
    #[cfg(test)]
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Name of the environment variable consulted
    pub fn variable(&self) -> &str {
        &self.env_var
    }

    pub async fn resolve(&self, explicit: Option<&str>) -> Result<String, CredentialError> {
        if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
            debug!("Using explicitly supplied credential");
            return Ok(token.to_string());
        }

        if let Some(token) = env::var(&self.env_var)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
        {
            debug!("Using credential from {}", self.env_var);
            return Ok(token);
        }

        info!("Getting credential from `{}`", self.command.join(" "));
        self.from_command().await.map_err(|reason| CredentialError::Exhausted {
            env_var: self.env_var.clone(),
            command: self.command.join(" "),
            reason,
        })
    }

    async fn from_command(&self) -> Result<String, String> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| "no credential command configured".to_string())?;

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| format!("{program}: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("exited with {}: {}", output.status, stderr.trim()));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err("command printed no token".to_string());
        }

        Ok(token)
    }
}
