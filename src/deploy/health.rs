//! Health checking for the gateway
//!
//! Bounded polling of the gateway's health endpoint plus the pass/fail
//! check records used by the debug checklist.

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::http::HttpClient;

/// Health poll configuration
#[derive(Clone, Debug)]
pub struct HealthCheckConfig {
    /// Maximum number of probes
    pub max_attempts: u32,

    /// Delay between consecutive probes
    pub interval: Duration,

    /// Timeout for an individual probe
    pub probe_timeout_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(1),
            probe_timeout_secs: 5,
        }
    }
}

impl HealthCheckConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn probe_timeout(mut self, secs: u64) -> Self {
        self.probe_timeout_secs = secs;
        self
    }
}

/// A single readiness probe against an endpoint
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Returns the response body on success, a description of the failure otherwise
    async fn probe(&self, endpoint: &str) -> Result<String, String>;
}

/// Probe that issues `GET <endpoint>` and accepts any 2xx
pub struct HttpHealthProbe {
    http_client: HttpClient,
}

impl HttpHealthProbe {
    pub fn new(config: &HealthCheckConfig) -> Result<Self> {
        Ok(Self {
            http_client: HttpClient::with_timeout(config.probe_timeout_secs)?,
        })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, endpoint: &str) -> Result<String, String> {
        match self.http_client.get(endpoint).await {
            Ok(response) if response.is_success() => {
                debug!("{} answered in {}ms", endpoint, response.duration_ms);
                Ok(response.pretty_body())
            }
            Ok(response) => Err(format!("HTTP {}", response.status_code)),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Outcome of a bounded health wait
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthResult {
    pub healthy: bool,
    pub last_error: Option<String>,
    pub attempts_used: u32,
}

impl HealthResult {
    /// Convert an unhealthy result into a [`HealthTimeout`]
    pub fn into_result(self) -> Result<HealthResult, HealthTimeout> {
        if self.healthy {
            Ok(self)
        } else {
            Err(HealthTimeout {
                attempts: self.attempts_used,
                last_error: self.last_error.unwrap_or_else(|| "no probe issued".to_string()),
            })
        }
    }
}

/// The gateway never answered its health endpoint within the bound
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Gateway not healthy after {attempts} attempts (last error: {last_error})")]
pub struct HealthTimeout {
    pub attempts: u32,
    pub last_error: String,
}

/// The health wait was interrupted before it finished
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Health wait cancelled")]
pub struct Cancelled;

/// Polls a health endpoint until it succeeds or attempts run out
pub struct HealthPoller<P> {
    config: HealthCheckConfig,
    probe: P,
}

impl<P: HealthProbe> HealthPoller<P> {
    pub fn new(config: HealthCheckConfig, probe: P) -> Self {
        Self { config, probe }
    }

    /// Probe once per interval, at most `max_attempts` times
    pub async fn wait_until_healthy(&self, endpoint: &str) -> HealthResult {
        let max_attempts = self.config.max_attempts;
        let mut last_error = None;

        info!(
            "Waiting for {} to become healthy ({} attempts, {:?} apart)",
            endpoint, max_attempts, self.config.interval
        );

        for attempt in 1..=max_attempts {
            match self.probe.probe(endpoint).await {
                Ok(_) => {
                    info!("Gateway healthy after {} attempt(s)", attempt);
                    return HealthResult {
                        healthy: true,
                        last_error: None,
                        attempts_used: attempt,
                    };
                }
                Err(e) => {
                    debug!("Health probe {}/{} failed: {}", attempt, max_attempts, e);
                    last_error = Some(e);
                }
            }

            if attempt < max_attempts {
                sleep(self.config.interval).await;
            }
        }

        warn!("Gateway not healthy after {} attempts", max_attempts);
        HealthResult {
            healthy: false,
            last_error,
            attempts_used: max_attempts,
        }
    }

    /// Like [`wait_until_healthy`](Self::wait_until_healthy), abandoned when `cancel` resolves
    pub async fn wait_until_healthy_or_cancel<F>(
        &self,
        endpoint: &str,
        cancel: F,
    ) -> Result<HealthResult, Cancelled>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.wait_until_healthy(endpoint) => Ok(result),
            _ = cancel => {
                warn!("Health wait for {} cancelled", endpoint);
                Err(Cancelled)
            }
        }
    }
}

/// Individual check result
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthCheck {
    /// Check name
    pub name: String,

    /// Whether check passed
    pub passed: bool,

    /// Result message
    pub message: String,
}

impl HealthCheck {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: message.into(),
        }
    }
}
