//! Gateway deployment and management module
//!
//! Provides launching, teardown, health checking and inspection of the
//! gateway container, plus the supporting credential and client-config
//! helpers.

mod client_config;
mod credential;
mod health;
mod inspect;
mod lifecycle;

pub use client_config::{resolve_api_key, ClientConfig};
pub use credential::CredentialResolver;
pub use health::{HealthCheckConfig, HealthPoller, HttpHealthProbe};
pub use inspect::{DebugReport, GatewayInspector, InspectError};
pub use lifecycle::{
    ContainerLifecycleManager, LaunchOptions, StopOutcome, SweepReport, DEFAULT_DEPENDENT_PATTERN,
};

#[cfg(test)]
pub use health::HealthCheck;
