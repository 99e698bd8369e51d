//! Data models for the gateway controller
//!
//! This module contains the configuration document and process descriptions
//! shared by the lifecycle and diagnostics code.

mod gateway;
mod process;

pub use gateway::{
    BackendSpec, ConfigBuilder, GatewayConfig, GatewayOptions, NamedBackend,
    DEFAULT_LISTEN_PORT, GITHUB_TOKEN_VAR,
};
pub use process::{
    LaunchSpec, Mount, PortMapping, ProcessIdentity, ProcessState, ProcessSummary, RunState,
};
