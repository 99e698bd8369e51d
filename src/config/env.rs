//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

use crate::models::GITHUB_TOKEN_VAR;

/// Environment variable prefix
const ENV_PREFIX: &str = "GATEWAY";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Container name from CONTAINER_NAME
    pub container_name: Option<String>,
    /// Host port from GATEWAY_PORT
    pub port: Option<u16>,
    /// Domain from GATEWAY_DOMAIN
    pub domain: Option<String>,
    /// API key from GATEWAY_API_KEY
    pub api_key: Option<String>,
    /// Image tag from GATEWAY_VERSION
    pub version: Option<String>,
    /// Config file from MCPG_CONFIG
    pub config_file: Option<String>,
    /// Client-config key fallback from API_KEY
    pub client_api_key: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            container_name: get_raw("CONTAINER_NAME"),
            port: get_env_parse("PORT"),
            domain: get_env("DOMAIN"),
            api_key: get_env("API_KEY"),
            version: get_env("VERSION"),
            config_file: get_raw("MCPG_CONFIG"),
            client_api_key: get_raw("API_KEY"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.container_name.is_some()
            || self.port.is_some()
            || self.domain.is_some()
            || self.api_key.is_some()
            || self.version.is_some()
            || self.config_file.is_some()
            || self.client_api_key.is_some()
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        let token_set = get_raw(GITHUB_TOKEN_VAR).is_some();

        println!("Environment Configuration:");
        println!("  CONTAINER_NAME:        {:?}", self.container_name);
        println!("  {}_PORT:          {:?}", ENV_PREFIX, self.port);
        println!("  {}_DOMAIN:        {:?}", ENV_PREFIX, self.domain);
        println!(
            "  {}_API_KEY:       {}",
            ENV_PREFIX,
            if self.api_key.is_some() { "(set)" } else { "None" }
        );
        println!("  {}_VERSION:       {:?}", ENV_PREFIX, self.version);
        println!("  MCPG_CONFIG:           {:?}", self.config_file);
        println!(
            "  API_KEY:               {}",
            if self.client_api_key.is_some() { "(set)" } else { "None" }
        );
        println!(
            "  {GITHUB_TOKEN_VAR}: {}",
            if token_set { "(set)" } else { "None" }
        );
    }
}

/// Get non-empty environment variable without prefix
fn get_raw(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    get_raw(&format!("{ENV_PREFIX}_{name}"))
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Builder for setting environment variables (useful for testing)
#[cfg(test)]
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

#[cfg(test)]
impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    pub fn container_name(mut self, name: impl Into<String>) -> Self {
        self.vars.push(("CONTAINER_NAME".to_string(), name.into()));
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_PORT"), port.to_string()));
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_DOMAIN"), domain.into()));
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_VERSION"), version.into()));
        self
    }

    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.push((key.into(), value.into()));
        self
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

/// Guard that restores environment variables on drop
#[cfg(test)]
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all recognised environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  CONTAINER_NAME                Gateway container name (default: mcpg-gateway)");
    println!("  {ENV_PREFIX}_PORT                  Host port for the gateway (default: 80)");
    println!("  {ENV_PREFIX}_DOMAIN                Gateway domain (default: localhost)");
    println!("  {ENV_PREFIX}_API_KEY               Gateway API key (default: random per start)");
    println!("  {ENV_PREFIX}_VERSION               Gateway image tag (default: v0.0.59)");
    println!("  {GITHUB_TOKEN_VAR}  GitHub token (default: `gh auth token`)");
    println!("  API_KEY                       Key for client-config when no key file exists");
    println!("  MCPG_CONFIG                   Path to configuration file");
    println!("  RUST_LOG                      Log filter (e.g. mcpg=debug)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_PORT=8080");
    println!("  export {ENV_PREFIX}_VERSION=v0.0.59");
    println!("  mcpg start");
}
