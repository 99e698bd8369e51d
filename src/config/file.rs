//! Configuration file management
//!
//! Handles finding, loading, and validating configuration files.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{ControllerConfig, EnvConfig};

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./mcpg.yaml",
    "./mcpg.yml",
    "./.mcpg.yaml",
    "~/.config/mcpg/config.yaml",
    "~/.mcpg.yaml",
];

impl ControllerConfig {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load from `path` if given, else from the first standard location, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path.map(Path::to_path_buf).or_else(Self::find) {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// File (or defaults) with environment overrides applied
    pub fn load_layered(path: Option<&Path>, env: &EnvConfig) -> Result<Self> {
        let mut config = Self::load_or_default(path)?;
        config.apply_env(env);
        Ok(config)
    }

    /// Like [`load_layered`](Self::load_layered), but a bad config file only
    /// warns and the defaults are used instead
    pub fn load_layered_or_default(path: Option<&Path>, env: &EnvConfig) -> Self {
        Self::load_layered(path, env).unwrap_or_else(|e| {
            warn!("Ignoring controller config: {:#}", e);
            let mut config = Self::default();
            config.apply_env(env);
            config
        })
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.container_name.trim().is_empty() {
            anyhow::bail!("container_name must not be empty");
        }
        if self.gateway_version.trim().is_empty() {
            anyhow::bail!("gateway_version must not be empty");
        }
        if self.host_port == 0 || self.listen_port == 0 {
            anyhow::bail!("Ports must be non-zero");
        }
        if self.health.max_attempts == 0 {
            anyhow::bail!("health.max_attempts must be at least 1");
        }
        if self.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            anyhow::bail!("api_key must not be empty when set");
        }

        self.dependent_regex().with_context(|| {
            format!("Invalid dependent_pattern '{}'", self.dependent_pattern)
        })?;

        let mut seen = std::collections::BTreeSet::new();
        for backend in &self.backends {
            if !seen.insert(backend.name.as_str()) {
                anyhow::bail!("Backend '{}' is defined more than once", backend.name);
            }
        }

        Ok(())
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackendSpec, NamedBackend};
    use tempfile::tempdir;

    #[test]
    fn test_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/mcpg.yaml");

        let config = ControllerConfig {
            container_name: "gw".to_string(),
            backends: vec![NamedBackend::new(
                "github",
                BackendSpec::github("ghp_x"),
            )],
            ..Default::default()
        };
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();

        let loaded = ControllerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mcpg.json");

        let config = ControllerConfig {
            host_port: 9090,
            ..Default::default()
        };
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(ControllerConfig::load(&path).unwrap().host_port, 9090);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mcpg.yml");
        let yaml = "\
gateway_version: v0.1.2
backends:
  - name: docs
    type: http
    url: http://docs/mcp
";
        std::fs::write(&path, yaml).unwrap();

        let config = ControllerConfig::load(&path).unwrap();
        assert_eq!(config.gateway_version, "v0.1.2");
        assert_eq!(config.container_name, "mcpg-gateway");
        assert_eq!(config.backends[0].spec.kind(), "http");
    }

    #[test]
    fn test_validate_config() {
        assert!(ControllerConfig::default().validate().is_ok());

        let bad_pattern = ControllerConfig {
            dependent_pattern: "(".to_string(),
            ..Default::default()
        };
        assert!(bad_pattern.validate().is_err());

        let duplicate = ControllerConfig {
            backends: vec![
                NamedBackend::new("a", BackendSpec::stdio("img")),
                NamedBackend::new("a", BackendSpec::stdio("img")),
            ],
            ..Default::default()
        };
        assert!(duplicate.validate().is_err());

        let empty_key = ControllerConfig {
            api_key: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(empty_key.validate().is_err());
    }

    #[test]
    fn test_load_or_default_explicit_missing() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        assert!(ControllerConfig::load_or_default(Some(&missing)).is_err());
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mcpg.yaml");
        std::fs::write(&path, "host_port: \"eighty\"\n").unwrap();

        let env = EnvConfig {
            container_name: Some("gw-fallback".to_string()),
            ..Default::default()
        };
        assert!(ControllerConfig::load_layered(Some(&path), &env).is_err());

        let config = ControllerConfig::load_layered_or_default(Some(&path), &env);
        assert_eq!(config.container_name, "gw-fallback");
        assert_eq!(config.host_port, 80);
    }

    #[test]
    fn test_load_layered_applies_env() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mcpg.yaml");
        std::fs::write(&path, "host_port: 9000\ndomain: gw.example\n").unwrap();

        let env = EnvConfig {
            port: Some(8080),
            ..Default::default()
        };
        let config = ControllerConfig::load_layered(Some(&path), &env).unwrap();
        assert_eq!(config.host_port, 8080);
        assert_eq!(config.domain, "gw.example");
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("./mcpg.yaml"), PathBuf::from("./mcpg.yaml"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/.mcpg.yaml"), home.join(".mcpg.yaml"));
        }
    }

    #[test]
    fn test_is_yaml_file() {
        assert!(is_yaml_file(Path::new("a.yaml")));
        assert!(is_yaml_file(Path::new("a.yml")));
        assert!(!is_yaml_file(Path::new("a.json")));
    }
}
