//! MCP client configuration pointing at the gateway

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::models::BackendSpec;

/// Name of the single server entry in the client config
pub const CLIENT_SERVER_NAME: &str = "github-gateway";

/// Key used when neither the key file nor `API_KEY` provide one
pub const FALLBACK_API_KEY: &str = "test-api-key";

/// Client-side config document
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientConfig {
    #[serde(rename = "mcpServers")]
    pub servers: BTreeMap<String, BackendSpec>,
}

impl ClientConfig {
    /// Route every tool of the GitHub backend through the gateway on `port`
    pub fn for_gateway(port: u16, api_key: &str) -> Self {
        let server = BackendSpec::http(format!("http://host.docker.internal:{port}/mcp/github"))
            .with_entry("Authorization", api_key)
            .with_tools(vec!["*".to_string()]);

        let mut servers = BTreeMap::new();
        servers.insert(CLIENT_SERVER_NAME.to_string(), server);
        Self { servers }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize client config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write client config: {}", path.display()))?;
        debug!("Client config written to {}", path.display());
        Ok(())
    }
}

/// Key cached by the last successful start, else `env_key`, else the fallback
pub fn resolve_api_key(key_file: &Path, env_key: Option<&str>) -> String {
    if let Ok(content) = std::fs::read_to_string(key_file) {
        let key = content.trim();
        if !key.is_empty() {
            return key.to_string();
        }
    }

    env_key
        .filter(|k| !k.is_empty())
        .unwrap_or(FALLBACK_API_KEY)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_client_config_shape() {
        let config = ClientConfig::for_gateway(8080, "k3y");
        let value = serde_json::to_value(&config).unwrap();

        let server = &value["mcpServers"]["github-gateway"];
        assert_eq!(server["type"], "http");
        assert_eq!(server["url"], "http://host.docker.internal:8080/mcp/github");
        assert_eq!(server["headers"]["Authorization"], "k3y");
        assert_eq!(server["tools"], serde_json::json!(["*"]));
    }

    #[test]
    fn test_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client.json");
        ClientConfig::for_gateway(80, "abc").write(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            written["mcpServers"]["github-gateway"]["url"],
            "http://host.docker.internal:80/mcp/github"
        );
    }

    #[test]
    fn test_resolve_api_key_order() {
        let dir = tempdir().unwrap();
        let key_file = dir.path().join("key.txt");

        assert_eq!(resolve_api_key(&key_file, None), FALLBACK_API_KEY);
        assert_eq!(resolve_api_key(&key_file, Some("from-env")), "from-env");

        std::fs::write(&key_file, "cached\n").unwrap();
        assert_eq!(resolve_api_key(&key_file, Some("from-env")), "cached");
    }
}
