//! Diagnostic pattern table and log sources

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kinds of log files produced by an agent run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Agent stdout/stderr; the primary source
    AgentLog,
    /// Gateway's own markdown log
    GatewayMarkdownLog,
    /// Egress firewall access log
    FirewallAccessLog,
}

impl LogKind {
    /// Location relative to a run's log directory
    pub fn relative_path(&self) -> &'static str {
        match self {
            LogKind::AgentLog => "agent-stdio.log",
            LogKind::GatewayMarkdownLog => "mcp-logs/gateway.md",
            LogKind::FirewallAccessLog => "sandbox/firewall/logs/access.log",
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, LogKind::AgentLog)
    }

    pub fn all() -> [LogKind; 3] {
        [
            LogKind::AgentLog,
            LogKind::GatewayMarkdownLog,
            LogKind::FirewallAccessLog,
        ]
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogKind::AgentLog => "Agent log",
            LogKind::GatewayMarkdownLog => "MCP Gateway log",
            LogKind::FirewallAccessLog => "Firewall log",
        };
        write!(f, "{name}")
    }
}

/// A log file to scan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSource {
    pub path: PathBuf,
    pub kind: LogKind,
}

impl LogSource {
    pub fn new(path: impl Into<PathBuf>, kind: LogKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Every known source under `dir`, present or not
    pub fn discover(dir: &Path) -> Vec<LogSource> {
        LogKind::all()
            .into_iter()
            .map(|kind| LogSource::new(dir.join(kind.relative_path()), kind))
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Error => "❌",
            Severity::Warning => "⚠️",
            Severity::Info => "ℹ️",
        }
    }
}

/// A named failure signature
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub applies_to: LogKind,
    pub regex: String,
    #[serde(default)]
    pub case_insensitive: bool,
    pub severity: Severity,
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
    /// Plural description, e.g. "MCP server failures"
    pub title: String,
    /// Singular noun used in counts, e.g. "MCP server failure"
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

fn default_sample_limit() -> usize {
    5
}

impl Pattern {
    pub fn new(
        id: impl Into<String>,
        applies_to: LogKind,
        regex: impl Into<String>,
        severity: Severity,
    ) -> Self {
        let id = id.into();
        Self {
            title: id.replace('_', " "),
            label: id.replace('_', " "),
            id,
            applies_to,
            regex: regex.into(),
            case_insensitive: false,
            severity,
            sample_limit: default_sample_limit(),
            advisory: None,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    pub fn describe(mut self, title: impl Into<String>, label: impl Into<String>) -> Self {
        self.title = title.into();
        self.label = label.into();
        self
    }

    pub fn advisory(mut self, text: impl Into<String>) -> Self {
        self.advisory = Some(text.into());
        self
    }

    pub fn compile(&self) -> Result<Regex, regex::Error> {
        RegexBuilder::new(&self.regex)
            .case_insensitive(self.case_insensitive)
            .build()
    }

    /// The built-in failure taxonomy
    pub fn builtin() -> Vec<Pattern> {
        vec![
            Pattern::new(
                "mcp_server_failure",
                LogKind::AgentLog,
                r"mcp:.*failed",
                Severity::Error,
            )
            .describe("MCP server failures", "MCP server failure"),
            Pattern::new(
                "dns_resolution_error",
                LogKind::AgentLog,
                r"dns error.*Name does not resolve",
                Severity::Error,
            )
            .describe("DNS resolution errors", "DNS resolution error")
            .advisory("This usually indicates host.docker.internal is not resolvable"),
            Pattern::new(
                "oauth_warning",
                LogKind::AgentLog,
                r"WARN codex_rmcp_client::oauth",
                Severity::Warning,
            )
            .describe("OAuth warnings", "OAuth warning")
            .advisory("This may indicate missing org.freedesktop.secrets service"),
            // only pattern matched without regard to case
            Pattern::new(
                "tool_unavailable_or_failed",
                LogKind::AgentLog,
                r"tool.*not available|tool.*failed",
                Severity::Error,
            )
            .case_insensitive()
            .sample_limit(3)
            .describe("tool availability errors", "tool error"),
            Pattern::new(
                "gateway_session_not_found",
                LogKind::GatewayMarkdownLog,
                r"Session not found",
                Severity::Warning,
            )
            .describe("session errors", "session error"),
            Pattern::new(
                "firewall_denied",
                LogKind::FirewallAccessLog,
                r"TCP_DENIED",
                Severity::Warning,
            )
            .describe("blocked requests", "blocked request"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin(id: &str) -> Pattern {
        Pattern::builtin().into_iter().find(|p| p.id == id).unwrap()
    }

    #[test]
    fn test_builtin_table() {
        let patterns = Pattern::builtin();
        assert_eq!(patterns.len(), 6);
        for pattern in &patterns {
            assert!(pattern.compile().is_ok(), "{} should compile", pattern.id);
        }

        let insensitive: Vec<_> = patterns
            .iter()
            .filter(|p| p.case_insensitive)
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(insensitive, vec!["tool_unavailable_or_failed"]);

        assert_eq!(builtin("tool_unavailable_or_failed").sample_limit, 3);
        assert_eq!(builtin("firewall_denied").sample_limit, 5);
        assert_eq!(builtin("oauth_warning").severity, Severity::Warning);
    }

    #[test]
    fn test_mcp_failure() {
        let re = builtin("mcp_server_failure").compile().unwrap();
        assert!(re.is_match("ERROR mcp: github failed to start"));
        assert!(!re.is_match("ERROR MCP: github FAILED"));
    }

    #[test]
    fn test_dns_error() {
        let re = builtin("dns_resolution_error").compile().unwrap();
        assert!(re.is_match(
            "dns error: failed to lookup address information: Name does not resolve"
        ));
        assert!(!re.is_match("Name does not resolve"));
    }

    #[test]
    fn test_tool_error_ignores_case() {
        let re = builtin("tool_unavailable_or_failed").compile().unwrap();
        assert!(re.is_match("Tool list_issues not available"));
        assert!(re.is_match("TOOL call FAILED"));
        assert!(!re.is_match("tool call succeeded"));
    }

    #[test]
    fn test_gateway_and_firewall() {
        let session = builtin("gateway_session_not_found").compile().unwrap();
        assert!(session.is_match("| 12:00 | Session not found: abc |"));
        assert!(!session.is_match("session not found"));

        let denied = builtin("firewall_denied").compile().unwrap();
        assert!(denied.is_match("1700000000.000 TCP_DENIED/403 0 CONNECT evil.com:443"));
    }

    #[test]
    fn test_discover() {
        let sources = LogSource::discover(Path::new("/logs/run-1"));
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].path, PathBuf::from("/logs/run-1/agent-stdio.log"));
        assert!(sources[0].kind.is_primary());
        assert_eq!(
            sources[2].path,
            PathBuf::from("/logs/run-1/sandbox/firewall/logs/access.log")
        );
    }

    #[test]
    fn test_pattern_from_yaml() {
        let yaml = "\
id: custom
applies_to: agent_log
regex: panic
severity: error
title: panics
label: panic
";
        let pattern: Pattern = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(pattern.sample_limit, 5);
        assert!(!pattern.case_insensitive);
        assert_eq!(pattern.applies_to, LogKind::AgentLog);
    }
}
