//! Output formatters for controller reports
//!
//! Renders scan reports, debug reports and the start/stop summaries as
//! plain text, or as JSON where the report is serializable.

use serde::Serialize;
use std::path::Path;

use crate::deploy::{DebugReport, StopOutcome, SweepReport};
use crate::diagnostics::{DiagnosticScanner, ScanFinding, ScanReport, Severity, SourceOutcome};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    JsonPretty,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "table" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            _ => None,
        }
    }
}

/// Connection details printed after a successful start
#[derive(Clone, Debug, Serialize)]
pub struct GatewayInfo {
    pub version: String,
    pub host_port: u16,
    pub backends: Vec<String>,
    pub api_key: String,
    pub container: String,
    pub log_path: String,
}

impl GatewayInfo {
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.host_port)
    }
}

const RULE: &str = "=========================================";

/// Report formatter
pub struct ReportFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ReportFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn to_json<T: Serialize>(&self, value: &T) -> String {
        if self.format == OutputFormat::JsonPretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }

    fn paint(&self, severity: Severity, text: String) -> String {
        if !self.colorize {
            return text;
        }
        match severity {
            Severity::Error => format!("\x1b[31m{text}\x1b[0m"),
            Severity::Warning => format!("\x1b[33m{text}\x1b[0m"),
            Severity::Info => text,
        }
    }

    /// Format a scan report
    pub fn format_scan(
        &self,
        report: &ScanReport,
        scanner: &DiagnosticScanner,
        dir: &Path,
    ) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => self.to_json(report),
            OutputFormat::Text => self.format_scan_text(report, scanner, dir),
        }
    }

    fn format_scan_text(
        &self,
        report: &ScanReport,
        scanner: &DiagnosticScanner,
        dir: &Path,
    ) -> String {
        let mut output = String::new();

        output.push_str("=== Quick Scan for Common Errors ===\n");
        output.push_str(&format!("Log directory: {}\n\n", dir.display()));

        for source in &report.sources {
            let findings = match &source.outcome {
                SourceOutcome::Unavailable(missing) => {
                    output.push_str(&format!("⚠️  {missing}\n\n"));
                    continue;
                }
                SourceOutcome::Scanned { findings } => findings,
            };

            for pattern in scanner.patterns_for(source.source.kind) {
                output.push_str(&format!("🔍 Scanning for {}...\n", pattern.title));
                match findings.iter().find(|f| f.pattern_id == pattern.id) {
                    Some(finding) => {
                        output.push_str(&self.format_finding(finding, &pattern.label));
                    }
                    None => output.push_str(&format!("   ✅ No {}\n", pattern.title)),
                }
                output.push('\n');
            }
        }

        output.push_str(&format!(
            "Matched lines: {} error, {} warning\n",
            report.count_by_severity(Severity::Error),
            report.count_by_severity(Severity::Warning)
        ));
        output.push_str("=== Scan Complete ===\n");
        output
    }

    fn format_finding(&self, finding: &ScanFinding, label: &str) -> String {
        let mut output = String::new();
        let headline = format!("Found {} {}(s)", finding.match_count, label);

        output.push_str(&format!(
            "   {}  {}\n",
            finding.severity.icon(),
            self.paint(finding.severity, headline)
        ));
        for line in &finding.sample_lines {
            output.push_str(&format!("      {line}\n"));
        }
        if let Some(advisory) = &finding.advisory {
            output.push_str(&format!("   {advisory}\n"));
        }
        output
    }

    /// Format the `debug` report
    pub fn format_debug(&self, report: &DebugReport) -> String {
        let mut output = String::new();
        let name = &report.container;

        output.push_str(&format!("{RULE}\nMCP Gateway Debug Information\n{RULE}\n\n"));

        output.push_str("=== Container Status ===\n");
        output.push_str(&report.summary.format_block());
        output.push_str("\n\n");

        output.push_str("=== Health Check ===\n");
        if let Some(body) = &report.health_body {
            output.push_str(body);
            output.push('\n');
        }
        let mark = if report.health.passed { "✓" } else { "✗" };
        output.push_str(&format!("{mark} {}\n\n", report.health.message));

        output.push_str("=== Gateway Logs (last 50 lines) ===\n");
        output.push_str(report.logs.as_deref().unwrap_or("Cannot read container logs"));
        output.push_str("\n\n");

        output.push_str("=== MCP Server Containers ===\n");
        if report.dependents.is_empty() {
            output.push_str("No MCP server containers found\n");
        } else {
            for dependent in &report.dependents {
                output.push_str(&format!("{dependent}\n"));
            }
        }
        output.push('\n');

        output.push_str("=== Internal Log Files ===\n");
        output.push_str(report.log_files.as_deref().unwrap_or("Cannot access log directory"));
        output.push_str("\n\n");

        output.push_str("=== Common Issues Check ===\n");
        for check in &report.checklist {
            let mark = if check.passed { "✓" } else { "✗" };
            output.push_str(&format!("{}: {} {}\n", check.name, mark, check.message));
        }
        if report.all_passed() {
            output.push_str("\n✓ No common issues detected\n");
        }

        output.push_str(&format!("\n{RULE}\nFor detailed logs:\n"));
        output.push_str(&format!("  docker logs {name}\n"));
        output.push_str(&format!("  docker logs {name} -f  # follow mode\n\n"));
        output.push_str("To restart gateway:\n");
        output.push_str(&format!("  docker restart {name}\n{RULE}\n"));
        output
    }

    /// Format the connection summary printed after a healthy start
    pub fn format_gateway_info(&self, info: &GatewayInfo) -> String {
        if self.format != OutputFormat::Text {
            return self.to_json(info);
        }

        let url = info.base_url();
        let mut output = String::new();

        output.push_str(&format!("\n{RULE}\nMCP Gateway Information\n{RULE}\n"));
        output.push_str(&format!("Version:     {}\n", info.version));
        output.push_str(&format!("URL:         {url}\n"));
        output.push_str(&format!("Health:      {url}/health\n"));
        for backend in &info.backends {
            let label = format!("{backend}:");
            output.push_str(&format!("{label:<13}{url}/mcp/{backend}\n"));
        }
        output.push_str(&format!("API Key:     {}\n", info.api_key));
        output.push_str(&format!("Container:   {}\n", info.container));
        output.push_str(&format!("Logs:        {}\n\n", info.log_path));
        output.push_str("To stop:\n  mcpg stop\n\n");
        output.push_str(&format!("To check status:\n  curl {url}/health | jq .\n{RULE}\n"));
        output
    }

    /// Format the result of `stop`
    pub fn format_stop(
        &self,
        container: &str,
        outcome: Option<StopOutcome>,
        sweep: Option<&SweepReport>,
    ) -> String {
        let mut output = String::new();

        match outcome {
            Some(StopOutcome::Removed) => output.push_str("✓ Gateway stopped and removed\n"),
            Some(StopOutcome::NotFound) => {
                output.push_str(&format!("⚠ Container '{container}' not found\n"))
            }
            None => output.push_str(&format!("✗ Could not fully remove '{container}'\n")),
        }

        output.push_str("Cleaning up MCP server containers...\n");
        match sweep {
            None => output.push_str("  Could not list containers\n"),
            Some(sweep) if sweep.matched.is_empty() => {
                output.push_str("  No MCP server containers found\n")
            }
            Some(sweep) => {
                for name in &sweep.removed {
                    output.push_str(&format!("  Removed: {name}\n"));
                }
                for failure in &sweep.failures {
                    output.push_str(&format!("  Failed:  {} ({})\n", failure.name, failure.error));
                }
            }
        }

        output.push_str("✓ Cleanup complete\n");
        output
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Text)
    }
}
