//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// MCP Gateway lifecycle and diagnostics controller
#[derive(Parser, Debug)]
#[command(name = "mcpg")]
#[command(version = "0.1.0")]
#[command(about = "Start, stop, inspect and diagnose the MCP Gateway container")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Controller configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launch the gateway and wait until it is healthy
    Start(StartArgs),

    /// Stop the gateway and remove the containers it spawned
    Stop,

    /// Print status, logs and common-issue checks for the gateway
    Debug,

    /// Scan an agent run's log directory for known failures
    Scan(ScanArgs),

    /// Write an MCP client config that routes through the gateway
    ClientConfig(ClientConfigArgs),

    /// Show recognised environment variables
    Env,
}

/// Arguments for start command
#[derive(Parser, Debug, Default)]
pub struct StartArgs {
    /// Host port to publish
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Gateway domain
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Gateway API key (random when omitted)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Gateway image tag
    #[arg(long)]
    pub gateway_version: Option<String>,

    /// GitHub token for the backend
    #[arg(long)]
    pub token: Option<String>,
}

/// Arguments for scan command
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Log directory of a workflow run
    pub log_dir: PathBuf,

    /// Output format (text, json, json-pretty)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Arguments for client-config command
#[derive(Parser, Debug)]
pub struct ClientConfigArgs {
    /// Gateway host port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Where to write the client config
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["mcpg", "stop", "--verbose"]);
        assert!(matches!(args.command, Command::Stop));
        assert_eq!(args.verbose, 1);

        let args = Args::parse_from(["mcpg", "-vv", "debug"]);
        assert_eq!(args.verbose, 2);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_start_args() {
        let args = Args::parse_from([
            "mcpg",
            "--config",
            "mcpg.yaml",
            "start",
            "--port",
            "8080",
            "--gateway-version",
            "v0.0.60",
            "--api-key",
            "secret",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("mcpg.yaml")));
        match args.command {
            Command::Start(start) => {
                assert_eq!(start.port, Some(8080));
                assert_eq!(start.gateway_version.as_deref(), Some("v0.0.60"));
                assert_eq!(start.api_key.as_deref(), Some("secret"));
                assert!(start.token.is_none());
            }
            _ => panic!("Expected Start command"),
        }
    }

    #[test]
    fn test_scan_args() {
        let args = Args::parse_from(["mcpg", "scan", "logs/run-1", "--format", "json"]);
        match args.command {
            Command::Scan(scan) => {
                assert_eq!(scan.log_dir, PathBuf::from("logs/run-1"));
                assert_eq!(scan.format, "json");
            }
            _ => panic!("Expected Scan command"),
        }

        assert!(Args::try_parse_from(["mcpg", "scan"]).is_err());
    }

    #[test]
    fn test_client_config_args() {
        let args = Args::parse_from(["mcpg", "client-config", "-p", "9000", "-o", "/tmp/c.json"]);
        match args.command {
            Command::ClientConfig(cc) => {
                assert_eq!(cc.port, Some(9000));
                assert_eq!(cc.output, Some(PathBuf::from("/tmp/c.json")));
            }
            _ => panic!("Expected ClientConfig command"),
        }
    }
}
