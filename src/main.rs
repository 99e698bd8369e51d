//! mcpg - MCP Gateway lifecycle and diagnostics controller
//!
//! Brings the MCP Gateway container from absent to healthy, tears it down
//! together with the backend containers it spawned, and scans agent run logs
//! for known failure signatures.
//!
//! ## Usage
//!
//! ```bash
//! # Start the gateway (GitHub token from GITHUB_PERSONAL_ACCESS_TOKEN or `gh auth token`)
//! mcpg start --port 8080
//!
//! # Inspect a running gateway
//! mcpg debug
//!
//! # Scan the logs of a workflow run
//! mcpg scan .github/aw/logs/run-21005890162
//!
//! # Stop and clean up
//! mcpg stop
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

mod cli;
mod config;
mod deploy;
mod diagnostics;
mod http;
mod models;
mod output;
mod runtime;
mod utils;

use cli::Args;
use config::{ControllerConfig, EnvConfig};
use deploy::{
    resolve_api_key, ClientConfig, ContainerLifecycleManager, CredentialResolver,
    GatewayInspector, HealthPoller, HttpHealthProbe, InspectError,
};
use diagnostics::DiagnosticScanner;
use models::ConfigBuilder;
use output::{GatewayInfo, OutputFormat, ReportFormatter};
use runtime::DockerRuntime;
use utils::logger::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(LogLevel::from_verbosity(args.verbose));

    let env = EnvConfig::load();
    if env.has_any() {
        debug!("Environment overrides: {:?}", env);
    }
    let config_path = args
        .config
        .clone()
        .or_else(|| env.config_file.as_ref().map(PathBuf::from));
    let config_path = config_path.as_deref();

    match args.command {
        cli::Command::Start(start_args) => {
            let config = ControllerConfig::load_layered(config_path, &env)?;
            start_gateway(config, start_args).await?;
        }
        cli::Command::Stop => {
            // teardown proceeds even when the config file is broken
            let config = ControllerConfig::load_layered_or_default(config_path, &env);
            stop_gateway(&config).await?;
        }
        cli::Command::Debug => {
            let config = ControllerConfig::load_layered(config_path, &env)?;
            debug_gateway(&config).await?;
        }
        cli::Command::Scan(scan_args) => {
            scan_logs(scan_args)?;
        }
        cli::Command::ClientConfig(client_args) => {
            let config = ControllerConfig::load_layered(config_path, &env)?;
            write_client_config(&config, &env, client_args)?;
        }
        cli::Command::Env => {
            config::print_env_help();
            println!();
            env.print_summary();
        }
    }

    Ok(())
}

/// 32 hex characters
fn generate_api_key() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn runtime_for(config: &ControllerConfig) -> DockerRuntime {
    DockerRuntime::new().binary(&config.runtime_binary)
}

fn print_failure_hints(container: &str) {
    println!("Check logs:");
    println!("  docker logs {container}");
    println!("  mcpg debug");
    println!("  mcpg scan <log-directory>");
}

async fn start_gateway(mut config: ControllerConfig, args: cli::StartArgs) -> Result<()> {
    if let Some(port) = args.port {
        config.host_port = port;
    }
    if let Some(domain) = args.domain {
        config.domain = domain;
    }
    if let Some(key) = args.api_key {
        config.api_key = Some(key);
    }
    if let Some(version) = args.gateway_version {
        config.gateway_version = version;
    }
    config.validate()?;

    let identity = config.identity();
    println!("Starting MCP Gateway {}...", config.gateway_version);

    let resolver = CredentialResolver::new();
    let token = match resolver.resolve(args.token.as_deref()).await {
        Ok(token) => token,
        Err(e) => {
            println!("✗ {e}");
            println!("Set {} or run `gh auth login`", resolver.variable());
            std::process::exit(1);
        }
    };

    println!("Creating gateway configuration...");
    let api_key = config.api_key.clone().unwrap_or_else(generate_api_key);
    let gateway_config = ConfigBuilder::build(
        &config.backends_or_default(&token),
        &config.gateway_options(),
        &api_key,
    )
    .context("Invalid gateway configuration")?;
    for (name, backend) in &gateway_config.backends {
        debug!("Backend {} ({})", name, backend.kind());
    }

    let runtime = runtime_for(&config);
    let manager = ContainerLifecycleManager::new(&runtime);

    println!("Launching container...");
    match manager
        .start(&identity, &gateway_config, &config.launch_options(&token))
        .await
    {
        Ok(outcome) => {
            if outcome.replaced {
                println!("Replaced existing container {identity}");
            }
        }
        Err(e) => {
            println!("✗ {e}");
            print_failure_hints(identity.as_str());
            std::process::exit(1);
        }
    }

    println!("Waiting for gateway to start...");
    let health_config = config.health_config();
    let poller = HealthPoller::new(health_config.clone(), HttpHealthProbe::new(&health_config)?);
    let cancel = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let result = match poller
        .wait_until_healthy_or_cancel(&config.health_endpoint(), cancel)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            println!("✗ {e}; gateway container {identity} left running");
            std::process::exit(1);
        }
    };

    if let Err(timeout) = result.into_result() {
        println!("✗ Gateway failed to start: {timeout}");
        print_failure_hints(identity.as_str());
        std::process::exit(1);
    }
    println!("✓ Gateway is running!");

    std::fs::write(&config.paths.api_key, &api_key).with_context(|| {
        format!(
            "Failed to write API key file: {}",
            config.paths.api_key.display()
        )
    })?;
    debug!("API key cached in {}", config.paths.api_key.display());

    let info = GatewayInfo {
        version: config.gateway_version.clone(),
        host_port: config.host_port,
        backends: gateway_config.backends.keys().cloned().collect(),
        api_key,
        container: identity.to_string(),
        log_path: config.paths.gateway_log.display().to_string(),
    };
    print!("{}", ReportFormatter::default().format_gateway_info(&info));

    Ok(())
}

async fn stop_gateway(config: &ControllerConfig) -> Result<()> {
    let identity = config.identity();
    let pattern = config.dependent_regex()?;
    let runtime = runtime_for(config);
    let manager = ContainerLifecycleManager::new(&runtime);

    println!("Stopping MCP Gateway...");

    let outcome = match manager.stop(&identity).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!("{}", e);
            println!("✗ {e}");
            None
        }
    };

    // dependents are swept even when the gateway teardown failed
    let sweep = match manager.sweep(&pattern).await {
        Ok(report) => {
            if let Err(e) = report.clone().into_result() {
                warn!("{}", e);
            }
            Some(report)
        }
        Err(e) => {
            warn!("Dependent sweep skipped: {}", e);
            None
        }
    };

    print!(
        "{}",
        ReportFormatter::default().format_stop(identity.as_str(), outcome, sweep.as_ref())
    );
    Ok(())
}

async fn debug_gateway(config: &ControllerConfig) -> Result<()> {
    let identity = config.identity();
    let runtime = runtime_for(config);
    let probe = HttpHealthProbe::new(&config.health_config())?;

    let inspector = GatewayInspector::new(&runtime, &probe, config.dependent_regex()?)
        .socket_path(&config.socket_path)
        .host_port(config.host_port)
        .connect_timeout(Duration::from_secs(config.health.probe_timeout_secs));

    match inspector.inspect(&identity).await {
        Ok(report) => {
            print!("{}", ReportFormatter::default().format_debug(&report));
            Ok(())
        }
        Err(InspectError::NotFound(name)) => {
            println!("✗ Container '{name}' not found");
            println!();
            println!("Start the gateway first:");
            println!("  mcpg start");
            std::process::exit(1);
        }
        Err(e) => Err(e).context("Failed to inspect gateway"),
    }
}

fn scan_logs(args: cli::ScanArgs) -> Result<()> {
    let format = OutputFormat::from_str(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {}", args.format))?;

    let scanner = DiagnosticScanner::builtin().context("Invalid built-in pattern table")?;
    info!("Scanning {}", args.log_dir.display());
    let report = scanner.scan_dir(&args.log_dir);

    let mut formatter = ReportFormatter::new(format);
    if !std::io::stdout().is_terminal() {
        formatter = formatter.no_color();
    }
    println!("{}", formatter.format_scan(&report, &scanner, &args.log_dir));

    if report.primary_unavailable().is_some() {
        std::process::exit(1);
    }
    Ok(())
}

fn write_client_config(
    config: &ControllerConfig,
    env: &EnvConfig,
    args: cli::ClientConfigArgs,
) -> Result<()> {
    let port = args.port.unwrap_or(config.host_port);
    let path = args
        .output
        .unwrap_or_else(|| config.paths.client_config.clone());
    let api_key = resolve_api_key(&config.paths.api_key, env.client_api_key.as_deref());

    println!("Creating MCP client configuration...");
    ClientConfig::for_gateway(port, &api_key).write(&path)?;

    println!("✓ Created {}", path.display());
    println!();
    println!("To use with Copilot CLI:");
    println!("  npx @github/copilot \\");
    println!("    --disable-builtin-mcps \\");
    println!("    --additional-mcp-config @{} \\", path.display());
    println!("    --allow-all-tools \\");
    println!("    --prompt 'List 3 issues from githubnext/gh-aw'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_api_key() {
        let key = generate_api_key();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_api_key());
    }
}
